use std::{
    mem,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, oneshot, watch},
    time::{interval, timeout, MissedTickBehavior},
};
use tracing::{debug, info, trace, warn};

use super::{
    commands::GrblCommand,
    messages::{get_alarm_text, get_error_text, initial_work_offsets, GrblState, MessageKind, WorkOffsets},
    parser::{classify, parse_alarm_code, parse_error_code, parse_feedback, parse_report},
    realtime::RealtimeCommand,
};
use crate::{error::LineError, serial::transmit::Transmitter, util::format_bytes::format_byte_string};

/*
    What the dispatcher and preset store need from the controller: one acknowledged command
    at a time, fire-and-forget realtime bytes, and the latest status snapshot.
*/
#[async_trait]
pub trait MachineLink: Send + Sync {
    /// Resolves once the controller has announced itself since the link was opened.
    async fn wait_for_greeting(&self) -> Result<(), LineError>;
    async fn send_command(&self, command: &GrblCommand) -> Result<(), LineError>;
    /// Transmits a line without claiming its reply. Any reply is left to arrive unsolicited.
    async fn send_unacknowledged(&self, command: &GrblCommand);
    fn send_realtime(&self, command: RealtimeCommand);
    fn state(&self) -> GrblState;
}

type AckSender = oneshot::Sender<Result<(), LineError>>;

enum AckState {
    Idle,
    Waiting(AckSender),
    Closed,
}

// The single pending acknowledgement, shared between the sender and the reply processor.
struct AckSlot {
    state: Mutex<AckState>,
}
impl AckSlot {
    fn lock(&self) -> MutexGuard<'_, AckState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn arm(&self) -> oneshot::Receiver<Result<(), LineError>> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.lock();
        if !matches!(*state, AckState::Closed) {
            *state = AckState::Waiting(sender);
        }
        // When closed the sender is dropped here and the receiver resolves as disconnected.
        receiver
    }
    fn disarm(&self) {
        let mut state = self.lock();
        if let AckState::Waiting(_) = *state {
            *state = AckState::Idle;
        }
    }
    fn complete(&self, result: Result<(), LineError>) -> bool {
        let mut state = self.lock();
        match mem::replace(&mut *state, AckState::Idle) {
            AckState::Waiting(sender) => {
                drop(sender.send(result));
                true
            }
            AckState::Idle => false,
            AckState::Closed => {
                *state = AckState::Closed;
                false
            }
        }
    }
    fn close(&self) {
        *self.lock() = AckState::Closed;
    }
}

pub struct GrblMachine {
    transmitter: Arc<Transmitter>,
    in_flight: tokio::sync::Mutex<()>,
    acks: Arc<AckSlot>,
    state: watch::Receiver<GrblState>,
    work_offsets: watch::Receiver<WorkOffsets>,
    greeted: watch::Receiver<bool>,
    ack_timeout: Option<Duration>,
}

// Sole writer of the status snapshot and work offsets, and the only source of acknowledgements.
pub struct ReplyProcessor {
    acks: Arc<AckSlot>,
    state: watch::Sender<GrblState>,
    work_offsets: watch::Sender<WorkOffsets>,
    greeted: watch::Sender<bool>,
}

pub struct MachineParts {
    pub machine: GrblMachine,
    pub processor: ReplyProcessor,
}

impl GrblMachine {
    pub fn create(transmitter: Arc<Transmitter>, ack_timeout: Option<Duration>) -> MachineParts {
        let acks = Arc::new(AckSlot { state: Mutex::new(AckState::Idle) });
        let (state_tx, state_rx) = watch::channel(GrblState::default());
        let (offsets_tx, offsets_rx) = watch::channel(initial_work_offsets());
        let (greeted_tx, greeted_rx) = watch::channel(false);
        MachineParts {
            machine: GrblMachine {
                transmitter,
                in_flight: tokio::sync::Mutex::new(()),
                acks: acks.clone(),
                state: state_rx,
                work_offsets: offsets_rx,
                greeted: greeted_rx,
                ack_timeout,
            },
            processor: ReplyProcessor {
                acks,
                state: state_tx,
                work_offsets: offsets_tx,
                greeted: greeted_tx,
            },
        }
    }

    /*
        A freshly reset controller drops everything it receives until its bootloader hands over,
        which it announces with the `Grbl ...` banner. Bounded by the ack timeout when one is set.
    */
    pub async fn wait_for_greeting(&self) -> Result<(), LineError> {
        let mut greeted = self.greeted.clone();
        let announced = async move {
            while !*greeted.borrow_and_update() {
                greeted.changed().await?;
            }
            Ok::<(), watch::error::RecvError>(())
        };
        let announced = match self.ack_timeout {
            Some(limit) => match timeout(limit, announced).await {
                Ok(announced) => announced,
                Err(_) => {
                    warn!("controller did not greet within {:?}", limit);
                    return Err(LineError::Timeout);
                }
            },
            None => announced.await,
        };
        announced.map_err(|_| LineError::Disconnected)
    }

    /*
        Transmits one command and waits for the next `ok`/`error:` reply. Callers queue on the
        in-flight lock, so replies always pair with the command that is currently out.
    */
    pub async fn send_and_await_ack(&self, bytes: &[u8]) -> Result<(), LineError> {
        let _in_flight = self.in_flight.lock().await;
        let reply = self.acks.arm();
        debug!("> {}", format_byte_string(bytes.iter().copied()));
        self.transmitter.enqueue(bytes).await;
        let reply = match self.ack_timeout {
            Some(limit) => match timeout(limit, reply).await {
                Ok(reply) => reply,
                Err(_) => {
                    self.acks.disarm();
                    warn!("no reply to {} within {:?}", format_byte_string(bytes.iter().copied()), limit);
                    return Err(LineError::Timeout);
                }
            },
            None => reply.await,
        };
        reply.unwrap_or(Err(LineError::Disconnected))
    }
    pub async fn send_without_ack(&self, bytes: &[u8]) {
        let _in_flight = self.in_flight.lock().await;
        debug!("> {} (unacknowledged)", format_byte_string(bytes.iter().copied()));
        self.transmitter.enqueue(bytes).await;
    }
    pub fn send_no_ack(&self, byte: u8) {
        trace!("> realtime {:#04x}", byte);
        self.transmitter.enqueue_immediate(byte);
    }
    pub fn state(&self) -> GrblState {
        *self.state.borrow()
    }
    pub fn work_offsets(&self) -> WorkOffsets {
        *self.work_offsets.borrow()
    }
    // Drives the report stream the status snapshot depends on.
    pub async fn poll_status(&self, period: Duration) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.send_no_ack(RealtimeCommand::StatusReport.byte());
        }
    }
}

#[async_trait]
impl MachineLink for GrblMachine {
    async fn wait_for_greeting(&self) -> Result<(), LineError> {
        GrblMachine::wait_for_greeting(self).await
    }
    async fn send_command(&self, command: &GrblCommand) -> Result<(), LineError> {
        self.send_and_await_ack(command.to_string().as_bytes()).await
    }
    async fn send_unacknowledged(&self, command: &GrblCommand) {
        self.send_without_ack(command.to_string().as_bytes()).await
    }
    fn send_realtime(&self, command: RealtimeCommand) {
        self.send_no_ack(command.byte())
    }
    fn state(&self) -> GrblState {
        GrblMachine::state(self)
    }
}

impl ReplyProcessor {
    fn acknowledge(&self, result: Result<(), LineError>) {
        if !self.acks.complete(result) {
            warn!("received acknowledgement without listener");
        }
    }
    pub fn process_line(&self, line: &str) {
        if line.is_empty() {
            trace!("< (blank)");
            return;
        }
        debug!("< {}", line);
        match classify(line) {
            MessageKind::Ok => self.acknowledge(Ok(())),
            MessageKind::Error => {
                let code = parse_error_code(line).unwrap_or(0);
                warn!("Error received: {}", get_error_text(code));
                self.acknowledge(Err(LineError::Grbl(code)));
            }
            MessageKind::Alarm => match parse_alarm_code(line) {
                Some(code) => warn!("Alarm received: {}", get_alarm_text(code)),
                None => warn!("Alarm received: {:?}", line),
            },
            MessageKind::Report => match parse_report(line) {
                Some(report) => self.state.send_modify(|state| {
                    state.state = report.state;
                    if let Some(position) = report.machine_position {
                        state.pos_act = position;
                    }
                }),
                None => debug!("report without fields: {:?}", line),
            },
            MessageKind::Feedback => match parse_feedback(line) {
                Ok(Some(offset)) => self.work_offsets.send_modify(|offsets| offsets[offset.index] = offset),
                Ok(None) => debug!("unused feedback: {:?}", line),
                Err(error) => warn!("ignoring work offset: {}", error),
            },
            MessageKind::Welcome => {
                info!("controller says: {}", line);
                self.greeted.send_replace(true);
            }
            MessageKind::Settings | MessageKind::StartupExec => debug!("echo: {}", line),
            MessageKind::Invalid => debug!("Unrecognized line: {:?}", line),
        }
    }
    pub async fn run(self, mut lines: mpsc::Receiver<String>) {
        while let Some(line) = lines.recv().await {
            self.process_line(&line);
        }
        info!("reply stream ended");
    }
}
impl Drop for ReplyProcessor {
    fn drop(&mut self) {
        self.acks.close();
    }
}
