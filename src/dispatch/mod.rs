pub mod jog;

use std::{sync::Arc, time::Duration};

use tokio::{
    sync::{
        broadcast::{self, error::RecvError},
        watch,
    },
    time::sleep,
};
use tracing::{info, warn};

use crate::{
    error::DispatchError,
    grbl::{
        commands::{DistanceMode, GrblCommand},
        machine::MachineLink,
        messages::Position,
        realtime::RealtimeCommand,
    },
    presets::{PresetSlot, PresetStore},
    visca::command::{JogDirection, PositionTarget, ViscaCommand},
};

use jog::JogState;

/*
    Single consumer of interpreted VISCA commands. Owns the jog state; the jog loop only ever
    observes it through the watch channel handed out by `new`.
*/
pub struct Dispatcher<L, S> {
    link: Arc<L>,
    store: S,
    jog: watch::Sender<JogState>,
    settle_delay: Duration,
    current_setting: Position,
}

impl<L: MachineLink, S: PresetStore> Dispatcher<L, S> {
    pub fn new(link: Arc<L>, store: S, settle_delay: Duration) -> (Self, watch::Receiver<JogState>) {
        let (jog, jog_rx) = watch::channel(JogState::default());
        (
            Dispatcher {
                link,
                store,
                jog,
                settle_delay,
                current_setting: Position::default(),
            },
            jog_rx,
        )
    }
    pub fn jog_state(&self) -> JogState {
        *self.jog.borrow()
    }
    pub fn current_setting(&self) -> Position {
        self.current_setting
    }

    async fn stop_jog_and_settle(&mut self) {
        let jogging = self.jog.borrow().active;
        if jogging {
            self.jog.send_modify(|jog| jog.active = false);
            self.link.send_realtime(RealtimeCommand::JogCancel);
            sleep(self.settle_delay).await;
        }
    }
    async fn move_to(&mut self, mode: DistanceMode, target: PositionTarget) -> Result<(), DispatchError> {
        self.stop_jog_and_settle().await;
        self.link.send_command(&GrblCommand::SetMode(mode)).await?;
        self.link
            .send_command(&GrblCommand::Rapid {
                x: f64::from(target.pan) / 1000.0,
                y: f64::from(target.tilt) / 1000.0,
            })
            .await?;
        Ok(())
    }

    pub async fn handle(&mut self, command: ViscaCommand) -> Result<(), DispatchError> {
        match command {
            ViscaCommand::Jog { direction: JogDirection::Stop, speeds } => {
                self.jog.send_replace(JogState::moving(JogDirection::Stop, speeds));
                self.link.send_realtime(RealtimeCommand::JogCancel);
            }
            ViscaCommand::Jog { direction, speeds } => {
                self.jog.send_replace(JogState::moving(direction, speeds));
            }
            ViscaCommand::AbsoluteMove(target) => self.move_to(DistanceMode::Absolute, target).await?,
            ViscaCommand::RelativeMove(target) => self.move_to(DistanceMode::Relative, target).await?,
            ViscaCommand::Home => self.link.send_command(&GrblCommand::Home).await?,
            ViscaCommand::Reset => self.link.send_command(&GrblCommand::Unlock).await?,
            ViscaCommand::MemoryRecall(slot) => {
                let slot = PresetSlot::try_from(slot)?;
                self.current_setting = self.link.state().pos_act;
                self.current_setting = self.store.load(slot).await?;
            }
            ViscaCommand::MemorySet(slot) => {
                let slot = PresetSlot::try_from(slot)?;
                self.current_setting = self.link.state().pos_act;
                self.store.save(slot, self.current_setting).await?;
            }
        }
        Ok(())
    }

    pub async fn run(mut self, mut commands: broadcast::Receiver<ViscaCommand>) {
        loop {
            let command = match commands.recv().await {
                Ok(command) => command,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("dispatcher behind; {} oldest commands dropped", skipped);
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            info!("received visca command {:?}", command);
            if let Err(error) = self.handle(command).await {
                warn!("failed to carry out {:?}: {}", command, error);
            }
        }
        info!("command queue closed");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::{
        error::{LineError, StoreError},
        grbl::messages::{GrblState, MachineState},
        testing::{RecordingLink, Sent},
        visca::command::Speeds,
    };

    #[derive(Default)]
    struct MemoryStore {
        saved: Vec<(u8, Position)>,
        loaded: Vec<u8>,
    }
    #[async_trait]
    impl PresetStore for MemoryStore {
        async fn load(&mut self, slot: PresetSlot) -> Result<Position, StoreError> {
            self.loaded.push(slot.index());
            Ok(Position::new(9.0, 8.0, 0.0))
        }
        async fn save(&mut self, slot: PresetSlot, position: Position) -> Result<(), StoreError> {
            self.saved.push((slot.index(), position));
            Ok(())
        }
    }

    const SPEEDS: Speeds = Speeds { pan: 0x10, tilt: 0x10 };

    fn dispatcher(settle: Duration) -> (Arc<RecordingLink>, Dispatcher<RecordingLink, MemoryStore>) {
        let link = Arc::new(RecordingLink::default());
        let (dispatcher, _) = Dispatcher::new(link.clone(), MemoryStore::default(), settle);
        (link, dispatcher)
    }

    fn target(pan: i32, tilt: i32) -> PositionTarget {
        PositionTarget { speeds: SPEEDS, pan, tilt }
    }

    #[tokio::test]
    async fn absolute_move_cancels_jog_first() {
        let settle = Duration::from_millis(30);
        let (link, mut dispatcher) = dispatcher(settle);
        dispatcher.handle(ViscaCommand::Jog { direction: JogDirection::Up, speeds: SPEEDS }).await.unwrap();
        assert!(dispatcher.jog_state().active);
        dispatcher.handle(ViscaCommand::AbsoluteMove(target(1500, -500))).await.unwrap();
        assert!(!dispatcher.jog_state().active);

        let timed = link.timed();
        let sent: Vec<Sent> = timed.iter().map(|(_, sent)| sent.clone()).collect();
        assert_eq!(
            sent,
            vec![
                Sent::Realtime(0x85),
                Sent::Line("G90\n".into()),
                Sent::Line("G0 X1.500Y-0.500\n".into()),
            ]
        );
        assert!(timed[1].0 - timed[0].0 >= settle);
    }

    #[tokio::test]
    async fn relative_move_without_jog_goes_straight_out() {
        let (link, mut dispatcher) = dispatcher(Duration::from_millis(30));
        dispatcher.handle(ViscaCommand::RelativeMove(target(-250, 1000))).await.unwrap();
        assert_eq!(link.sent(), vec![Sent::Line("G91\n".into()), Sent::Line("G0 X-0.250Y1.000\n".into())]);
    }

    #[tokio::test]
    async fn stop_cancels_immediately() {
        let (link, mut dispatcher) = dispatcher(Duration::ZERO);
        dispatcher.handle(ViscaCommand::Jog { direction: JogDirection::DownRight, speeds: SPEEDS }).await.unwrap();
        assert_eq!(
            dispatcher.jog_state(),
            JogState { active: true, pan_dir: 1, tilt_dir: -1, speeds: Some(SPEEDS) }
        );
        dispatcher.handle(ViscaCommand::Jog { direction: JogDirection::Stop, speeds: SPEEDS }).await.unwrap();
        let jog = dispatcher.jog_state();
        assert_eq!((jog.active, jog.pan_dir, jog.tilt_dir), (false, 0, 0));
        assert_eq!(link.sent(), vec![Sent::Realtime(0x85)]);
    }

    #[tokio::test]
    async fn home_and_reset() {
        let (link, mut dispatcher) = dispatcher(Duration::ZERO);
        dispatcher.handle(ViscaCommand::Home).await.unwrap();
        dispatcher.handle(ViscaCommand::Reset).await.unwrap();
        assert_eq!(link.lines(), vec!["$H\n", "$X\n"]);
    }

    #[tokio::test]
    async fn memory_commands_use_current_position() {
        let (link, mut dispatcher) = dispatcher(Duration::ZERO);
        link.set_state(GrblState { state: MachineState::Idle, pos_act: Position::new(1.0, 2.0, 3.0) });
        dispatcher.handle(ViscaCommand::MemorySet(4)).await.unwrap();
        assert_eq!(dispatcher.store.saved, vec![(4, Position::new(1.0, 2.0, 3.0))]);
        dispatcher.handle(ViscaCommand::MemoryRecall(4)).await.unwrap();
        assert_eq!(dispatcher.store.loaded, vec![4]);
        assert_eq!(dispatcher.current_setting(), Position::new(9.0, 8.0, 0.0));
    }

    #[tokio::test]
    async fn failures_are_reported_not_fatal() {
        let (link, mut dispatcher) = dispatcher(Duration::ZERO);
        assert!(matches!(
            dispatcher.handle(ViscaCommand::MemorySet(9)).await,
            Err(DispatchError::Store(StoreError::InvalidSlot(9)))
        ));
        link.reject_with(Some(2));
        assert!(matches!(
            dispatcher.handle(ViscaCommand::Home).await,
            Err(DispatchError::Line(LineError::Grbl(2)))
        ));

        link.reject_with(None);
        let (commands, queue) = broadcast::channel(4);
        commands.send(ViscaCommand::MemoryRecall(200)).unwrap();
        commands.send(ViscaCommand::Reset).unwrap();
        drop(commands);
        dispatcher.run(queue).await;
        assert_eq!(link.lines().last().map(String::as_str), Some("$X\n"));
    }

    #[tokio::test]
    async fn stop_survives_a_backlog() {
        let link = Arc::new(RecordingLink::default());
        let (dispatcher, jog_rx) = Dispatcher::new(link.clone(), MemoryStore::default(), Duration::ZERO);
        let (commands, queue) = broadcast::channel(2);
        for direction in [JogDirection::Up, JogDirection::Left, JogDirection::Right, JogDirection::Stop] {
            commands.send(ViscaCommand::Jog { direction, speeds: SPEEDS }).unwrap();
        }
        drop(commands);
        dispatcher.run(queue).await;
        assert!(!jog_rx.borrow().active);
        assert_eq!(link.sent(), vec![Sent::Realtime(0x85)]);
    }
}
