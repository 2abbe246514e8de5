use std::{sync::Mutex, time::Duration};

use async_trait::async_trait;
use tokio::time::{sleep, Instant};

use crate::{
    error::LineError,
    grbl::{commands::GrblCommand, machine::MachineLink, messages::GrblState, realtime::RealtimeCommand},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Line(String),
    Realtime(u8),
}

// Acknowledges everything after a short round trip and remembers what went out, and when.
#[derive(Default)]
pub struct RecordingLink {
    sent: Mutex<Vec<(Instant, Sent)>>,
    state: Mutex<GrblState>,
    reject_with: Mutex<Option<u64>>,
}
impl RecordingLink {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().iter().map(|(_, sent)| sent.clone()).collect()
    }
    pub fn timed(&self) -> Vec<(Instant, Sent)> {
        self.sent.lock().unwrap().clone()
    }
    pub fn lines(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|sent| match sent {
                Sent::Line(line) => Some(line),
                Sent::Realtime(_) => None,
            })
            .collect()
    }
    pub fn set_state(&self, state: GrblState) {
        *self.state.lock().unwrap() = state;
    }
    pub fn reject_with(&self, code: Option<u64>) {
        *self.reject_with.lock().unwrap() = code;
    }
}

#[async_trait]
impl MachineLink for RecordingLink {
    async fn wait_for_greeting(&self) -> Result<(), LineError> {
        Ok(())
    }
    async fn send_command(&self, command: &GrblCommand) -> Result<(), LineError> {
        self.sent.lock().unwrap().push((Instant::now(), Sent::Line(command.to_string())));
        sleep(Duration::from_millis(1)).await;
        match *self.reject_with.lock().unwrap() {
            Some(code) => Err(LineError::Grbl(code)),
            None => Ok(()),
        }
    }
    async fn send_unacknowledged(&self, command: &GrblCommand) {
        self.sent.lock().unwrap().push((Instant::now(), Sent::Line(command.to_string())));
    }
    fn send_realtime(&self, command: RealtimeCommand) {
        self.sent.lock().unwrap().push((Instant::now(), Sent::Realtime(command.byte())));
    }
    fn state(&self) -> GrblState {
        *self.state.lock().unwrap()
    }
}
