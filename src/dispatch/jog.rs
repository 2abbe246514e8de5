use std::{sync::Arc, time::Duration};

use tokio::{sync::watch, time::sleep};
use tracing::{debug, warn};

use crate::{
    grbl::{commands::GrblCommand, machine::MachineLink, realtime::RealtimeCommand},
    visca::command::{JogDirection, Speeds},
};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JogState {
    pub active: bool,
    pub pan_dir: i8,
    pub tilt_dir: i8,
    pub speeds: Option<Speeds>,
}
impl JogState {
    pub fn moving(direction: JogDirection, speeds: Speeds) -> Self {
        let (pan_dir, tilt_dir) = direction.steps();
        JogState {
            active: direction != JogDirection::Stop,
            pan_dir,
            tilt_dir,
            speeds: Some(speeds),
        }
    }
    // The mount's X axis tilts and its Y axis pans, both reversed.
    pub fn command(&self, step: f64, feed: f64) -> GrblCommand {
        GrblCommand::Jog {
            x: f64::from(-self.tilt_dir) * step,
            y: f64::from(-self.pan_dir) * step,
            feed,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct JogSettings {
    pub step: f64,
    pub feed: f64,
    pub idle_interval: Duration,
}

/*
    Keeps short jog moves flowing while a direction is held. Each move waits for its ack, so the
    pace follows the controller's round trip. Ends once the dispatcher drops its side of `jog`.
*/
pub async fn run_jog_loop<L: MachineLink>(link: Arc<L>, mut jog: watch::Receiver<JogState>, settings: JogSettings) {
    let mut was_active = false;
    loop {
        let current = *jog.borrow_and_update();
        if was_active && !current.active {
            debug!("jog released");
            link.send_realtime(RealtimeCommand::JogCancel);
        }
        was_active = current.active;
        if current.active {
            if let Err(error) = link.send_command(&current.command(settings.step, settings.feed)).await {
                warn!("jog step failed: {}", error);
                sleep(settings.idle_interval).await;
            }
        } else {
            sleep(settings.idle_interval).await;
        }
        if jog.has_changed().is_err() {
            return;
        }
    }
}
