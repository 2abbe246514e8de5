use std::{path::PathBuf, time::Duration};

/// Tunables for one bridge instance. The binary fills these from its arguments.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Grace period after cancelling a jog before a positioning command goes out.
    pub settle_delay: Duration,
    pub jog_idle_interval: Duration,
    pub status_poll_interval: Duration,
    /// Distance of one incremental jog command.
    pub jog_step: f64,
    pub jog_feed: f64,
    pub queue_capacity: usize,
    pub ack_timeout: Option<Duration>,
    pub skip_homing: bool,
    pub data_folder: PathBuf,
}

impl BridgeConfig {
    pub fn presets_path(&self) -> PathBuf {
        self.data_folder.join("presets.json")
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            settle_delay: Duration::from_millis(100),
            jog_idle_interval: Duration::from_millis(50),
            status_poll_interval: Duration::from_secs(1),
            jog_step: 0.01,
            jog_feed: 0.01,
            queue_capacity: 32,
            ack_timeout: None,
            skip_homing: false,
            data_folder: PathBuf::from("data"),
        }
    }
}
