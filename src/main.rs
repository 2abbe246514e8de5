use std::{path::PathBuf, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio::runtime::Builder;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ptz_bridge::{
    bridge::run_bridge,
    config::BridgeConfig,
    serial::connection::{open_and_reset_arduino_like_serial, open_plain_serial},
};

#[derive(Parser, Debug)]
#[command(version, about = "Bridge VISCA pan/tilt commands onto a GRBL motion controller.", long_about = None)]
struct Args {
    /// Serial port the camera controller speaks VISCA on
    #[arg(long)]
    visca_port: String,
    /// Serial port of the GRBL controller
    #[arg(long)]
    grbl_port: String,
    #[arg(long, default_value_t = 9600)]
    visca_baud: u32,
    #[arg(long, default_value_t = 115200)]
    grbl_baud: u32,
    /// Where stored presets are recorded
    #[arg(short, long, default_value = "data")]
    data_folder: String,
    /// Give up on a command after this long without ok/error. Waits forever when absent.
    #[arg(long)]
    ack_timeout_ms: Option<u64>,
    #[arg(long)]
    skip_homing: bool,
}

impl Args {
    fn config(&self) -> BridgeConfig {
        BridgeConfig {
            ack_timeout: self.ack_timeout_ms.map(Duration::from_millis),
            skip_homing: self.skip_homing,
            data_folder: PathBuf::from(&self.data_folder),
            ..BridgeConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    info!("starting bridge with {:?}", args);
    let runtime = Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .context("building runtime")?;
    runtime.block_on(async {
        let (controller_in, controller_out) = open_and_reset_arduino_like_serial(&args.grbl_port, args.grbl_baud).await?;
        let (camera, _) = open_plain_serial(&args.visca_port, args.visca_baud)?;
        run_bridge(camera, controller_in, controller_out, args.config()).await
    })
}
