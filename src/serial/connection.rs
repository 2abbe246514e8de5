use std::time::Duration;

use anyhow::Context;
use tokio::{
    io::{split, ReadHalf, WriteHalf},
    time::sleep,
};
use tokio_serial::{self, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream, StopBits};

pub type SerialHalves = (ReadHalf<SerialStream>, WriteHalf<SerialStream>);

pub fn open_serial(path: &str, baud_rate: u32) -> anyhow::Result<SerialStream> {
    tokio_serial::new(path, baud_rate)
        .data_bits(DataBits::Eight)
        .flow_control(FlowControl::None)
        .timeout(Duration::from_millis(30))
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .open_native_async()
        .with_context(|| format!("failed to open serial port {}", path))
}

pub async fn open_and_reset_arduino_like_serial(path: &str, baud_rate: u32) -> anyhow::Result<SerialHalves> {
    let mut port = open_serial(path, baud_rate)?;
    port.write_data_terminal_ready(false).context("unable to drop DTR")?;
    sleep(Duration::from_millis(2)).await;
    port.write_data_terminal_ready(true).context("unable to raise DTR")?;
    Ok(split(port))
}

pub fn open_plain_serial(path: &str, baud_rate: u32) -> anyhow::Result<SerialHalves> {
    Ok(split(open_serial(path, baud_rate)?))
}
