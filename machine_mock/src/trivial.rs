use std::{future::Future, pin::pin, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    time::{timeout_at, Instant},
};

pub const GREETING: &[u8] = b"Grbl 1.1h ['$' for help]\r\n";
pub const STATUS_REPORT: &[u8] = b"<Idle|MPos:0.000,1.000,3.000|FS:0,0|WCO:5.000,-5.250,17.000>\r\n";
const PARAMETERS: &[u8] = b"[G54:0.000,0.000,0.000]\r\n[G55:10.000,20.000,0.000]\r\n[G56:0.000,0.000,0.000]\r\n\
[G57:0.000,0.000,0.000]\r\n[G58:0.000,0.000,0.000]\r\n[G59:0.000,0.000,0.000]\r\n[G28:0.000,0.000,0.000]\r\n\
[G30:0.000,0.000,0.000]\r\n[G92:0.000,0.000,0.000]\r\n[TLO:0.000]\r\n[PRB:0.000,0.000,0.000:0]\r\n";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Line(String),
    Realtime(u8),
}

/// A controller that accepts everything: `ok` per line, a status report per `?`.
pub fn trivial_machine(input: impl AsyncRead, output: impl AsyncWrite) -> impl Future<Output=()> {
    recording_machine(input, output, None)
}

/// A controller that was just reset: input is swallowed for `boot_time`, then it greets and
/// behaves like `trivial_machine`.
pub fn rebooting_machine(input: impl AsyncRead, output: impl AsyncWrite, boot_time: Duration) -> impl Future<Output=()> {
    async move {
        let mut input = pin!(input);
        let booted = Instant::now() + boot_time;
        let mut discarded = [0u8; 64];
        while let Ok(read) = timeout_at(booted, input.read(&mut discarded)).await {
            if matches!(read, Ok(0) | Err(_)) {
                return;
            }
        }
        trivial_machine(input, output).await
    }
}

/// Like `trivial_machine`, but reports every line and realtime byte it receives on `log`.
pub fn recording_machine(
    input: impl AsyncRead,
    output: impl AsyncWrite,
    log: Option<mpsc::UnboundedSender<Received>>,
) -> impl Future<Output=()> {
    async move {
        let mut input = pin!(input);
        let mut output = pin!(output);
        let record = |received: Received| {
            if let Some(log) = &log {
                drop(log.send(received));
            }
        };
        drop(output.write_all(GREETING).await);
        let mut line = Vec::new();
        loop {
            let value = match input.read_u8().await {
                Ok(value) => value,
                Err(_) => return,
            };
            match value {
                b'\n' => {
                    let text = String::from_utf8_lossy(&line).into_owned();
                    line.clear();
                    if text == "$#" {
                        drop(output.write_all(PARAMETERS).await);
                    }
                    record(Received::Line(text));
                    drop(output.write_all(b"ok\r\n").await);
                }
                b'\r' => (),
                b'?' => drop(output.write_all(STATUS_REPORT).await),
                0x18 => {
                    record(Received::Realtime(value));
                    line.clear();
                    drop(output.write_all(GREETING).await);
                }
                0x80..=0xff | b'!' | b'~' => record(Received::Realtime(value)),
                _ => line.push(value),
            }
        }
    }
}
