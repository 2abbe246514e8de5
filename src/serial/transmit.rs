use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Notify,
};
use tracing::warn;

use crate::util::fixed_rb::ByteRing;

pub const TX_CAPACITY: usize = 512;

/*
    Outbound byte queue for the motion controller. Callers fill the ring; a single writer task
    drains it to the port. Line commands wait for space, realtime bytes never wait.
*/
pub struct Transmitter {
    ring: Mutex<ByteRing<TX_CAPACITY>>,
    ready: Notify,
    space: Notify,
}
impl Transmitter {
    pub fn new() -> Self {
        Transmitter {
            ring: Mutex::new(ByteRing::new()),
            ready: Notify::new(),
            space: Notify::new(),
        }
    }
    fn ring(&self) -> MutexGuard<'_, ByteRing<TX_CAPACITY>> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }
    pub async fn enqueue(&self, bytes: &[u8]) {
        let mut rest = bytes;
        loop {
            let stored = self.ring().push_slice(rest);
            rest = &rest[stored..];
            self.ready.notify_one();
            if rest.is_empty() {
                return;
            }
            self.space.notified().await;
        }
    }
    pub fn enqueue_immediate(&self, byte: u8) -> bool {
        let stored = self.ring().push(byte).is_ok();
        if stored {
            self.ready.notify_one();
        } else {
            warn!("transmit buffer full; dropping realtime byte {:#04x}", byte);
        }
        stored
    }
    pub fn pending(&self) -> usize {
        self.ring().len()
    }
    pub async fn run<W: AsyncWrite + Unpin>(&self, mut writer: W) -> std::io::Result<()> {
        let mut chunk = [0u8; 64];
        loop {
            let count = self.ring().pop_slice(&mut chunk);
            if count == 0 {
                self.ready.notified().await;
                continue;
            }
            self.space.notify_one();
            writer.write_all(&chunk[..count]).await?;
            writer.flush().await?;
        }
    }
}
impl Default for Transmitter {
    fn default() -> Self {
        Self::new()
    }
}
