use std::fmt::Debug;

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc::{self, error::TrySendError},
};
use tracing::{trace, warn};

use crate::util::{fixed_rb::ByteRing, format_bytes::format_byte_string};

pub const RX_CAPACITY: usize = 512;

/*
    Byte-at-a-time reconstruction of framed messages. Implementations must not block and must
    return to a resynchronizing state on their own when input is malformed.
*/
pub trait Decoder {
    type Item;
    fn push_byte(&mut self, byte: u8) -> Option<Self::Item>;
}

// Bounded queue policy: when full, the newest item is dropped. Returns false once the consumer is gone.
pub fn offer<T: Debug>(queue: &mpsc::Sender<T>, item: T, label: &str) -> bool {
    match queue.try_send(item) {
        Ok(()) => true,
        Err(TrySendError::Full(item)) => {
            warn!("{} queue full; dropping {:?}", label, item);
            true
        }
        Err(TrySendError::Closed(_)) => false,
    }
}

/*
    Receive path for one serial channel: raw reads land in a fixed ring, the ring is drained
    through the decoder, and finished items go to the processing queue.
*/
pub async fn pump<R, D>(mut reader: R, mut decoder: D, queue: mpsc::Sender<D::Item>, label: &'static str) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    D: Decoder,
    D::Item: Debug,
{
    let mut ring: ByteRing<RX_CAPACITY> = ByteRing::new();
    let mut chunk = [0u8; 64];
    loop {
        let count = reader.read(&mut chunk).await?;
        if count == 0 {
            return Ok(());
        }
        trace!("{} < {}", label, format_byte_string(chunk[..count].iter().copied()));
        let stored = ring.push_slice(&chunk[..count]);
        if stored < count {
            warn!("{} receive buffer full; dropped {} bytes", label, count - stored);
        }
        while let Some(byte) = ring.pop() {
            if let Some(item) = decoder.push_byte(byte) {
                if !offer(&queue, item, label) {
                    return Ok(());
                }
            }
        }
    }
}
