use tracing::debug;

use crate::serial::pump::Decoder;

pub const LINE_CAPACITY: usize = 128;

/*
    Newline-delimited reply lines from the controller. A line that outgrows the buffer wraps
    back to the start, losing what came before; the next newline resynchronizes.
*/
pub struct LineDecoder {
    buffer: [u8; LINE_CAPACITY],
    position: usize,
}
impl LineDecoder {
    pub fn new() -> Self {
        LineDecoder { buffer: [0; LINE_CAPACITY], position: 0 }
    }
}
impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}
impl Decoder for LineDecoder {
    type Item = String;

    fn push_byte(&mut self, byte: u8) -> Option<String> {
        if byte == b'\n' {
            let mut line = &self.buffer[..self.position];
            if let [rest @ .., b'\r'] = line {
                line = rest;
            }
            let line = String::from_utf8_lossy(line).into_owned();
            self.position = 0;
            return Some(line);
        }
        if self.position == LINE_CAPACITY {
            debug!("reply line longer than {} bytes; wrapping", LINE_CAPACITY);
            self.position = 0;
        }
        self.buffer[self.position] = byte;
        self.position += 1;
        None
    }
}
