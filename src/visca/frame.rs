use tracing::debug;

use crate::serial::pump::Decoder;

pub const MAX_PAYLOAD: usize = 14;
pub const TERMINATOR: u8 = 0xFF;
pub const FIRST_ADDRESS: u8 = 0x81;
pub const LAST_ADDRESS: u8 = 0x88;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViscaRawFrame {
    pub address: u8,
    pub length: u8,
    pub data: [u8; MAX_PAYLOAD],
}
impl ViscaRawFrame {
    pub fn new(address: u8) -> Self {
        ViscaRawFrame { address, length: 0, data: [0; MAX_PAYLOAD] }
    }
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length as usize]
    }
    fn append(&mut self, byte: u8) -> bool {
        if self.length as usize >= MAX_PAYLOAD {
            return false;
        }
        self.data[self.length as usize] = byte;
        self.length += 1;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameState {
    WaitForAddress,
    ReadData(ViscaRawFrame),
}

/*
    Rebuilds frames from the camera-control byte stream. Bytes outside a frame are skipped
    until an address in 0x81..=0x88 shows up; the frame closes on 0xFF.
*/
pub struct FrameDecoder {
    state: FrameState,
}
impl FrameDecoder {
    pub fn new() -> Self {
        FrameDecoder { state: FrameState::WaitForAddress }
    }
}
impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
impl Decoder for FrameDecoder {
    type Item = ViscaRawFrame;

    fn push_byte(&mut self, byte: u8) -> Option<ViscaRawFrame> {
        match &mut self.state {
            FrameState::WaitForAddress => {
                if (FIRST_ADDRESS..=LAST_ADDRESS).contains(&byte) {
                    self.state = FrameState::ReadData(ViscaRawFrame::new(byte));
                }
                None
            }
            FrameState::ReadData(frame) => {
                if byte == TERMINATOR {
                    let frame = *frame;
                    self.state = FrameState::WaitForAddress;
                    return Some(frame);
                }
                if !frame.append(byte) {
                    debug!("visca frame from {:#04x} exceeds {} bytes; dropped", frame.address, MAX_PAYLOAD);
                    self.state = FrameState::WaitForAddress;
                }
                None
            }
        }
    }
}
