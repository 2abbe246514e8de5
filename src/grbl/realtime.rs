// Single-byte commands the controller acts on as soon as they arrive, outside the line protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RealtimeCommand {
    Reset = 0x18,
    StatusReport = b'?',
    CycleStart = b'~',
    FeedHold = b'!',
    JogCancel = 0x85,
}
impl RealtimeCommand {
    pub fn byte(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_bytes() {
        assert_eq!(RealtimeCommand::StatusReport.byte(), b'?');
        assert_eq!(RealtimeCommand::JogCancel.byte(), 0x85);
        assert_eq!(RealtimeCommand::Reset.byte(), 0x18);
    }
}
