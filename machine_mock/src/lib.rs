mod trivial;

pub use trivial::{rebooting_machine, recording_machine, trivial_machine, Received, GREETING, STATUS_REPORT};
