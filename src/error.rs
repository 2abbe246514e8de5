use thiserror::Error;

/// Outcome of a command that did not end in a plain `ok`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("controller replied error:{0}")]
    Grbl(u64),
    #[error("no acknowledgement within the configured timeout")]
    Timeout,
    #[error("reply stream closed before acknowledgement")]
    Disconnected,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpretError {
    #[error("unknown jog direction id {0:#06x}")]
    UnknownJog(u16),
    #[error("unrecognized frame shape")]
    Unrecognized,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed position {0:?}")]
pub struct PositionError(pub String);

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("preset slot {0} out of range 0..=7")]
    InvalidSlot(u8),
    #[error("preset file: {0}")]
    Io(#[from] std::io::Error),
    #[error("preset record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("controller rejected preset command: {0}")]
    Machine(#[from] LineError),
}

/// Why a single VISCA command could not be carried out. Never fatal to the dispatcher.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Line(#[from] LineError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
