use embedded_hal::digital::ErrorKind;
use thiserror::Error;

use crate::line::Role;

/// Pin lifecycle misuse or a line the platform refused.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    /// Identifier is invalid for the platform or already claimed.
    #[error("line {id} is not available")]
    Unavailable { id: u32 },
    /// Direction could not be set, or the line is used against its role.
    #[error("line {id} is not configured for this access")]
    Configuration { id: u32 },
    #[error("{role} line is not claimed")]
    NotClaimed { role: Role },
}

impl embedded_hal::digital::Error for PinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Errors surfaced by the session controller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Another session holds the lines.
    #[error("device in use by another session")]
    Busy,
    /// `initialize` failed on `role`; no line is left claimed.
    #[error("unable to initialize {role} line: {cause}")]
    PinInit { role: Role, cause: PinError },
    /// Command issued out of sequence.
    #[error("command issued before the lines were initialized")]
    NotReady,
    #[error("unsupported control command {0}")]
    Unsupported(u32),
    #[error(transparent)]
    Pin(#[from] PinError),
}
