//! Numeric control codes of the device node.

/// Control code values.
pub mod code {
    pub const SET_CLOCK: u32 = 1;
    pub const SET_DATA_OUT: u32 = 2;
    pub const SET_DATA_IN: u32 = 3;
    pub const WRITE_BYTE: u32 = 4;
    pub const READ_BYTE: u32 = 5;
    pub const INIT: u32 = 6;
}

/// A decoded control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Claim and configure the lines given at registration.
    Initialize,
    WriteByte(u8),
    ReadByte,
    /// Any code the device does not act on, including the per-line
    /// `SET_*` codes: lines are chosen through configuration.
    Unsupported(u32),
}

impl Command {
    /// Decode a control `code` and its argument. Only the low byte of `arg`
    /// is used by `WRITE_BYTE`.
    pub fn decode(code: u32, arg: usize) -> Self {
        match code {
            code::INIT => Command::Initialize,
            code::WRITE_BYTE => Command::WriteByte(arg as u8),
            code::READ_BYTE => Command::ReadByte,
            other => Command::Unsupported(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Command::Initialize => code::INIT,
            Command::WriteByte(_) => code::WRITE_BYTE,
            Command::ReadByte => code::READ_BYTE,
            Command::Unsupported(code) => code,
        }
    }
}
