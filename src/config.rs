/// Line identifiers of the three bus lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub clock: u32,
    pub data_out: u32,
    pub data_in: u32,
}

impl PinConfig {
    /// Arduino header pins 13 (clock), 11 (data-out) and 12 (data-in) on an
    /// Intel Galileo board.
    pub const GALILEO: Self = Self {
        clock: 40,
        data_out: 43,
        data_in: 42,
    };
}

impl Default for PinConfig {
    fn default() -> Self {
        Self::GALILEO
    }
}

/// Software timing of the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Delay after every line transition, in nanoseconds. Zero toggles as
    /// fast as the CPU allows.
    pub step_ns: u32,
}

impl Timing {
    pub const FREE_RUNNING: Self = Self { step_ns: 0 };
}

impl Default for Timing {
    fn default() -> Self {
        Self::FREE_RUNNING
    }
}

/// Everything the controller is handed at registration.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Lines claimed by the `INIT` control command.
    pub pins: PinConfig,
    pub timing: Timing,
}
