//! Digital lines used by the bit-banged bus.
//!
//! A [`GpioChip`] is the platform side: it validates identifiers, hands out
//! [`GpioLine`] handles and takes them back. A [`PinLine`] wraps one such
//! handle together with its role on the bus and refuses every access that
//! does not fit that role, instead of touching the hardware.

use core::fmt;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin, PinState};

use crate::error::PinError;

/// Platform GPIO controller.
pub trait GpioChip {
    type Line: GpioLine;

    /// Claim line `id`. Fails with [`PinError::Unavailable`] if the identifier
    /// is not valid on this platform or the line is already taken.
    fn request(&mut self, id: u32, label: &'static str) -> Result<Self::Line, PinError>;

    /// Give a previously requested line back.
    fn free(&mut self, line: Self::Line);
}

/// Raw access to one requested line.
pub trait GpioLine {
    fn direction_output(&mut self, initial: PinState) -> Result<(), PinError>;
    fn direction_input(&mut self) -> Result<(), PinError>;
    fn set_value(&mut self, level: PinState) -> Result<(), PinError>;
    fn get_value(&mut self) -> PinState;
}

/// Function of a line on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Clock,
    DataOut,
    DataIn,
}

impl Role {
    /// Label passed to the platform when the line is requested.
    pub const fn label(self) -> &'static str {
        match self {
            Role::Clock => "spisw_clck",
            Role::DataOut => "spisw_mosi",
            Role::DataIn => "spisw_miso",
        }
    }

    const fn is_output(self) -> bool {
        !matches!(self, Role::DataIn)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Clock => "clock",
            Role::DataOut => "data-out",
            Role::DataIn => "data-in",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Unset,
    Output,
    Input,
}

/// One bus line and its lifecycle: claimed, configured, released.
pub struct PinLine<L> {
    role: Role,
    id: Option<u32>,
    line: Option<L>,
    direction: Direction,
}

impl<L: GpioLine> PinLine<L> {
    pub const fn new(role: Role) -> Self {
        Self {
            role,
            id: None,
            line: None,
            direction: Direction::Unset,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    /// Identifier of the claimed line, if any.
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    pub fn is_claimed(&self) -> bool {
        self.line.is_some()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn claim<C>(&mut self, chip: &mut C, id: u32) -> Result<(), PinError>
    where
        C: GpioChip<Line = L>,
    {
        if self.line.is_some() {
            return Err(PinError::Unavailable { id });
        }

        let line = chip.request(id, self.role.label())?;
        self.line = Some(line);
        self.id = Some(id);
        self.direction = Direction::Unset;
        Ok(())
    }

    pub fn configure_output(&mut self, initial: PinState) -> Result<(), PinError> {
        let id = self.configurable(Direction::Output)?;
        let line = self.line.as_mut().ok_or(PinError::Configuration { id })?;
        line.direction_output(initial)?;
        self.direction = Direction::Output;
        Ok(())
    }

    pub fn configure_input(&mut self) -> Result<(), PinError> {
        let id = self.configurable(Direction::Input)?;
        let line = self.line.as_mut().ok_or(PinError::Configuration { id })?;
        line.direction_input()?;
        self.direction = Direction::Input;
        Ok(())
    }

    pub fn set_level(&mut self, level: PinState) -> Result<(), PinError> {
        self.accessible(Direction::Output)?.set_value(level)
    }

    pub fn read_level(&mut self) -> Result<PinState, PinError> {
        Ok(self.accessible(Direction::Input)?.get_value())
    }

    /// Hand the line back to `chip`. Releasing an unclaimed line does nothing.
    pub fn release<C>(&mut self, chip: &mut C)
    where
        C: GpioChip<Line = L>,
    {
        if let Some(line) = self.line.take() {
            chip.free(line);
        }
        self.id = None;
        self.direction = Direction::Unset;
    }

    fn configurable(&self, wanted: Direction) -> Result<u32, PinError> {
        // An unclaimed line reports id 0: there is no identifier to blame yet.
        let id = self.id.unwrap_or(0);
        let fits = match wanted {
            Direction::Output => self.role.is_output(),
            Direction::Input => !self.role.is_output(),
            Direction::Unset => false,
        };

        if self.line.is_none() || !fits {
            return Err(PinError::Configuration { id });
        }
        Ok(id)
    }

    fn accessible(&mut self, wanted: Direction) -> Result<&mut L, PinError> {
        let role = self.role;
        let id = self.id.unwrap_or(0);
        let direction = self.direction;
        let line = self.line.as_mut().ok_or(PinError::NotClaimed { role })?;

        if direction != wanted {
            return Err(PinError::Configuration { id });
        }
        Ok(line)
    }
}

impl<L> ErrorType for PinLine<L> {
    type Error = PinError;
}

impl<L: GpioLine> OutputPin for PinLine<L> {
    fn set_low(&mut self) -> Result<(), PinError> {
        self.set_level(PinState::Low)
    }

    fn set_high(&mut self) -> Result<(), PinError> {
        self.set_level(PinState::High)
    }
}

impl<L: GpioLine> InputPin for PinLine<L> {
    fn is_high(&mut self) -> Result<bool, PinError> {
        Ok(self.read_level()? == PinState::High)
    }

    fn is_low(&mut self) -> Result<bool, PinError> {
        Ok(self.read_level()? == PinState::Low)
    }
}
