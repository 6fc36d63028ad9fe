//! Bit-banged SPI master over three GPIO lines.
//!
//! The bus is driven in SPI mode 0 entirely by toggling a clock line and a
//! data-out line and sampling a data-in line, without the platform's SPI
//! controller. Access is exclusive: one [`Session`] at a time owns the lines.
//!
//! ```ignore
//! let spisw = SpiSw::new(chip, NoDelay, Config::default());
//!
//! let mut session = spisw.open()?;
//! session.initialize(&PinConfig::GALILEO)?;
//! session.write_byte(0xAA)?;
//! let reply = session.read_byte()?;
//! session.close()?;
//! ```
//!
//! The platform is plugged in through [`GpioChip`] / [`GpioLine`]; a
//! simulated chip works just as well as hardware registers.

#![cfg_attr(not(test), no_std)]

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod line;
pub mod session;

pub use command::Command;
pub use config::{Config, PinConfig, Timing};
pub use engine::{BitBang, NoDelay};
pub use error::{Error, PinError};
pub use line::{Direction, GpioChip, GpioLine, PinLine, Role};
pub use session::{Session, SessionState, SpiSw};
