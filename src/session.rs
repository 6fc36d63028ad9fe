//! Exclusive sessions on the bit-banged bus.
//!
//! [`SpiSw`] is the single control surface of the device. A caller gets a
//! [`Session`] from [`SpiSw::open`], and only one session may exist at a
//! time: the second `open` fails with [`Error::Busy`] instead of waiting.
//!
//! ```text
//!            open            initialize
//!  Closed ---------> Open ---------------> Initialized --+
//!    ^                |                        |   ^     | write_byte
//!    |      close     |          close         |   +-----+ read_byte
//!    +----------------+------------------------+
//! ```
//!
//! Dropping a session that was never closed runs the same cleanup as
//! [`Session::close`].

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::{Mutex, MutexGuard};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::PinState;
use log::{debug, error, info, warn};

use crate::command::Command;
use crate::config::{Config, PinConfig, Timing};
use crate::engine::BitBang;
use crate::error::{Error, PinError};
use crate::line::{Direction, GpioChip, PinLine, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    /// Exclusive access held, lines not claimed yet.
    Open,
    Initialized,
}

struct Bus<C: GpioChip, D> {
    chip: C,
    delay: D,
    clock: PinLine<C::Line>,
    data_out: PinLine<C::Line>,
    data_in: PinLine<C::Line>,
    state: SessionState,
}

impl<C: GpioChip, D: DelayNs> Bus<C, D> {
    fn bring_up(&mut self, pins: &PinConfig) -> Result<(), Error> {
        bring_up_line(&mut self.chip, &mut self.clock, pins.clock)?;
        bring_up_line(&mut self.chip, &mut self.data_out, pins.data_out)?;
        bring_up_line(&mut self.chip, &mut self.data_in, pins.data_in)?;

        for line in [&mut self.clock, &mut self.data_out] {
            let role = line.role();
            line.set_level(PinState::Low)
                .map_err(|cause| Error::PinInit { role, cause })?;
        }
        Ok(())
    }

    /// Drive the outputs low and release every line. Lines are released even
    /// when driving one of them fails; the first failure is returned.
    fn park(&mut self) -> Result<(), PinError> {
        let mut result = Ok(());
        for line in [&mut self.clock, &mut self.data_out] {
            if line.direction() == Direction::Output {
                result = result.and(line.set_level(PinState::Low));
            }
        }

        self.release_all();
        result
    }

    fn release_all(&mut self) {
        self.clock.release(&mut self.chip);
        self.data_out.release(&mut self.chip);
        self.data_in.release(&mut self.chip);
    }

    fn engine(
        &mut self,
        timing: Timing,
    ) -> BitBang<'_, PinLine<C::Line>, PinLine<C::Line>, PinLine<C::Line>, D> {
        BitBang::new(
            &mut self.clock,
            &mut self.data_out,
            &mut self.data_in,
            &mut self.delay,
            timing,
        )
    }
}

fn bring_up_line<C: GpioChip>(
    chip: &mut C,
    line: &mut PinLine<C::Line>,
    id: u32,
) -> Result<(), Error> {
    let role = line.role();
    let configured = line.claim(chip, id).and_then(|()| match role {
        Role::DataIn => line.configure_input(),
        Role::Clock | Role::DataOut => line.configure_output(PinState::Low),
    });

    match configured {
        Ok(()) => {
            debug!("{role} line {id} ready");
            Ok(())
        }
        Err(cause) => {
            error!("unable to set up {role} line {id}: {cause}");
            Err(Error::PinInit { role, cause })
        }
    }
}

/// The bit-banged SPI device: a GPIO chip, three bus lines and the lock
/// that makes sessions exclusive.
pub struct SpiSw<C: GpioChip, D> {
    config: Config,
    bus: Mutex<CriticalSectionRawMutex, Bus<C, D>>,
}

impl<C: GpioChip, D: DelayNs> SpiSw<C, D> {
    /// Register the device over `chip`. No line is touched until a session
    /// initializes the bus.
    pub fn new(chip: C, delay: D, config: Config) -> Self {
        Self {
            config,
            bus: Mutex::new(Bus {
                chip,
                delay,
                clock: PinLine::new(Role::Clock),
                data_out: PinLine::new(Role::DataOut),
                data_in: PinLine::new(Role::DataIn),
                state: SessionState::Closed,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Try to take exclusive ownership of the bus. Never blocks.
    pub fn open(&self) -> Result<Session<'_, C, D>, Error> {
        let mut bus = self.bus.try_lock().map_err(|_| {
            warn!("device in use by another session");
            Error::Busy
        })?;

        bus.state = SessionState::Open;
        info!("device is opened");

        Ok(Session {
            config: &self.config,
            bus: Some(bus),
        })
    }

    /// Tear the device down and hand the GPIO chip back.
    pub fn into_inner(self) -> C {
        self.bus.into_inner().chip
    }
}

/// Exclusive ownership of the bus. Commands are applied in call order.
pub struct Session<'a, C: GpioChip, D: DelayNs> {
    config: &'a Config,
    bus: Option<MutexGuard<'a, CriticalSectionRawMutex, Bus<C, D>>>,
}

impl<C: GpioChip, D: DelayNs> Session<'_, C, D> {
    pub fn state(&self) -> SessionState {
        self.bus
            .as_deref()
            .map_or(SessionState::Closed, |bus| bus.state)
    }

    /// Claim clock and data-out as low outputs and data-in as input.
    ///
    /// On failure every line claimed by this call is released again and the
    /// session stays [`SessionState::Open`]. Initializing an initialized
    /// session parks the current lines first.
    pub fn initialize(&mut self, pins: &PinConfig) -> Result<(), Error> {
        let bus = self.bus.as_deref_mut().ok_or(Error::NotReady)?;

        if bus.state == SessionState::Initialized {
            info!("re-initializing lines");
            bus.state = SessionState::Open;
            bus.park()?;
        }

        if let Err(err) = bus.bring_up(pins) {
            bus.release_all();
            return Err(err);
        }

        bus.state = SessionState::Initialized;
        info!(
            "lines initialized (clock {}, data-out {}, data-in {})",
            pins.clock, pins.data_out, pins.data_in
        );
        Ok(())
    }

    pub fn write_byte(&mut self, byte: u8) -> Result<(), Error> {
        let timing = self.config.timing;
        self.ready()?.engine(timing).shift_out(byte)?;
        debug!("written byte: {byte:#04x}");
        Ok(())
    }

    pub fn read_byte(&mut self) -> Result<u8, Error> {
        let timing = self.config.timing;
        let byte = self.ready()?.engine(timing).shift_in()?;
        debug!("read byte: {byte:#04x}");
        Ok(byte)
    }

    /// Run a decoded control command. Returns the byte produced by
    /// [`Command::ReadByte`].
    pub fn execute(&mut self, command: Command) -> Result<Option<u8>, Error> {
        match command {
            Command::Initialize => {
                let pins = self.config.pins;
                self.initialize(&pins).map(|()| None)
            }
            Command::WriteByte(byte) => self.write_byte(byte).map(|()| None),
            Command::ReadByte => self.read_byte().map(Some),
            Command::Unsupported(code) => {
                self.ready()?;
                warn!("unsupported control command {code}");
                Err(Error::Unsupported(code))
            }
        }
    }

    /// Drive clock and data-out low, release the lines and give up
    /// exclusive access. Closing a closed session does nothing.
    pub fn close(&mut self) -> Result<(), Error> {
        let Some(mut bus) = self.bus.take() else {
            return Ok(());
        };

        let parked = bus.park();
        bus.state = SessionState::Closed;
        drop(bus);

        info!("device is closed");
        parked.map_err(Error::from)
    }

    fn ready(&mut self) -> Result<&mut Bus<C, D>, Error> {
        match self.bus.as_deref_mut() {
            Some(bus) if bus.state == SessionState::Initialized => Ok(bus),
            _ => Err(Error::NotReady),
        }
    }
}

impl<C: GpioChip, D: DelayNs> Drop for Session<'_, C, D> {
    fn drop(&mut self) {
        if self.bus.is_none() {
            return;
        }

        warn!("session dropped while open, forcing cleanup");
        if let Err(err) = self.close() {
            error!("forced cleanup: {err}");
        }
    }
}
