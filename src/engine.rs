//! Mode 0 shift-and-sample over three digital lines.
//!
//! Output: data line is set first, then the clock is pulsed high and low.
//! Input: the clock is pulled low then high, and the data line is sampled
//! after the rising edge. Bits travel most-significant first.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};

use crate::config::Timing;

/// Borrowed view of the bus for the duration of one byte.
pub struct BitBang<'a, CLK, DO, DI, D> {
    clock: &'a mut CLK,
    data_out: &'a mut DO,
    data_in: &'a mut DI,
    delay: &'a mut D,
    timing: Timing,
}

impl<'a, CLK, DO, DI, D, E> BitBang<'a, CLK, DO, DI, D>
where
    CLK: OutputPin<Error = E>,
    DO: OutputPin<Error = E>,
    DI: InputPin<Error = E>,
    D: DelayNs,
{
    pub fn new(
        clock: &'a mut CLK,
        data_out: &'a mut DO,
        data_in: &'a mut DI,
        delay: &'a mut D,
        timing: Timing,
    ) -> Self {
        Self {
            clock,
            data_out,
            data_in,
            delay,
            timing,
        }
    }

    /// Clock `byte` out. Leaves the clock low and data-out at the last bit.
    pub fn shift_out(&mut self, byte: u8) -> Result<(), E> {
        for bit in (0..8).rev() {
            self.data_out.set_state(PinState::from(byte & (1 << bit) != 0))?;
            self.step();

            self.clock.set_high()?;
            self.step();
            self.clock.set_low()?;
            self.step();
        }
        Ok(())
    }

    /// Clock eight bits in, then return the clock to its idle low level so
    /// the next byte starts with a rising edge.
    pub fn shift_in(&mut self) -> Result<u8, E> {
        let mut byte = 0u8;

        for _ in 0..8 {
            self.clock.set_low()?;
            self.step();
            self.clock.set_high()?;
            self.step();

            byte <<= 1;
            if self.data_in.is_high()? {
                byte |= 1;
            }
        }

        self.clock.set_low()?;
        self.step();
        Ok(byte)
    }

    #[inline(always)]
    fn step(&mut self) {
        if self.timing.step_ns > 0 {
            self.delay.delay_ns(self.timing.step_ns);
        }
    }
}

/// Free-running delay: every step returns immediately.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl DelayNs for NoDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}
