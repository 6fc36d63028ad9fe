//! `GpioChip` backed by the STM32F4 GPIO port registers.
//!
//! Line identifiers number the pins of ports A..E consecutively:
//! `id = port * 16 + pin`, so PA5 is 5 and PB3 is 19.
//!
//! Register map used (per port, stride 0x400 from GPIOA):
//!   GPIOA base        = 0x4002_0000
//!     +0x00  MODER    – 2 bits per pin, 00 input / 01 output
//!     +0x10  IDR      – input data
//!     +0x18  BSRR     – bit set [15:0] / bit reset [31:16]
//!
//!   RCC AHB1ENR       = 0x4002_3830  (bit n clocks port n)

use embedded_hal::digital::PinState;
use spisw::{GpioChip, GpioLine, PinError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const GPIOA_BASE: u32 = 0x4002_0000;
const PORT_STRIDE: u32 = 0x400;
const PORTS: u32 = 5;

const MODER: u32 = 0x00;
const IDR: u32 = 0x10;
const BSRR: u32 = 0x18;

const RCC_AHB1ENR: u32 = 0x4002_3830;

const MODE_MASK: u32 = 0b11;
const MODE_INPUT: u32 = 0b00;
const MODE_OUTPUT: u32 = 0b01;

// ---------------------------------------------------------------------------
// Volatile helpers
// ---------------------------------------------------------------------------

#[inline(always)]
unsafe fn rd(addr: u32) -> u32 {
    unsafe { core::ptr::read_volatile(addr as *const u32) }
}

#[inline(always)]
unsafe fn wr(addr: u32, val: u32) {
    unsafe { core::ptr::write_volatile(addr as *mut u32, val) }
}

// ---------------------------------------------------------------------------
// Chip
// ---------------------------------------------------------------------------

/// Owner of the GPIO ports. Tracks which lines are handed out.
pub struct Stm32Gpio {
    claimed: u128,
}

impl Stm32Gpio {
    pub const fn new() -> Self {
        Self { claimed: 0 }
    }
}

impl GpioChip for Stm32Gpio {
    type Line = Stm32Line;

    fn request(&mut self, id: u32, _label: &'static str) -> Result<Stm32Line, PinError> {
        let port = id / 16;
        let bit = 1u128 << id.min(127);

        if port >= PORTS || self.claimed & bit != 0 {
            return Err(PinError::Unavailable { id });
        }

        unsafe {
            wr(RCC_AHB1ENR, rd(RCC_AHB1ENR) | (1 << port));
        }

        self.claimed |= bit;
        Ok(Stm32Line {
            id,
            base: GPIOA_BASE + port * PORT_STRIDE,
            pin: id % 16,
        })
    }

    fn free(&mut self, line: Stm32Line) {
        // Back to the reset state: floating input.
        line.set_mode(MODE_INPUT);
        self.claimed &= !(1u128 << line.id);
    }
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

pub struct Stm32Line {
    id: u32,
    base: u32,
    pin: u32,
}

impl Stm32Line {
    fn set_mode(&self, mode: u32) {
        let shift = self.pin * 2;
        unsafe {
            let moder = rd(self.base + MODER) & !(MODE_MASK << shift);
            wr(self.base + MODER, moder | (mode << shift));
        }
    }
}

impl GpioLine for Stm32Line {
    fn direction_output(&mut self, initial: PinState) -> Result<(), PinError> {
        // Latch the level first so the pin never glitches to the old value.
        self.set_value(initial)?;
        self.set_mode(MODE_OUTPUT);
        Ok(())
    }

    fn direction_input(&mut self) -> Result<(), PinError> {
        self.set_mode(MODE_INPUT);
        Ok(())
    }

    fn set_value(&mut self, level: PinState) -> Result<(), PinError> {
        let bit = match level {
            PinState::High => 1 << self.pin,
            PinState::Low => 1 << (16 + self.pin),
        };
        unsafe { wr(self.base + BSRR, bit) }
        Ok(())
    }

    fn get_value(&mut self) -> PinState {
        let idr = unsafe { rd(self.base + IDR) };
        PinState::from(idr & (1 << self.pin) != 0)
    }
}
