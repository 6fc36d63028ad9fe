//! Bare-metal host for the bit-banged SPI device on STM32F4.
//!
//! This file registers exactly one `SpiSw` control surface over GPIOA,
//! drives it through the reference sequence and tears it down again.
//! Results and the driver's log go out on USART2.
//!
//! ## Building
//!
//!   cargo build --target thumbv7em-none-eabihf --release --features firmware
//!
//! ## Wiring
//!
//!   PA5  clock      (SPI1 SCK position on the Discovery/Nucleo headers)
//!   PA7  data-out   (MOSI position)
//!   PA6  data-in    (MISO position)
//!
//! ## What you'll see on USART2
//!
//!   [INFO] device is opened
//!   ...
//!   [PASS] wrote 0xaa, read 0x..
//!   [PASS] second open refused while busy
//!   All tests finished.

#![no_std]
#![no_main]

mod stm32_gpio;

use core::fmt::Write;

use cortex_m_rt::entry;
use embedded_hal::delay::DelayNs;
use log::{LevelFilter, Log, Metadata, Record};
use spisw::command::code;
use spisw::{Command, Config, Error, PinConfig, SpiSw, Timing};

use stm32_gpio::Stm32Gpio;

/// Core clock after reset (HSI).
const HCLK_HZ: u32 = 16_000_000;

const NUCLEO_PINS: PinConfig = PinConfig {
    clock: 5,
    data_out: 7,
    data_in: 6,
};

// ---------------------------------------------------------------------------
// USART2 writer.  USART2 base on STM32F4 = 0x4000_4400.
//   +0x00  SR   – status register   (TXE is bit 7)
//   +0x04  DR   – data register
//   +0x08  BRR  – baud-rate register
//   +0x0C  CR1  – control register 1
// ---------------------------------------------------------------------------

const USART2_BASE: u32 = 0x4000_4400;
const USART2_SR: *const u32 = USART2_BASE as *const u32;
const USART2_DR: *mut u32 = (USART2_BASE + 0x04) as *mut u32;
const USART2_BRR: *mut u32 = (USART2_BASE + 0x08) as *mut u32;
const USART2_CR1: *mut u32 = (USART2_BASE + 0x0C) as *mut u32;

/// RCC APB1ENR, bit 17 clocks USART2.
const RCC_APB1ENR: *mut u32 = 0x4002_3840 as *mut u32;

struct Uart;

impl Uart {
    fn init() {
        unsafe {
            let apb1enr = core::ptr::read_volatile(RCC_APB1ENR);
            core::ptr::write_volatile(RCC_APB1ENR, apb1enr | (1 << 17));

            // 115 200 baud at 16 MHz.
            core::ptr::write_volatile(USART2_BRR, 0x8B);
            // TE (bit 3) | UE (bit 13)
            core::ptr::write_volatile(USART2_CR1, (1 << 3) | (1 << 13));
        }
    }

    fn write_byte(b: u8) {
        unsafe {
            while core::ptr::read_volatile(USART2_SR) & (1 << 7) == 0 {}
            core::ptr::write_volatile(USART2_DR, b as u32);
        }
    }
}

impl Write for Uart {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for b in s.bytes() {
            if b == b'\n' {
                Self::write_byte(b'\r');
            }
            Self::write_byte(b);
        }
        Ok(())
    }
}

struct UartLogger;

impl Log for UartLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let _ = writeln!(Uart, "[{}] {}", record.level(), record.args());
    }

    fn flush(&self) {}
}

static LOGGER: UartLogger = UartLogger;

// ---------------------------------------------------------------------------
// Busy-wait delay counted in core cycles.
// ---------------------------------------------------------------------------

struct CycleDelay {
    hz: u32,
}

impl DelayNs for CycleDelay {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = (u64::from(ns) * u64::from(self.hz)).div_ceil(1_000_000_000);
        cortex_m::asm::delay(cycles.clamp(1, u64::from(u32::MAX)) as u32);
    }
}

// ---------------------------------------------------------------------------
// Reference sequence: INIT, write 0xAA, read one byte, refuse a second
// open while the first session is alive, close.
// ---------------------------------------------------------------------------

fn exercise(spisw: &SpiSw<Stm32Gpio, CycleDelay>) -> Result<(), Error> {
    let mut session = spisw.open()?;

    session.execute(Command::decode(code::INIT, 0))?;

    let written = 0xAA;
    session.execute(Command::decode(code::WRITE_BYTE, written))?;
    match session.execute(Command::decode(code::READ_BYTE, 0))? {
        Some(read) => {
            let _ = writeln!(Uart, "[PASS] wrote {written:#04x}, read {read:#04x}");
        }
        None => {
            let _ = writeln!(Uart, "[FAIL] read returned no byte");
        }
    }

    match spisw.open() {
        Err(Error::Busy) => {
            let _ = writeln!(Uart, "[PASS] second open refused while busy");
        }
        Err(err) => {
            let _ = writeln!(Uart, "[FAIL] second open: {err}");
        }
        Ok(_) => {
            let _ = writeln!(Uart, "[FAIL] second open succeeded");
        }
    }

    session.close()
}

#[entry]
fn main() -> ! {
    Uart::init();
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
    let _ = writeln!(Uart, "USART2 initialised.");

    let spisw = SpiSw::new(
        Stm32Gpio::new(),
        CycleDelay { hz: HCLK_HZ },
        Config {
            pins: NUCLEO_PINS,
            timing: Timing { step_ns: 1_000 },
        },
    );

    if let Err(err) = exercise(&spisw) {
        let _ = writeln!(Uart, "[FAIL] {err}");
    }

    let _gpio = spisw.into_inner();
    let _ = writeln!(Uart, "All tests finished.");

    // Halt – spin forever so the core doesn't run off into unmapped memory.
    loop {
        cortex_m::asm::wfi();
    }
}

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    let _ = writeln!(Uart, "[PANIC]");
    loop {}
}
