//! Module describing the pin-level and frame-level abstractions over the
//! CT1642's two-wire (plus optional key-sense) serial interface, and the
//! bit-banging implementation of that interface.

// This module defines a trait w/ async methods, which warns because trait
// futures built this way can't be required to be `Send`.  This crate targets
// single-core microcontrollers with no concept of threads, so that limitation
// does not concern us.
#![allow(async_fn_in_trait)]

use core::marker::PhantomData;

use embedded_hal_1::digital::{Error as PinError, ErrorType, InputPin, OutputPin};

/// The raw GPIO lines the driver owns.
///
/// The CT1642 bus is write-mostly: a clock line and a data line driven by the
/// host, and (on boards with a front-panel keypad) a single key-sense input
/// that the chip pulls high when the currently selected key column has a key
/// down.  Unlike the TM16xx family there is no shared bidirectional data pin,
/// so this trait never needs to switch a line's direction.
///
/// Implement this for your platform, or use [`HalPins`] to adapt any pair of
/// `embedded-hal` output pins (and optionally an input pin).
pub trait Pins {
    type Error;

    /// Drive the clock line high or low.
    fn set_clock(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Drive the data line high or low.
    fn set_data(&mut self, high: bool) -> Result<(), Self::Error>;

    /// Sample the key-sense line.  Boards without a keypad report an idle
    /// (low) line.
    fn read_key(&mut self) -> Result<bool, Self::Error>;
}

/// Adapter implementing [`Pins`] on top of `embedded-hal` 1.0 digital pins.
///
/// All three pins must share one error type, which in practice they do since
/// they come from the same HAL.
pub struct HalPins<Clk, Dio, Key> {
    clock: Clk,
    data: Dio,
    key: Key,
}

impl<Clk, Dio, E> HalPins<Clk, Dio, NoKeyLine<E>>
where
    Clk: OutputPin<Error = E>,
    Dio: OutputPin<Error = E>,
    E: PinError,
{
    /// Clock and data only; key scanning will always report no key down.
    pub fn new(clock: Clk, data: Dio) -> Self {
        Self {
            clock,
            data,
            key: NoKeyLine(PhantomData),
        }
    }
}

impl<Clk, Dio, Key, E> HalPins<Clk, Dio, Key>
where
    Clk: OutputPin<Error = E>,
    Dio: OutputPin<Error = E>,
    Key: InputPin<Error = E>,
{
    /// Clock, data, and the key-sense input.
    pub fn with_key(clock: Clk, data: Dio, key: Key) -> Self {
        Self { clock, data, key }
    }
}

impl<Clk, Dio, Key, E> Pins for HalPins<Clk, Dio, Key>
where
    Clk: OutputPin<Error = E>,
    Dio: OutputPin<Error = E>,
    Key: InputPin<Error = E>,
{
    type Error = E;

    fn set_clock(&mut self, high: bool) -> Result<(), E> {
        if high {
            self.clock.set_high()
        } else {
            self.clock.set_low()
        }
    }

    fn set_data(&mut self, high: bool) -> Result<(), E> {
        if high {
            self.data.set_high()
        } else {
            self.data.set_low()
        }
    }

    fn read_key(&mut self) -> Result<bool, E> {
        self.key.is_high()
    }
}

/// Stand-in key input for boards wired without a keypad.  Always reads low.
pub struct NoKeyLine<E>(PhantomData<E>);

impl<E: PinError> ErrorType for NoKeyLine<E> {
    type Error = E;
}

impl<E: PinError> InputPin for NoKeyLine<E> {
    fn is_high(&mut self) -> Result<bool, E> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, E> {
        Ok(true)
    }
}

/// Frame-level view of the bus, as consumed by [`crate::Ct1642`].
///
/// One frame is one complete load of the chip's 18-bit shift register: a
/// digit-select address in the top 4 bits and an 8-bit segment payload at the
/// bottom, latched to the output drivers at the end.  The protocol is
/// open-loop; there is no acknowledgment and no way to detect a missing or
/// miswired chip.
///
/// There is exactly one implementation in this crate
/// ([`BitBangingLineDriver`]), but keeping the trait means the display logic
/// can be exercised against a recording fake, and leaves room for a PIO or
/// SPI-abuse implementation later.
pub trait LineDriver {
    type Error;

    /// Shift out one 18-bit frame and latch it into the output register.
    fn send_frame(&mut self, address: u8, segments: u8) -> Result<(), Self::Error>;

    /// Sample the key-sense line.
    fn key_line_is_high(&mut self) -> Result<bool, Self::Error>;
}

/// [`LineDriver`] implementation that bit-bangs the protocol over a [`Pins`]
/// implementation.
///
/// The chip samples the data line on every rising clock edge, so each bit is
/// presented while the clock is low and then clocked in by raising it.  The
/// waveform is slow enough (the chip tolerates multi-MHz clocks, we toggle at
/// GPIO speed) that no inter-edge delays are needed.
pub struct BitBangingLineDriver<P: Pins> {
    pins: P,
}

impl<P: Pins> BitBangingLineDriver<P> {
    /// Take ownership of the lines and drive them to the idle (low) state.
    pub fn new(mut pins: P) -> Result<Self, P::Error> {
        pins.set_data(false)?;
        pins.set_clock(false)?;
        Ok(Self { pins })
    }

    /// Give the pins back, e.g. to reconfigure them for another use.
    pub fn release(self) -> P {
        self.pins
    }

    /// Present one bit on the data line and clock it into the shift register.
    fn clock_in_bit(&mut self, high: bool) -> Result<(), P::Error> {
        self.pins.set_clock(false)?;
        self.pins.set_data(high)?;
        self.pins.set_clock(true)
    }
}

impl<P: Pins> LineDriver for BitBangingLineDriver<P> {
    type Error = P::Error;

    fn send_frame(&mut self, address: u8, segments: u8) -> Result<(), P::Error> {
        // 4 address bits, MSB first.  The address encoding is active-low; the
        // composer hands us the full address byte and we send its top nibble.
        for i in 0..4 {
            self.clock_in_bit((address << i) & 0x80 != 0)?;
        }

        // 6 don't-care bits with the data line held high.  The register is a
        // fixed 18 bits long (4 + 6 + 8) so these must be clocked even though
        // the chip ignores them.
        for _ in 0..6 {
            self.pins.set_data(true)?;
            self.pins.set_clock(false)?;
            self.pins.set_clock(true)?;
        }

        // 8 segment bits, MSB first (segment A down to the decimal point).
        for i in 0..8 {
            self.clock_in_bit((segments << i) & 0x80 != 0)?;
        }

        // Latch the register into the output drivers.  This is a fixed
        // data-line dance with a single falling clock edge in the middle; no
        // rising edges, so nothing further is shifted in.
        self.pins.set_data(false)?;
        self.pins.set_data(true)?;
        self.pins.set_clock(false)?;
        self.pins.set_data(false)?;
        self.pins.set_data(true)
    }

    fn key_line_is_high(&mut self) -> Result<bool, P::Error> {
        self.pins.read_key()
    }
}

/// Abstraction over platform-specific timers, used for the persistence-of-
/// vision pause between digit frames and the settle time during key scans.
///
/// The timer situation on embedded Rust is still unsettled, with
/// `embassy-time`, `embedded-time`, `fugit` and others all in use.  To avoid
/// picking a side, this one-method trait is implemented in terms of whatever
/// your preferred timer is.  The `embassy-time` feature provides one.
pub trait Timer {
    /// Pause for (at least) the given number of milliseconds.
    async fn wait_millis(ms: u32);
}

#[cfg(feature = "embassy-time")]
mod embassy_time_timer {
    use embassy_time::{Duration, Timer as EmbassyTimer};

    /// [`super::Timer`] implementation backed by `embassy-time`.
    pub struct EmbassyTimeTimer;

    impl super::Timer for EmbassyTimeTimer {
        async fn wait_millis(ms: u32) {
            EmbassyTimer::after(Duration::from_millis(ms as u64)).await
        }
    }
}

#[cfg(feature = "embassy-time")]
pub use embassy_time_timer::EmbassyTimeTimer;
