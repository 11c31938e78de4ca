//! # Microchip MCP342x Driver
//!
//! Async driver for the MCP3421/2/3/4/5/6/7/8 family of delta-sigma ADCs.

#![cfg_attr(not(test), no_std)]

use crate::conversion::{decode, split_frame, FRAME_LEN};
use crate::timing::wait_us;
use core::result::Result;
use embedded_hal_async::{delay, i2c};

#[cfg(feature = "defmt")]
use defmt::*;

mod conversion;
mod registers;
mod timing;

pub use conversion::{normalise, sign_extend, Conversion};
pub use registers::{Channel, Config, Gain, Mode, Resolution};
pub use timing::{Clock, Deadline};

/// Default I2C device address, with both address pins low.
pub const DEFAULT_DEVICE_ADDRESS: u8 = 0x68;

/// I2C general call address, listened to by every device on the bus.
pub const GENERAL_CALL_ADDRESS: u8 = 0x00;

/// Commands understood at the general call address.
#[derive(Clone, Copy)]
#[repr(u8)]
enum GeneralCall {
    /// Latch the address pins, then reset like a power-on.
    Reset = 0x06,
    /// Latch the address pins.
    Latch = 0x04,
    /// Start a conversion on every device.
    Conversion = 0x08,
}

/// Errors that can occur when using the MCP342x driver.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<I2cErr> {
    /// Writing the configuration register failed.
    ConfigureFailed(I2cErr),
    /// Writing the configuration register to start a conversion failed.
    ConvertFailed(I2cErr),
    /// Reading the result frame failed.
    ReadFailed(I2cErr),
    /// The device reported that no fresh result is available yet.
    ConversionNotReady,
    /// No fresh result was available before the timeout.
    ReadTimeout,
}

/// Sends a general call reset to every device on the bus.
pub async fn general_call_reset<I: i2c::I2c>(i2c: &mut I) -> Result<(), I::Error> {
    general_call(i2c, GeneralCall::Reset).await
}

/// Makes every device on the bus latch its address pins.
pub async fn general_call_latch<I: i2c::I2c>(i2c: &mut I) -> Result<(), I::Error> {
    general_call(i2c, GeneralCall::Latch).await
}

/// Starts a conversion on every device on the bus, using the configuration
/// each one was given with [`Mcp342x::configure`].
pub async fn general_call_conversion<I: i2c::I2c>(i2c: &mut I) -> Result<(), I::Error> {
    general_call(i2c, GeneralCall::Conversion).await
}

async fn general_call<I: i2c::I2c>(i2c: &mut I, command: GeneralCall) -> Result<(), I::Error> {
    i2c.write(GENERAL_CALL_ADDRESS, &[command as u8]).await
}

/// Returns the first address in `candidates` that answers a one byte read.
pub async fn probe_address<I: i2c::I2c>(i2c: &mut I, candidates: &[u8]) -> Option<u8> {
    let mut buf = [0u8];
    for &address in candidates {
        if i2c.read(address, &mut buf).await.is_ok() {
            #[cfg(feature = "defmt")]
            debug!("MCP342x answered at {=u8:#x}", address);
            return Some(address);
        }
    }
    None
}

/// MCP342x async driver.
pub struct Mcp342x<I2C, DELAY, CLOCK>
where
    I2C: i2c::I2c,
    DELAY: delay::DelayNs,
    CLOCK: Clock,
{
    i2c_dev: I2C,
    delay: DELAY,
    clock: CLOCK,
    address: u8,
}

impl<I2C, DELAY, CLOCK, I2cErr> Mcp342x<I2C, DELAY, CLOCK>
where
    I2C: i2c::I2c<Error = I2cErr>,
    DELAY: delay::DelayNs,
    CLOCK: Clock,
{
    /// Creates a new MCP342x driver instance.
    ///
    /// # Arguments
    /// i2c_dev: The I2C device.
    /// delay: The delay provider.
    /// clock: Free-running microsecond counter, used for read timeouts.
    /// address: The 7-bit device address, usually [`DEFAULT_DEVICE_ADDRESS`].
    ///
    pub fn new(i2c_dev: I2C, delay: DELAY, clock: CLOCK, address: u8) -> Self {
        Self {
            i2c_dev,
            delay,
            clock,
            address,
        }
    }

    /// The I2C address used to talk to this device.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Looks for the device at each of `candidates` in turn and adopts the
    /// first address that responds.
    ///
    /// Returns `false`, keeping the current address, if nothing responds.
    pub async fn probe(&mut self, candidates: &[u8]) -> bool {
        match probe_address(&mut self.i2c_dev, candidates).await {
            Some(address) => {
                self.address = address;
                true
            }
            None => false,
        }
    }

    /// Writes the configuration register without starting a conversion.
    ///
    /// Useful together with [`general_call_conversion`] to trigger several
    /// devices at once.
    pub async fn configure(&mut self, config: Config) -> Result<(), Error<I2cErr>> {
        self.write_config(config)
            .await
            .map_err(Error::ConfigureFailed)
    }

    /// Starts a new conversion with the given configuration.
    ///
    /// In continuous mode this restarts the free-running conversion.
    pub async fn convert(&mut self, config: Config) -> Result<(), Error<I2cErr>> {
        #[cfg(feature = "defmt")]
        trace!("MCP342x {=u8:#x}: start conversion {}", self.address, config);

        self.write_config(config.with_convert_bit())
            .await
            .map_err(Error::ConvertFailed)
    }

    /// Starts a new conversion with the given settings.
    pub async fn convert_with(
        &mut self,
        channel: Channel,
        mode: Mode,
        resolution: Resolution,
        gain: Gain,
    ) -> Result<(), Error<I2cErr>> {
        self.convert(Config::new(channel, mode, resolution, gain))
            .await
    }

    /// Reads the latest result.
    ///
    /// Returns [`Error::ConversionNotReady`] if the device has not finished
    /// the conversion yet.
    pub async fn read(&mut self) -> Result<Conversion, Error<I2cErr>> {
        // Always read the longest frame; the trailing status byte tells us
        // how much of it is data.
        let mut frame = [0u8; FRAME_LEN];
        self.i2c_dev
            .read(self.address, &mut frame)
            .await
            .map_err(Error::ReadFailed)?;

        let (data, status) = split_frame(&frame);
        if !status.is_ready() {
            return Err(Error::ConversionNotReady);
        }

        Ok(Conversion {
            value: decode(data, status.resolution()),
            status,
        })
    }

    /// Starts a conversion and waits for its result.
    ///
    /// Sleeps for the expected conversion time of `resolution`, then polls
    /// until the device reports a fresh result or `timeout_us` microseconds
    /// have passed since the conversion was started. Bus errors end the wait
    /// immediately.
    pub async fn convert_and_read(
        &mut self,
        channel: Channel,
        mode: Mode,
        resolution: Resolution,
        gain: Gain,
        timeout_us: u32,
    ) -> Result<Conversion, Error<I2cErr>> {
        self.convert_with(channel, mode, resolution, gain).await?;
        let deadline = Deadline::after(self.clock.now_us(), timeout_us);

        wait_us(&mut self.delay, resolution.conversion_time_us()).await;

        loop {
            match self.read().await {
                Ok(conversion) => return Ok(conversion),
                Err(Error::ConversionNotReady) => {
                    #[cfg(feature = "defmt")]
                    trace!("MCP342x {=u8:#x}: conversion not ready", self.address);
                }
                Err(e) => return Err(e),
            }

            if deadline.has_passed(self.clock.now_us()) {
                #[cfg(feature = "defmt")]
                debug!("MCP342x {=u8:#x}: read timed out", self.address);
                return Err(Error::ReadTimeout);
            }
        }
    }

    /// Sends a general call reset. This affects every device on the bus.
    pub async fn general_call_reset(&mut self) -> Result<(), I2cErr> {
        general_call_reset(&mut self.i2c_dev).await
    }

    /// Sends a general call latch. This affects every device on the bus.
    pub async fn general_call_latch(&mut self) -> Result<(), I2cErr> {
        general_call_latch(&mut self.i2c_dev).await
    }

    /// Sends a general call conversion. This affects every device on the bus.
    pub async fn general_call_conversion(&mut self) -> Result<(), I2cErr> {
        general_call_conversion(&mut self.i2c_dev).await
    }

    /// Gives back the bus, delay and clock.
    pub fn release(self) -> (I2C, DELAY, CLOCK) {
        (self.i2c_dev, self.delay, self.clock)
    }

    /// Writes a value to the configuration register.
    async fn write_config(&mut self, config: Config) -> Result<(), I2cErr> {
        self.i2c_dev.write(self.address, &[config.bits()]).await
    }
}
