//! Conversion latency and timeout bookkeeping.

use crate::registers::{Config, Resolution};
use embedded_hal_async::delay::DelayNs;

/// Longest wait issued through `delay_us`; anything longer sleeps in whole
/// milliseconds.
pub(crate) const FINE_DELAY_LIMIT_US: u32 = 16_383;

/// Free-running microsecond counter.
///
/// The counter is expected to wrap at `u32::MAX`. Any `FnMut() -> u32` closure
/// can be used, e.g. `|| Instant::now().as_micros() as u32`.
pub trait Clock {
    fn now_us(&mut self) -> u32;
}

impl<F> Clock for F
where
    F: FnMut() -> u32,
{
    fn now_us(&mut self) -> u32 {
        self()
    }
}

/// Point in time on a wrapping microsecond clock.
///
/// Comparison is done on the signed difference, so a deadline stays correct
/// while the clock wraps as long as the timeout is shorter than 2^31 µs.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Deadline(u32);

impl Deadline {
    pub const fn after(now: u32, timeout_us: u32) -> Self {
        Self(now.wrapping_add(timeout_us))
    }

    /// Signed distance from the deadline, negative while time remains.
    pub const fn elapsed(&self, now: u32) -> i32 {
        now.wrapping_sub(self.0) as i32
    }

    pub const fn has_passed(&self, now: u32) -> bool {
        self.elapsed(now) >= 0
    }
}

impl Resolution {
    /// Typical conversion time from the data sheet.
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            Resolution::Bits12 => 4_167,
            Resolution::Bits14 => 16_667,
            Resolution::Bits16 => 66_667,
            Resolution::Bits18 => 266_667,
        }
    }
}

impl Config {
    pub fn conversion_time_us(self) -> u32 {
        self.resolution().conversion_time_us()
    }
}

/// Sleeps for roughly `us` microseconds.
pub(crate) async fn wait_us<DELAY: DelayNs>(delay: &mut DELAY, us: u32) {
    if us > FINE_DELAY_LIMIT_US {
        delay.delay_ms(us / 1000).await;
    } else {
        delay.delay_us(us).await;
    }
}
