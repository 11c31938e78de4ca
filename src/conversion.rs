//! Decoding of conversion results.

use crate::registers::{Config, Resolution};
use byteorder::{BigEndian, ByteOrder};

/// Bytes requested on every read. Sufficient for an 18-bit result plus the
/// echoed configuration register.
pub(crate) const FRAME_LEN: usize = 4;

/// A sample read from the device.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Conversion {
    /// Sign-extended sample in ADC counts.
    pub value: i32,
    /// Configuration register echoed by the device alongside the data. In
    /// continuous mode this may differ from the last written configuration.
    pub status: Config,
}

impl Conversion {
    /// The sample rescaled to the common 21-bit scale, see [`normalise`].
    pub fn normalised(&self) -> i32 {
        normalise(self.value, self.status)
    }
}

/// Splits a read frame into its data bytes and the status byte that follows
/// them.
///
/// An 18-bit result is three bytes wide, anything else two. The trailing byte
/// decides: if it reports 18 bits the frame is `[d2, d1, d0, status]`,
/// otherwise it is `[d1, d0, status, status]` and the byte right after the
/// data is used.
pub(crate) fn split_frame(frame: &[u8; FRAME_LEN]) -> (&[u8], Config) {
    let trailing = Config::from(frame[3]);
    if trailing.resolution() == Resolution::Bits18 {
        (&frame[..3], trailing)
    } else {
        (&frame[..2], Config::from(frame[2]))
    }
}

/// Accumulates big-endian data bytes and sign-extends them for `resolution`.
pub(crate) fn decode(data: &[u8], resolution: Resolution) -> i32 {
    let raw = BigEndian::read_uint(data, data.len()) as u32;
    sign_extend(raw, resolution)
}

/// Sign-extends a right-aligned raw sample of the given resolution to `i32`.
pub fn sign_extend(raw: u32, resolution: Resolution) -> i32 {
    let (sign_bit, extension) = match resolution {
        Resolution::Bits12 => (0x800, 0xFFFF_F000),
        Resolution::Bits14 => (0x2000, 0xFFFF_C000),
        Resolution::Bits16 => (0x8000, 0xFFFF_0000),
        Resolution::Bits18 => (0x2_0000, 0xFFFC_0000),
    };
    if raw & sign_bit != 0 {
        (raw | extension) as i32
    } else {
        raw as i32
    }
}

/// Rescales a sample so every resolution and gain share the same LSB weight.
///
/// The value is shifted left by `21 - resolution - log2(gain)`, from 9 places
/// at 12 bits and gain 1 down to none at 18 bits and gain 8. Results then fit
/// in 21 bits, so up to 1024 normalised samples can be summed in an `i32`.
/// Summing more than that may overflow.
pub fn normalise(value: i32, config: Config) -> i32 {
    let shift = 21 - config.resolution().bits() - config.gain().log2();
    value << shift
}
