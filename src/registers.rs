//! The MCP342x configuration register.
//!
//! The chip has a single 8-bit register which is written to select the
//! input, mode, resolution and gain, and which is echoed back after the
//! data bytes of every read:
//!
//! ```text
//! bit   7      6  5    4     3  2    1  0
//!      RDY/ST  C1 C0   O/C   S1 S0   G1 G0
//! ```

use core::ops::BitOr;

/// Bit 7 when written: start a new conversion.
pub(crate) const NEW_CONVERSION_MASK: u8 = 0x80;
/// Bit 7 when read: the data bytes do not hold a fresh result.
pub(crate) const NOT_READY_MASK: u8 = 0x80;

/// Trait for fields packed into the configuration register.
pub(crate) trait RegisterField: Copy {
    /// Position of the field's least significant bit.
    const SHIFT: u8;
    /// Right-aligned width mask.
    const WIDTH: u8;

    fn raw(self) -> u8;

    /// Builds the field from a right-aligned value already masked to `WIDTH`.
    fn from_raw(raw: u8) -> Self;

    fn mask() -> u8 {
        Self::WIDTH << Self::SHIFT
    }

    fn encode(self) -> u8 {
        (self.raw() & Self::WIDTH) << Self::SHIFT
    }

    fn decode(byte: u8) -> Self {
        Self::from_raw((byte >> Self::SHIFT) & Self::WIDTH)
    }
}

/// Analog input multiplexed into the converter.
///
/// Two-channel parts (MCP3422/3/6/7) only use `Ch1` and `Ch2`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Channel {
    Ch1 = 0b00,
    Ch2 = 0b01,
    Ch3 = 0b10,
    Ch4 = 0b11,
}

impl Channel {
    /// Channel number as printed in the data sheet, 1 to 4.
    pub const fn number(self) -> u8 {
        self as u8 + 1
    }
}

impl RegisterField for Channel {
    const SHIFT: u8 = 5;
    const WIDTH: u8 = 0b11;

    fn raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0b00 => Channel::Ch1,
            0b01 => Channel::Ch2,
            0b10 => Channel::Ch3,
            _ => Channel::Ch4,
        }
    }
}

/// Conversion mode.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Mode {
    /// One conversion per start request, then idle.
    OneShot = 0,
    /// Free-running; every read returns the latest completed sample.
    Continuous = 1,
}

impl RegisterField for Mode {
    const SHIFT: u8 = 4;
    const WIDTH: u8 = 0b1;

    fn raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Self {
        if raw == 0 {
            Mode::OneShot
        } else {
            Mode::Continuous
        }
    }
}

/// Sample resolution. Higher resolutions convert more slowly.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Resolution {
    /// 12 bits, 240 samples/s.
    Bits12 = 0b00,
    /// 14 bits, 60 samples/s.
    Bits14 = 0b01,
    /// 16 bits, 15 samples/s.
    Bits16 = 0b10,
    /// 18 bits, 3.75 samples/s. Not supported by the MCP3426/7/8.
    Bits18 = 0b11,
}

impl Resolution {
    pub const fn bits(self) -> u8 {
        12 + 2 * self as u8
    }
}

impl RegisterField for Resolution {
    const SHIFT: u8 = 2;
    const WIDTH: u8 = 0b11;

    fn raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0b00 => Resolution::Bits12,
            0b01 => Resolution::Bits14,
            0b10 => Resolution::Bits16,
            _ => Resolution::Bits18,
        }
    }
}

/// Programmable gain amplifier setting.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Gain {
    X1 = 0b00,
    X2 = 0b01,
    X4 = 0b10,
    X8 = 0b11,
}

impl Gain {
    pub const fn multiplier(self) -> u8 {
        1 << self as u8
    }

    /// Base-2 logarithm of the multiplier, 0 to 3.
    pub const fn log2(self) -> u8 {
        self as u8
    }
}

impl RegisterField for Gain {
    const SHIFT: u8 = 0;
    const WIDTH: u8 = 0b11;

    fn raw(self) -> u8 {
        self as u8
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0b00 => Gain::X1,
            0b01 => Gain::X2,
            0b10 => Gain::X4,
            _ => Gain::X8,
        }
    }
}

/// Contents of the configuration register.
///
/// Bit 7 means different things depending on the direction of the transfer,
/// so it is only reachable through [`Config::is_ready`] (read direction) and
/// [`Config::with_convert_bit`] (write direction).
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config(u8);

impl Config {
    /// Packs the four fields into a register value with bit 7 clear.
    pub fn new(channel: Channel, mode: Mode, resolution: Resolution, gain: Gain) -> Self {
        Self(channel.encode() | mode.encode() | resolution.encode() | gain.encode())
    }

    /// Builds a configuration from plain numbers.
    ///
    /// `channel` is 1-based and `resolution` is in bits. Out of range values
    /// are truncated to the field width like the register would, and a gain
    /// other than 2, 4 or 8 selects a gain of 1.
    pub fn from_values(channel: u8, continuous: bool, resolution: u8, gain: u8) -> Self {
        let mode = if continuous {
            Mode::Continuous
        } else {
            Mode::OneShot
        };
        let gain = match gain {
            2 => Gain::X2,
            4 => Gain::X4,
            8 => Gain::X8,
            _ => Gain::X1,
        };
        Self::new(
            Channel::decode(channel.wrapping_sub(1) << Channel::SHIFT),
            mode,
            Resolution::decode((resolution.wrapping_sub(12) >> 1) << Resolution::SHIFT),
            gain,
        )
    }

    /// Raw register value.
    pub const fn bits(self) -> u8 {
        self.0
    }

    pub fn channel(self) -> Channel {
        Channel::decode(self.0)
    }

    pub fn mode(self) -> Mode {
        Mode::decode(self.0)
    }

    pub fn resolution(self) -> Resolution {
        Resolution::decode(self.0)
    }

    pub fn gain(self) -> Gain {
        Gain::decode(self.0)
    }

    /// Splits a register value into its fields and the ready flag.
    pub fn unpack(self) -> (Channel, Mode, Resolution, Gain, bool) {
        (
            self.channel(),
            self.mode(),
            self.resolution(),
            self.gain(),
            self.is_ready(),
        )
    }

    /// Read direction: true when the echoed register reports a fresh result.
    pub const fn is_ready(self) -> bool {
        self.0 & NOT_READY_MASK == 0
    }

    /// Write direction: the value to send to request a new conversion.
    pub const fn with_convert_bit(self) -> Self {
        Self(self.0 | NEW_CONVERSION_MASK)
    }

    pub fn with_channel(self, channel: Channel) -> Self {
        Self((self.0 & !Channel::mask()) | channel.encode())
    }

    pub fn with_mode(self, mode: Mode) -> Self {
        Self((self.0 & !Mode::mask()) | mode.encode())
    }

    pub fn with_resolution(self, resolution: Resolution) -> Self {
        Self((self.0 & !Resolution::mask()) | resolution.encode())
    }

    pub fn with_gain(self, gain: Gain) -> Self {
        Self((self.0 & !Gain::mask()) | gain.encode())
    }
}

impl From<u8> for Config {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Config> for u8 {
    fn from(config: Config) -> Self {
        config.0
    }
}

impl BitOr for Config {
    type Output = Config;

    fn bitor(self, rhs: Config) -> Config {
        Config(self.0 | rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHANNELS: [Channel; 4] = [Channel::Ch1, Channel::Ch2, Channel::Ch3, Channel::Ch4];
    const MODES: [Mode; 2] = [Mode::OneShot, Mode::Continuous];
    const RESOLUTIONS: [Resolution; 4] = [
        Resolution::Bits12,
        Resolution::Bits14,
        Resolution::Bits16,
        Resolution::Bits18,
    ];
    const GAINS: [Gain; 4] = [Gain::X1, Gain::X2, Gain::X4, Gain::X8];

    #[test]
    fn test_pack_layout() {
        let config = Config::new(Channel::Ch3, Mode::Continuous, Resolution::Bits16, Gain::X4);
        assert_eq!(config.bits(), 0b0101_1010);

        let config = Config::new(Channel::Ch1, Mode::OneShot, Resolution::Bits12, Gain::X1);
        assert_eq!(config.bits(), 0x00);

        let config = Config::new(Channel::Ch4, Mode::Continuous, Resolution::Bits18, Gain::X8);
        assert_eq!(config.bits(), 0x7F);
    }

    #[test]
    fn test_pack_unpack_every_combination() {
        for channel in CHANNELS {
            for mode in MODES {
                for resolution in RESOLUTIONS {
                    for gain in GAINS {
                        let packed = Config::new(channel, mode, resolution, gain);
                        let (c, m, r, g, ready) = Config::from(packed.bits()).unpack();
                        assert_eq!((c, m, r, g), (channel, mode, resolution, gain));
                        assert!(ready);
                        assert_eq!(Config::new(c, m, r, g), packed);
                    }
                }
            }
        }
    }

    #[test]
    fn test_unpack_is_total() {
        for byte in 0..=u8::MAX {
            let config = Config::from(byte);
            let (c, m, r, g, ready) = config.unpack();
            let repacked = Config::new(c, m, r, g);
            assert_eq!(repacked.bits(), byte & 0x7F);
            assert_eq!(ready, byte & 0x80 == 0);
        }
    }

    #[test]
    fn test_bit_seven_accessors() {
        let config = Config::new(Channel::Ch2, Mode::OneShot, Resolution::Bits14, Gain::X2);
        assert!(config.is_ready());

        let start = config.with_convert_bit();
        assert_eq!(start.bits(), config.bits() | 0x80);
        // The same bit read back means "not ready".
        assert!(!start.is_ready());
        assert_eq!(start.channel(), Channel::Ch2);
        assert_eq!(start.resolution(), Resolution::Bits14);
    }

    #[test]
    fn test_field_builders_do_not_leak() {
        let config = Config::from(0xFF)
            .with_channel(Channel::Ch1)
            .with_mode(Mode::OneShot)
            .with_resolution(Resolution::Bits12)
            .with_gain(Gain::X1);
        assert_eq!(config.bits(), 0x80);

        let config = Config::default().with_resolution(Resolution::Bits18);
        assert_eq!(config.bits(), 0x0C);
        assert_eq!(config.gain(), Gain::X1);
        assert_eq!(config.channel(), Channel::Ch1);
    }

    #[test]
    fn test_bitor_composes_fields() {
        let channel = Config::default().with_channel(Channel::Ch4);
        let gain = Config::default().with_gain(Gain::X8);
        let config = channel | gain;
        assert_eq!(config.channel(), Channel::Ch4);
        assert_eq!(config.gain(), Gain::X8);
        assert_eq!(config.mode(), Mode::OneShot);
    }

    #[test]
    fn test_from_values() {
        assert_eq!(
            Config::from_values(1, false, 12, 1),
            Config::new(Channel::Ch1, Mode::OneShot, Resolution::Bits12, Gain::X1)
        );
        assert_eq!(
            Config::from_values(4, true, 18, 8),
            Config::new(Channel::Ch4, Mode::Continuous, Resolution::Bits18, Gain::X8)
        );
        assert_eq!(
            Config::from_values(2, false, 16, 4),
            Config::new(Channel::Ch2, Mode::OneShot, Resolution::Bits16, Gain::X4)
        );
        // Channel 5 wraps to channel 1, unknown gains select x1.
        assert_eq!(Config::from_values(5, false, 14, 3).channel(), Channel::Ch1);
        assert_eq!(Config::from_values(5, false, 14, 3).gain(), Gain::X1);
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(Channel::Ch1.number(), 1);
        assert_eq!(Channel::Ch4.number(), 4);
        assert_eq!(Resolution::Bits12.bits(), 12);
        assert_eq!(Resolution::Bits18.bits(), 18);
        assert_eq!(Gain::X1.multiplier(), 1);
        assert_eq!(Gain::X8.multiplier(), 8);
        assert_eq!(Gain::X4.log2(), 2);
    }
}
