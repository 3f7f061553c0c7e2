//! Rate conversion utilities.
//!
//! Meters work in bits and bits per second; these helpers convert the byte
//! based quantities that packets and configuration files report.
//!
//! # Example
//!
//! ```
//! use diffserv::util::rate;
//!
//! assert_eq!(rate::bytes_to_bits(1000), 8000);
//! assert_eq!(3.0 * rate::MEGA, 3_000_000.0);
//! ```

/// Bits in one byte.
pub const BITS_PER_BYTE: u64 = 8;

/// SI kilo multiplier for rates and sizes.
pub const KILO: f64 = 1e3;
/// SI mega multiplier.
pub const MEGA: f64 = 1e6;
/// SI giga multiplier.
pub const GIGA: f64 = 1e9;
/// SI tera multiplier.
pub const TERA: f64 = 1e12;

/// Convert a byte count to bits.
///
/// # Example
///
/// ```
/// use diffserv::util::rate::bytes_to_bits;
///
/// assert_eq!(bytes_to_bits(1), 8);
/// assert_eq!(bytes_to_bits(1500), 12_000);
/// ```
#[inline]
pub const fn bytes_to_bits(bytes: u64) -> u64 {
    bytes * BITS_PER_BYTE
}

/// Scale a byte based quantity to bits, for fractional sizes such as `1.5KB`.
#[inline]
pub fn byte_multiplier(multiplier: f64) -> f64 {
    multiplier * BITS_PER_BYTE as f64
}

/// A configured information rate.
///
/// Rates are either absolute or a fraction of the datarate of the interface
/// the conditioner is attached to. Relative rates can only be resolved once
/// that datarate is known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InformationRate {
    /// Bits per second.
    Absolute(f64),
    /// Fraction (1.0 = 100%) of the interface datarate.
    Relative(f64),
}

impl InformationRate {
    /// Resolve to bits per second.
    ///
    /// Returns `None` for a relative rate when the interface datarate is
    /// unknown.
    pub fn resolve(self, datarate: Option<f64>) -> Option<f64> {
        match self {
            Self::Absolute(bps) => Some(bps),
            Self::Relative(fraction) => datarate.map(|d| d * fraction),
        }
    }

    /// Check if this rate depends on the interface datarate.
    pub fn is_relative(&self) -> bool {
        matches!(self, Self::Relative(_))
    }
}

impl Default for InformationRate {
    fn default() -> Self {
        Self::Absolute(0.0)
    }
}
