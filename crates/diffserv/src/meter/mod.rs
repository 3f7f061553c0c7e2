//! Traffic meters.
//!
//! A meter compares the arrival pattern of the packets attributed to it
//! against a rate/burst profile and colors each packet. All meters share the
//! same refill rule: `floor(elapsed_secs * rate)` tokens (bits) per arrival.
//!
//! | kind | colors | buckets |
//! |---|---|---|
//! | [`TokenBucket`] | green, red | `tc` (cir, cbs) |
//! | [`SrTcm`] | green, yellow, red | `tc` (cir, cbs), `te` (ebs) |
//! | [`TrTcm`] | green, yellow, red | `tp` (pir, pbs), `tc` (cir, cbs) |
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use diffserv::Color;
//! use diffserv::meter::{Meter, TokenBucketParams};
//!
//! let mut meter = Meter::token_bucket(TokenBucketParams { cir: 1e6, cbs: 10_000 }, Duration::ZERO);
//! assert_eq!(meter.arrive(8_000, Duration::ZERO), Color::GREEN);
//! assert_eq!(meter.arrive(8_000, Duration::ZERO), Color::RED);
//! ```

mod srtcm;
mod token_bucket;
mod trtcm;

pub use srtcm::{SrTcm, SrTcmParams};
pub use token_bucket::{TokenBucket, TokenBucketParams};
pub use trtcm::{TrTcm, TrTcmParams};

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::Error;
use crate::types::Color;
use crate::validation::{Validatable, ValidationResult};

/// Tokens accumulated between `last` and `now` at `rate` bits per second.
///
/// Truncates toward zero; a clock that went backwards yields nothing.
pub(crate) fn refill_tokens(last: Duration, now: Duration, rate: f64) -> u64 {
    let elapsed = now.saturating_sub(last);
    // `as` saturates, so an enormous refill becomes u64::MAX.
    (elapsed.as_nanos() as f64 * rate / 1e9) as u64
}

/// Meter type tag used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterKind {
    TokenBucket,
    SrTcm,
    TrTcm,
}

impl MeterKind {
    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::TokenBucket => "token-bucket",
            Self::SrTcm => "srtcm",
            Self::TrTcm => "trtcm",
        }
    }

    /// Colors meters of this kind produce.
    pub fn colors(&self) -> &'static [Color] {
        match self {
            Self::TokenBucket => &[Color::GREEN, Color::RED],
            Self::SrTcm | Self::TrTcm => &[Color::GREEN, Color::YELLOW, Color::RED],
        }
    }

    /// Number of colors meters of this kind produce.
    pub fn num_colors(&self) -> usize {
        self.colors().len()
    }

    /// Width of an action table that can hold every color of this kind.
    ///
    /// A token bucket produces two colors but its second one is red, so it
    /// needs the full three column table.
    pub fn color_span(&self) -> usize {
        self.colors()
            .iter()
            .map(|c| c.index() + 1)
            .max()
            .unwrap_or(1)
    }
}

impl FromStr for MeterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "token-bucket" | "tokenbucket" | "tb" => Ok(Self::TokenBucket),
            "srtcm" | "single-rate-three-color" => Ok(Self::SrTcm),
            "trtcm" | "two-rate-three-color" => Ok(Self::TrTcm),
            _ => Err(Error::UnknownType {
                category: "meter",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolved parameters of any meter kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeterParams {
    TokenBucket(TokenBucketParams),
    SrTcm(SrTcmParams),
    TrTcm(TrTcmParams),
}

impl MeterParams {
    /// Get the meter kind.
    pub fn kind(&self) -> MeterKind {
        match self {
            Self::TokenBucket(_) => MeterKind::TokenBucket,
            Self::SrTcm(_) => MeterKind::SrTcm,
            Self::TrTcm(_) => MeterKind::TrTcm,
        }
    }
}

impl Validatable for MeterParams {
    fn validate(&self) -> ValidationResult {
        match self {
            Self::TokenBucket(p) => p.validate(),
            Self::SrTcm(p) => p.validate(),
            Self::TrTcm(p) => p.validate(),
        }
    }
}

/// A meter with its token state.
#[derive(Debug, Clone)]
pub enum Meter {
    TokenBucket(TokenBucket),
    SrTcm(SrTcm),
    TrTcm(TrTcm),
}

impl Meter {
    /// Create a meter with full buckets whose refill clock starts at `now`.
    pub fn new(params: MeterParams, now: Duration) -> Self {
        match params {
            MeterParams::TokenBucket(p) => Self::TokenBucket(TokenBucket::new(p, now)),
            MeterParams::SrTcm(p) => Self::SrTcm(SrTcm::new(p, now)),
            MeterParams::TrTcm(p) => Self::TrTcm(TrTcm::new(p, now)),
        }
    }

    /// Create a token bucket meter.
    pub fn token_bucket(params: TokenBucketParams, now: Duration) -> Self {
        Self::new(MeterParams::TokenBucket(params), now)
    }

    /// Create a single rate three color marker.
    pub fn srtcm(params: SrTcmParams, now: Duration) -> Self {
        Self::new(MeterParams::SrTcm(params), now)
    }

    /// Create a two rate three color marker.
    pub fn trtcm(params: TrTcmParams, now: Duration) -> Self {
        Self::new(MeterParams::TrTcm(params), now)
    }

    /// Meter a packet of `size_bits` arriving at `now`.
    pub fn arrive(&mut self, size_bits: u64, now: Duration) -> Color {
        match self {
            Self::TokenBucket(m) => m.arrive(size_bits, now),
            Self::SrTcm(m) => m.arrive(size_bits, now),
            Self::TrTcm(m) => m.arrive(size_bits, now),
        }
    }

    /// Get the meter kind.
    pub fn kind(&self) -> MeterKind {
        match self {
            Self::TokenBucket(_) => MeterKind::TokenBucket,
            Self::SrTcm(_) => MeterKind::SrTcm,
            Self::TrTcm(_) => MeterKind::TrTcm,
        }
    }

    /// Number of colors this meter produces.
    pub fn num_colors(&self) -> usize {
        self.kind().num_colors()
    }

    /// Width of an action table that can hold every color of this meter.
    pub fn color_span(&self) -> usize {
        self.kind().color_span()
    }

    /// Get the parameters.
    pub fn params(&self) -> MeterParams {
        match self {
            Self::TokenBucket(m) => MeterParams::TokenBucket(*m.params()),
            Self::SrTcm(m) => MeterParams::SrTcm(*m.params()),
            Self::TrTcm(m) => MeterParams::TrTcm(*m.params()),
        }
    }
}
