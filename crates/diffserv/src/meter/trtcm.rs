//! Two Rate Three Color Marker (RFC 2698).

use std::time::Duration;

use super::refill_tokens;
use crate::types::Color;
use crate::validation::{Validatable, ValidationResult};

/// trTCM parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrTcmParams {
    /// Peak information rate in bits per second.
    pub pir: f64,
    /// Peak burst size in bits.
    pub pbs: u64,
    /// Committed information rate in bits per second.
    pub cir: f64,
    /// Committed burst size in bits.
    pub cbs: u64,
}

impl Validatable for TrTcmParams {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (field, rate) in [("pir", self.pir), ("cir", self.cir)] {
            if !rate.is_finite() || rate < 0.0 {
                result.add_error(field, format!("rate must be a non-negative number, got {}", rate));
            }
        }
        if self.pir < self.cir {
            result.add_warning("pir", "pir is below cir; packets are never green above pir");
        }
        if self.pbs == 0 {
            result.add_warning("pbs", "burst size is 0; every packet is red");
        }

        result
    }
}

/// Two rate three color marker.
///
/// The peak bucket `tp` and the committed bucket `tc` refill independently
/// and each is clamped to its own burst size.
#[derive(Debug, Clone)]
pub struct TrTcm {
    params: TrTcmParams,
    tp: u64,
    tc: u64,
    last_update: Duration,
}

impl TrTcm {
    /// Create a marker with both buckets full.
    pub fn new(params: TrTcmParams, now: Duration) -> Self {
        Self {
            params,
            tp: params.pbs,
            tc: params.cbs,
            last_update: now,
        }
    }

    /// Meter a packet of `size_bits` arriving at `now`.
    pub fn arrive(&mut self, size_bits: u64, now: Duration) -> Color {
        let peak = refill_tokens(self.last_update, now, self.params.pir);
        let committed = refill_tokens(self.last_update, now, self.params.cir);
        self.tp = self.tp.saturating_add(peak).min(self.params.pbs);
        self.tc = self.tc.saturating_add(committed).min(self.params.cbs);
        self.last_update = self.last_update.max(now);

        if self.tp < size_bits {
            Color::RED
        } else if self.tc < size_bits {
            self.tp -= size_bits;
            Color::YELLOW
        } else {
            self.tp -= size_bits;
            self.tc -= size_bits;
            Color::GREEN
        }
    }

    /// Tokens in the peak bucket.
    pub fn peak_tokens(&self) -> u64 {
        self.tp
    }

    /// Tokens in the committed bucket.
    pub fn committed_tokens(&self) -> u64 {
        self.tc
    }

    /// Get the parameters.
    pub fn params(&self) -> &TrTcmParams {
        &self.params
    }
}
