//! Single Rate Three Color Marker (RFC 2697).

use std::time::Duration;

use super::refill_tokens;
use crate::types::Color;
use crate::validation::{Validatable, ValidationResult};

/// srTCM parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SrTcmParams {
    /// Committed information rate in bits per second.
    pub cir: f64,
    /// Committed burst size in bits.
    pub cbs: u64,
    /// Excess burst size in bits.
    pub ebs: u64,
}

impl Validatable for SrTcmParams {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !self.cir.is_finite() || self.cir < 0.0 {
            result.add_error("cir", format!("rate must be a non-negative number, got {}", self.cir));
        }
        if self.cbs == 0 && self.ebs == 0 {
            result.add_warning("cbs", "cbs and ebs are both 0; every packet is red");
        }

        result
    }
}

/// Single rate three color marker.
///
/// The committed bucket `tc` fills at CIR. Tokens that overflow it spill
/// into the excess bucket `te`, which has no refill of its own.
#[derive(Debug, Clone)]
pub struct SrTcm {
    params: SrTcmParams,
    tc: u64,
    te: u64,
    last_update: Duration,
}

impl SrTcm {
    /// Create a marker with both buckets full.
    pub fn new(params: SrTcmParams, now: Duration) -> Self {
        Self {
            params,
            tc: params.cbs,
            te: params.ebs,
            last_update: now,
        }
    }

    /// Meter a packet of `size_bits` arriving at `now`.
    pub fn arrive(&mut self, size_bits: u64, now: Duration) -> Color {
        let tokens = refill_tokens(self.last_update, now, self.params.cir);
        let tc = self.tc.saturating_add(tokens);
        if tc <= self.params.cbs {
            self.tc = tc;
        } else {
            let excess = tc - self.params.cbs;
            self.tc = self.params.cbs;
            self.te = self.te.saturating_add(excess).min(self.params.ebs);
        }
        self.last_update = self.last_update.max(now);

        if self.tc >= size_bits {
            self.tc -= size_bits;
            Color::GREEN
        } else if self.te >= size_bits {
            self.te -= size_bits;
            Color::YELLOW
        } else {
            Color::RED
        }
    }

    /// Tokens in the committed bucket.
    pub fn committed_tokens(&self) -> u64 {
        self.tc
    }

    /// Tokens in the excess bucket.
    pub fn excess_tokens(&self) -> u64 {
        self.te
    }

    /// Get the parameters.
    pub fn params(&self) -> &SrTcmParams {
        &self.params
    }
}
