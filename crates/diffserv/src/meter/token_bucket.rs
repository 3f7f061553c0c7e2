//! Two-color token bucket.

use std::time::Duration;

use super::refill_tokens;
use crate::types::Color;
use crate::validation::{Validatable, ValidationResult};

/// Token bucket parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TokenBucketParams {
    /// Committed information rate in bits per second.
    pub cir: f64,
    /// Committed burst size in bits.
    pub cbs: u64,
}

impl Validatable for TokenBucketParams {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !self.cir.is_finite() || self.cir < 0.0 {
            result.add_error("cir", format!("rate must be a non-negative number, got {}", self.cir));
        }
        if self.cbs == 0 {
            result.add_warning("cbs", "burst size is 0; every packet is red");
        }

        result
    }
}

/// Two-color token bucket.
///
/// A refill that would overflow the bucket is discarded rather than
/// clamped. Packets that fit the bucket are green, the rest red.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    params: TokenBucketParams,
    tc: u64,
    last_update: Duration,
}

impl TokenBucket {
    /// Create a full bucket whose refill clock starts at `now`.
    pub fn new(params: TokenBucketParams, now: Duration) -> Self {
        Self {
            params,
            tc: params.cbs,
            last_update: now,
        }
    }

    /// Meter a packet of `size_bits` arriving at `now`.
    pub fn arrive(&mut self, size_bits: u64, now: Duration) -> Color {
        let tokens = refill_tokens(self.last_update, now, self.params.cir);
        if let Some(tc) = self.tc.checked_add(tokens)
            && tc <= self.params.cbs
        {
            self.tc = tc;
        }
        self.last_update = self.last_update.max(now);

        if self.tc >= size_bits {
            self.tc -= size_bits;
            Color::GREEN
        } else {
            Color::RED
        }
    }

    /// Tokens currently in the bucket.
    pub fn tokens(&self) -> u64 {
        self.tc
    }

    /// Get the parameters.
    pub fn params(&self) -> &TokenBucketParams {
        &self.params
    }
}
