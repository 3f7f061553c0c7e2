//! Declarative conditioner configuration.
//!
//! A configuration names a classifier, a set of meters, the code points
//! each meter polices and an ordered list of action rules. It is read from
//! YAML or JSON and turned into a conditioner by
//! [`TrafficConditioner::from_config`](crate::conditioner::TrafficConditioner::from_config).
//!
//! ```yaml
//! classifier:
//!   type: multi-field
//!   filters:
//!     - { dscp: EF, protocol: udp, destPort: 5004-5005 }
//!     - { dscp: AF11, srcAddress: 10.1.0.0/16 }
//! meters:
//!   - { name: voice, type: token-bucket, cir: 256kbps, cbs: 3000B }
//!   - { name: data, type: trtcm, pir: 20%, pbs: 64KB, cir: 10%, cbs: 32KB }
//! traffic-profiles:
//!   - { meter: voice, dscp: EF }
//!   - { meter: data, dscp: AF11 }
//! actions:
//!   - drop: { dscp: EF, color: red }
//!   - mark: { dscp: AF11, color: yellow, value: AF12 }
//!   - mark: { dscp: AF11, color: red, value: AF13 }
//! ```
//!
//! # Example
//!
//! ```
//! use diffserv::config::{self, ConfigContext};
//! use diffserv::conditioner::TrafficConditioner;
//!
//! let config = config::from_yaml_str(
//!     "meters: [{name: m, type: srtcm, cir: 50%, cbs: 10kb, ebs: 20kb}]\n\
//!      traffic-profiles: [{meter: m}]\n",
//! )?;
//! let conditioner = TrafficConditioner::from_config(&config, ConfigContext::new().datarate(1e7))?;
//! assert_eq!(conditioner.num_colors(), 3);
//! # Ok::<(), diffserv::Error>(())
//! ```

mod build;
mod types;

pub use types::*;

use std::path::Path;

use crate::clock::Clock;
use crate::error::Result;
use crate::shaper::ShaperFactory;

/// Collaborators a configuration is built against.
#[derive(Default)]
pub struct ConfigContext {
    /// Datarate of the attached interface in bits per second. Needed by
    /// percentage rates.
    pub datarate: Option<f64>,
    /// Registry `shape` rules create their shapers from.
    pub shaper_factory: ShaperFactory,
    /// Time source; the monotonic clock when `None`.
    pub clock: Option<Box<dyn Clock>>,
}

impl ConfigContext {
    /// Create a context with no datarate and the built-in shapers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the interface datarate in bits per second.
    pub fn datarate(mut self, bps: f64) -> Self {
        self.datarate = Some(bps);
        self
    }

    /// Set the shaper registry.
    pub fn shaper_factory(mut self, factory: ShaperFactory) -> Self {
        self.shaper_factory = factory;
        self
    }

    /// Set the time source.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }
}

impl std::fmt::Debug for ConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigContext")
            .field("datarate", &self.datarate)
            .field("shaper_factory", &self.shaper_factory)
            .field("clock", &self.clock.is_some())
            .finish()
    }
}

/// Parse a YAML configuration.
pub fn from_yaml_str(s: &str) -> Result<ConditionerConfig> {
    Ok(serde_yaml::from_str(s)?)
}

/// Parse a JSON configuration.
pub fn from_json_str(s: &str) -> Result<ConditionerConfig> {
    Ok(serde_json::from_str(s)?)
}

/// Read a configuration file: JSON for a `.json` extension, YAML otherwise.
pub fn load(path: impl AsRef<Path>) -> Result<ConditionerConfig> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    tracing::debug!(path = %path.display(), json = is_json, "loading conditioner configuration");
    if is_json {
        from_json_str(&content)
    } else {
        from_yaml_str(&content)
    }
}
