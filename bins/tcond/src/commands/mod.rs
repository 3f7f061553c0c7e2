//! tcond subcommands.

pub mod check;
pub mod replay;

use std::path::Path;

use anyhow::Context;
use diffserv::clock::ManualClock;
use diffserv::config::{self, ConfigContext};
use diffserv::conditioner::TrafficConditioner;
use diffserv::util::parse::get_rate;
use diffserv::util::rate::InformationRate;
use serde::Serialize;

/// Global output flags.
pub struct Output {
    pub json: bool,
    pub pretty: bool,
}

impl Output {
    /// Print a value as one JSON document.
    pub fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        let text = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        println!("{}", text);
        Ok(())
    }
}

/// Parse `--datarate`; only absolute rates make sense for an interface.
pub fn parse_datarate(s: &str) -> Result<f64, String> {
    match get_rate(s).map_err(|e| e.to_string())? {
        InformationRate::Absolute(bps) => Ok(bps),
        InformationRate::Relative(_) => Err("datarate must be an absolute rate".to_string()),
    }
}

/// Load a configuration file and build a conditioner driven by `clock`.
pub fn load_conditioner(
    path: &Path,
    datarate: Option<f64>,
    clock: ManualClock,
) -> anyhow::Result<TrafficConditioner> {
    let config = config::load(path).with_context(|| format!("loading {}", path.display()))?;

    let mut ctx = ConfigContext::new().clock(clock);
    if let Some(bps) = datarate {
        ctx = ctx.datarate(bps);
    }
    let conditioner = TrafficConditioner::from_config(&config, ctx)
        .with_context(|| format!("building conditioner from {}", path.display()))?;
    Ok(conditioner)
}
