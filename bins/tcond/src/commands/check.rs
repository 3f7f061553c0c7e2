//! Check command - validate a configuration and show the action table.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use diffserv::clock::ManualClock;
use diffserv::conditioner::TrafficConditioner;
use diffserv::meter::{Meter, MeterParams};
use diffserv::{Action, Color, DSCP_MAX, Dscp};
use serde::Serialize;

use super::{Output, load_conditioner, parse_datarate};

#[derive(Args)]
pub struct CheckCmd {
    /// Configuration file (YAML, or JSON with a .json extension).
    pub config: PathBuf,

    /// Interface datarate for percentage rates (e.g. 100mbps).
    #[arg(short = 'r', long, value_parser = parse_datarate)]
    pub datarate: Option<f64>,

    /// Also list cells whose action is pass.
    #[arg(short = 'a', long)]
    pub all: bool,
}

#[derive(Debug, Serialize)]
struct CheckReport {
    classifier: Option<ClassifierSummary>,
    colors: usize,
    meters: Vec<MeterSummary>,
    shaped_cells: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    cells: Vec<CellSummary>,
}

#[derive(Debug, Serialize)]
struct ClassifierSummary {
    #[serde(rename = "type")]
    kind: &'static str,
    filters: usize,
}

#[derive(Debug, Serialize)]
struct MeterSummary {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    /// Rates in bits/sec and bucket sizes in bits.
    params: BTreeMap<&'static str, f64>,
    dscp: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CellSummary {
    dscp: String,
    color: String,
    action: String,
    /// A shape cell whose type has no registered shaper.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    missing_shaper: bool,
}

impl CheckCmd {
    pub fn run(&self, output: &Output) -> anyhow::Result<()> {
        let tc = load_conditioner(&self.config, self.datarate, ManualClock::new())?;
        let report = self.report(&tc);

        if output.json {
            output.print_json(&report)
        } else {
            print_report(&report);
            Ok(())
        }
    }

    fn report(&self, tc: &TrafficConditioner) -> CheckReport {
        let meters = tc
            .meters()
            .map(|(name, meter)| MeterSummary {
                name: name.to_string(),
                kind: meter.kind().name(),
                params: meter_params(meter),
                dscp: Dscp::all()
                    .filter(|&d| tc.meter_for(d) == Some(name))
                    .map(|d| d.to_string())
                    .collect(),
            })
            .collect();

        let cells = tc
            .action_table()
            .map(|table| {
                table
                    .iter()
                    .filter(|(_, _, action)| self.all || !action.is_pass())
                    .map(|(dscp, color, action)| cell(tc, dscp, color, action))
                    .collect()
            })
            .unwrap_or_default();

        CheckReport {
            classifier: tc.classifier().map(|c| ClassifierSummary {
                kind: c.kind().name(),
                filters: c.filter_count(),
            }),
            colors: tc.num_colors(),
            meters,
            shaped_cells: tc.shaped_cells(),
            cells,
        }
    }
}

fn cell(tc: &TrafficConditioner, dscp: Dscp, color: Color, action: Action) -> CellSummary {
    CellSummary {
        dscp: dscp.to_string(),
        color: color.to_string(),
        action: action.to_string(),
        missing_shaper: action.is_shape() && !tc.has_shaper(dscp, color),
    }
}

fn meter_params(meter: &Meter) -> BTreeMap<&'static str, f64> {
    let params = match meter.params() {
        MeterParams::TokenBucket(p) => vec![("cir", p.cir), ("cbs", p.cbs as f64)],
        MeterParams::SrTcm(p) => vec![
            ("cir", p.cir),
            ("cbs", p.cbs as f64),
            ("ebs", p.ebs as f64),
        ],
        MeterParams::TrTcm(p) => vec![
            ("pir", p.pir),
            ("pbs", p.pbs as f64),
            ("cir", p.cir),
            ("cbs", p.cbs as f64),
        ],
    };
    params.into_iter().collect()
}

fn print_report(report: &CheckReport) {
    match &report.classifier {
        Some(c) if c.filters > 0 => println!("classifier {} ({} filters)", c.kind, c.filters),
        Some(c) => println!("classifier {}", c.kind),
        None => println!("classifier none"),
    }

    for meter in &report.meters {
        let params: Vec<String> = meter
            .params
            .iter()
            .map(|(key, value)| format!("{} {}", key, value))
            .collect();
        print!("meter {} {} {}", meter.name, meter.kind, params.join(" "));
        if meter.dscp.len() == DSCP_MAX {
            println!(" dscp *");
        } else if meter.dscp.is_empty() {
            println!(" (unused)");
        } else {
            println!(" dscp {}", meter.dscp.join(" "));
        }
    }

    println!("colors {}", report.colors);
    println!("shaped cells {}", report.shaped_cells);

    for cell in &report.cells {
        let note = if cell.missing_shaper { " (no shaper)" } else { "" };
        println!("{:<6} {:<7} {}{}", cell.dscp, cell.color, cell.action, note);
    }
}
