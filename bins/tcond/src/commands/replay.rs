//! Replay command - run a packet trace through a conditioner.
//!
//! A trace is JSON lines, one packet per line:
//!
//! ```text
//! {"time": 0.001, "src": "10.0.0.1", "dst": "10.0.0.2", "protocol": "udp", "dst_port": 5004, "length": 200}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use clap::Args;
use diffserv::clock::{Clock, ManualClock};
use diffserv::conditioner::{ConditionerStats, Disposition, Outcome};
use diffserv::packet::{IpDatagram, Packet};
use diffserv::util::names::{self, IPPROTO_TCP, IPPROTO_UDP};
use diffserv::Color;
use serde::{Deserialize, Serialize};

use super::{Output, load_conditioner, parse_datarate};

#[derive(Args)]
pub struct ReplayCmd {
    /// Configuration file (YAML, or JSON with a .json extension).
    pub config: PathBuf,

    /// Trace file in JSON lines, or - for stdin.
    pub trace: PathBuf,

    /// Interface datarate for percentage rates (e.g. 100mbps).
    #[arg(short = 'r', long, value_parser = parse_datarate)]
    pub datarate: Option<f64>,

    /// Print packet counters at the end.
    #[arg(short = 's', long)]
    pub stats: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Family {
    Ipv4,
    Ipv6,
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Protocol {
    Number(u8),
    Name(String),
}

impl Protocol {
    fn id(&self) -> anyhow::Result<u8> {
        match self {
            Self::Number(id) => Ok(*id),
            Self::Name(name) => {
                names::protocol_id(name).ok_or_else(|| anyhow!("unknown protocol '{}'", name))
            }
        }
    }
}

/// One packet of a trace.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TraceRecord {
    /// Arrival time in seconds.
    time: f64,
    /// Inferred from the addresses when absent.
    family: Option<Family>,
    src: Option<IpAddr>,
    dst: Option<IpAddr>,
    #[serde(default)]
    tos: u8,
    protocol: Option<Protocol>,
    src_port: Option<u16>,
    dst_port: Option<u16>,
    length: u32,
    #[serde(default)]
    fragment: bool,
}

impl TraceRecord {
    fn arrival(&self) -> anyhow::Result<Duration> {
        Duration::try_from_secs_f64(self.time).map_err(|e| anyhow!("time {}: {}", self.time, e))
    }

    fn family(&self) -> Family {
        match (self.family, self.src.or(self.dst)) {
            (Some(family), _) => family,
            (None, Some(IpAddr::V4(_))) => Family::Ipv4,
            (None, Some(IpAddr::V6(_))) => Family::Ipv6,
            (None, None) => Family::Other,
        }
    }

    fn to_packet(&self) -> anyhow::Result<Packet> {
        let packet = match self.family() {
            Family::Other => Packet::Other {
                byte_length: self.length,
            },
            Family::Ipv4 => {
                let src = v4(self.src)?;
                let dst = v4(self.dst)?;
                self.datagram(src, dst)?.into()
            }
            Family::Ipv6 => {
                let src = v6(self.src)?;
                let dst = v6(self.dst)?;
                self.datagram(src, dst)?.into()
            }
        };
        Ok(packet)
    }

    fn datagram<A: Copy + Into<IpAddr>>(&self, src: A, dst: A) -> anyhow::Result<IpDatagram<A>> {
        let protocol = self.protocol.as_ref().map(Protocol::id).transpose()?;
        let src_port = self.src_port.unwrap_or(0);
        let dst_port = self.dst_port.unwrap_or(0);

        let datagram = IpDatagram::new(src, dst);
        let datagram = match protocol {
            Some(IPPROTO_UDP) => datagram.udp(src_port, dst_port),
            Some(IPPROTO_TCP) => datagram.tcp(src_port, dst_port),
            Some(id) => datagram.protocol(id),
            None => datagram,
        };
        Ok(datagram
            .tos(self.tos)
            .length(self.length)
            .fragment(self.fragment))
    }
}

fn v4(addr: Option<IpAddr>) -> anyhow::Result<Ipv4Addr> {
    match addr {
        None => Ok(Ipv4Addr::UNSPECIFIED),
        Some(IpAddr::V4(addr)) => Ok(addr),
        Some(addr) => bail!("{} is not an IPv4 address", addr),
    }
}

fn v6(addr: Option<IpAddr>) -> anyhow::Result<Ipv6Addr> {
    match addr {
        None => Ok(Ipv6Addr::UNSPECIFIED),
        Some(IpAddr::V6(addr)) => Ok(addr),
        Some(addr) => bail!("{} is not an IPv6 address", addr),
    }
}

/// Result line for one packet.
#[derive(Debug, Serialize)]
struct PacketReport {
    time: f64,
    dscp: String,
    color: String,
    action: String,
    outcome: &'static str,
    /// Code point the forwarded packet carries.
    #[serde(skip_serializing_if = "Option::is_none")]
    out_dscp: Option<String>,
    length: u32,
}

impl PacketReport {
    fn new(time: f64, length: u32, d: &Disposition) -> Self {
        let outcome = match d.outcome {
            Outcome::Forward(_) => "forward",
            Outcome::Drop(_) => "drop",
            Outcome::Held => "held",
        };
        Self {
            time,
            dscp: d.dscp.to_string(),
            color: d.color.to_string(),
            action: d.action.to_string(),
            outcome,
            out_dscp: d
                .outcome
                .packet()
                .and_then(Packet::dscp)
                .map(|dscp| dscp.to_string()),
            length,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatsReport {
    received: u64,
    forwarded: u64,
    dropped: u64,
    marked: u64,
    shaped: u64,
    held: u64,
    colors: Vec<ColorCount>,
}

#[derive(Debug, Serialize)]
struct ColorCount {
    color: String,
    packets: u64,
}

impl From<&ConditionerStats> for StatsReport {
    fn from(stats: &ConditionerStats) -> Self {
        let colors = stats
            .colors
            .iter()
            .enumerate()
            .filter_map(|(i, &packets)| {
                let color = Color::new(u8::try_from(i).ok()?);
                Some(ColorCount {
                    color: color.to_string(),
                    packets,
                })
            })
            .collect();
        Self {
            received: stats.received,
            forwarded: stats.forwarded,
            dropped: stats.dropped,
            marked: stats.marked,
            shaped: stats.shaped,
            held: stats.held,
            colors,
        }
    }
}

impl ReplayCmd {
    pub fn run(&self, output: &Output) -> anyhow::Result<()> {
        let clock = ManualClock::new();
        let mut tc = load_conditioner(&self.config, self.datarate, clock.clone())?;

        let reader: Box<dyn BufRead> = if self.trace.as_os_str() == "-" {
            Box::new(BufReader::new(io::stdin()))
        } else {
            let file = File::open(&self.trace)
                .with_context(|| format!("opening {}", self.trace.display()))?;
            Box::new(BufReader::new(file))
        };

        for (index, line) in reader.lines().enumerate() {
            let line = line.with_context(|| format!("reading {}", self.trace.display()))?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let lineno = index + 1;

            let (record, packet, arrival) = parse_record(line)
                .with_context(|| format!("{}:{}", self.trace.display(), lineno))?;
            clock.set(arrival);

            let disposition = tc.process(packet, clock.now());
            let report = PacketReport::new(record.time, record.length, &disposition);
            if output.json {
                println!("{}", serde_json::to_string(&report)?);
            } else {
                print_packet(&report);
            }
        }

        let stats = StatsReport::from(tc.stats());
        tracing::debug!(received = stats.received, dropped = stats.dropped, "trace replayed");

        if self.stats {
            if output.json {
                output.print_json(&stats)?;
            } else {
                print_stats(&stats);
            }
        }

        Ok(())
    }
}

fn parse_record(line: &str) -> anyhow::Result<(TraceRecord, Packet, Duration)> {
    let record: TraceRecord = serde_json::from_str(line)?;
    let packet = record.to_packet()?;
    let arrival = record.arrival()?;
    Ok((record, packet, arrival))
}

fn print_packet(report: &PacketReport) {
    print!(
        "{:>12.6} {:<6} {:<7} {:<16} {}",
        report.time, report.dscp, report.color, report.action, report.outcome
    );
    match &report.out_dscp {
        Some(dscp) if *dscp != report.dscp => println!(" {}", dscp),
        _ => println!(),
    }
}

fn print_stats(stats: &StatsReport) {
    println!(
        "received {} forwarded {} dropped {} marked {} shaped {} held {}",
        stats.received, stats.forwarded, stats.dropped, stats.marked, stats.shaped, stats.held
    );
    let colors: Vec<String> = stats
        .colors
        .iter()
        .map(|c| format!("{} {}", c.color, c.packets))
        .collect();
    println!("{}", colors.join(" "));
}
