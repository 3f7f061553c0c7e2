//! The traffic conditioner.
//!
//! [`TrafficConditioner`] runs every packet through
//! classify → meter → action lookup → dispatch. It owns its classifier,
//! meters, action table and shapers; only meter token state changes once it
//! is built.
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use diffserv::{Color, Dscp};
//! use diffserv::action::{ActionRule, ColorSet, DscpSet};
//! use diffserv::classifier::{Classifier, Filter, MultiFieldClassifier};
//! use diffserv::clock::ManualClock;
//! use diffserv::conditioner::{Outcome, TrafficConditioner};
//! use diffserv::meter::{MeterParams, TokenBucketParams};
//! use diffserv::packet::IpDatagram;
//!
//! let classifier = MultiFieldClassifier::new().filter(Filter::new(Dscp::EF).udp())?;
//! let mut conditioner = TrafficConditioner::builder()
//!     .classifier(Classifier::MultiField(classifier))
//!     .meter("voice", MeterParams::TokenBucket(TokenBucketParams { cir: 64_000.0, cbs: 12_000 }))
//!     .traffic_profile(Dscp::EF, "voice")
//!     .action(ActionRule::drop(Dscp::EF, Color::RED))
//!     .clock(ManualClock::new())
//!     .build()?;
//!
//! let packet = || IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST).udp(1, 2).length(1000);
//! assert!(matches!(conditioner.condition(packet().into()), Outcome::Forward(_)));
//! assert!(matches!(conditioner.condition(packet().into()), Outcome::Drop(_)));
//! # Ok::<(), diffserv::Error>(())
//! ```

use std::collections::HashMap;
use std::time::Duration;

use crate::action::{Action, ActionRule, ActionTable, DscpSet};
use crate::classifier::Classifier;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{Error, Result};
use crate::meter::{Meter, MeterParams};
use crate::packet::Packet;
use crate::shaper::{ShaperFactory, ShaperMap};
use crate::types::{Color, DSCP_MAX, Dscp};
use crate::validation::Validatable;

// ============================================================================
// Outcomes
// ============================================================================

/// A dropped packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropEvent {
    pub dscp: Dscp,
    pub color: Color,
    pub byte_length: u32,
}

/// What became of a conditioned packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Send this packet now (possibly re-marked, possibly released by a
    /// shaper).
    Forward(Packet),
    /// The packet was discarded.
    Drop(DropEvent),
    /// A shaper kept the packet.
    Held,
}

impl Outcome {
    /// Get the forwarded packet, if any.
    pub fn packet(&self) -> Option<&Packet> {
        match self {
            Self::Forward(packet) => Some(packet),
            _ => None,
        }
    }

    /// Check if the packet was dropped.
    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop(_))
    }
}

/// Full record of one pass through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    /// Class assigned by the classifier.
    pub dscp: Dscp,
    /// Color assigned by the class's meter.
    pub color: Color,
    /// Action looked up for (dscp, color).
    pub action: Action,
    pub outcome: Outcome,
}

/// Packet counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionerStats {
    pub received: u64,
    pub forwarded: u64,
    pub dropped: u64,
    /// Packets whose code point was rewritten.
    pub marked: u64,
    /// Packets handed to a shaper.
    pub shaped: u64,
    /// Packets a shaper kept.
    pub held: u64,
    /// Packets per color, indexed by color value.
    pub colors: Vec<u64>,
}

impl ConditionerStats {
    fn new(num_colors: usize) -> Self {
        Self {
            colors: vec![0; num_colors],
            ..Default::default()
        }
    }

    /// Packets metered with `color`.
    pub fn color(&self, color: Color) -> u64 {
        self.colors.get(color.index()).copied().unwrap_or(0)
    }

    fn record(&mut self, disposition: &Disposition) {
        self.received += 1;
        if let Some(count) = self.colors.get_mut(disposition.color.index()) {
            *count += 1;
        }
        if disposition.action.mark_target().is_some() {
            self.marked += 1;
        }
        if disposition.action.is_shape() {
            self.shaped += 1;
        }
        match disposition.outcome {
            Outcome::Forward(_) => self.forwarded += 1,
            Outcome::Drop(_) => self.dropped += 1,
            Outcome::Held => self.held += 1,
        }
    }
}

// ============================================================================
// TrafficConditioner
// ============================================================================

/// Classifies, meters, marks, drops and shapes packets.
pub struct TrafficConditioner {
    classifier: Option<Classifier>,
    meters: Vec<(String, Meter)>,
    dscp_to_meter: [Option<usize>; DSCP_MAX],
    actions: Option<ActionTable>,
    shapers: ShaperMap,
    clock: Box<dyn Clock>,
    num_colors: usize,
    stats: ConditionerStats,
}

impl TrafficConditioner {
    /// Start building a conditioner.
    pub fn builder() -> ConditionerBuilder {
        ConditionerBuilder::new()
    }

    /// Condition a packet at the current clock time.
    pub fn condition(&mut self, packet: Packet) -> Outcome {
        let now = self.clock.now();
        self.process(packet, now).outcome
    }

    /// Condition a packet arriving at `now` and report every step.
    pub fn process(&mut self, mut packet: Packet, now: Duration) -> Disposition {
        let dscp = self.classify(&packet);
        let color = self.meter(dscp, &packet, now);
        let action = self
            .actions
            .as_ref()
            .map_or(Action::Pass, |table| table.get(dscp, color));
        tracing::debug!(%dscp, %color, %action, "conditioning packet");

        let outcome = match action {
            Action::Pass => Outcome::Forward(packet),
            Action::Drop => {
                tracing::debug!(%dscp, %color, "dropping packet");
                Outcome::Drop(DropEvent {
                    dscp,
                    color,
                    byte_length: packet.byte_length(),
                })
            }
            Action::Mark(target) => {
                mark(&mut packet, target);
                Outcome::Forward(packet)
            }
            Action::Shape => self.shape(packet, dscp, color),
            Action::MarkAndShape(target) => {
                mark(&mut packet, target);
                self.shape(packet, dscp, color)
            }
        };

        let disposition = Disposition {
            dscp,
            color,
            action,
            outcome,
        };
        self.stats.record(&disposition);
        disposition
    }

    /// Classify a packet without metering it.
    pub fn classify(&self, packet: &Packet) -> Dscp {
        self.classifier
            .as_ref()
            .map_or(Dscp::BE, |c| c.classify(packet))
    }

    fn meter(&mut self, dscp: Dscp, packet: &Packet, now: Duration) -> Color {
        match self.dscp_to_meter[dscp.index()] {
            Some(i) => self.meters[i].1.arrive(packet.size_bits(), now),
            None => Color::GREEN,
        }
    }

    fn shape(&mut self, packet: Packet, dscp: Dscp, color: Color) -> Outcome {
        tracing::debug!(%dscp, %color, "shaping packet");
        match self.shapers.get_mut(dscp, color) {
            Some(shaper) => match shaper.shape(packet) {
                Some(packet) => Outcome::Forward(packet),
                None => Outcome::Held,
            },
            None => Outcome::Forward(packet),
        }
    }

    /// Get the classifier.
    pub fn classifier(&self) -> Option<&Classifier> {
        self.classifier.as_ref()
    }

    /// Get the action table.
    pub fn action_table(&self) -> Option<&ActionTable> {
        self.actions.as_ref()
    }

    /// Get a meter by name.
    pub fn meter_by_name(&self, name: &str) -> Option<&Meter> {
        self.meters.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    /// Iterate over the meters in definition order.
    pub fn meters(&self) -> impl Iterator<Item = (&str, &Meter)> {
        self.meters.iter().map(|(n, m)| (n.as_str(), m))
    }

    /// Name of the meter assigned to a code point.
    pub fn meter_for(&self, dscp: Dscp) -> Option<&str> {
        self.dscp_to_meter[dscp.index()].map(|i| self.meters[i].0.as_str())
    }

    /// Number of colors the action table distinguishes.
    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    /// Number of (DSCP, color) cells with a shaper.
    pub fn shaped_cells(&self) -> usize {
        self.shapers.len()
    }

    /// Check if a cell has a shaper.
    pub fn has_shaper(&self, dscp: Dscp, color: Color) -> bool {
        self.shapers.contains(dscp, color)
    }

    /// Get the packet counters.
    pub fn stats(&self) -> &ConditionerStats {
        &self.stats
    }

    /// Reset the packet counters.
    pub fn reset_stats(&mut self) {
        self.stats = ConditionerStats::new(self.num_colors);
    }
}

fn mark(packet: &mut Packet, dscp: Dscp) {
    tracing::debug!(%dscp, "marking packet");
    packet.set_dscp(dscp);
}

impl std::fmt::Debug for TrafficConditioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficConditioner")
            .field("classifier", &self.classifier)
            .field("meters", &self.meters)
            .field("actions", &self.actions)
            .field("shapers", &self.shapers)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConditionerBuilder
// ============================================================================

/// Builder for [`TrafficConditioner`].
///
/// All checks happen in [`build`](Self::build). Errors name the offending
/// element as `meters[i] 'name'`, `traffic-profiles[i]` or
/// `actions[i] <kind>`.
pub struct ConditionerBuilder {
    classifier: Option<Classifier>,
    meters: Vec<(String, MeterParams)>,
    profiles: Vec<(DscpSet, String)>,
    rules: Option<Vec<ActionRule>>,
    shaper_factory: ShaperFactory,
    clock: Option<Box<dyn Clock>>,
}

impl ConditionerBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self {
            classifier: None,
            meters: Vec::new(),
            profiles: Vec::new(),
            rules: None,
            shaper_factory: ShaperFactory::new(),
            clock: None,
        }
    }

    /// Set the classifier. Without one every packet is best effort.
    pub fn classifier(mut self, classifier: impl Into<Classifier>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Define a named meter.
    pub fn meter(mut self, name: impl Into<String>, params: MeterParams) -> Self {
        self.meters.push((name.into(), params));
        self
    }

    /// Assign a meter to code points. Later profiles override earlier ones.
    pub fn traffic_profile(mut self, dscps: impl Into<DscpSet>, meter: impl Into<String>) -> Self {
        self.profiles.push((dscps.into(), meter.into()));
        self
    }

    /// Append an action rule. Any call creates the action table.
    pub fn action(mut self, rule: ActionRule) -> Self {
        self.rules.get_or_insert_with(Vec::new).push(rule);
        self
    }

    /// Append several action rules.
    pub fn actions(mut self, rules: impl IntoIterator<Item = ActionRule>) -> Self {
        self.rules.get_or_insert_with(Vec::new).extend(rules);
        self
    }

    /// Set the registry shape rules create shapers from.
    pub fn shaper_factory(mut self, factory: ShaperFactory) -> Self {
        self.shaper_factory = factory;
        self
    }

    /// Set the time source. Defaults to [`MonotonicClock`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    /// Set a boxed time source.
    pub fn boxed_clock(mut self, clock: Box<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate everything and assemble the conditioner.
    pub fn build(self) -> Result<TrafficConditioner> {
        let clock = self
            .clock
            .unwrap_or_else(|| Box::new(MonotonicClock::new()));
        let now = clock.now();

        // Meters
        let mut meters: Vec<(String, Meter)> = Vec::with_capacity(self.meters.len());
        let mut by_name: HashMap<&str, usize> = HashMap::new();
        let mut num_colors = 1;
        for (i, (name, params)) in self.meters.iter().enumerate() {
            let element = format!("meters[{}] '{}'", i, name);
            if by_name.contains_key(name.as_str()) {
                return Err(Error::DuplicateMeter { name: name.clone() }.in_element(element));
            }
            let result = params.validate();
            result.log_warnings(&element);
            result.into_result().map_err(|e| e.in_element(&element))?;

            let meter = Meter::new(*params, now);
            num_colors = num_colors.max(meter.color_span());
            by_name.insert(name.as_str(), meters.len());
            meters.push((name.clone(), meter));
        }

        // Traffic profiles
        let mut dscp_to_meter = [None; DSCP_MAX];
        for (i, (dscps, name)) in self.profiles.iter().enumerate() {
            let index = *by_name.get(name.as_str()).ok_or_else(|| {
                Error::UnknownMeter { name: name.clone() }
                    .in_element(format!("traffic-profiles[{}]", i))
            })?;
            for dscp in dscps.to_vec() {
                dscp_to_meter[dscp.index()] = Some(index);
            }
        }

        // Actions and shapers
        let mut shapers = ShaperMap::new();
        let actions = match &self.rules {
            Some(rules) => {
                let mut table = ActionTable::new(num_colors);
                for (i, rule) in rules.iter().enumerate() {
                    let element = format!("actions[{}] <{}>", i, rule.name());
                    let cells = table.apply(rule).map_err(|e| e.in_element(&element))?;
                    match rule {
                        ActionRule::Drop { .. } => {
                            for (dscp, color) in cells {
                                shapers.remove(dscp, color);
                            }
                        }
                        ActionRule::Shape { shaper, .. } => {
                            // Dropped cells are never shaped.
                            for (dscp, color) in cells {
                                if !table.get(dscp, color).is_shape() {
                                    continue;
                                }
                                let instance = self
                                    .shaper_factory
                                    .create(shaper)
                                    .map_err(|e| e.in_element(&element))?;
                                shapers.insert(dscp, color, instance);
                            }
                        }
                        ActionRule::Mark { .. } => {}
                    }
                }
                Some(table)
            }
            None => None,
        };

        tracing::info!(
            classifier = self.classifier.as_ref().map_or("none", |c| c.kind().name()),
            filters = self.classifier.as_ref().map_or(0, Classifier::filter_count),
            meters = meters.len(),
            colors = num_colors,
            active_cells = actions.as_ref().map_or(0, ActionTable::active_cells),
            shaped_cells = shapers.len(),
            "traffic conditioner configured"
        );

        Ok(TrafficConditioner {
            classifier: self.classifier,
            meters,
            dscp_to_meter,
            actions,
            shapers,
            clock,
            num_colors,
            stats: ConditionerStats::new(num_colors),
        })
    }
}

impl Default for ConditionerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
