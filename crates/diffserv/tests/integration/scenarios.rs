//! End-to-end conditioning scenarios.

use std::net::Ipv4Addr;
use std::time::Duration;

use diffserv::action::{Action, ActionRule, ColorSet, DscpSet, MarkTarget};
use diffserv::classifier::{Classifier, Filter, MultiFieldClassifier};
use diffserv::clock::ManualClock;
use diffserv::conditioner::{DropEvent, Outcome, TrafficConditioner};
use diffserv::meter::{Meter, MeterParams, SrTcmParams, TokenBucketParams};
use diffserv::packet::{IpDatagram, Packet};
use diffserv::shaper::{Shaper, ShaperFactory, ShaperSpec};
use diffserv::{Color, Dscp};

use crate::common::{tcp4, udp4, udp6};

// ============================================================================
// Meters
// ============================================================================

#[test]
fn test_token_bucket_back_to_back() {
    let mut meter = Meter::token_bucket(
        TokenBucketParams {
            cir: 1_000_000.0,
            cbs: 10_000,
        },
        Duration::ZERO,
    );
    assert_eq!(meter.arrive(8_000, Duration::ZERO), Color::GREEN);
    assert_eq!(meter.arrive(8_000, Duration::ZERO), Color::RED);

    let Meter::TokenBucket(tb) = &meter else {
        panic!("expected a token bucket");
    };
    assert_eq!(tb.tokens(), 2_000);
}

#[test]
fn test_srtcm_excess_only() {
    let mut tc = TrafficConditioner::builder()
        .meter(
            "sr",
            MeterParams::SrTcm(SrTcmParams {
                cir: 0.0,
                cbs: 0,
                ebs: 10_000,
            }),
        )
        .traffic_profile(DscpSet::All, "sr")
        .clock(ManualClock::new())
        .build()
        .unwrap();

    let disposition = tc.process(udp4(0, 625), Duration::from_secs(1));
    assert_eq!(disposition.color, Color::YELLOW);

    let Some(Meter::SrTcm(sr)) = tc.meter_by_name("sr") else {
        panic!("expected an srTCM");
    };
    assert_eq!(sr.committed_tokens(), 0);
    assert_eq!(sr.excess_tokens(), 5_000);
}

// ============================================================================
// Classifiers
// ============================================================================

fn udp_then_wildcard() -> MultiFieldClassifier {
    MultiFieldClassifier::new()
        .filter(Filter::new(Dscp::EF).udp())
        .unwrap()
        .filter(Filter::new(Dscp::BE))
        .unwrap()
}

#[test]
fn test_multi_field_first_match() {
    let classifier = Classifier::from(udp_then_wildcard());
    assert_eq!(classifier.classify(&udp4(0, 100)), Dscp::EF);
    assert_eq!(classifier.classify(&tcp4(0, 100)), Dscp::BE);
    assert_eq!(classifier.classify(&udp6(0, 100)), Dscp::EF);
}

#[test]
fn test_multi_field_overrides_existing_code_point() {
    let mut tc = TrafficConditioner::builder()
        .classifier(udp_then_wildcard())
        .clock(ManualClock::new())
        .build()
        .unwrap();
    // The classifier decides the class; the packet itself is not re-marked.
    let d = tc.process(tcp4(0x2e, 100), Duration::ZERO);
    assert_eq!(d.dscp, Dscp::BE);
    assert_eq!(d.outcome.packet().and_then(Packet::dscp), Some(Dscp::EF));
}

#[test]
fn test_port_filter_skips_fragments() {
    let classifier = Classifier::from(
        MultiFieldClassifier::new()
            .filter(Filter::new(Dscp::AF31).udp().dst_port(5004))
            .unwrap(),
    );
    let whole: Packet = IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
        .udp(1, 5004)
        .into();
    let fragment: Packet = IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
        .udp(1, 5004)
        .fragment(true)
        .into();
    assert_eq!(classifier.classify(&whole), Dscp::AF31);
    assert_eq!(classifier.classify(&fragment), Dscp::BE);
}

#[test]
fn test_non_ip_packets_are_best_effort() {
    let packet = Packet::Other { byte_length: 64 };
    assert_eq!(Classifier::BehaviorAggregate.classify(&packet), Dscp::BE);
    assert_eq!(Classifier::from(udp_then_wildcard()).classify(&packet), Dscp::BE);
}

// ============================================================================
// Actions
// ============================================================================

#[test]
fn test_mark_all_drop_ef_red() {
    let mut tc = TrafficConditioner::builder()
        .classifier(Classifier::BehaviorAggregate)
        .meter(
            "tb",
            MeterParams::TokenBucket(TokenBucketParams {
                cir: 0.0,
                cbs: 8_000,
            }),
        )
        .traffic_profile(DscpSet::All, "tb")
        .action(ActionRule::mark(DscpSet::All, ColorSet::All, MarkTarget::Dscp(Dscp::AF11)))
        .action(ActionRule::drop(Dscp::EF, Color::RED))
        .clock(ManualClock::new())
        .build()
        .unwrap();

    let table = tc.action_table().unwrap();
    assert_eq!(table.get(Dscp::EF, Color::RED), Action::Drop);
    assert_eq!(table.get(Dscp::EF, Color::GREEN), Action::Mark(Dscp::AF11));
    assert_eq!(table.get(Dscp::CS1, Color::RED), Action::Mark(Dscp::AF11));

    // Green EF is re-marked.
    let green = tc.process(udp4(0x2e, 1000), Duration::ZERO);
    assert_eq!(green.outcome.packet().and_then(Packet::dscp), Some(Dscp::AF11));

    // The bucket is empty now: red EF is dropped.
    let red = tc.process(udp4(0x2e, 1000), Duration::ZERO);
    assert_eq!(
        red.outcome,
        Outcome::Drop(DropEvent {
            dscp: Dscp::EF,
            color: Color::RED,
            byte_length: 1000,
        })
    );

    // Red traffic of any other class is only re-marked.
    let other = tc.process(udp4(0x0a, 1000), Duration::ZERO);
    assert_eq!(other.color, Color::RED);
    assert_eq!(other.action, Action::Mark(Dscp::AF11));
}

#[test]
fn test_mark_then_reclassify() {
    let mut tc = TrafficConditioner::builder()
        .classifier(Classifier::BehaviorAggregate)
        .action(ActionRule::mark(DscpSet::All, ColorSet::All, MarkTarget::Dscp(Dscp::CS3)))
        .clock(ManualClock::new())
        .build()
        .unwrap();

    for packet in [udp4(0x80, 100), udp6(0x41, 100)] {
        let marked = tc.condition(packet);
        let marked = marked.packet().unwrap();
        assert_eq!(Classifier::BehaviorAggregate.classify(marked), Dscp::CS3);
    }

    // Marking a non-IP packet changes nothing.
    let other = Packet::Other { byte_length: 64 };
    assert_eq!(tc.condition(other.clone()), Outcome::Forward(other));
}

/// Releases packets in batches of `n`, most recent first.
struct Batch {
    n: usize,
    queue: Vec<Packet>,
    released: Vec<Packet>,
}

impl Shaper for Batch {
    fn shape(&mut self, packet: Packet) -> Option<Packet> {
        self.queue.push(packet);
        if self.queue.len() == self.n {
            self.released.append(&mut self.queue);
        }
        self.released.pop()
    }
}

#[test]
fn test_shaper_params_and_instances() {
    let mut factory = ShaperFactory::new();
    factory.register("batch", |spec| {
        let n = spec.get("size").unwrap_or("1").parse().unwrap_or(1);
        Ok(Box::new(Batch {
            n,
            queue: Vec::new(),
            released: Vec::new(),
        }))
    });

    let mut tc = TrafficConditioner::builder()
        .classifier(Classifier::BehaviorAggregate)
        .action(ActionRule::shape(
            vec![Dscp::AF21, Dscp::AF22],
            ColorSet::All,
            ShaperSpec::new("batch").param("size", "2"),
        ))
        .shaper_factory(factory)
        .clock(ManualClock::new())
        .build()
        .unwrap();

    // Each cell has its own shaper: AF21 and AF22 do not share a batch.
    assert_eq!(tc.condition(udp4(0x12, 1)), Outcome::Held);
    assert_eq!(tc.condition(udp4(0x14, 2)), Outcome::Held);
    assert_eq!(tc.condition(udp4(0x12, 3)), Outcome::Forward(udp4(0x12, 3)));
    assert_eq!(tc.condition(udp4(0x12, 4)), Outcome::Forward(udp4(0x12, 1)));
    assert_eq!(tc.stats().held, 2);
}

#[test]
fn test_identity_mark_then_shape() {
    let mut tc = TrafficConditioner::builder()
        .classifier(Classifier::BehaviorAggregate)
        .action(ActionRule::mark(Dscp::AF31, ColorSet::All, MarkTarget::Matched))
        .action(ActionRule::shape(Dscp::AF31, ColorSet::All, ShaperSpec::new("pass")))
        .clock(ManualClock::new())
        .build()
        .unwrap();

    let d = tc.process(udp4(0x1a, 100), Duration::ZERO);
    assert_eq!(d.action, Action::MarkAndShape(Dscp::AF31));
    assert_eq!(d.outcome, Outcome::Forward(udp4(0x1a, 100)));
    assert_eq!(tc.stats().marked, 1);
    assert_eq!(tc.stats().shaped, 1);
}
