//! Invariants checked over generated inputs.

use std::net::Ipv4Addr;
use std::time::Duration;

use diffserv::action::{Action, ActionRule, ActionTable, ColorSet, DscpSet, MarkTarget};
use diffserv::classifier::{Classifier, Filter, MultiFieldClassifier};
use diffserv::meter::{SrTcm, SrTcmParams, TokenBucket, TokenBucketParams, TrTcm, TrTcmParams};
use diffserv::packet::{IpDatagram, Packet};
use diffserv::shaper::ShaperSpec;
use diffserv::{Color, DSCP_MAX, Dscp};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const ROUNDS: usize = 2_000;

#[test]
fn test_buckets_stay_within_capacity() {
    let mut rng = StdRng::seed_from_u64(7);
    let mut tb = TokenBucket::new(TokenBucketParams { cir: 3e6, cbs: 20_000 }, Duration::ZERO);
    let mut sr = SrTcm::new(
        SrTcmParams {
            cir: 2e6,
            cbs: 12_000,
            ebs: 30_000,
        },
        Duration::ZERO,
    );
    let mut tr = TrTcm::new(
        TrTcmParams {
            pir: 4e6,
            pbs: 24_000,
            cir: 1e6,
            cbs: 12_000,
        },
        Duration::ZERO,
    );

    let mut now = Duration::ZERO;
    for _ in 0..ROUNDS {
        now += Duration::from_micros(rng.gen_range(0..10_000));
        let size = rng.gen_range(0..16_000);
        tb.arrive(size, now);
        sr.arrive(size, now);
        tr.arrive(size, now);

        assert!(tb.tokens() <= 20_000);
        assert!(sr.committed_tokens() <= 12_000);
        assert!(sr.excess_tokens() <= 30_000);
        assert!(tr.peak_tokens() <= 24_000);
        assert!(tr.committed_tokens() <= 12_000);
    }
}

#[test]
fn test_trtcm_red_consumes_nothing() {
    let mut rng = StdRng::seed_from_u64(11);
    let params = TrTcmParams {
        pir: 1e6,
        pbs: 10_000,
        cir: 5e5,
        cbs: 6_000,
    };
    let mut tr = TrTcm::new(params, Duration::ZERO);
    let mut now = Duration::ZERO;

    for _ in 0..ROUNDS {
        now += Duration::from_micros(rng.gen_range(0..4_000));
        let size = rng.gen_range(1_000..13_000);

        let mut refilled = tr.clone();
        refilled.arrive(0, now);
        let (tp, tc) = (refilled.peak_tokens(), refilled.committed_tokens());

        match tr.arrive(size, now) {
            Color::RED => {
                assert!(tp < size);
                assert_eq!((tr.peak_tokens(), tr.committed_tokens()), (tp, tc));
            }
            color => {
                assert!(tp >= size, "{} packet without peak tokens", color);
                assert_eq!(tr.peak_tokens(), tp - size);
            }
        }
    }
}

#[test]
fn test_srtcm_excess_fills_only_on_overflow() {
    let mut rng = StdRng::seed_from_u64(13);
    let params = SrTcmParams {
        cir: 1e6,
        cbs: 8_000,
        ebs: 16_000,
    };
    let mut sr = SrTcm::new(params, Duration::ZERO);
    let mut now = Duration::ZERO;

    for _ in 0..ROUNDS {
        now += Duration::from_micros(rng.gen_range(0..12_000));
        let before = sr.excess_tokens();

        let mut refilled = sr.clone();
        refilled.arrive(0, now);
        if refilled.excess_tokens() > before {
            assert_eq!(refilled.committed_tokens(), params.cbs);
        }

        sr.arrive(rng.gen_range(2_000..12_000), now);
    }
}

#[test]
fn test_first_matching_filter_wins() {
    let mut rng = StdRng::seed_from_u64(17);
    let protocols = [6u8, 17];

    for _ in 0..200 {
        // A handful of protocol/port filters with random targets.
        let mut mf = MultiFieldClassifier::new();
        let mut filters = Vec::new();
        for _ in 0..rng.gen_range(1..7) {
            let dscp = Dscp::new(rng.gen_range(0..64)).unwrap();
            let port = rng.gen_range(1000..1004u16);
            let filter = Filter::new(dscp)
                .protocol(protocols[rng.gen_range(0..2)])
                .dst_port(port);
            mf.push(filter.clone()).unwrap();
            filters.push(filter);
        }
        let classifier = Classifier::from(mf);

        for _ in 0..20 {
            let port = rng.gen_range(1000..1004u16);
            let datagram = IpDatagram::new(Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2));
            let packet: Packet = if rng.gen_bool(0.5) {
                datagram.udp(9, port).into()
            } else {
                datagram.tcp(9, port).into()
            };
            let header = packet.header().unwrap();

            let expected = filters
                .iter()
                .find(|f| f.matches(&header))
                .map_or(Dscp::BE, |f| f.dscp);
            assert_eq!(classifier.classify(&packet), expected);
        }
    }
}

fn random_rule(rng: &mut StdRng) -> ActionRule {
    let dscps = if rng.gen_ratio(1, 4) {
        DscpSet::All
    } else {
        DscpSet::List(
            (0..rng.gen_range(1..4))
                .map(|_| Dscp::new(rng.gen_range(0..8)).unwrap())
                .collect(),
        )
    };
    let colors = if rng.gen_ratio(1, 3) {
        ColorSet::All
    } else {
        ColorSet::from(Color::new(rng.gen_range(0..3)))
    };
    match rng.gen_range(0..3) {
        0 => ActionRule::drop(dscps, colors),
        1 => {
            let target = if rng.gen_ratio(1, 4) {
                MarkTarget::Matched
            } else {
                MarkTarget::Dscp(Dscp::new(rng.gen_range(0..64)).unwrap())
            };
            ActionRule::mark(dscps, colors, target)
        }
        _ => ActionRule::shape(dscps, colors, ShaperSpec::new("pass")),
    }
}

#[test]
fn test_drop_is_never_overridden() {
    let mut rng = StdRng::seed_from_u64(19);

    for _ in 0..200 {
        let rules: Vec<ActionRule> = (0..rng.gen_range(1..9)).map(|_| random_rule(&mut rng)).collect();
        let (table, _) = ActionTable::build(3, &rules).unwrap();

        for dscp in Dscp::all() {
            for c in 0..3 {
                let color = Color::new(c);
                let selects = |rule: &ActionRule| {
                    rule.dscps().to_vec().contains(&dscp) && rule.colors().to_vec(3).contains(&color)
                };
                let dropped = rules
                    .iter()
                    .any(|r| matches!(r, ActionRule::Drop { .. }) && selects(r));
                assert_eq!(table.get(dscp, color) == Action::Drop, dropped);
            }
        }
    }
}

#[test]
fn test_mark_round_trip_preserves_upper_bits() {
    for value in 0..DSCP_MAX as u8 {
        let dscp = Dscp::new(value).unwrap();
        for upper in [0x00u8, 0x40, 0x80, 0xc0] {
            let mut packet: Packet = IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST)
                .tos(upper | 0x3f)
                .into();
            packet.set_dscp(dscp);
            assert_eq!(Classifier::BehaviorAggregate.classify(&packet), dscp);
            let Packet::Ipv4(datagram) = &packet else {
                unreachable!()
            };
            assert_eq!(datagram.tos & 0xc0, upper);
        }
    }
}
