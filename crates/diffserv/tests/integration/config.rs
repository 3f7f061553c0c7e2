//! Building conditioners from configuration files.

use std::time::Duration;

use diffserv::action::Action;
use diffserv::clock::ManualClock;
use diffserv::conditioner::{Outcome, TrafficConditioner};
use diffserv::config::{self, ConfigContext};
use diffserv::meter::{Meter, MeterParams, TrTcmParams};
use diffserv::packet::Packet;
use diffserv::shaper::{Shaper, ShaperFactory};
use diffserv::{Color, Dscp, Error};

use crate::common::{tcp4, udp4};

const EDGE: &str = r#"
classifier:
  type: multi-field
  filters:
    - { dscp: EF, protocol: udp, destPort: 5004-5005 }
    - { dscp: AF11, protocol: tcp, destAddress: 10.0.1.0/24 }
    - { dscp: BE }
meters:
  - { name: voice, type: token-bucket, cir: 10%, cbs: 1000B }
  - { name: data, type: trtcm, pir: 2mbps, pbs: 2000B, cir: 1mbps, cbs: 1000B }
traffic-profiles:
  - { meter: voice, dscp: EF }
  - { meter: data, dscp: AF11 AF12 AF13 }
actions:
  - drop: { dscp: EF, color: red }
  - mark: { dscp: AF11, color: yellow, value: AF12 }
  - mark: { dscp: AF11, color: red, value: AF13 }
"#;

fn build(yaml: &str, ctx: ConfigContext) -> diffserv::Result<TrafficConditioner> {
    let config = config::from_yaml_str(yaml)?;
    TrafficConditioner::from_config(&config, ctx)
}

fn edge() -> TrafficConditioner {
    build(EDGE, ConfigContext::new().datarate(1e6).clock(ManualClock::new())).unwrap()
}

#[test]
fn test_edge_config_structure() {
    let tc = edge();
    assert_eq!(tc.classifier().map(|c| c.filter_count()), Some(3));
    assert_eq!(tc.num_colors(), 3);
    assert_eq!(tc.meter_for(Dscp::EF), Some("voice"));
    assert_eq!(tc.meter_for(Dscp::AF13), Some("data"));
    assert_eq!(tc.meter_for(Dscp::BE), None);

    match tc.meter_by_name("voice").map(Meter::params) {
        Some(MeterParams::TokenBucket(p)) => {
            assert_eq!(p.cir, 100_000.0);
            assert_eq!(p.cbs, 8_000);
        }
        other => panic!("unexpected meter: {:?}", other),
    }

    let table = tc.action_table().unwrap();
    assert_eq!(table.get(Dscp::EF, Color::RED), Action::Drop);
    assert_eq!(table.get(Dscp::AF11, Color::YELLOW), Action::Mark(Dscp::AF12));
    assert_eq!(table.get(Dscp::AF11, Color::RED), Action::Mark(Dscp::AF13));
    assert_eq!(table.active_cells(), 3);
}

#[test]
fn test_edge_config_traffic() {
    let mut tc = edge();

    // Voice: 1000-byte bucket, one packet fits.
    assert!(matches!(tc.process(udp4(0, 1000), Duration::ZERO).outcome, Outcome::Forward(_)));
    let d = tc.process(udp4(0, 1000), Duration::ZERO);
    assert_eq!((d.dscp, d.color), (Dscp::EF, Color::RED));
    assert!(d.outcome.is_drop());
    // 80 ms at 100 kbit/s refills 8000 bits.
    assert!(!tc.process(udp4(0, 1000), Duration::from_millis(80)).outcome.is_drop());

    // Data: green, yellow, red in turn.
    let colors: Vec<(Color, Option<Dscp>)> = (0..3)
        .map(|_| {
            let d = tc.process(tcp4(0, 1000), Duration::from_millis(80));
            (d.color, d.outcome.packet().and_then(Packet::dscp))
        })
        .collect();
    assert_eq!(
        colors,
        vec![
            (Color::GREEN, Some(Dscp::BE)),
            (Color::YELLOW, Some(Dscp::AF12)),
            (Color::RED, Some(Dscp::AF13)),
        ]
    );

    let stats = tc.stats();
    assert_eq!(stats.received, 6);
    assert_eq!(stats.dropped, 1);
    assert_eq!(stats.marked, 2);
}

#[test]
fn test_json_matches_yaml() {
    let json = r#"{
        "classifier": {"type": "ba"},
        "meters": [{"name": "m", "type": "trtcm", "pir": "2mbps", "pbs": 24000, "cir": "1mbps", "cbs": 16000}],
        "traffic-profiles": [{"meter": "m"}],
        "actions": [{"drop": {"color": "red"}}]
    }"#;
    let yaml = r#"
classifier: { type: ba }
meters: [{ name: m, type: trtcm, pir: 2mbps, pbs: 24000, cir: 1mbps, cbs: 16000 }]
traffic-profiles: [{ meter: m }]
actions: [{ drop: { color: red } }]
"#;
    let from_json = config::from_json_str(json).unwrap();
    let from_yaml = config::from_yaml_str(yaml).unwrap();
    assert_eq!(from_json, from_yaml);

    let tc = TrafficConditioner::from_config(&from_json, ConfigContext::new()).unwrap();
    assert_eq!(
        tc.meter_by_name("m").map(Meter::params),
        Some(MeterParams::TrTcm(TrTcmParams {
            pir: 2e6,
            pbs: 24_000,
            cir: 1e6,
            cbs: 16_000,
        }))
    );
    assert_eq!(tc.meter_for(Dscp::CS7), Some("m"));
}

#[test]
fn test_errors_locate_the_element() {
    let cases = [
        (
            "classifier: { filters: [{ dscp: EF }, { dscp: EF, srcPort: 20-10 }] }",
            "classifier.filters[1]",
        ),
        (
            "classifier: { filters: [{ protocol: udp }] }",
            "classifier.filters[0]",
        ),
        ("classifier: { type: wfq }", "classifier"),
        ("meters: [{ name: a, type: tb }, { name: a, type: tb }]", "meters[1] 'a'"),
        ("meters: [{ name: a, type: tb, cir: 5% }]", "meters[0] 'a'"),
        ("traffic-profiles: [{ meter: ghost }]", "traffic-profiles[0]"),
        ("traffic-profiles: [{ dscp: EF }]", "traffic-profiles[0]"),
        ("actions: [{ drop: {} }, { mark: { dscp: EF } }]", "actions[1] <mark>"),
        ("actions: [{ shape: { type: leaky-bucket } }]", "actions[0] <shape>"),
        ("actions: [{ drop: { dscp: 99 } }]", "actions[0] <drop>"),
    ];

    for (yaml, element) in cases {
        let err = build(yaml, ConfigContext::new()).unwrap_err();
        assert!(err.is_config(), "{}: {}", yaml, err);
        assert_eq!(err.element(), Some(element), "{}: {}", yaml, err);
    }
}

#[test]
fn test_color_beyond_meters_is_rejected() {
    let yaml = "meters: [{ name: a, type: tb }]\nactions: [{ drop: { color: 3 } }]\n";
    let err = build(yaml, ConfigContext::new()).unwrap_err();
    assert!(matches!(&err, Error::InElement { source, .. } if matches!(**source, Error::Validation(_))));
    assert!(err.to_string().contains("color"));
}

#[test]
fn test_without_actions_everything_passes() {
    let mut tc = build(
        "meters: [{ name: a, type: tb }]\ntraffic-profiles: [{ meter: a }]\n",
        ConfigContext::new().clock(ManualClock::new()),
    )
    .unwrap();
    assert!(tc.action_table().is_none());
    let d = tc.process(udp4(0, 1000), Duration::ZERO);
    assert_eq!(d.color, Color::RED);
    assert_eq!(d.outcome, Outcome::Forward(udp4(0, 1000)));
}

struct Every {
    n: u32,
    seen: u32,
}

impl Shaper for Every {
    fn shape(&mut self, packet: Packet) -> Option<Packet> {
        self.seen += 1;
        (self.seen % self.n == 0).then_some(packet)
    }
}

#[test]
fn test_shape_params_reach_factory() {
    let mut factory = ShaperFactory::new();
    factory.register("every", |spec| {
        let n = spec
            .get("n")
            .ok_or_else(|| Error::missing("shape", "n"))?
            .parse::<u32>()
            .map_err(|e| Error::config("shape", "n", e))?;
        Ok(Box::new(Every { n, seen: 0 }))
    });

    let yaml = r#"
classifier: { type: behavior-aggregate }
actions:
  - mark: { dscp: AF41, value: AF42 }
  - shape: { dscp: AF41, type: every, n: 3 }
"#;
    let mut tc = build(yaml, ConfigContext::new().shaper_factory(factory)).unwrap();

    let outcomes: Vec<bool> = (0..6)
        .map(|_| matches!(tc.condition(udp4(0x22, 100)), Outcome::Forward(_)))
        .collect();
    assert_eq!(outcomes, vec![false, false, true, false, false, true]);

    let d = tc.process(udp4(0x22, 100), Duration::ZERO);
    assert_eq!(d.action, Action::MarkAndShape(Dscp::AF42));

    let mut factory = ShaperFactory::new();
    factory.register("every", |_| Err(Error::missing("shape", "n")));
    let err = build(yaml, ConfigContext::new().shaper_factory(factory)).unwrap_err();
    assert_eq!(err.element(), Some("shape"));
}
