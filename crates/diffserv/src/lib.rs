//! Diffserv traffic conditioner.
//!
//! This crate implements the traffic conditioning block of a Differentiated
//! Services domain boundary. Every packet is
//!
//! 1. classified into a traffic class identified by a DSCP,
//! 2. metered against the rate/burst profile of its class, which gives it a
//!    conformance color (green, yellow or red),
//! 3. looked up in a (DSCP, color) action table, and
//! 4. passed, re-marked, dropped or handed to a shaper accordingly.
//!
//! Classifiers, meters and the action table are built once from a
//! configuration; afterwards only meter token state changes.
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use std::time::Duration;
//! use diffserv::clock::ManualClock;
//! use diffserv::config::{self, ConfigContext};
//! use diffserv::conditioner::{Outcome, TrafficConditioner};
//! use diffserv::packet::IpDatagram;
//! use diffserv::{Color, Dscp};
//!
//! let config = config::from_yaml_str(r#"
//! classifier:
//!   filters:
//!     - { dscp: EF, protocol: udp }
//! meters:
//!   - { name: voice, type: trtcm, pir: 2mbps, pbs: 20000, cir: 1mbps, cbs: 10000 }
//! traffic-profiles:
//!   - { meter: voice, dscp: EF }
//! actions:
//!   - mark: { color: yellow, value: AF41 }
//!   - drop: { color: red }
//! "#)?;
//! let mut tc = TrafficConditioner::from_config(&config, ConfigContext::new().clock(ManualClock::new()))?;
//!
//! let packet = || IpDatagram::new(Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 0, 0, 2))
//!     .udp(5004, 5004)
//!     .length(1000);
//!
//! let first = tc.process(packet().into(), Duration::ZERO);
//! assert_eq!((first.dscp, first.color), (Dscp::EF, Color::GREEN));
//!
//! let second = tc.process(packet().into(), Duration::ZERO);
//! assert_eq!(second.color, Color::YELLOW);
//! assert_eq!(second.outcome.packet().and_then(|p| p.dscp()), Some(Dscp::AF41));
//!
//! let third = tc.process(packet().into(), Duration::ZERO);
//! assert!(matches!(third.outcome, Outcome::Drop(_)));
//! # Ok::<(), diffserv::Error>(())
//! ```

pub mod action;
pub mod classifier;
pub mod clock;
pub mod conditioner;
pub mod config;
pub mod error;
pub mod meter;
pub mod packet;
pub mod shaper;
pub mod shared;
pub mod types;
pub mod util;
pub mod validation;

// Re-export common types at crate root for convenience
pub use action::{Action, ActionRule, ActionTable};
pub use classifier::{Classifier, Filter, MultiFieldClassifier};
pub use conditioner::{Outcome, TrafficConditioner};
pub use error::{Error, Result};
pub use meter::Meter;
pub use packet::Packet;
pub use types::{Color, DSCP_MAX, Dscp};
