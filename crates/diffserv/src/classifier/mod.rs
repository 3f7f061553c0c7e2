//! Packet classifiers.
//!
//! A classifier maps every packet to a code point and never fails:
//!
//! - [`Classifier::BehaviorAggregate`] reads the code point the packet
//!   already carries.
//! - [`Classifier::MultiField`] evaluates an ordered list of [`Filter`]s
//!   against the packet header.
//!
//! Packets that cannot be classified (non-IP, no matching filter) are
//! best effort.
//!
//! # Example
//!
//! ```
//! use std::net::Ipv4Addr;
//! use diffserv::Dscp;
//! use diffserv::classifier::{Classifier, Filter, MultiFieldClassifier};
//! use diffserv::packet::IpDatagram;
//!
//! let mf = MultiFieldClassifier::new()
//!     .filter(Filter::new(Dscp::EF).udp())?
//!     .filter(Filter::new(Dscp::BE))?;
//! let classifier = Classifier::MultiField(mf);
//!
//! let packet = IpDatagram::new(Ipv4Addr::LOCALHOST, Ipv4Addr::LOCALHOST).udp(1, 2).into();
//! assert_eq!(classifier.classify(&packet), Dscp::EF);
//! # Ok::<(), diffserv::Error>(())
//! ```

mod filter;
mod multi_field;

pub use filter::{AddressMatch, Filter};
pub use multi_field::MultiFieldClassifier;

use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::packet::Packet;
use crate::types::Dscp;

/// Classifier type tag used in configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClassifierKind {
    BehaviorAggregate,
    #[default]
    MultiField,
}

impl ClassifierKind {
    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::BehaviorAggregate => "behavior-aggregate",
            Self::MultiField => "multi-field",
        }
    }
}

impl FromStr for ClassifierKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "behavior-aggregate" | "behaviour-aggregate" | "ba" | "baclassifier" => {
                Ok(Self::BehaviorAggregate)
            }
            "multi-field" | "mf" | "mfclassifier" => Ok(Self::MultiField),
            _ => Err(Error::UnknownType {
                category: "classifier",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ClassifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A packet classifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classifier {
    /// Trust the code point in the ToS / Traffic Class byte.
    BehaviorAggregate,
    /// First matching filter decides.
    MultiField(MultiFieldClassifier),
}

impl Classifier {
    /// Classify a packet.
    pub fn classify(&self, packet: &Packet) -> Dscp {
        match self {
            Self::BehaviorAggregate => packet.dscp().unwrap_or(Dscp::BE),
            Self::MultiField(mf) => mf.classify(packet),
        }
    }

    /// Get the type tag.
    pub fn kind(&self) -> ClassifierKind {
        match self {
            Self::BehaviorAggregate => ClassifierKind::BehaviorAggregate,
            Self::MultiField(_) => ClassifierKind::MultiField,
        }
    }

    /// Number of filters (zero for behavior-aggregate).
    pub fn filter_count(&self) -> usize {
        match self {
            Self::BehaviorAggregate => 0,
            Self::MultiField(mf) => mf.len(),
        }
    }
}

impl From<MultiFieldClassifier> for Classifier {
    fn from(mf: MultiFieldClassifier) -> Self {
        Self::MultiField(mf)
    }
}
