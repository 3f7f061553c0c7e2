//! Traffic shaper capability.
//!
//! The conditioner does not implement shaping delays itself. A [`Shaper`]
//! receives a packet and returns the packet to transmit now, or `None` if
//! it kept the packet for later. Shapers are created by name through a
//! [`ShaperFactory`], one instance per (DSCP, color) cell a `shape` rule
//! covers.
//!
//! # Example
//!
//! ```
//! use diffserv::packet::Packet;
//! use diffserv::shaper::{Shaper, ShaperFactory, ShaperSpec};
//!
//! #[derive(Default)]
//! struct Blackhole {
//!     held: Vec<Packet>,
//! }
//!
//! impl Shaper for Blackhole {
//!     fn shape(&mut self, packet: Packet) -> Option<Packet> {
//!         self.held.push(packet);
//!         None
//!     }
//! }
//!
//! let mut factory = ShaperFactory::new();
//! factory.register("blackhole", |_spec| Ok(Box::new(Blackhole::default())));
//!
//! let mut shaper = factory.create(&ShaperSpec::new("blackhole"))?;
//! assert!(shaper.shape(Packet::Other { byte_length: 60 }).is_none());
//! # Ok::<(), diffserv::Error>(())
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::types::{Color, Dscp};

/// A traffic shaper.
pub trait Shaper: Send {
    /// Accept a packet; return the packet to send now, if any.
    fn shape(&mut self, packet: Packet) -> Option<Packet>;
}

/// Shaper type name plus its configuration attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShaperSpec {
    pub kind: String,
    pub params: BTreeMap<String, String>,
}

impl ShaperSpec {
    /// Create a spec with no parameters.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Get a parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Forwards every packet immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughShaper;

impl Shaper for PassThroughShaper {
    fn shape(&mut self, packet: Packet) -> Option<Packet> {
        Some(packet)
    }
}

type Constructor = Box<dyn Fn(&ShaperSpec) -> Result<Box<dyn Shaper>> + Send + Sync>;

/// Registry of shaper constructors keyed by type name.
///
/// A new factory knows the `pass` type ([`PassThroughShaper`]).
pub struct ShaperFactory {
    constructors: HashMap<String, Constructor>,
}

impl ShaperFactory {
    /// Create a factory with the built-in shaper types.
    pub fn new() -> Self {
        let mut factory = Self {
            constructors: HashMap::new(),
        };
        factory.register("pass", |_| Ok(Box::new(PassThroughShaper)));
        factory
    }

    /// Register a constructor for a type name, replacing any previous one.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F)
    where
        F: Fn(&ShaperSpec) -> Result<Box<dyn Shaper>> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Box::new(constructor));
    }

    /// Check if a type name is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.constructors.contains_key(kind)
    }

    /// Registered type names, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Create a shaper instance.
    pub fn create(&self, spec: &ShaperSpec) -> Result<Box<dyn Shaper>> {
        let constructor = self
            .constructors
            .get(&spec.kind)
            .ok_or_else(|| Error::UnknownType {
                category: "shaper",
                name: spec.kind.clone(),
            })?;
        constructor(spec)
    }
}

impl Default for ShaperFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ShaperFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaperFactory")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Shaper instances assigned to (DSCP, color) cells.
#[derive(Default)]
pub struct ShaperMap {
    shapers: HashMap<(Dscp, Color), Box<dyn Shaper>>,
}

impl ShaperMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a shaper to a cell, replacing any previous assignment.
    pub fn insert(&mut self, dscp: Dscp, color: Color, shaper: Box<dyn Shaper>) {
        self.shapers.insert((dscp, color), shaper);
    }

    /// Remove the shaper of a cell.
    pub fn remove(&mut self, dscp: Dscp, color: Color) -> Option<Box<dyn Shaper>> {
        self.shapers.remove(&(dscp, color))
    }

    /// Get the shaper of a cell.
    pub fn get_mut(&mut self, dscp: Dscp, color: Color) -> Option<&mut (dyn Shaper + 'static)> {
        self.shapers.get_mut(&(dscp, color)).map(|s| s.as_mut())
    }

    /// Check if a cell has a shaper.
    pub fn contains(&self, dscp: Dscp, color: Color) -> bool {
        self.shapers.contains_key(&(dscp, color))
    }

    /// Number of cells with a shaper.
    pub fn len(&self) -> usize {
        self.shapers.len()
    }

    /// Check if no cell has a shaper.
    pub fn is_empty(&self) -> bool {
        self.shapers.is_empty()
    }
}

impl fmt::Debug for ShaperMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut cells: Vec<_> = self.shapers.keys().collect();
        cells.sort();
        f.debug_struct("ShaperMap").field("cells", &cells).finish()
    }
}
