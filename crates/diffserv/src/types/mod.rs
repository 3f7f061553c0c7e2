//! Core value types: code points and conformance colors.

pub mod color;
pub mod dscp;

pub use color::Color;
pub use dscp::{DSCP_MAX, Dscp};
