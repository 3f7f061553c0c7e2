//! Conformance colors assigned by meters.

use std::fmt;
use std::str::FromStr;

use crate::util::names;
use crate::util::parse::{self, ParseError};

/// A conformance color.
///
/// Meters produce colors in `0..num_colors`; the three predefined values
/// cover every built-in meter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Color(u8);

impl Color {
    pub const GREEN: Color = Color(0);
    pub const YELLOW: Color = Color(1);
    pub const RED: Color = Color(2);

    /// Create a color from its numeric value.
    pub const fn new(value: u8) -> Self {
        Self(value)
    }

    /// Get the numeric value.
    pub const fn value(self) -> u8 {
        self.0
    }

    /// Index into per-color tables.
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Predefined name, if any.
    pub fn name(self) -> Option<&'static str> {
        names::color_name(self.0)
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(value) = names::color_value(s) {
            return Ok(Self(value));
        }
        if !s.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ParseError::UnknownName(s.to_string()));
        }
        parse::get_u8(s).map(Self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "{}", self.0),
        }
    }
}

/// Parse a space separated list of colors; `*` selects `0..num_colors`.
///
/// Colors at or above `num_colors` are rejected.
pub fn parse_color_list(s: &str, num_colors: usize) -> Result<Vec<Color>, ParseError> {
    let s = s.trim();
    if s == "*" {
        return Ok((0..num_colors).map(|c| Color(c as u8)).collect());
    }
    if s.is_empty() {
        return Err(ParseError::InvalidFormat("empty color list".to_string()));
    }
    s.split_whitespace()
        .map(|token| {
            let color: Color = token.parse()?;
            if color.index() >= num_colors {
                return Err(ParseError::OutOfRange(format!(
                    "color {} (meters produce {} colors)",
                    token, num_colors
                )));
            }
            Ok(color)
        })
        .collect()
}
