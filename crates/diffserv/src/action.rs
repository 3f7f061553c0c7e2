//! Per-(DSCP, color) actions.
//!
//! An [`ActionTable`] holds one [`Action`] for every code point and every
//! color the configured meters can produce. It is built from an ordered list
//! of [`ActionRule`]s whose composition is order dependent:
//!
//! - `drop` overwrites the cell.
//! - `mark` applies only to a cell that is `Pass` (becomes `Mark`) or
//!   `Shape` (becomes `MarkAndShape`); it never overrides a drop or an
//!   earlier mark.
//! - `shape` turns `Pass` into `Shape` and `Mark` into `MarkAndShape`, and
//!   (re)assigns a shaper to the cell whatever its action.
//!
//! # Example
//!
//! ```
//! use diffserv::{Color, Dscp};
//! use diffserv::action::{Action, ActionRule, ActionTable, ColorSet, DscpSet, MarkTarget};
//!
//! let mut table = ActionTable::new(3);
//! table.apply(&ActionRule::mark(DscpSet::All, ColorSet::All, MarkTarget::Dscp(Dscp::AF11)))?;
//! table.apply(&ActionRule::drop(DscpSet::from(Dscp::EF), ColorSet::from(Color::RED)))?;
//!
//! assert_eq!(table.get(Dscp::EF, Color::RED), Action::Drop);
//! assert_eq!(table.get(Dscp::EF, Color::GREEN), Action::Mark(Dscp::AF11));
//! # Ok::<(), diffserv::Error>(())
//! ```

use std::fmt;

use crate::error::Result;
use crate::shaper::ShaperSpec;
use crate::types::{Color, DSCP_MAX, Dscp};
use crate::validation::{Validatable, ValidationResult};

// ============================================================================
// Action
// ============================================================================

/// Treatment of the packets of one (DSCP, color) cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Action {
    /// Forward unchanged.
    #[default]
    Pass,
    /// Discard.
    Drop,
    /// Rewrite the code point and forward.
    Mark(Dscp),
    /// Hand to the cell's shaper.
    Shape,
    /// Rewrite the code point, then hand to the cell's shaper.
    MarkAndShape(Dscp),
}

impl Action {
    /// Code point the packet is re-marked with, if any.
    pub fn mark_target(&self) -> Option<Dscp> {
        match *self {
            Self::Mark(dscp) | Self::MarkAndShape(dscp) => Some(dscp),
            _ => None,
        }
    }

    /// Check if the packet goes to a shaper.
    pub fn is_shape(&self) -> bool {
        matches!(self, Self::Shape | Self::MarkAndShape(_))
    }

    /// Check if this is the no-op action.
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => f.write_str("pass"),
            Self::Drop => f.write_str("drop"),
            Self::Mark(dscp) => write!(f, "mark {}", dscp),
            Self::Shape => f.write_str("shape"),
            Self::MarkAndShape(dscp) => write!(f, "mark {} + shape", dscp),
        }
    }
}

// ============================================================================
// Rule selectors
// ============================================================================

/// Code points a rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DscpSet {
    /// All 64 code points (`*`).
    #[default]
    All,
    List(Vec<Dscp>),
}

impl DscpSet {
    /// Expand to the selected code points.
    pub fn to_vec(&self) -> Vec<Dscp> {
        match self {
            Self::All => Dscp::all().collect(),
            Self::List(list) => list.clone(),
        }
    }
}

impl From<Dscp> for DscpSet {
    fn from(dscp: Dscp) -> Self {
        Self::List(vec![dscp])
    }
}

impl From<Vec<Dscp>> for DscpSet {
    fn from(list: Vec<Dscp>) -> Self {
        Self::List(list)
    }
}

/// Colors a rule applies to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColorSet {
    /// Every color the meters produce (`*`).
    #[default]
    All,
    List(Vec<Color>),
}

impl ColorSet {
    /// Expand to the selected colors.
    pub fn to_vec(&self, num_colors: usize) -> Vec<Color> {
        match self {
            Self::All => (0..num_colors).map(|c| Color::new(c as u8)).collect(),
            Self::List(list) => list.clone(),
        }
    }
}

impl From<Color> for ColorSet {
    fn from(color: Color) -> Self {
        Self::List(vec![color])
    }
}

impl From<Vec<Color>> for ColorSet {
    fn from(list: Vec<Color>) -> Self {
        Self::List(list)
    }
}

/// Target code point of a `mark` rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkTarget {
    Dscp(Dscp),
    /// Mark with the matched code point itself (`*`).
    ///
    /// This rewrites nothing, but it takes the cell out of `Pass`, so a
    /// later `mark` rule no longer applies to it.
    Matched,
}

impl MarkTarget {
    /// Resolve the target for a matched code point.
    pub fn resolve(&self, matched: Dscp) -> Dscp {
        match *self {
            Self::Dscp(dscp) => dscp,
            Self::Matched => matched,
        }
    }
}

// ============================================================================
// ActionRule
// ============================================================================

/// A declarative action rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRule {
    Drop {
        dscps: DscpSet,
        colors: ColorSet,
    },
    Mark {
        dscps: DscpSet,
        colors: ColorSet,
        target: MarkTarget,
    },
    Shape {
        dscps: DscpSet,
        colors: ColorSet,
        shaper: ShaperSpec,
    },
}

impl ActionRule {
    /// Create a drop rule.
    pub fn drop(dscps: impl Into<DscpSet>, colors: impl Into<ColorSet>) -> Self {
        Self::Drop {
            dscps: dscps.into(),
            colors: colors.into(),
        }
    }

    /// Create a mark rule.
    pub fn mark(dscps: impl Into<DscpSet>, colors: impl Into<ColorSet>, target: MarkTarget) -> Self {
        Self::Mark {
            dscps: dscps.into(),
            colors: colors.into(),
            target,
        }
    }

    /// Create a shape rule.
    pub fn shape(dscps: impl Into<DscpSet>, colors: impl Into<ColorSet>, shaper: ShaperSpec) -> Self {
        Self::Shape {
            dscps: dscps.into(),
            colors: colors.into(),
            shaper,
        }
    }

    /// Rule name as written in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Drop { .. } => "drop",
            Self::Mark { .. } => "mark",
            Self::Shape { .. } => "shape",
        }
    }

    /// Get the code point selector.
    pub fn dscps(&self) -> &DscpSet {
        match self {
            Self::Drop { dscps, .. } | Self::Mark { dscps, .. } | Self::Shape { dscps, .. } => {
                dscps
            }
        }
    }

    /// Get the color selector.
    pub fn colors(&self) -> &ColorSet {
        match self {
            Self::Drop { colors, .. } | Self::Mark { colors, .. } | Self::Shape { colors, .. } => {
                colors
            }
        }
    }

    /// Check the rule against the number of colors of the table.
    pub fn validate_for(&self, num_colors: usize) -> ValidationResult {
        let mut result = ValidationResult::new();

        if let ColorSet::List(colors) = self.colors() {
            for color in colors {
                if color.index() >= num_colors {
                    result.add_error(
                        "color",
                        format!(
                            "color {} is out of range; meters produce {} color(s)",
                            color, num_colors
                        ),
                    );
                }
            }
        }
        if let DscpSet::List(dscps) = self.dscps()
            && dscps.is_empty()
        {
            result.add_warning("dscp", "rule selects no code points");
        }

        result
    }
}

impl Validatable for ActionRule {
    fn validate(&self) -> ValidationResult {
        // Without a table, assume the widest built-in meter.
        self.validate_for(3)
    }
}

// ============================================================================
// ActionTable
// ============================================================================

/// Dense (DSCP, color) to [`Action`] mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionTable {
    num_colors: usize,
    cells: Vec<Action>,
}

impl ActionTable {
    /// Create a table where every cell is `Pass`.
    ///
    /// `num_colors` is raised to at least 1.
    pub fn new(num_colors: usize) -> Self {
        let num_colors = num_colors.max(1);
        Self {
            num_colors,
            cells: vec![Action::Pass; DSCP_MAX * num_colors],
        }
    }

    /// Build a table from rules applied in order.
    ///
    /// Returns the table and, for every `shape` rule in order, the cells
    /// it covers together with its shaper spec.
    pub fn build<'a>(
        num_colors: usize,
        rules: impl IntoIterator<Item = &'a ActionRule>,
    ) -> Result<(Self, Vec<(Vec<(Dscp, Color)>, &'a ShaperSpec)>)> {
        let mut table = Self::new(num_colors);
        let mut shaped = Vec::new();
        for rule in rules {
            let cells = table.apply(rule)?;
            if let ActionRule::Shape { shaper, .. } = rule {
                shaped.push((cells, shaper));
            }
        }
        Ok((table, shaped))
    }

    /// Number of colors per code point.
    pub fn num_colors(&self) -> usize {
        self.num_colors
    }

    fn slot(&self, dscp: Dscp, color: Color) -> Option<usize> {
        (color.index() < self.num_colors).then(|| dscp.index() * self.num_colors + color.index())
    }

    /// Look up the action of a cell.
    ///
    /// Colors outside the table pass.
    pub fn get(&self, dscp: Dscp, color: Color) -> Action {
        self.slot(dscp, color)
            .map(|i| self.cells[i])
            .unwrap_or(Action::Pass)
    }

    /// Set the action of a cell.
    ///
    /// Returns `false` if the color is outside the table.
    pub fn set(&mut self, dscp: Dscp, color: Color, action: Action) -> bool {
        match self.slot(dscp, color) {
            Some(i) => {
                self.cells[i] = action;
                true
            }
            None => false,
        }
    }

    /// Apply one rule.
    ///
    /// Returns the cells the rule selected. For `shape` rules these are the
    /// cells that get a shaper.
    pub fn apply(&mut self, rule: &ActionRule) -> Result<Vec<(Dscp, Color)>> {
        let result = rule.validate_for(self.num_colors);
        result.log_warnings(rule.name());
        result.into_result()?;

        let colors = rule.colors().to_vec(self.num_colors);
        let mut cells = Vec::new();

        for dscp in rule.dscps().to_vec() {
            for &color in &colors {
                let current = self.get(dscp, color);
                let next = match rule {
                    ActionRule::Drop { .. } => Action::Drop,
                    ActionRule::Mark { target, .. } => {
                        let target = target.resolve(dscp);
                        match current {
                            Action::Pass => Action::Mark(target),
                            Action::Shape => Action::MarkAndShape(target),
                            other => {
                                tracing::debug!(%dscp, %color, action = %other, "mark rule ignored for cell");
                                other
                            }
                        }
                    }
                    ActionRule::Shape { .. } => match current {
                        Action::Pass => Action::Shape,
                        Action::Mark(target) => Action::MarkAndShape(target),
                        other => other,
                    },
                };
                self.set(dscp, color, next);
                cells.push((dscp, color));
            }
        }

        Ok(cells)
    }

    /// Iterate over all cells in (DSCP, color) order.
    pub fn iter(&self) -> impl Iterator<Item = (Dscp, Color, Action)> + '_ {
        Dscp::all().flat_map(move |dscp| {
            (0..self.num_colors).map(move |c| {
                let color = Color::new(c as u8);
                (dscp, color, self.get(dscp, color))
            })
        })
    }

    /// Number of cells that are not `Pass`.
    pub fn active_cells(&self) -> usize {
        self.cells.iter().filter(|a| !a.is_pass()).count()
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self::new(1)
    }
}
