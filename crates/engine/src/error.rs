//! Error types for sheet operations and formula evaluation.
//!
//! Two distinct families live here. `SheetError` is an operation failure:
//! the edit is rejected and the sheet is left untouched. `FormulaError` is
//! a cell *value*: evaluation produced `#REF!`/`#VALUE!`/`#ARITHM!`, the
//! cell holds that result, and formulas referencing it inherit it.

use serde::{Deserialize, Serialize};

use crate::position::Position;

/// Evaluation error category. A legitimate cell value, not a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormulaError {
    /// A referenced position is outside the addressable grid.
    Ref,
    /// A referenced cell's text is not fully numeric.
    Value,
    /// Division by zero.
    Div0,
}

impl FormulaError {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaError::Ref => "#REF!",
            FormulaError::Value => "#VALUE!",
            FormulaError::Div0 => "#ARITHM!",
        }
    }
}

impl std::fmt::Display for FormulaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::error::Error for FormulaError {}

/// Report produced when an edit would introduce a circular reference.
///
/// Carries the positions that prove the cycle and a prebuilt message so
/// callers can log it directly.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleError {
    /// Positions participating in the cycle. May be a subset for long cycles.
    pub cells: Vec<Position>,
    message: String,
}

impl CycleError {
    /// A cell referencing itself.
    pub fn self_reference(cell: Position) -> Self {
        Self {
            cells: vec![cell],
            message: format!("cell {} references itself", cell),
        }
    }

    /// A multi-cell cycle, witnessed by the given positions.
    pub fn cycle(cells: Vec<Position>) -> Self {
        let path: Vec<String> = cells.iter().map(|c| c.to_string()).collect();
        let message = format!("circular reference through {}", path.join(" -> "));
        Self { cells, message }
    }
}

impl std::fmt::Display for CycleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CycleError {}

/// Failure of a public sheet operation. The sheet is unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// Position outside the addressable grid.
    InvalidPosition(Position),
    /// Accepting the edit would create a cycle in the reference graph.
    CircularDependency(CycleError),
    /// The text after `=` did not parse as a formula.
    Formula(String),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::InvalidPosition(pos) => {
                write!(f, "invalid position ({}, {})", pos.row, pos.col)
            }
            SheetError::CircularDependency(cycle) => write!(f, "{}", cycle),
            SheetError::Formula(msg) => write!(f, "formula parse error: {}", msg),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::CircularDependency(cycle) => Some(cycle),
            _ => None,
        }
    }
}
