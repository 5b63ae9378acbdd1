//! A single grid entry.
//!
//! Content is a closed sum: empty, literal text, or an owned formula AST.
//! A formula cell memoizes its last evaluation in an interior-mutable slot
//! so reads stay `&self`; the sheet clears that slot when anything the
//! formula depends on changes. Reference adjacency is not stored here; it
//! lives in the sheet's dependency graph, keyed by position.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::error::FormulaError;
use crate::formula::parser::{self, Expr};
use crate::formula::refs;
use crate::position::Position;

/// Leading character that escapes a literal: the value drops it.
pub const ESCAPE_SIGN: char = '\'';
/// Leading character that marks a formula.
pub const FORMULA_SIGN: char = '=';

/// What a cell is worth when read: text, a number, or an evaluation error.
/// Numbers only ever come from formula evaluation; numeric literal text
/// stays text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Text(String),
    Number(f64),
    Error(FormulaError),
}

impl CellValue {
    /// Rendered form for tabular output.
    ///
    /// Numbers with no fractional part print without a decimal point
    /// (`124`, not `124.0`); everything else uses the default float
    /// formatting. Errors print their tag.
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Error(e) => e.as_str().to_string(),
        }
    }
}

/// Memoized result of a formula evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Computed {
    Number(f64),
    Error(FormulaError),
}

impl From<Computed> for CellValue {
    fn from(computed: Computed) -> Self {
        match computed {
            Computed::Number(n) => CellValue::Number(n),
            Computed::Error(e) => CellValue::Error(e),
        }
    }
}

/// An owned, parsed formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    ast: Expr,
}

impl Formula {
    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// `=` plus the canonical expression text.
    pub fn text(&self) -> String {
        format!("{}{}", FORMULA_SIGN, self.ast.expression())
    }

    /// Distinct valid referenced positions, in first-occurrence order.
    pub fn referenced_cells(&self) -> Vec<Position> {
        refs::distinct_valid(&self.ast)
    }
}

/// Cell content. Closed set; edits replace the whole variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellContent {
    Empty,
    /// Non-empty raw text.
    Literal(String),
    Formula(Formula),
}

impl CellContent {
    /// Classify raw input text, in order: empty, formula (`=` plus at
    /// least one character), literal. A lone `=` is a literal.
    ///
    /// Formula parse failures surface as the error string from the parser.
    pub fn parse(text: &str) -> Result<Self, String> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        if let Some(body) = text.strip_prefix(FORMULA_SIGN) {
            if !body.is_empty() {
                let ast = parser::parse(body)?;
                return Ok(CellContent::Formula(Formula { ast }));
            }
        }
        Ok(CellContent::Literal(text.to_string()))
    }

    /// Raw text round-trip: what the user would edit.
    pub fn text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Literal(text) => text.clone(),
            CellContent::Formula(formula) => formula.text(),
        }
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        match self {
            CellContent::Formula(formula) => formula.referenced_cells(),
            _ => Vec::new(),
        }
    }
}

/// Strip the escape sign from literal text for display.
pub fn unescape(text: &str) -> &str {
    text.strip_prefix(ESCAPE_SIGN).unwrap_or(text)
}

/// One grid slot: content plus the evaluation cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    content: CellContent,
    #[serde(skip)]
    cache: RefCell<Option<Computed>>,
}

impl Cell {
    pub fn new(content: CellContent) -> Self {
        Self {
            content,
            cache: RefCell::new(None),
        }
    }

    /// An empty placeholder, as materialized for referenced-but-unset
    /// positions.
    pub fn empty() -> Self {
        Self::new(CellContent::Empty)
    }

    pub fn content(&self) -> &CellContent {
        &self.content
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    /// Swap in new content. The stale cache goes with the old content.
    pub fn replace_content(&mut self, content: CellContent) {
        self.content = content;
        *self.cache.borrow_mut() = None;
    }

    pub fn text(&self) -> String {
        self.content.text()
    }

    pub fn referenced_cells(&self) -> Vec<Position> {
        self.content.referenced_cells()
    }

    /// Memoized evaluation result, if still coherent.
    pub fn cached(&self) -> Option<Computed> {
        *self.cache.borrow()
    }

    pub fn store_cache(&self, computed: Computed) {
        *self.cache.borrow_mut() = Some(computed);
    }

    /// Drop the cached result. Returns true if there was one, the signal
    /// that dependents still need their own invalidation pass.
    pub fn invalidate(&self) -> bool {
        self.cache.borrow_mut().take().is_some()
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!(CellContent::parse("").unwrap(), CellContent::Empty);
    }

    #[test]
    fn test_parse_literal() {
        assert_eq!(
            CellContent::parse("hello").unwrap(),
            CellContent::Literal("hello".to_string())
        );
        // A lone '=' is a literal, not a formula
        assert_eq!(
            CellContent::parse("=").unwrap(),
            CellContent::Literal("=".to_string())
        );
        // Escaped text keeps its raw form in content
        assert_eq!(
            CellContent::parse("'=1+2").unwrap(),
            CellContent::Literal("'=1+2".to_string())
        );
    }

    #[test]
    fn test_parse_formula() {
        let content = CellContent::parse("=1+2").unwrap();
        assert_eq!(content.text(), "=1+2");
        assert!(matches!(content, CellContent::Formula(_)));
    }

    #[test]
    fn test_parse_formula_error() {
        assert!(CellContent::parse("=1+").is_err());
        assert!(CellContent::parse("=)").is_err());
    }

    #[test]
    fn test_formula_text_is_canonical() {
        let content = CellContent::parse("=((A1))+((2))").unwrap();
        assert_eq!(content.text(), "=A1+2");
    }

    #[test]
    fn test_referenced_cells_deduped_ordered() {
        let content = CellContent::parse("=B2+A1+B2").unwrap();
        assert_eq!(
            content.referenced_cells(),
            vec![Position::new(1, 1), Position::new(0, 0)]
        );
        assert!(CellContent::parse("plain").unwrap().referenced_cells().is_empty());
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("'123"), "123");
        assert_eq!(unescape("123"), "123");
        assert_eq!(unescape("''x"), "'x");
        assert_eq!(unescape("'"), "");
    }

    #[test]
    fn test_cache_lifecycle() {
        let cell = Cell::new(CellContent::parse("=1+1").unwrap());
        assert_eq!(cell.cached(), None);
        assert!(!cell.invalidate());

        cell.store_cache(Computed::Number(2.0));
        assert_eq!(cell.cached(), Some(Computed::Number(2.0)));

        assert!(cell.invalidate());
        assert_eq!(cell.cached(), None);
        assert!(!cell.invalidate());
    }

    #[test]
    fn test_replace_content_drops_cache() {
        let mut cell = Cell::new(CellContent::parse("=1+1").unwrap());
        cell.store_cache(Computed::Number(2.0));
        cell.replace_content(CellContent::parse("=2+2").unwrap());
        assert_eq!(cell.cached(), None);
    }

    #[test]
    fn test_value_rendering() {
        assert_eq!(CellValue::Number(124.0).to_text(), "124");
        assert_eq!(CellValue::Number(3.5).to_text(), "3.5");
        assert_eq!(CellValue::Number(-2.0).to_text(), "-2");
        assert_eq!(CellValue::Text("hi".to_string()).to_text(), "hi");
        assert_eq!(CellValue::Error(FormulaError::Div0).to_text(), "#ARITHM!");
    }
}
