// Formula evaluator - executes a parsed expression against cell values
// supplied by the owning sheet through the CellLookup seam.

use crate::error::FormulaError;
use crate::position::Position;

use super::parser::{Expr, Op};

/// How the evaluator reads other cells. Implemented by `Sheet`.
pub trait CellLookup {
    /// Numeric value of the cell at `pos`.
    ///
    /// The implementation owns the coercion rules: invalid positions are
    /// `#REF!`, absent cells and empty text are 0, non-numeric text is
    /// `#VALUE!`, and error values re-raise as themselves.
    fn number(&self, pos: Position) -> Result<f64, FormulaError>;
}

/// Execute the expression. The first error aborts evaluation and becomes
/// the formula's result.
pub fn evaluate<L: CellLookup>(expr: &Expr, lookup: &L) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(n) => Ok(*n),
        Expr::Ref(pos) => lookup.number(*pos),
        Expr::Neg(inner) => Ok(-evaluate(inner, lookup)?),
        Expr::Binary { op, left, right } => {
            let lhs = evaluate(left, lookup)?;
            let rhs = evaluate(right, lookup)?;
            match op {
                Op::Add => Ok(lhs + rhs),
                Op::Sub => Ok(lhs - rhs),
                Op::Mul => Ok(lhs * rhs),
                Op::Div => {
                    if rhs == 0.0 {
                        Err(FormulaError::Div0)
                    } else {
                        Ok(lhs / rhs)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::parser::parse;

    /// Fixed-table lookup: (position, result) pairs, 0 for anything else.
    struct Table(Vec<(Position, Result<f64, FormulaError>)>);

    impl CellLookup for Table {
        fn number(&self, pos: Position) -> Result<f64, FormulaError> {
            if !pos.is_valid() {
                return Err(FormulaError::Ref);
            }
            self.0
                .iter()
                .find(|(p, _)| *p == pos)
                .map(|(_, v)| v.clone())
                .unwrap_or(Ok(0.0))
        }
    }

    fn eval(input: &str, table: &Table) -> Result<f64, FormulaError> {
        evaluate(&parse(input).unwrap(), table)
    }

    #[test]
    fn test_arithmetic() {
        let table = Table(vec![]);
        assert_eq!(eval("1+2*3", &table), Ok(7.0));
        assert_eq!(eval("(1+2)*3", &table), Ok(9.0));
        assert_eq!(eval("8-2-3", &table), Ok(3.0));
        assert_eq!(eval("7/2", &table), Ok(3.5));
        assert_eq!(eval("-3+1", &table), Ok(-2.0));
        assert_eq!(eval("--2", &table), Ok(2.0));
    }

    #[test]
    fn test_division_by_zero() {
        let table = Table(vec![]);
        assert_eq!(eval("1/0", &table), Err(FormulaError::Div0));
        assert_eq!(eval("0/0", &table), Err(FormulaError::Div0));
        // The zero divisor can come from a subexpression
        assert_eq!(eval("0*1+1/(2-2)", &table), Err(FormulaError::Div0));
    }

    #[test]
    fn test_references_through_lookup() {
        let a1 = Position::new(0, 0);
        let b1 = Position::new(0, 1);
        let table = Table(vec![(a1, Ok(2.0)), (b1, Ok(5.0))]);
        assert_eq!(eval("A1*B1+1", &table), Ok(11.0));
        // Unlisted cells read as 0
        assert_eq!(eval("C9+1", &table), Ok(1.0));
    }

    #[test]
    fn test_lookup_errors_propagate() {
        let a1 = Position::new(0, 0);
        let table = Table(vec![(a1, Err(FormulaError::Value))]);
        assert_eq!(eval("A1+1", &table), Err(FormulaError::Value));
    }

    #[test]
    fn test_invalid_reference_is_ref_error() {
        let table = Table(vec![]);
        assert_eq!(eval("A99999", &table), Err(FormulaError::Ref));
    }
}
