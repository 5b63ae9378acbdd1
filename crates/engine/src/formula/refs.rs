//! Reference extraction from a parsed formula.
//!
//! `collect` reports what the source says, verbatim: every reference in
//! source order, duplicates and out-of-bounds positions included. The
//! dependency graph wants the cleaned-up view, `distinct_valid`.

use rustc_hash::FxHashSet;

use crate::position::Position;

use super::parser::Expr;

/// All cell references in source order, duplicates preserved.
pub fn collect(expr: &Expr) -> Vec<Position> {
    let mut refs = Vec::new();
    walk(expr, &mut refs);
    refs
}

fn walk(expr: &Expr, refs: &mut Vec<Position>) {
    match expr {
        Expr::Number(_) => {}
        Expr::Ref(pos) => refs.push(*pos),
        Expr::Neg(inner) => walk(inner, refs),
        Expr::Binary { left, right, .. } => {
            walk(left, refs);
            walk(right, refs);
        }
    }
}

/// Distinct valid references in first-occurrence order. This is the set
/// the dependency graph is wired from.
pub fn distinct_valid(expr: &Expr) -> Vec<Position> {
    let mut seen = FxHashSet::default();
    collect(expr)
        .into_iter()
        .filter(|pos| pos.is_valid() && seen.insert(*pos))
        .collect()
}
