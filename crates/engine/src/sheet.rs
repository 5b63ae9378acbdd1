//! Sparse grid of cells with dependency tracking and lazy evaluation.
//!
//! The sheet is the sole owner of cells (a jagged row-major grid of
//! optional slots) and of the dependency graph between them. Every edit
//! runs the same pipeline: parse the candidate content, probe for cycles,
//! and only then swap content, rewire edges, and cascade cache
//! invalidation. A rejected edit leaves no trace, and no reader ever
//! observes an asymmetric or cyclic graph.

use std::io::{self, Write};

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::cell::{self, Cell, CellContent, CellValue, Computed};
use crate::dep_graph::DepGraph;
use crate::error::{FormulaError, SheetError};
use crate::formula::eval::{self, CellLookup};
use crate::position::{Position, Size};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Sheet {
    /// Row-major jagged storage. Growth is monotonic on write; cleared
    /// slots stay allocated (printable size is computed from content, not
    /// capacity).
    rows: Vec<Vec<Option<Cell>>>,
    /// Reference edges, rebuilt via `rebuild_edges` after deserialization.
    #[serde(skip)]
    graph: DepGraph,
    /// Counts actual AST executions, to pin down memoization behavior.
    #[cfg(test)]
    #[serde(skip)]
    eval_count: std::cell::Cell<u32>,
}

impl Sheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install new content at `pos`.
    ///
    /// Parsing and the cycle probe run before any mutation; on failure the
    /// sheet is untouched. On success the edit materializes referenced
    /// absent positions as empty placeholders, rewires the graph, and
    /// invalidates every transitive dependent's cache.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), SheetError> {
        self.check_position(pos)?;
        let content = CellContent::parse(text).map_err(SheetError::Formula)?;
        let new_refs = content.referenced_cells();
        if let Some(cycle) = self.graph.would_create_cycle(pos, &new_refs) {
            return Err(SheetError::CircularDependency(cycle));
        }

        let old_refs: Vec<Position> = self.graph.references(pos).collect();

        self.grow_to(pos);
        let slot = &mut self.rows[pos.row][pos.col];
        match slot.as_mut() {
            Some(cell) => cell.replace_content(content),
            None => *slot = Some(Cell::new(content)),
        }

        for &target in &new_refs {
            self.grow_to(target);
            let slot = &mut self.rows[target.row][target.col];
            if slot.is_none() {
                *slot = Some(Cell::empty());
            }
        }

        self.graph.rewire(pos, new_refs.into_iter().collect());
        self.invalidate_from(pos);
        self.sweep_orphans(pos, &old_refs);
        Ok(())
    }

    /// Read handle to the cell at `pos`, if one exists.
    pub fn cell(&self, pos: Position) -> Result<Option<&Cell>, SheetError> {
        self.check_position(pos)?;
        Ok(self.slot(pos))
    }

    /// Write handle to the cell at `pos`, if one exists. Content edits
    /// belong in `set_cell`; this is for inspection and cache poking.
    pub fn cell_mut(&mut self, pos: Position) -> Result<Option<&mut Cell>, SheetError> {
        self.check_position(pos)?;
        Ok(self
            .rows
            .get_mut(pos.row)
            .and_then(|row| row.get_mut(pos.col))
            .and_then(|slot| slot.as_mut()))
    }

    /// Reset the cell to empty. The slot is freed entirely when nothing
    /// references it; otherwise an empty placeholder stays behind and
    /// referencing formulas read it as 0.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), SheetError> {
        self.check_position(pos)?;
        if self.slot(pos).is_none() {
            return Ok(());
        }

        let old_refs: Vec<Position> = self.graph.references(pos).collect();
        if let Some(cell) = self.rows[pos.row][pos.col].as_mut() {
            cell.replace_content(CellContent::Empty);
        }
        self.graph.sever(pos);
        self.invalidate_from(pos);
        self.sweep_orphans(pos, &old_refs);

        if !self.graph.is_referenced(pos) {
            self.rows[pos.row][pos.col] = None;
        }
        Ok(())
    }

    /// The cell's value: empty and absent cells read as empty text,
    /// literals as their unescaped text, formulas as their memoized or
    /// freshly computed result.
    pub fn value(&self, pos: Position) -> Result<CellValue, SheetError> {
        self.check_position(pos)?;
        Ok(match self.slot(pos) {
            Some(cell) => self.cell_value(cell),
            None => CellValue::Text(String::new()),
        })
    }

    /// The cell's raw text: what an editor would show.
    pub fn text(&self, pos: Position) -> Result<String, SheetError> {
        self.check_position(pos)?;
        Ok(self.slot(pos).map(Cell::text).unwrap_or_default())
    }

    /// True if some formula references this position.
    pub fn is_referenced(&self, pos: Position) -> bool {
        self.graph.is_referenced(pos)
    }

    /// Read-only view of the reference graph.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Smallest (rows, cols) rectangle containing every existing cell,
    /// anchored at A1. Empty placeholders count; freed slots don't.
    pub fn printable_size(&self) -> Size {
        let mut size = Size::default();
        for (row, columns) in self.rows.iter().enumerate() {
            for (col, slot) in columns.iter().enumerate() {
                if slot.is_some() {
                    size.rows = size.rows.max(row + 1);
                    size.cols = size.cols.max(col + 1);
                }
            }
        }
        size
    }

    /// Render cell values over the printable rectangle: tab-separated
    /// columns, newline-terminated rows, absent cells empty.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |sheet, cell| sheet.cell_value(cell).to_text())
    }

    /// Render raw cell texts over the printable rectangle.
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_with(out, |_, cell| cell.text())
    }

    fn print_with<W, F>(&self, out: &mut W, render: F) -> io::Result<()>
    where
        W: Write,
        F: Fn(&Self, &Cell) -> String,
    {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.slot(Position::new(row, col)) {
                    out.write_all(render(self, cell).as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    /// Reconstruct the dependency graph from cell contents. Deserialized
    /// sheets arrive with an empty graph; call this before editing.
    pub fn rebuild_edges(&mut self) {
        let mut wiring: Vec<(Position, FxHashSet<Position>)> = Vec::new();
        for (row, columns) in self.rows.iter().enumerate() {
            for (col, slot) in columns.iter().enumerate() {
                if let Some(cell) = slot {
                    let refs = cell.referenced_cells();
                    if !refs.is_empty() {
                        wiring.push((Position::new(row, col), refs.into_iter().collect()));
                    }
                }
            }
        }
        self.graph = DepGraph::new();
        for (pos, refs) in wiring {
            self.graph.rewire(pos, refs);
        }
    }

    #[cfg(test)]
    pub fn eval_count(&self) -> u32 {
        self.eval_count.get()
    }

    #[cfg(test)]
    pub fn reset_eval_count(&self) {
        self.eval_count.set(0);
    }

    fn check_position(&self, pos: Position) -> Result<(), SheetError> {
        if pos.is_valid() {
            Ok(())
        } else {
            Err(SheetError::InvalidPosition(pos))
        }
    }

    fn slot(&self, pos: Position) -> Option<&Cell> {
        self.rows.get(pos.row)?.get(pos.col)?.as_ref()
    }

    fn grow_to(&mut self, pos: Position) {
        if self.rows.len() <= pos.row {
            self.rows.resize_with(pos.row + 1, Vec::new);
        }
        let row = &mut self.rows[pos.row];
        if row.len() <= pos.col {
            row.resize_with(pos.col + 1, || None);
        }
    }

    /// Compute (or recall) a cell's value. Formula results are memoized;
    /// the cascade in `invalidate_from` is what keeps them honest.
    fn cell_value(&self, cell: &Cell) -> CellValue {
        match cell.content() {
            CellContent::Empty => CellValue::Text(String::new()),
            CellContent::Literal(text) => CellValue::Text(cell::unescape(text).to_string()),
            CellContent::Formula(formula) => {
                if let Some(computed) = cell.cached() {
                    return computed.into();
                }
                #[cfg(test)]
                self.eval_count.set(self.eval_count.get() + 1);
                let computed = match eval::evaluate(formula.ast(), self) {
                    Ok(number) => Computed::Number(number),
                    Err(error) => Computed::Error(error),
                };
                cell.store_cache(computed);
                computed.into()
            }
        }
    }

    /// Clear the edited cell's cache unconditionally (its content changed),
    /// then walk incoming edges. A dependent whose cache was still live is
    /// cleared and recursed into; an already-empty cache stops the walk,
    /// because its dependents can only hold a value computed through it.
    fn invalidate_from(&self, pos: Position) {
        if let Some(cell) = self.slot(pos) {
            cell.invalidate();
        }
        let mut stack: Vec<Position> = self.graph.dependents(pos).collect();
        while let Some(current) = stack.pop() {
            let Some(cell) = self.slot(current) else {
                continue;
            };
            if cell.invalidate() {
                stack.extend(self.graph.dependents(current));
            }
        }
    }

    /// Free empty placeholders orphaned by an edge rewrite: former
    /// reference targets that no formula points at anymore. Keeps the
    /// lifetime rule (a cell exists iff non-empty or referenced) true
    /// after every edit, not just after `clear_cell`.
    fn sweep_orphans(&mut self, edited: Position, old_refs: &[Position]) {
        for &target in old_refs {
            if target == edited || self.graph.is_referenced(target) {
                continue;
            }
            let keep = self.slot(target).map_or(true, |cell| !cell.is_empty());
            if !keep {
                self.rows[target.row][target.col] = None;
            }
        }
    }
}

impl CellLookup for Sheet {
    /// Reference coercion, per referenced position: invalid is `#REF!`,
    /// absent reads 0, numbers pass through, text must parse as a whole
    /// (empty text reads 0), and error values re-raise as themselves.
    fn number(&self, pos: Position) -> Result<f64, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        let Some(cell) = self.slot(pos) else {
            return Ok(0.0);
        };
        match self.cell_value(cell) {
            CellValue::Number(n) => Ok(n),
            CellValue::Text(text) => {
                if text.is_empty() {
                    Ok(0.0)
                } else {
                    text.parse::<f64>().map_err(|_| FormulaError::Value)
                }
            }
            CellValue::Error(error) => Err(error),
        }
    }
}
