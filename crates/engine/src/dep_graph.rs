//! Bidirectional reference graph over cell positions.
//!
//! Edge direction follows the formulas: `A → B` means A's formula
//! references B. Both directions are materialized for O(1) queries:
//!
//! - `outgoing[A]` = positions A's formula references
//! - `incoming[B]` = positions whose formulas reference B
//!
//! # Invariants
//!
//! 1. Symmetry: `B ∈ outgoing[A]` iff `A ∈ incoming[B]`.
//! 2. No empty sets are stored; absent key means no edges.
//! 3. Acyclicity is the caller's contract: every edit probes
//!    `would_create_cycle` before calling `rewire`.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::CycleError;
use crate::position::Position;

#[derive(Debug, Clone, Default)]
pub struct DepGraph {
    outgoing: FxHashMap<Position, FxHashSet<Position>>,
    incoming: FxHashMap<Position, FxHashSet<Position>>,
}

impl DepGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Positions the cell's formula references.
    pub fn references(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.outgoing
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// Positions whose formulas reference this cell.
    pub fn dependents(&self, cell: Position) -> impl Iterator<Item = Position> + '_ {
        self.incoming
            .get(&cell)
            .into_iter()
            .flat_map(|set| set.iter().copied())
    }

    /// True if at least one formula references this cell.
    pub fn is_referenced(&self, cell: Position) -> bool {
        self.incoming.contains_key(&cell)
    }

    /// Replace the cell's outgoing edges atomically, keeping both maps in
    /// step. An empty set removes the cell from the outgoing side entirely.
    pub fn rewire(&mut self, cell: Position, new_refs: FxHashSet<Position>) {
        if let Some(old_refs) = self.outgoing.remove(&cell) {
            for target in old_refs {
                if let Some(back) = self.incoming.get_mut(&target) {
                    back.remove(&cell);
                    if back.is_empty() {
                        self.incoming.remove(&target);
                    }
                }
            }
        }

        if new_refs.is_empty() {
            return;
        }

        for &target in &new_refs {
            self.incoming.entry(target).or_default().insert(cell);
        }
        self.outgoing.insert(cell, new_refs);
    }

    /// Drop all outgoing edges of a cell (content became non-formula).
    pub fn sever(&mut self, cell: Position) {
        self.rewire(cell, FxHashSet::default());
    }

    /// Would pointing `cell` at `new_refs` close a cycle?
    ///
    /// Pure probe, never mutates. A cycle exists exactly when some new
    /// reference target already depends on `cell`, so walk the dependents
    /// of `cell` and look for a member of `new_refs`. The cell's own old
    /// outgoing edges are irrelevant (the edit replaces them), and
    /// positions with no formula have no dependents path, so references to
    /// not-yet-existing cells never trip this.
    pub fn would_create_cycle(
        &self,
        cell: Position,
        new_refs: &[Position],
    ) -> Option<CycleError> {
        if new_refs.contains(&cell) {
            return Some(CycleError::self_reference(cell));
        }

        let targets: FxHashSet<Position> = new_refs.iter().copied().collect();
        let mut visited = FxHashSet::default();
        let mut stack = vec![cell];

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            for dependent in self.dependents(current) {
                if targets.contains(&dependent) {
                    // dependent already reaches `cell`; the new edge
                    // cell → dependent closes the loop
                    return Some(CycleError::cycle(vec![cell, dependent]));
                }
                stack.push(dependent);
            }
        }

        None
    }

    /// Every position that participates in at least one edge.
    pub fn positions(&self) -> FxHashSet<Position> {
        self.outgoing
            .keys()
            .chain(self.incoming.keys())
            .copied()
            .collect()
    }

    /// Panic unless both maps mirror each other and store no empty sets.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        for (cell, refs) in &self.outgoing {
            assert!(!refs.is_empty(), "empty outgoing set stored for {}", cell);
            for target in refs {
                assert!(
                    self.incoming
                        .get(target)
                        .map_or(false, |back| back.contains(cell)),
                    "missing back edge: {} references {} but is not among its dependents",
                    cell,
                    target
                );
            }
        }
        for (cell, back) in &self.incoming {
            assert!(!back.is_empty(), "empty incoming set stored for {}", cell);
            for dependent in back {
                assert!(
                    self.outgoing
                        .get(dependent)
                        .map_or(false, |refs| refs.contains(cell)),
                    "missing forward edge: {} depends on {} but does not reference it",
                    dependent,
                    cell
                );
            }
        }
    }

    /// Panic if the outgoing-edge graph contains a cycle.
    #[cfg(test)]
    pub fn assert_acyclic(&self) {
        // Iterative DFS with an explicit on-path set
        let mut done: FxHashSet<Position> = FxHashSet::default();
        for &root in self.outgoing.keys() {
            if done.contains(&root) {
                continue;
            }
            let mut on_path: FxHashSet<Position> = FxHashSet::default();
            let mut stack: Vec<(Position, Vec<Position>, usize)> = vec![(
                root,
                self.references(root).collect(),
                0,
            )];
            on_path.insert(root);
            while let Some((_, refs, next)) = stack.last_mut() {
                if let Some(&child) = refs.get(*next) {
                    *next += 1;
                    if done.contains(&child) {
                        continue;
                    }
                    assert!(
                        !on_path.contains(&child),
                        "cycle through {} detected",
                        child
                    );
                    on_path.insert(child);
                    let child_refs: Vec<Position> = self.references(child).collect();
                    stack.push((child, child_refs, 0));
                } else {
                    let (cell, _, _) = stack.pop().unwrap();
                    on_path.remove(&cell);
                    done.insert(cell);
                }
            }
        }
    }
}
