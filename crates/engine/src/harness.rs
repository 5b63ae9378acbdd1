//! Test-only helpers: terse sheet construction and whole-sheet invariant
//! checks shared across module tests.

use crate::position::Position;
use crate::sheet::Sheet;

/// Parse an A1 label, panicking on malformed test input.
pub fn pos(text: &str) -> Position {
    Position::parse(text).unwrap_or_else(|| panic!("bad test position {:?}", text))
}

/// Build a sheet from (label, text) pairs, expecting every edit to stick.
pub fn sheet_of(entries: &[(&str, &str)]) -> Sheet {
    let mut sheet = Sheet::new();
    for (label, text) in entries {
        sheet
            .set_cell(pos(label), text)
            .unwrap_or_else(|e| panic!("set {} = {:?} failed: {}", label, text, e));
    }
    assert_invariants(&sheet);
    sheet
}

/// Check the graph-level invariants that must hold after every edit:
/// edge symmetry, acyclicity, outgoing edges matching cell contents, and
/// every graph node backed by an existing cell.
pub fn assert_invariants(sheet: &Sheet) {
    let graph = sheet.graph();
    graph.assert_consistent();
    graph.assert_acyclic();

    for node in graph.positions() {
        let cell = sheet
            .cell(node)
            .expect("graph nodes are valid positions")
            .unwrap_or_else(|| panic!("graph node {} has no cell in the grid", node));

        let from_graph: Vec<Position> = {
            let mut refs: Vec<Position> = graph.references(node).collect();
            refs.sort();
            refs
        };
        let from_content: Vec<Position> = {
            let mut refs = cell.referenced_cells();
            refs.sort();
            refs
        };
        assert_eq!(
            from_graph, from_content,
            "graph edges of {} diverge from its content",
            node
        );
    }
}
