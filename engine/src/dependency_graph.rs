//! FILENAME: engine/src/dependency_graph.rs
//! PURPOSE: Tracks which cells read which other cells.
//! CONTEXT: The sheet owns one instance of this graph and rewires it on every
//! successful edit. Edges are keyed by coordinate, never by cell handle, so
//! the graph survives rehashing of the sparse cell map and can carry edges
//! into positions that hold no stored cell at all (a formula may read an
//! unpopulated cell).
//!
//! Forward edges ("reads") point from a formula cell to its inputs; reverse
//! edges ("readers") point the other way. Both directions are updated
//! together, so `a` reads `b` exactly when `b` lists `a` among its readers.

use crate::coord::CellCoord;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// Forward edges: for each position, the positions its formula reads.
    reads: HashMap<CellCoord, HashSet<CellCoord>>,

    /// Reverse edges: for each position, the positions whose formulas read it.
    readers: HashMap<CellCoord, HashSet<CellCoord>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        DependencyGraph::default()
    }

    /// Replaces the outgoing edges of `cell` with `refs`, keeping the
    /// reverse direction in step. Callers run the cycle check first; this
    /// method wires whatever it is handed.
    pub fn set_references(&mut self, cell: CellCoord, refs: HashSet<CellCoord>) {
        self.clear_references(cell);

        for &target in &refs {
            self.readers.entry(target).or_default().insert(cell);
        }
        if !refs.is_empty() {
            self.reads.insert(cell, refs);
        }
    }

    /// Removes all outgoing edges of `cell`. Incoming edges (other cells
    /// reading this position) stay where they are.
    pub fn clear_references(&mut self, cell: CellCoord) {
        let Some(old_refs) = self.reads.remove(&cell) else {
            return;
        };

        for target in old_refs {
            if let Some(readers) = self.readers.get_mut(&target) {
                readers.remove(&cell);
                if readers.is_empty() {
                    self.readers.remove(&target);
                }
            }
        }
    }

    /// The positions `cell` reads directly, if it reads any.
    pub fn references_of(&self, cell: CellCoord) -> Option<&HashSet<CellCoord>> {
        self.reads.get(&cell)
    }

    /// The positions that read `cell` directly, if any do.
    pub fn readers_of(&self, cell: CellCoord) -> Option<&HashSet<CellCoord>> {
        self.readers.get(&cell)
    }

    /// True if any edge touches the position, in either direction.
    pub fn is_referenced(&self, cell: CellCoord) -> bool {
        self.reads.contains_key(&cell) || self.readers.contains_key(&cell)
    }

    /// Would giving `cell` the outgoing edges `new_refs` close a loop?
    ///
    /// Depth-first search seeded with every prospective reference, following
    /// the current forward edges: encountering `cell` on any path means the
    /// edit must be rejected. A direct self-reference falls out of the same
    /// walk. Nothing is mutated, and the visited set bounds the work to the
    /// reachable subgraph.
    pub fn would_create_cycle(&self, cell: CellCoord, new_refs: &HashSet<CellCoord>) -> bool {
        let mut visited: HashSet<CellCoord> = HashSet::new();
        let mut pending: Vec<CellCoord> = new_refs.iter().copied().collect();

        while let Some(position) = pending.pop() {
            if position == cell {
                return true;
            }
            if visited.insert(position) {
                if let Some(refs) = self.reads.get(&position) {
                    pending.extend(refs.iter().copied());
                }
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::parse_a1;
    use crate::formula::Formula;

    fn at(label: &str) -> CellCoord {
        parse_a1(label).unwrap()
    }

    /// Builds a reference set the same way the sheet does: from a parsed
    /// formula's referenced cells.
    fn refs_of(expression: &str) -> HashSet<CellCoord> {
        Formula::parse(expression)
            .unwrap()
            .referenced_cells()
            .iter()
            .copied()
            .collect()
    }

    #[test]
    fn wiring_records_both_directions() {
        let mut graph = DependencyGraph::new();

        // C1 = A1 + B1
        graph.set_references(at("C1"), refs_of("A1+B1"));

        let reads = graph.references_of(at("C1")).unwrap();
        assert_eq!(reads.len(), 2);
        assert!(reads.contains(&at("A1")));
        assert!(reads.contains(&at("B1")));

        assert!(graph.readers_of(at("A1")).unwrap().contains(&at("C1")));
        assert!(graph.readers_of(at("B1")).unwrap().contains(&at("C1")));
    }

    #[test]
    fn rewiring_drops_stale_edges() {
        let mut graph = DependencyGraph::new();

        graph.set_references(at("C1"), refs_of("A1+B1"));
        // The cell is edited to read only D5.
        graph.set_references(at("C1"), refs_of("D5*2"));

        assert_eq!(graph.references_of(at("C1")).unwrap().len(), 1);
        assert!(graph.readers_of(at("A1")).is_none());
        assert!(graph.readers_of(at("B1")).is_none());
        assert!(graph.readers_of(at("D5")).unwrap().contains(&at("C1")));
    }

    #[test]
    fn clearing_removes_only_outgoing_edges() {
        let mut graph = DependencyGraph::new();

        graph.set_references(at("B1"), refs_of("A1"));
        graph.set_references(at("C1"), refs_of("B1"));

        graph.clear_references(at("B1"));

        assert!(graph.references_of(at("B1")).is_none());
        assert!(graph.readers_of(at("A1")).is_none());
        // C1 still reads B1.
        assert!(graph.readers_of(at("B1")).unwrap().contains(&at("C1")));
        assert!(graph.references_of(at("C1")).unwrap().contains(&at("B1")));
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let graph = DependencyGraph::new();
        assert!(graph.would_create_cycle(at("A1"), &refs_of("A1*2")));
    }

    #[test]
    fn two_cell_loop_is_detected() {
        let mut graph = DependencyGraph::new();

        graph.set_references(at("B1"), refs_of("A1"));
        assert!(graph.would_create_cycle(at("A1"), &refs_of("B1")));
    }

    #[test]
    fn loop_through_a_chain_is_detected() {
        let mut graph = DependencyGraph::new();

        // A2 reads A1, A3 reads A2, A4 reads A3. Making A1 read A4 would
        // close the loop; an uninvolved cell reading A4 is fine.
        graph.set_references(at("A2"), refs_of("A1"));
        graph.set_references(at("A3"), refs_of("A2"));
        graph.set_references(at("A4"), refs_of("A3"));

        assert!(graph.would_create_cycle(at("A1"), &refs_of("A4+1")));
        assert!(!graph.would_create_cycle(at("A5"), &refs_of("A4+1")));
    }

    #[test]
    fn diamond_sharing_is_not_a_cycle() {
        let mut graph = DependencyGraph::new();

        // B1 and B2 both read A1; a cell reading both closes no loop.
        graph.set_references(at("B1"), refs_of("A1+1"));
        graph.set_references(at("B2"), refs_of("A1*2"));

        assert!(!graph.would_create_cycle(at("C1"), &refs_of("B1+B2")));
    }

    #[test]
    fn cycle_check_leaves_the_graph_alone() {
        let mut graph = DependencyGraph::new();
        graph.set_references(at("B1"), refs_of("A1"));

        assert!(graph.would_create_cycle(at("A1"), &refs_of("B1")));

        // The rejected edges were never wired.
        assert!(graph.references_of(at("A1")).is_none());
        assert_eq!(graph.references_of(at("B1")).unwrap().len(), 1);
        assert!(graph.readers_of(at("A1")).unwrap().contains(&at("B1")));
    }

    #[test]
    fn is_referenced_sees_both_directions() {
        let mut graph = DependencyGraph::new();

        graph.set_references(at("B1"), refs_of("A1"));

        assert!(graph.is_referenced(at("A1")));
        assert!(graph.is_referenced(at("B1")));
        assert!(!graph.is_referenced(at("C1")));

        graph.clear_references(at("B1"));
        assert!(!graph.is_referenced(at("A1")));
        assert!(!graph.is_referenced(at("B1")));
    }
}
