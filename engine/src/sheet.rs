//! FILENAME: engine/src/sheet.rs
//! PURPOSE: Manages the collection of cells (The Spreadsheet Sheet).
//! CONTEXT: This file defines the `Sheet` struct which owns all cell data
//! and the dependency graph between cells. It uses a sparse storage strategy
//! (HashMap) so massive sheets where most cells are empty stay cheap.
//!
//! EDIT PROTOCOL (set_cell):
//! 1. Validate the position and build the prospective content (parse).
//! 2. Check that the new references would not close a cycle.
//! 3. Rewire the dependency graph and commit the new content.
//! 4. Invalidate the memoized values of all transitive dependents,
//!    cutting off at cells whose memo is already absent.
//! Steps 1 and 2 can fail; the sheet is untouched until step 3.

use log::{debug, trace};
use std::collections::{HashMap, HashSet};
use std::io;

use crate::cell::{Cell, CellContent, CellValue};
use crate::coord::{self, coord_to_a1, CellCoord};
use crate::dependency_graph::DependencyGraph;
use parser::ParseError;

/// Errors raised by sheet operations. Evaluation failures are never raised:
/// they surface as `CellValue::Error` results instead.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetError {
    /// The position lies outside the sheet bounds.
    InvalidPosition(CellCoord),
    /// Accepting the edit would create a reference cycle.
    CircularDependency(CellCoord),
    /// The text after '=' is not a valid expression.
    Parse(ParseError),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::InvalidPosition(coord) => {
                write!(f, "Invalid position: ({}, {})", coord.0, coord.1)
            }
            SheetError::CircularDependency(coord) => {
                write!(f, "Circular dependency at {}", coord_to_a1(*coord))
            }
            SheetError::Parse(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Parse(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ParseError> for SheetError {
    fn from(e: ParseError) -> Self {
        SheetError::Parse(e)
    }
}

/// The Sheet holds the state of the spreadsheet.
/// Cells are stored sparsely; a position absent from the map reads as an
/// empty cell everywhere. Every stored cell carries non-empty text (setting
/// empty text drops the entry), so the stored keys are exactly the cells
/// that make up the printable area.
#[derive(Debug, Default)]
pub struct Sheet {
    /// Sparse storage: keys are (row, col), values are Cell instances.
    /// Row and Col are 0-based indices.
    cells: HashMap<CellCoord, Cell>,

    /// Reference edges between positions, in both directions.
    graph: DependencyGraph,

    /// Tracks the highest row index currently in use.
    max_row: u32,

    /// Tracks the highest column index currently in use.
    max_col: u32,
}

impl Sheet {
    /// Creates a new, empty Sheet.
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
            graph: DependencyGraph::new(),
            max_row: 0,
            max_col: 0,
        }
    }

    /// Sets the cell at `coord` from raw input text.
    ///
    /// Empty text clears the cell, text starting with '=' (length at least 2)
    /// is parsed as a formula, anything else is literal text. On any error
    /// the sheet is left exactly as it was.
    pub fn set_cell(&mut self, coord: CellCoord, text: &str) -> Result<(), SheetError> {
        if !coord::is_valid(coord) {
            return Err(SheetError::InvalidPosition(coord));
        }

        let content = CellContent::from_input(text)?;

        let new_refs: HashSet<CellCoord> = content.referenced_cells().iter().copied().collect();
        if self.graph.would_create_cycle(coord, &new_refs) {
            return Err(SheetError::CircularDependency(coord));
        }

        debug!(
            "set {} to {:?} ({} references)",
            coord_to_a1(coord),
            text,
            new_refs.len()
        );

        self.graph.set_references(coord, new_refs);

        if matches!(content, CellContent::Empty) {
            self.remove_entry(coord);
        } else {
            self.insert_entry(coord, Cell::new(content));
        }

        self.invalidate_from(coord);
        Ok(())
    }

    /// Clears the cell at `coord`. Dependent formulas see the position as
    /// empty afterwards and their memoized values are invalidated; reverse
    /// edges into the position survive.
    pub fn clear_cell(&mut self, coord: CellCoord) -> Result<(), SheetError> {
        self.set_cell(coord, "")
    }

    /// Returns the cell stored at `coord`, or None for a valid but
    /// unpopulated position.
    pub fn get_cell(&self, coord: CellCoord) -> Result<Option<&Cell>, SheetError> {
        if !coord::is_valid(coord) {
            return Err(SheetError::InvalidPosition(coord));
        }
        Ok(self.cells.get(&coord))
    }

    /// Returns the value at `coord`, evaluating (and memoizing) if needed.
    /// Unpopulated positions read as `CellValue::Empty`.
    pub fn get_value(&self, coord: CellCoord) -> Result<CellValue, SheetError> {
        if !coord::is_valid(coord) {
            return Err(SheetError::InvalidPosition(coord));
        }
        Ok(self
            .cells
            .get(&coord)
            .map(|cell| cell.value(self))
            .unwrap_or(CellValue::Empty))
    }

    /// Returns the raw text at `coord`; unpopulated positions read as "".
    pub fn get_text(&self, coord: CellCoord) -> Result<String, SheetError> {
        if !coord::is_valid(coord) {
            return Err(SheetError::InvalidPosition(coord));
        }
        Ok(self
            .cells
            .get(&coord)
            .map(|cell| cell.text())
            .unwrap_or_default())
    }

    /// True if any edge touches the position: some formula reads it, or it
    /// holds a formula reading others.
    pub fn is_referenced(&self, coord: CellCoord) -> bool {
        self.graph.is_referenced(coord)
    }

    /// The smallest (rows, cols) box anchored at (0, 0) containing every
    /// cell with non-empty text; (0, 0) when the sheet is empty.
    pub fn get_printable_size(&self) -> (u32, u32) {
        if self.cells.is_empty() {
            (0, 0)
        } else {
            (self.max_row + 1, self.max_col + 1)
        }
    }

    /// Writes the evaluated values of the printable area: columns separated
    /// by tabs, every row terminated by a line feed. Numbers print in their
    /// default notation, errors as their tag, empty cells as empty fields.
    pub fn print_values(&self, output: &mut impl io::Write) -> io::Result<()> {
        self.print_with(output, |cell, sheet| cell.value(sheet).display_value())
    }

    /// Writes the raw text of the printable area in the same layout.
    pub fn print_texts(&self, output: &mut impl io::Write) -> io::Result<()> {
        self.print_with(output, |cell, _| cell.text())
    }

    fn print_with(
        &self,
        output: &mut impl io::Write,
        render: impl Fn(&Cell, &Sheet) -> String,
    ) -> io::Result<()> {
        let (rows, cols) = self.get_printable_size();
        for row in 0..rows {
            for col in 0..cols {
                if col > 0 {
                    write!(output, "\t")?;
                }
                if let Some(cell) = self.cells.get(&(row, col)) {
                    write!(output, "{}", render(cell, self))?;
                }
            }
            writeln!(output)?;
        }
        Ok(())
    }

    /// Unvalidated lookup for formula evaluation; the evaluator has already
    /// bounds-checked the coordinate.
    pub(crate) fn peek(&self, coord: CellCoord) -> Option<&Cell> {
        self.cells.get(&coord)
    }

    #[cfg(test)]
    pub(crate) fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Drops the memo at `start` and of every transitive dependent.
    /// A dependent whose memo is already absent cannot have memoized
    /// dependents of its own, so traversal stops there.
    fn invalidate_from(&self, start: CellCoord) {
        if let Some(cell) = self.cells.get(&start) {
            cell.clear_cached();
        }

        let mut cleared = 0usize;
        let mut stack = self.readers_of(start);
        while let Some(current) = stack.pop() {
            let Some(cell) = self.cells.get(&current) else {
                continue;
            };
            if cell.clear_cached() {
                cleared += 1;
                stack.extend(self.readers_of(current));
            }
        }

        trace!(
            "invalidated {} dependent cache entries of {}",
            cleared,
            coord_to_a1(start)
        );
    }

    fn readers_of(&self, coord: CellCoord) -> Vec<CellCoord> {
        self.graph
            .readers_of(coord)
            .map(|readers| readers.iter().copied().collect())
            .unwrap_or_default()
    }

    fn insert_entry(&mut self, coord: CellCoord, cell: Cell) {
        if coord.0 > self.max_row {
            self.max_row = coord.0;
        }
        if coord.1 > self.max_col {
            self.max_col = coord.1;
        }
        self.cells.insert(coord, cell);
    }

    /// Removes a stored cell. If it sat on a boundary, the printable
    /// bounds are recalculated by scanning the remaining keys.
    fn remove_entry(&mut self, coord: CellCoord) {
        let was_at_boundary = coord.0 == self.max_row || coord.1 == self.max_col;
        if self.cells.remove(&coord).is_some() && was_at_boundary {
            self.recalculate_bounds();
        }
    }

    fn recalculate_bounds(&mut self) {
        self.max_row = 0;
        self.max_col = 0;

        for &(row, col) in self.cells.keys() {
            if row > self.max_row {
                self.max_row = row;
            }
            if col > self.max_col {
                self.max_col = col;
            }
        }
    }
}
