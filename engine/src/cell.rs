//! FILENAME: engine/src/cell.rs
//! PURPOSE: Defines the fundamental data structures for a single spreadsheet cell.
//! CONTEXT: This file contains the `Cell` struct, its tagged `CellContent`
//! body (empty, text, or formula), and the `CellValue`/`CellError` result
//! types. A cell separates the user's input (raw text) from the calculated
//! result (value), and memoizes the result until the sheet invalidates it.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;

use crate::coord::CellCoord;
use crate::formula::Formula;
use crate::sheet::Sheet;
use parser::ParseError;

/// The character that marks the start of a formula ("=A1+1").
pub const FORMULA_SIGN: char = '=';

/// The character that escapes text so it is never treated as a formula
/// and never coerces to a number ("'123").
pub const ESCAPE_SIGN: char = '\'';

/// Represents the evaluation errors a cell can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    /// A formula references a position outside the sheet bounds.
    Ref,
    /// An operand could not be coerced to a number.
    Value,
    /// Evaluation produced a non-finite result (e.g. division by zero).
    Arithmetic,
}

impl std::fmt::Display for CellError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellError::Ref => write!(f, "#REF!"),
            CellError::Value => write!(f, "#VALUE!"),
            CellError::Arithmetic => write!(f, "#ARITHM!"),
        }
    }
}

/// Represents the calculated result of a cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Error(CellError),
}

impl CellValue {
    /// Returns the display form of the value: numbers in default notation,
    /// text verbatim, errors as their tag, empty as the empty string.
    pub fn display_value(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format!("{}", n),
            CellValue::Text(s) => s.clone(),
            CellValue::Error(e) => e.to_string(),
        }
    }
}

/// The content of a cell as entered by the user, one of three variants.
#[derive(Debug, Clone)]
pub enum CellContent {
    Empty,
    Text(String),
    Formula(Formula),
}

impl CellContent {
    /// Selects the variant from raw input text:
    /// - empty string: Empty
    /// - at least two characters starting with '=': Formula (may fail to parse)
    /// - anything else, including a lone "=": Text
    pub fn from_input(text: &str) -> Result<CellContent, ParseError> {
        if text.is_empty() {
            Ok(CellContent::Empty)
        } else if text.len() >= 2 && text.starts_with(FORMULA_SIGN) {
            let formula = Formula::parse(&text[1..])?;
            Ok(CellContent::Formula(formula))
        } else {
            Ok(CellContent::Text(text.to_string()))
        }
    }

    /// The raw text form: what the user typed, with formulas re-serialized
    /// into their canonical expression.
    pub fn text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Text(s) => s.clone(),
            CellContent::Formula(f) => format!("{}{}", FORMULA_SIGN, f.expression()),
        }
    }

    /// The positions this content reads: empty except for formulas.
    pub fn referenced_cells(&self) -> &[CellCoord] {
        match self {
            CellContent::Formula(f) => f.referenced_cells(),
            _ => &[],
        }
    }

    fn compute(&self, sheet: &Sheet) -> CellValue {
        match self {
            CellContent::Empty => CellValue::Empty,
            CellContent::Text(s) => {
                if let Some(stripped) = s.strip_prefix(ESCAPE_SIGN) {
                    CellValue::Text(stripped.to_string())
                } else {
                    CellValue::Text(s.clone())
                }
            }
            CellContent::Formula(f) => match f.evaluate(sheet) {
                Ok(n) => CellValue::Number(n),
                Err(e) => CellValue::Error(e),
            },
        }
    }
}

/// The atomic unit of the spreadsheet: a content body plus a memoized value.
/// The memo is interior-mutable so that reading a value through a shared
/// sheet reference can populate caches bottom-up during recursive evaluation.
#[derive(Debug)]
pub struct Cell {
    content: CellContent,
    cached: RefCell<Option<CellValue>>,
}

impl Cell {
    pub(crate) fn new(content: CellContent) -> Self {
        Cell {
            content,
            cached: RefCell::new(None),
        }
    }

    /// Returns the cell's value, computing and memoizing it on first access.
    /// Errors are memoized exactly like numbers and text.
    pub fn value(&self, sheet: &Sheet) -> CellValue {
        if let Some(v) = self.cached.borrow().as_ref() {
            return v.clone();
        }

        // The borrow above is released before evaluation so that formulas
        // reading other cells can recurse back through the sheet.
        let v = self.content.compute(sheet);
        *self.cached.borrow_mut() = Some(v.clone());
        v
    }

    /// Returns the raw text form of the cell.
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Returns the valid positions referenced by the content, deduplicated
    /// and sorted ascending by (row, col).
    pub fn referenced_cells(&self) -> &[CellCoord] {
        self.content.referenced_cells()
    }

    /// Drops the memoized value. Returns true if a value was present,
    /// which is what the invalidation cascade uses as its cut-off.
    pub(crate) fn clear_cached(&self) -> bool {
        self.cached.borrow_mut().take().is_some()
    }
}
