//! FILENAME: engine/src/formula.rs
//! PURPOSE: Wraps a parsed formula expression for use by cells.
//! CONTEXT: This module hides the parser behind the three capabilities the
//! engine consumes: evaluation against a sheet, canonical re-serialization,
//! and the list of referenced positions. Evaluation coerces neighbouring
//! cell values to numbers and propagates `CellError`s unchanged; the
//! leftmost error in evaluation order wins.

use log::trace;

use crate::cell::{CellError, CellValue, ESCAPE_SIGN};
use crate::coord::{self, CellCoord};
use crate::sheet::Sheet;
use parser::{BinaryOperator, Expression, ParseError, UnaryOperator};

/// A parsed formula: the expression tree plus the precomputed list of
/// in-bounds positions it references.
#[derive(Debug, Clone)]
pub struct Formula {
    expr: Expression,
    references: Vec<CellCoord>,
}

impl Formula {
    /// Parses the expression text after the '=' sign.
    /// References outside the sheet bounds parse fine; they evaluate to
    /// `#REF!` and are omitted from `referenced_cells`.
    pub fn parse(expression: &str) -> Result<Formula, ParseError> {
        let expr = parser::parse(expression)?;

        let mut references = Vec::new();
        collect_references(&expr, &mut references);
        references.sort();
        references.dedup();

        Ok(Formula { expr, references })
    }

    /// The canonical expression text (without the leading '=').
    pub fn expression(&self) -> String {
        self.expr.to_formula_string()
    }

    /// The valid positions the formula reads, deduplicated and sorted
    /// ascending by (row, col).
    pub fn referenced_cells(&self) -> &[CellCoord] {
        &self.references
    }

    /// Evaluates the formula against the sheet. Referenced cells are read
    /// through the sheet and may recursively evaluate their own formulas.
    pub fn evaluate(&self, sheet: &Sheet) -> Result<f64, CellError> {
        trace!("evaluating formula: {}", self.expr);

        let result = eval_expr(&self.expr, sheet)?;
        if result.is_finite() {
            Ok(result)
        } else {
            Err(CellError::Arithmetic)
        }
    }
}

fn collect_references(expr: &Expression, out: &mut Vec<CellCoord>) {
    match expr {
        Expression::Literal(_) => {}
        Expression::CellRef { col, row } => {
            if let Some(coord) = resolve_ref(col, *row) {
                out.push(coord);
            }
        }
        Expression::UnaryOp { operand, .. } => collect_references(operand, out),
        Expression::BinaryOp { left, right, .. } => {
            collect_references(left, out);
            collect_references(right, out);
        }
    }
}

/// Resolves a reference's column string and 1-based row number into an
/// in-bounds coordinate. None means the reference is out of range.
fn resolve_ref(col: &str, row: u32) -> Option<CellCoord> {
    let col = coord::parse_col(col)?;
    if row == 0 {
        return None;
    }
    let coord = (row - 1, col);
    coord::is_valid(coord).then_some(coord)
}

fn eval_expr(expr: &Expression, sheet: &Sheet) -> Result<f64, CellError> {
    match expr {
        Expression::Literal(n) => Ok(*n),

        Expression::CellRef { col, row } => cell_input(sheet, col, *row),

        Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand,
        } => Ok(-eval_expr(operand, sheet)?),

        Expression::BinaryOp { left, op, right } => {
            let lhs = eval_expr(left, sheet)?;
            let rhs = eval_expr(right, sheet)?;

            let result = match op {
                BinaryOperator::Add => lhs + rhs,
                BinaryOperator::Subtract => lhs - rhs,
                BinaryOperator::Multiply => lhs * rhs,
                BinaryOperator::Divide => lhs / rhs,
            };

            if result.is_finite() {
                Ok(result)
            } else {
                Err(CellError::Arithmetic)
            }
        }
    }
}

/// Computes the numeric input for one referenced position:
/// - out-of-range reference: `#REF!`
/// - absent or empty cell: 0.0
/// - numeric value: the number itself
/// - text value: the full string parsed as f64 (surrounding whitespace
///   ignored), except escaped text which is never coercible: `#VALUE!`
/// - an error value propagates unchanged
fn cell_input(sheet: &Sheet, col: &str, row: u32) -> Result<f64, CellError> {
    let coord = resolve_ref(col, row).ok_or(CellError::Ref)?;

    let Some(cell) = sheet.peek(coord) else {
        return Ok(0.0);
    };

    match cell.value(sheet) {
        CellValue::Empty => Ok(0.0),
        CellValue::Number(n) => Ok(n),
        CellValue::Text(_) => {
            let text = cell.text();
            if text.starts_with(ESCAPE_SIGN) {
                return Err(CellError::Value);
            }
            text.trim().parse::<f64>().map_err(|_| CellError::Value)
        }
        CellValue::Error(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Sheet;

    #[test]
    fn references_are_sorted_and_deduplicated() {
        let formula = Formula::parse("B2+A1+B2+A10").unwrap();
        assert_eq!(
            formula.referenced_cells(),
            &[(0, 0), (1, 1), (9, 0)],
            "sorted by (row, col), duplicates removed"
        );
    }

    #[test]
    fn out_of_range_references_are_omitted() {
        // ZZZZ1 is syntactically a reference but far outside the bounds.
        let formula = Formula::parse("A1+ZZZZ1").unwrap();
        assert_eq!(formula.referenced_cells(), &[(0, 0)]);
    }

    #[test]
    fn expression_is_canonical() {
        let formula = Formula::parse(" 1 + 2 * A1 ").unwrap();
        assert_eq!(formula.expression(), "1+2*A1");
    }

    #[test]
    fn literal_arithmetic_evaluates() {
        let sheet = Sheet::new();
        let formula = Formula::parse("2*(3+4)").unwrap();
        assert_eq!(formula.evaluate(&sheet), Ok(14.0));
    }

    #[test]
    fn absent_cells_read_as_zero() {
        let sheet = Sheet::new();
        let formula = Formula::parse("A1+5").unwrap();
        assert_eq!(formula.evaluate(&sheet), Ok(5.0));
    }

    #[test]
    fn division_by_zero_is_arithmetic_error() {
        let sheet = Sheet::new();
        let formula = Formula::parse("1/0").unwrap();
        assert_eq!(formula.evaluate(&sheet), Err(CellError::Arithmetic));
    }

    #[test]
    fn out_of_range_reference_evaluates_to_ref_error() {
        let sheet = Sheet::new();
        let formula = Formula::parse("ZZZZ1").unwrap();
        assert_eq!(formula.evaluate(&sheet), Err(CellError::Ref));
    }

    #[test]
    fn leftmost_error_wins() {
        let sheet = Sheet::new();
        // ZZZZ1 yields #REF!, 1/0 yields #ARITHM!; the reference is
        // evaluated first.
        let formula = Formula::parse("ZZZZ1+1/0").unwrap();
        assert_eq!(formula.evaluate(&sheet), Err(CellError::Ref));

        let formula = Formula::parse("1/0+ZZZZ1").unwrap();
        assert_eq!(formula.evaluate(&sheet), Err(CellError::Arithmetic));
    }

    #[test]
    fn overflow_is_arithmetic_error() {
        let sheet = Sheet::new();
        let formula = Formula::parse("1e308*10").unwrap();
        assert_eq!(formula.evaluate(&sheet), Err(CellError::Arithmetic));
    }
}
