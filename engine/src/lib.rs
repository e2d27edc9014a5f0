//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the spreadsheet engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod coord;
pub mod dependency_graph;
pub mod formula;
pub mod sheet;

// Re-export commonly used types at the crate root
pub use cell::{Cell, CellContent, CellError, CellValue, ESCAPE_SIGN, FORMULA_SIGN};
pub use coord::{
    a1_to_coord, col_to_index, coord_to_a1, index_to_col, is_valid, parse_a1, parse_col, CellCoord,
    MAX_COLS, MAX_ROWS,
};
pub use dependency_graph::DependencyGraph;
pub use formula::Formula;
pub use sheet::{Sheet, SheetError};

#[cfg(test)]
mod tests {
    use super::*;

    fn at(label: &str) -> CellCoord {
        parse_a1(label).unwrap()
    }

    #[test]
    fn it_evaluates_a_chain_of_cells() {
        let mut sheet = Sheet::new();

        sheet.set_cell(at("A1"), "10").unwrap();
        sheet.set_cell(at("B1"), "20").unwrap();
        sheet.set_cell(at("C1"), "=A1+B1").unwrap();
        sheet.set_cell(at("D1"), "=C1*2").unwrap();

        assert_eq!(sheet.get_value(at("D1")).unwrap(), CellValue::Number(60.0));
    }

    #[test]
    fn integration_test_edit_recompute_workflow() {
        let mut sheet = Sheet::new();

        // A diamond: A1 feeds both B1 and B2, which feed C1.
        sheet.set_cell(at("A1"), "1").unwrap();
        sheet.set_cell(at("B1"), "=A1+1").unwrap();
        sheet.set_cell(at("B2"), "=A1*3").unwrap();
        sheet.set_cell(at("C1"), "=B1+B2").unwrap();

        assert_eq!(sheet.get_value(at("C1")).unwrap(), CellValue::Number(5.0));

        // One edit at the root invalidates the whole diamond.
        sheet.set_cell(at("A1"), "10").unwrap();
        assert_eq!(sheet.get_value(at("C1")).unwrap(), CellValue::Number(41.0));
    }

    #[test]
    fn integration_test_cycle_prevention() {
        let mut sheet = Sheet::new();

        sheet.set_cell(at("A1"), "=B1").unwrap();
        sheet.set_cell(at("B1"), "=C1").unwrap();

        // Closing the loop anywhere along the chain must fail.
        assert!(matches!(
            sheet.set_cell(at("C1"), "=A1"),
            Err(SheetError::CircularDependency(_))
        ));
        assert!(matches!(
            sheet.set_cell(at("B1"), "=B1"),
            Err(SheetError::CircularDependency(_))
        ));

        // The failed edits left everything readable.
        assert_eq!(sheet.get_value(at("A1")).unwrap(), CellValue::Number(0.0));
    }

    #[test]
    fn integration_test_text_and_formula_interplay() {
        let mut sheet = Sheet::new();

        sheet.set_cell(at("A1"), "  3.5  ").unwrap();
        sheet.set_cell(at("B1"), "=A1*2").unwrap();
        assert_eq!(sheet.get_value(at("B1")).unwrap(), CellValue::Number(7.0));

        // Escaped text stops coercing without changing its display value.
        sheet.set_cell(at("A1"), "'3.5").unwrap();
        assert_eq!(
            sheet.get_value(at("A1")).unwrap(),
            CellValue::Text("3.5".to_string())
        );
        assert_eq!(
            sheet.get_value(at("B1")).unwrap(),
            CellValue::Error(CellError::Value)
        );
    }

    #[test]
    fn integration_test_printing_round_trip() {
        let mut sheet = Sheet::new();
        sheet.set_cell(at("A1"), "=1/0").unwrap();
        sheet.set_cell(at("B1"), "'=escaped").unwrap();
        sheet.set_cell(at("A2"), "=2+2").unwrap();

        let mut values = Vec::new();
        sheet.print_values(&mut values).unwrap();
        assert_eq!(
            String::from_utf8(values).unwrap(),
            "#ARITHM!\t=escaped\n4\t\n"
        );

        let mut texts = Vec::new();
        sheet.print_texts(&mut texts).unwrap();
        assert_eq!(String::from_utf8(texts).unwrap(), "=1/0\t'=escaped\n=2+2\t\n");
    }

    #[test]
    fn integration_test_canonical_text_survives_reset() {
        let mut sheet = Sheet::new();
        sheet.set_cell(at("A1"), "=((B2) + (C3)) * 2").unwrap();

        let text = sheet.get_text(at("A1")).unwrap();
        assert_eq!(text, "=(B2+C3)*2");

        // Feeding a cell its own text back is a no-op for the whole graph.
        sheet.set_cell(at("A1"), &text).unwrap();
        assert_eq!(sheet.get_text(at("A1")).unwrap(), text);
        assert_eq!(sheet.get_value(at("A1")).unwrap(), CellValue::Number(0.0));
    }
}
