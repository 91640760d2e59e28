//! Pure partition planner: capacity limits in, spreadsheet/sheet layout out.

use crate::error::GsheetError;
use crate::spec::{
    SpecGsheetWriteOptions, SpecLayoutDims, SpecLayoutPlan, SpecSheetSlice, SpecSpreadsheetSlot,
};
use crate::util::{calculate_ceil_div, create_slot_identifier};

/// Reject option combinations the planner cannot honor.
pub fn validate_write_options(options: &SpecGsheetWriteOptions) -> Result<(), GsheetError> {
    if options.chunk_size == Some(0) {
        return Err(GsheetError::InvalidInput(
            "chunk_size must be >= 1 or None.".to_string(),
        ));
    }
    if options.max_cells_per_sheet == 0 {
        return Err(GsheetError::InvalidInput(
            "max_cells_per_sheet must be >= 1.".to_string(),
        ));
    }
    if options.max_cells_per_workbook == 0 {
        return Err(GsheetError::InvalidInput(
            "max_cells_per_workbook must be >= 1.".to_string(),
        ));
    }
    if options.max_cells_per_sheet > options.max_cells_per_workbook {
        return Err(GsheetError::InvalidInput(format!(
            "max_cells_per_sheet ({}) must be <= max_cells_per_workbook ({}).",
            options.max_cells_per_sheet, options.max_cells_per_workbook
        )));
    }
    Ok(())
}

/// Derive the five partition sizes for `n_records x n_cols`.
pub fn derive_layout_dims(
    n_records: usize,
    n_cols: usize,
    options: &SpecGsheetWriteOptions,
) -> Result<SpecLayoutDims, GsheetError> {
    validate_write_options(options)?;
    if n_records == 0 {
        return Err(GsheetError::InvalidInput(
            "records must contain at least one record.".to_string(),
        ));
    }
    if n_cols == 0 {
        return Err(GsheetError::InvalidInput(
            "records must have at least one column.".to_string(),
        ));
    }

    let n_cells_total = n_records.checked_mul(n_cols).ok_or_else(|| {
        GsheetError::InvalidInput(format!(
            "Cell count overflow: {n_records} records x {n_cols} columns."
        ))
    })?;

    Ok(SpecLayoutDims {
        n_records,
        n_cols,
        n_cells_total,
        n_spreadsheets_needed: calculate_ceil_div(n_cells_total, options.max_cells_per_workbook),
        n_sheets_needed_total: calculate_ceil_div(n_cells_total, options.max_cells_per_sheet),
        n_sheets_per_spreadsheet: calculate_ceil_div(
            options.max_cells_per_workbook,
            options.max_cells_per_sheet,
        ),
        n_rows_per_sheet: calculate_ceil_div(options.max_cells_per_sheet, n_cols),
    })
}

/// Split `n_records` rows into spreadsheet slots and sheet slices.
///
/// Walks spreadsheet indices `1..=n_spreadsheets_needed` and local sheet
/// indices `1..=n_sheets_per_spreadsheet`; one global sheet counter spans all
/// spreadsheets and gates the total at `n_sheets_needed_total`. Every
/// spreadsheet slot is kept, even one that receives no sheets, and a sheet
/// planned after the records run out holds zero rows (header only).
pub fn plan_layout(
    base_name: &str,
    n_records: usize,
    n_cols: usize,
    options: &SpecGsheetWriteOptions,
) -> Result<SpecLayoutPlan, GsheetError> {
    if base_name.is_empty() {
        return Err(GsheetError::InvalidInput(
            "base_name must not be empty.".to_string(),
        ));
    }
    let dims = derive_layout_dims(n_records, n_cols, options)?;

    let mut n_cursor = 0usize;
    let mut n_sheets_planned = 0usize;
    let mut l_spreadsheets = Vec::new();

    for n_idx_spreadsheet in 1..=dims.n_spreadsheets_needed {
        let mut l_sheets = Vec::new();
        for n_idx_sheet_local in 1..=dims.n_sheets_per_spreadsheet {
            if n_sheets_planned >= dims.n_sheets_needed_total {
                break;
            }

            let n_rows_this_sheet = usize::min(dims.n_rows_per_sheet, dims.n_records - n_cursor);
            l_sheets.push(SpecSheetSlice {
                sheet_name: create_slot_identifier(base_name, n_idx_sheet_local),
                idx_sheet_local: n_idx_sheet_local,
                row_start_inclusive: n_cursor,
                row_end_exclusive: n_cursor + n_rows_this_sheet,
            });

            n_cursor += n_rows_this_sheet;
            n_sheets_planned += 1;
        }

        l_spreadsheets.push(SpecSpreadsheetSlot {
            spreadsheet_name: create_slot_identifier(base_name, n_idx_spreadsheet),
            idx_spreadsheet: n_idx_spreadsheet,
            sheets: l_sheets,
        });
    }

    debug_assert_eq!(n_cursor, dims.n_records, "plan must place every record");

    Ok(SpecLayoutPlan {
        dims,
        spreadsheets: l_spreadsheets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn options_with(max_cells_per_sheet: usize, max_cells_per_workbook: usize) -> SpecGsheetWriteOptions {
        SpecGsheetWriteOptions {
            chunk_size: None,
            max_cells_per_sheet,
            max_cells_per_workbook,
        }
    }

    #[test]
    fn test_derive_layout_dims_small_limits() {
        let dims = derive_layout_dims(10, 2, &options_with(12, 12)).unwrap();

        assert_eq!(dims.n_cells_total, 20);
        assert_eq!(dims.n_sheets_per_spreadsheet, 1);
        assert_eq!(dims.n_rows_per_sheet, 6);
        assert_eq!(dims.n_sheets_needed_total, 2);
        assert_eq!(dims.n_spreadsheets_needed, 2);
    }

    #[test]
    fn test_plan_layout_small_limits() {
        let plan = plan_layout("data", 10, 2, &options_with(12, 12)).unwrap();

        assert_eq!(plan.spreadsheets.len(), 2);
        assert_eq!(plan.spreadsheets[0].spreadsheet_name, "data_1");
        assert_eq!(plan.spreadsheets[1].spreadsheet_name, "data_2");
        assert_eq!(
            plan.spreadsheets[1].sheets,
            vec![SpecSheetSlice {
                sheet_name: "data_1".to_string(),
                idx_sheet_local: 1,
                row_start_inclusive: 6,
                row_end_exclusive: 10,
            }]
        );
        assert_eq!(plan.spreadsheets[0].n_records(), 6);
    }

    #[test]
    fn test_plan_layout_default_limits_single_sheet() {
        let plan = plan_layout("data", 5, 2, &SpecGsheetWriteOptions::default()).unwrap();

        assert_eq!(plan.spreadsheets.len(), 1);
        assert_eq!(plan.n_sheets(), 1);
        assert_eq!(plan.spreadsheets[0].sheets[0].n_rows(), 5);
        assert_eq!(plan.dims.n_rows_per_sheet, 1_250_000);
    }

    #[test]
    fn test_plan_layout_multiple_sheets_per_spreadsheet() {
        // 3 sheets of 4 rows fit per spreadsheet; 26 records need 7 sheets.
        let plan = plan_layout("big", 26, 1, &options_with(4, 12)).unwrap();

        assert_eq!(plan.dims.n_spreadsheets_needed, 3);
        assert_eq!(plan.dims.n_sheets_needed_total, 7);
        let l_counts: Vec<usize> = plan.spreadsheets.iter().map(|s| s.sheets.len()).collect();
        assert_eq!(l_counts, vec![3, 3, 1]);
        let l_names: Vec<&str> = plan.spreadsheets[1]
            .sheets
            .iter()
            .map(|s| s.sheet_name.as_str())
            .collect();
        assert_eq!(l_names, vec!["big_1", "big_2", "big_3"]);
        assert_eq!(plan.spreadsheets[2].sheets[0].row_start_inclusive, 24);
        assert_eq!(plan.spreadsheets[2].sheets[0].n_rows(), 2);
    }

    #[test]
    fn test_plan_layout_keeps_trailing_spreadsheet_without_sheets() {
        // Per-spreadsheet sheet capacity (3 x 4 cells) exceeds the workbook ceiling,
        // so every record lands in the first spreadsheet and slot 2 stays empty.
        let plan = plan_layout("t", 11, 1, &options_with(4, 10)).unwrap();

        assert_eq!(plan.dims.n_spreadsheets_needed, 2);
        assert_eq!(plan.spreadsheets.len(), 2);
        assert_eq!(plan.spreadsheets[0].sheets.len(), 3);
        assert_eq!(plan.spreadsheets[0].n_records(), 11);
        assert_eq!(plan.spreadsheets[1].spreadsheet_name, "t_2");
        assert!(plan.spreadsheets[1].sheets.is_empty());
    }

    #[test]
    fn test_plan_layout_plans_header_only_sheets() {
        // ceil(21 / 10) = 3 sheets by cells, but 4-row sheets cover 7 records in 2.
        let plan = plan_layout("t", 7, 3, &options_with(10, 100)).unwrap();

        assert_eq!(plan.dims.n_sheets_needed_total, 3);
        assert_eq!(plan.n_sheets(), 3);
        let l_rows: Vec<usize> = plan.spreadsheets[0].sheets.iter().map(|s| s.n_rows()).collect();
        assert_eq!(l_rows, vec![4, 3, 0]);
        assert_eq!(
            plan.spreadsheets[0].sheets[2],
            SpecSheetSlice {
                sheet_name: "t_3".to_string(),
                idx_sheet_local: 3,
                row_start_inclusive: 7,
                row_end_exclusive: 7,
            }
        );
    }

    #[test]
    fn test_plan_layout_rejects_invalid_options() {
        assert!(matches!(
            plan_layout("t", 1, 1, &options_with(20, 10)),
            Err(GsheetError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_layout("t", 1, 1, &options_with(0, 10)),
            Err(GsheetError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_layout("", 1, 1, &SpecGsheetWriteOptions::default()),
            Err(GsheetError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_layout("t", 0, 1, &SpecGsheetWriteOptions::default()),
            Err(GsheetError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_layout("t", 1, 0, &SpecGsheetWriteOptions::default()),
            Err(GsheetError::InvalidInput(_))
        ));
        assert!(matches!(
            plan_layout("t", usize::MAX, 2, &SpecGsheetWriteOptions::default()),
            Err(GsheetError::InvalidInput(_))
        ));

        let options_chunk = SpecGsheetWriteOptions {
            chunk_size: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            plan_layout("t", 1, 1, &options_chunk),
            Err(GsheetError::InvalidInput(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_plan_layout_places_every_record_once(
            n_records in 1usize..400,
            n_cols in 1usize..8,
            n_max_cells_per_sheet in 1usize..60,
            n_factor_workbook in 1usize..6,
            n_extra_workbook in 0usize..30,
        ) {
            let n_max_cells_per_workbook = n_max_cells_per_sheet * n_factor_workbook + n_extra_workbook;
            let options = options_with(n_max_cells_per_sheet, n_max_cells_per_workbook);
            let plan = plan_layout("p", n_records, n_cols, &options).unwrap();

            let mut n_cursor = 0usize;
            for (n_idx, slot) in plan.spreadsheets.iter().enumerate() {
                prop_assert_eq!(slot.idx_spreadsheet, n_idx + 1);
                prop_assert!(slot.sheets.len() <= plan.dims.n_sheets_per_spreadsheet);
                for (n_idx_sheet, sheet) in slot.sheets.iter().enumerate() {
                    prop_assert_eq!(sheet.idx_sheet_local, n_idx_sheet + 1);
                    prop_assert_eq!(sheet.row_start_inclusive, n_cursor);
                    prop_assert!(sheet.n_rows() <= plan.dims.n_rows_per_sheet);
                    n_cursor = sheet.row_end_exclusive;
                }
            }
            prop_assert_eq!(n_cursor, n_records);
            prop_assert_eq!(
                plan.n_sheets(),
                usize::min(
                    plan.dims.n_sheets_needed_total,
                    plan.dims.n_spreadsheets_needed * plan.dims.n_sheets_per_spreadsheet
                )
            );
            prop_assert_eq!(plan.spreadsheets.len(), plan.dims.n_spreadsheets_needed);
        }
    }
}
