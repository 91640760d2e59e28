//! Stateless helper utilities used by the planner and the writer kernel.

use std::collections::{BTreeMap, BTreeSet};

use crate::conf::{C_SLOT_SEPARATOR, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};
use crate::error::GsheetError;
use crate::spec::{EnumCellValue, SpecRecord, SpecRecordTable};

////////////////////////////////////////////////////////////////////////////////
// #region CellValueConversion

/// Convert one field to its display text; `None` is the explicit null marker.
///
/// NaN counts as missing. Whole floats keep one decimal (`2.0`), booleans
/// render as `True`/`False`.
pub fn derive_display_value(value: &EnumCellValue) -> Option<String> {
    match value {
        EnumCellValue::None => None,
        EnumCellValue::String(val) => Some(val.clone()),
        EnumCellValue::Integer(val) => Some(val.to_string()),
        EnumCellValue::Boolean(val) => Some(if *val { "True" } else { "False" }.to_string()),
        EnumCellValue::Float(val) => {
            if val.is_nan() {
                None
            } else if val.is_infinite() {
                Some(if val.is_sign_positive() { "inf" } else { "-inf" }.to_string())
            } else if val.fract() == 0.0 && val.abs() < 1e16 {
                Some(format!("{val:.1}"))
            } else {
                Some(val.to_string())
            }
        }
    }
}

/// Convert a row of fields to display values.
pub fn derive_display_row(row: &[EnumCellValue]) -> Vec<Option<String>> {
    row.iter().map(derive_display_value).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RecordValidation

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), GsheetError> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(GsheetError::InvalidInput(format!(
        "Duplicate column names detected: {c_msg}"
    )))
}

/// Align records to the key order of the first record.
///
/// Every record must carry exactly the same key set as the first one.
pub fn derive_record_table(records: &[SpecRecord]) -> Result<SpecRecordTable, GsheetError> {
    let Some(record_first) = records.first() else {
        return Err(GsheetError::InvalidInput(
            "records must contain at least one record.".to_string(),
        ));
    };

    let l_columns: Vec<String> = record_first.keys().map(ToString::to_string).collect();
    if l_columns.is_empty() {
        return Err(GsheetError::InvalidInput(
            "records must have at least one column.".to_string(),
        ));
    }

    let mut l_rows = Vec::with_capacity(records.len());
    for (n_idx_record, record) in records.iter().enumerate() {
        if record.len() != l_columns.len() {
            return Err(GsheetError::InvalidInput(format!(
                "Record {n_idx_record} has {} columns; expected {} ({:?}).",
                record.len(),
                l_columns.len(),
                l_columns
            )));
        }

        let mut l_row = Vec::with_capacity(l_columns.len());
        for c_col in &l_columns {
            let Some(value) = record.get(c_col) else {
                return Err(GsheetError::InvalidInput(format!(
                    "Record {n_idx_record} is missing column {c_col:?}."
                )));
            };
            l_row.push(value.clone());
        }
        l_rows.push(l_row);
    }

    Ok(SpecRecordTable {
        columns: l_columns,
        rows: l_rows,
    })
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region RowChunking

/// Chunker output: either the untouched input or its contiguous chunks.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumChunkedList<'a, T> {
    /// Chunking disabled; the input is the sole write unit.
    Unchunked(&'a [T]),
    /// Contiguous chunks covering the input in order.
    Chunked(Vec<&'a [T]>),
}

impl<'a, T> EnumChunkedList<'a, T> {
    /// Write units in order, whichever shape was produced.
    pub fn units(&self) -> Vec<&'a [T]> {
        match self {
            Self::Unchunked(items) => vec![*items],
            Self::Chunked(chunks) => chunks.clone(),
        }
    }
}

/// Split `items` into contiguous chunks of at most `chunk_size` items.
///
/// `None` disables chunking. Input no longer than `chunk_size` is one chunk.
/// `chunk_size == Some(0)` is rejected earlier by option validation.
pub fn chunk_list<T>(items: &[T], chunk_size: Option<usize>) -> EnumChunkedList<'_, T> {
    let Some(n_chunk_size) = chunk_size else {
        return EnumChunkedList::Unchunked(items);
    };
    debug_assert!(n_chunk_size > 0, "chunk_size must be >= 1");

    if items.len() <= n_chunk_size {
        return EnumChunkedList::Chunked(vec![items]);
    }
    EnumChunkedList::Chunked(items.chunks(n_chunk_size).collect())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SlotNaming

/// Create suffixed slot name (`base_1`, `base_2`, ...).
pub fn create_slot_identifier(base_name: &str, idx_1based: usize) -> String {
    format!("{base_name}{C_SLOT_SEPARATOR}{idx_1based}")
}

/// `ceil(numerator / denominator)` for positive denominators.
pub fn calculate_ceil_div(numerator: usize, denominator: usize) -> usize {
    numerator.div_ceil(denominator)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region CellAddress

/// Convert zero-based column index to letters (`0 -> A`, `26 -> AA`).
pub fn derive_column_letters(col_idx: usize) -> String {
    let mut l_chars = Vec::new();
    let mut n_rest = col_idx + 1;
    while n_rest > 0 {
        let n_rem = (n_rest - 1) % 26;
        l_chars.push((b'A' + n_rem as u8) as char);
        n_rest = (n_rest - 1) / 26;
    }
    l_chars.iter().rev().collect()
}

/// Build an A1 address from a 1-based row and a zero-based column.
pub fn create_cell_address(row_1based: usize, col_idx: usize) -> String {
    format!("{}{row_1based}", derive_column_letters(col_idx))
}

/// Parse an A1 address into zero-based `(row, col)`.
pub fn parse_cell_address(address: &str) -> Result<(usize, usize), GsheetError> {
    let c_address = address.trim().to_ascii_uppercase();
    let n_len_letters = c_address
        .chars()
        .take_while(|chr| chr.is_ascii_alphabetic())
        .count();
    let (c_letters, c_digits) = c_address.split_at(n_len_letters);

    if c_letters.is_empty() || c_digits.is_empty() || !c_digits.chars().all(|c| c.is_ascii_digit())
    {
        return Err(GsheetError::InvalidInput(format!(
            "Invalid A1 cell address: {address:?}"
        )));
    }

    let mut n_col = 0usize;
    for chr in c_letters.bytes() {
        n_col = n_col * 26 + (chr - b'A' + 1) as usize;
    }
    let n_row: usize = c_digits
        .parse()
        .map_err(|_| GsheetError::InvalidInput(format!("Invalid A1 row: {address:?}")))?;
    if n_row == 0 {
        return Err(GsheetError::InvalidInput(format!(
            "A1 rows are 1-based: {address:?}"
        )));
    }

    Ok((n_row - 1, n_col - 1))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_chunk_list_splits_with_short_tail() {
        let items: Vec<i32> = (1..=10).collect();

        assert_eq!(
            chunk_list(&items, Some(3)),
            EnumChunkedList::Chunked(vec![&items[0..3], &items[3..6], &items[6..9], &items[9..]])
        );
    }

    #[test]
    fn test_chunk_list_larger_chunk_is_single_chunk() {
        let items: Vec<i32> = (1..=10).collect();

        assert_eq!(
            chunk_list(&items, Some(12)),
            EnumChunkedList::Chunked(vec![&items[..]])
        );
    }

    #[test]
    fn test_chunk_list_none_returns_input_unwrapped() {
        let items: Vec<i32> = (1..=10).collect();
        let chunked = chunk_list(&items, None);

        assert_eq!(chunked, EnumChunkedList::Unchunked(&items[..]));
        assert_eq!(chunked.units(), vec![&items[..]]);
    }

    proptest! {
        #[test]
        fn prop_chunk_list_covers_input(
            items in proptest::collection::vec(any::<u16>(), 1..300),
            n_chunk_size in 1usize..50,
        ) {
            let l_units = chunk_list(&items, Some(n_chunk_size)).units();

            prop_assert_eq!(l_units.len(), items.len().div_ceil(n_chunk_size));
            prop_assert!(l_units.iter().all(|unit| !unit.is_empty() && unit.len() <= n_chunk_size));
            let l_joined: Vec<u16> = l_units.concat();
            prop_assert_eq!(l_joined, items);
        }
    }

    #[test]
    fn test_derive_display_value() {
        assert_eq!(derive_display_value(&EnumCellValue::None), None);
        assert_eq!(derive_display_value(&EnumCellValue::Float(f64::NAN)), None);
        assert_eq!(
            derive_display_value(&EnumCellValue::Float(2.0)).as_deref(),
            Some("2.0")
        );
        assert_eq!(
            derive_display_value(&EnumCellValue::Float(0.25)).as_deref(),
            Some("0.25")
        );
        assert_eq!(
            derive_display_value(&EnumCellValue::Float(f64::NEG_INFINITY)).as_deref(),
            Some("-inf")
        );
        assert_eq!(
            derive_display_value(&EnumCellValue::Integer(-7)).as_deref(),
            Some("-7")
        );
        assert_eq!(
            derive_display_value(&EnumCellValue::Boolean(true)).as_deref(),
            Some("True")
        );
        assert_eq!(
            derive_display_value(&EnumCellValue::String(String::new())).as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_derive_record_table_aligns_by_first_record_keys() {
        let records = vec![
            SpecRecord::new().with("b", 1).with("a", "x"),
            SpecRecord::new().with("a", "y").with("b", 2),
        ];
        let table = derive_record_table(&records).unwrap();

        assert_eq!(table.columns, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(
            table.rows[1],
            vec![EnumCellValue::Integer(2), EnumCellValue::from("y")]
        );
    }

    #[test]
    fn test_derive_record_table_rejects_bad_input() {
        assert!(matches!(
            derive_record_table(&[]),
            Err(GsheetError::InvalidInput(_))
        ));
        assert!(matches!(
            derive_record_table(&[SpecRecord::new()]),
            Err(GsheetError::InvalidInput(_))
        ));

        let records_width = vec![
            SpecRecord::new().with("a", 1).with("b", 2),
            SpecRecord::new().with("a", 1),
        ];
        assert!(matches!(
            derive_record_table(&records_width),
            Err(GsheetError::InvalidInput(_))
        ));

        let records_keys = vec![
            SpecRecord::new().with("a", 1).with("b", 2),
            SpecRecord::new().with("a", 1).with("c", 2),
        ];
        let err = derive_record_table(&records_keys).unwrap_err();
        assert!(err.to_string().contains("missing column \"b\""));
    }

    #[test]
    fn test_validate_unique_columns() {
        assert!(validate_unique_columns(&["a".to_string(), "b".to_string()]).is_ok());

        let err = validate_unique_columns(&["a".to_string(), "b".to_string(), "a".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("\"a\" x2 at indices [0, 2]"));
    }

    #[test]
    fn test_cell_address_helpers() {
        assert_eq!(derive_column_letters(0), "A");
        assert_eq!(derive_column_letters(25), "Z");
        assert_eq!(derive_column_letters(26), "AA");
        assert_eq!(derive_column_letters(701), "ZZ");
        assert_eq!(derive_column_letters(702), "AAA");

        assert_eq!(create_cell_address(6, 0), "A6");
        assert_eq!(parse_cell_address("A1").unwrap(), (0, 0));
        assert_eq!(parse_cell_address("ab12").unwrap(), (11, 27));
        assert!(parse_cell_address("A0").is_err());
        assert!(parse_cell_address("12").is_err());
        assert!(parse_cell_address("A1B").is_err());
    }

    #[test]
    fn test_slot_identifier_and_ceil_div() {
        assert_eq!(create_slot_identifier("sales", 3), "sales_3");
        assert_eq!(calculate_ceil_div(20, 12), 2);
        assert_eq!(calculate_ceil_div(24, 12), 2);
        assert_eq!(calculate_ceil_div(1, 12), 1);
    }

    #[test]
    fn test_sanitize_sheet_name() {
        assert_eq!(sanitize_sheet_name("a/b:c", "_"), "a_b_c");
        assert_eq!(sanitize_sheet_name("   ", "_"), "Sheet");
        assert_eq!(sanitize_sheet_name(&"x".repeat(40), "_").len(), 31);
    }
}
