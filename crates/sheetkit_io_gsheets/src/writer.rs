//! Writer orchestrator that walks a layout plan against a spreadsheet service.

use std::io::Cursor;

use log::{debug, info, warn};
use polars::prelude::{AnyValue, DataFrame, IpcReader, SerReader};

use crate::conf::C_SHEET_NAME_PLACEHOLDER;
use crate::error::GsheetError;
use crate::plan::plan_layout;
use crate::service::{SheetsConnector, SpreadsheetService};
use crate::spec::{
    EnumCellValue, EnumLookup, SpecGsheetReport, SpecGsheetWriteOptions, SpecGsheetWriterConfig,
    SpecRecord, SpecRecordTable, SpecSheetSlice, SpecSpreadsheetReport, SpecSpreadsheetSlot,
};
use crate::util::{
    chunk_list, create_cell_address, create_slot_identifier, derive_display_row,
    derive_record_table, validate_unique_columns,
};

/// Partitioned writer bound to one connector.
///
/// The service session is opened on first use and kept for the writer's
/// lifetime.
pub struct GsheetWriter<C: SheetsConnector> {
    config: SpecGsheetWriterConfig,
    connector: C,
    client: Option<C::Service>,
}

impl<C: SheetsConnector> GsheetWriter<C> {
    /// Create a writer; no remote call is issued until the first write.
    pub fn new(config: SpecGsheetWriterConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            client: None,
        }
    }

    /// Writer-wide configuration.
    pub fn config(&self) -> &SpecGsheetWriterConfig {
        &self.config
    }

    /// `true` once the service session has been opened.
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Service session, connecting on first access.
    pub fn client(&mut self) -> Result<&mut C::Service, GsheetError> {
        let client = match self.client.take() {
            Some(client) => client,
            None => {
                debug!("Connecting spreadsheet service (auth_mode={}).", self.config.auth_mode);
                self.connector.connect(self.config.auth_mode)?
            }
        };
        Ok(self.client.insert(client))
    }

    /// Write `records` under `base_name`, partitioned by `options`.
    pub fn write(
        &mut self,
        records: &[SpecRecord],
        base_name: &str,
        options: &SpecGsheetWriteOptions,
    ) -> Result<SpecGsheetReport, GsheetError> {
        let table = derive_record_table(records)?;
        self.write_table(&table, base_name, options)
    }

    /// Write a DataFrame: column names form the header, rows the records.
    pub fn write_dataframe(
        &mut self,
        df: &DataFrame,
        base_name: &str,
        options: &SpecGsheetWriteOptions,
    ) -> Result<SpecGsheetReport, GsheetError> {
        let table = derive_record_table_from_dataframe(df)?;
        self.write_table(&table, base_name, options)
    }

    /// Write a DataFrame from Polars IPC bytes.
    pub fn write_from_ipc_bytes(
        &mut self,
        v_ipc_df: &[u8],
        base_name: &str,
        options: &SpecGsheetWriteOptions,
    ) -> Result<SpecGsheetReport, GsheetError> {
        let df = derive_dataframe_from_ipc_bytes(v_ipc_df)?;
        self.write_dataframe(&df, base_name, options)
    }

    /// Write an already aligned table.
    ///
    /// The layout is planned before any remote call, so invalid input never
    /// touches the service.
    pub fn write_table(
        &mut self,
        table: &SpecRecordTable,
        base_name: &str,
        options: &SpecGsheetWriteOptions,
    ) -> Result<SpecGsheetReport, GsheetError> {
        validate_unique_columns(&table.columns)?;
        if let Some((n_idx_row, row)) = table
            .rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != table.width())
        {
            return Err(GsheetError::InvalidInput(format!(
                "Row {n_idx_row} has {} values; expected {}.",
                row.len(),
                table.width()
            )));
        }

        let plan = plan_layout(base_name, table.height(), table.width(), options)?;
        let config = self.config.clone();
        let client = self.client()?;

        let mut report = SpecGsheetReport {
            dims: plan.dims,
            ..Default::default()
        };
        let l_header: Vec<Option<String>> = table.columns.iter().cloned().map(Some).collect();

        for slot in &plan.spreadsheets {
            let report_spreadsheet = write_spreadsheet(
                client,
                &config,
                base_name,
                slot,
                table,
                &l_header,
                options.chunk_size,
                &mut report,
            )?;
            report.spreadsheets.push(report_spreadsheet);
        }

        report.spreadsheets_deleted =
            cleanup_spreadsheets(client, base_name, plan.dims.n_spreadsheets_needed + 1)?;
        Ok(report)
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region ExistenceChecks

/// `true` when a document named `name` exists; other failures propagate.
pub fn check_document_exists<S: SpreadsheetService>(
    client: &mut S,
    name: &str,
) -> Result<bool, GsheetError> {
    Ok(client.open_document(name)?.is_found())
}

/// `true` when `document` has a sheet named `sheet_name`.
pub fn check_sheet_exists<S: SpreadsheetService>(
    client: &mut S,
    document: &S::Document,
    sheet_name: &str,
) -> Result<bool, GsheetError> {
    Ok(client.find_sheet(document, sheet_name)?.is_found())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reconciliation

/// Delete sheets `<base>_<k>` for `k = idx_start, idx_start + 1, ...` until one is absent.
pub fn cleanup_sheets<S: SpreadsheetService>(
    client: &mut S,
    document: &S::Document,
    base_name: &str,
    idx_start: usize,
) -> Result<Vec<String>, GsheetError> {
    let mut l_deleted = Vec::new();
    let mut n_idx = idx_start;
    loop {
        let c_sheet_name = create_slot_identifier(base_name, n_idx);
        let EnumLookup::Found(sheet) = client.find_sheet(document, &c_sheet_name)? else {
            break;
        };
        client.delete_sheet(document, &sheet)?;
        info!("Deleted stale sheet \"{c_sheet_name}\".");
        l_deleted.push(c_sheet_name);
        n_idx += 1;
    }
    Ok(l_deleted)
}

/// Delete documents `<base>_<k>` for `k = idx_start, idx_start + 1, ...` until one is absent.
pub fn cleanup_spreadsheets<S: SpreadsheetService>(
    client: &mut S,
    base_name: &str,
    idx_start: usize,
) -> Result<Vec<String>, GsheetError> {
    let mut l_deleted = Vec::new();
    let mut n_idx = idx_start;
    loop {
        let c_document_name = create_slot_identifier(base_name, n_idx);
        let EnumLookup::Found(document) = client.open_document(&c_document_name)? else {
            break;
        };
        client.delete_document(&document)?;
        info!("Deleted stale spreadsheet \"{c_document_name}\".");
        l_deleted.push(c_document_name);
        n_idx += 1;
    }
    Ok(l_deleted)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SpreadsheetWrite

#[allow(clippy::too_many_arguments)]
fn write_spreadsheet<S: SpreadsheetService>(
    client: &mut S,
    config: &SpecGsheetWriterConfig,
    base_name: &str,
    slot: &SpecSpreadsheetSlot,
    table: &SpecRecordTable,
    header: &[Option<String>],
    chunk_size: Option<usize>,
    report: &mut SpecGsheetReport,
) -> Result<SpecSpreadsheetReport, GsheetError> {
    let c_name = slot.spreadsheet_name.as_str();
    info!(
        "Writing spreadsheet \"{c_name}\" ({} records, {} sheets).",
        slot.n_records(),
        slot.sheets.len()
    );

    let if_created = !check_document_exists(client, c_name)?;
    if if_created {
        let document = client.create_document(c_name)?;
        info!("Created spreadsheet \"{c_name}\".");
        match config.recipient_identity.as_deref() {
            Some(identity) => {
                client.share_document(&document, identity, config.share_role)?;
                info!(
                    "Shared \"{c_name}\" with {identity} ({}).",
                    config.share_role.as_str()
                );
            }
            None => {
                let c_msg = format!("Spreadsheet \"{c_name}\" created without a recipient to share with.");
                warn!("{c_msg}");
                report.warn(c_msg);
            }
        }
    }

    let document = client
        .open_document(c_name)?
        .found_or(GsheetError::DocumentNotFound(c_name.to_string()))?;

    let mut report_spreadsheet = SpecSpreadsheetReport {
        spreadsheet_name: c_name.to_string(),
        if_created,
        ..Default::default()
    };
    for sheet_slice in &slot.sheets {
        write_sheet(client, &document, sheet_slice, table, header, chunk_size)?;
        report_spreadsheet.n_records_written += sheet_slice.n_rows();
        report_spreadsheet.sheets.push(sheet_slice.clone());
    }

    report_spreadsheet.sheets_deleted =
        cleanup_sheets(client, &document, base_name, report_spreadsheet.sheets.len() + 1)?;

    info!(
        "Wrote {} records to \"{c_name}\" in {} sheets.",
        report_spreadsheet.n_records_written,
        report_spreadsheet.sheets.len()
    );
    Ok(report_spreadsheet)
}

fn write_sheet<S: SpreadsheetService>(
    client: &mut S,
    document: &S::Document,
    sheet_slice: &SpecSheetSlice,
    table: &SpecRecordTable,
    header: &[Option<String>],
    chunk_size: Option<usize>,
) -> Result<(), GsheetError> {
    let c_sheet_name = sheet_slice.sheet_name.as_str();
    let n_rows_grid = sheet_slice.n_rows() + 1;
    let n_cols = table.width();

    let sheet = match client.find_sheet(document, c_sheet_name)? {
        EnumLookup::Found(sheet) => {
            client.clear_sheet(&sheet)?;
            client.resize_sheet(&sheet, n_rows_grid, n_cols)?;
            sheet
        }
        EnumLookup::NotFound => {
            let sheet = client.create_sheet(document, c_sheet_name, n_rows_grid, n_cols)?;
            info!("Created sheet \"{c_sheet_name}\" ({n_rows_grid} x {n_cols}).");
            sheet
        }
    };

    if let EnumLookup::Found(sheet_placeholder) = client.find_sheet(document, C_SHEET_NAME_PLACEHOLDER)? {
        client.delete_sheet(document, &sheet_placeholder)?;
        info!("Deleted placeholder sheet \"{C_SHEET_NAME_PLACEHOLDER}\".");
    }

    client.write_range(&sheet, &create_cell_address(1, 0), &[header.to_vec()])?;

    // Row 1 holds the header. Column A's filled extent undercounts when a chunk
    // ends in rows with a null first value; the address stays past rows already written.
    let mut n_row_next = 2usize;
    let l_rows = &table.rows[sheet_slice.row_start_inclusive..sheet_slice.row_end_exclusive];
    for chunk in chunk_list(l_rows, chunk_size).units() {
        if chunk.is_empty() {
            continue;
        }
        let l_display: Vec<Vec<Option<String>>> =
            chunk.iter().map(|row| derive_display_row(row)).collect();
        let n_row_first_empty =
            usize::max(client.count_first_column_filled(&sheet)? + 1, n_row_next);
        n_row_next = n_row_first_empty + l_display.len();
        let c_cell = create_cell_address(n_row_first_empty, 0);
        debug!(
            "Writing {} rows to \"{c_sheet_name}\" at {c_cell}.",
            l_display.len()
        );
        client.write_range(&sheet, &c_cell, &l_display)?;
    }

    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region DataFrameIntake

/// Convert a DataFrame into an aligned record table.
pub fn derive_record_table_from_dataframe(df: &DataFrame) -> Result<SpecRecordTable, GsheetError> {
    let l_columns: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    validate_unique_columns(&l_columns)?;

    let l_cols = df.get_columns();
    let mut l_rows = Vec::with_capacity(df.height());
    for n_idx_row in 0..df.height() {
        let mut l_row = Vec::with_capacity(l_cols.len());
        for col in l_cols {
            l_row.push(derive_cell_value_from_any_value(col.get(n_idx_row)?));
        }
        l_rows.push(l_row);
    }

    Ok(SpecRecordTable {
        columns: l_columns,
        rows: l_rows,
    })
}

fn derive_dataframe_from_ipc_bytes(v_ipc_df: &[u8]) -> Result<DataFrame, GsheetError> {
    Ok(IpcReader::new(Cursor::new(v_ipc_df)).finish()?)
}

fn derive_cell_value_from_any_value(value: AnyValue<'_>) -> EnumCellValue {
    match value {
        AnyValue::Null => EnumCellValue::None,
        AnyValue::Boolean(val) => EnumCellValue::Boolean(val),
        AnyValue::String(val) => EnumCellValue::String(val.to_string()),
        AnyValue::StringOwned(val) => EnumCellValue::String(val.to_string()),
        AnyValue::UInt8(val) => EnumCellValue::Integer(i64::from(val)),
        AnyValue::UInt16(val) => EnumCellValue::Integer(i64::from(val)),
        AnyValue::UInt32(val) => EnumCellValue::Integer(i64::from(val)),
        AnyValue::UInt64(val) => match i64::try_from(val) {
            Ok(n_val) => EnumCellValue::Integer(n_val),
            Err(_) => EnumCellValue::String(val.to_string()),
        },
        AnyValue::Int8(val) => EnumCellValue::Integer(i64::from(val)),
        AnyValue::Int16(val) => EnumCellValue::Integer(i64::from(val)),
        AnyValue::Int32(val) => EnumCellValue::Integer(i64::from(val)),
        AnyValue::Int64(val) => EnumCellValue::Integer(val),
        AnyValue::Int128(val) => match i64::try_from(val) {
            Ok(n_val) => EnumCellValue::Integer(n_val),
            Err(_) => EnumCellValue::String(val.to_string()),
        },
        AnyValue::Float32(val) => EnumCellValue::Float(f64::from(val)),
        AnyValue::Float64(val) => EnumCellValue::Float(val),
        _ => EnumCellValue::String(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
