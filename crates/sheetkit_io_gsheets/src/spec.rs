//! Shared models, options and reports for the partitioned sheet writer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::conf::{
    N_CHUNK_SIZE_DEFAULT, N_MAX_CELLS_PER_SHEET_DEFAULT, N_MAX_CELLS_PER_WORKBOOK_DEFAULT,
};
use crate::error::GsheetError;

////////////////////////////////////////////////////////////////////////////////
// #region RecordSpecification

/// Scalar field value of one record.
#[derive(Debug, Clone, PartialEq)]
pub enum EnumCellValue {
    /// Missing/null value.
    None,
    /// Boolean value.
    Boolean(bool),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Text value.
    String(String),
}

impl From<&str> for EnumCellValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for EnumCellValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for EnumCellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for EnumCellValue {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<f64> for EnumCellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for EnumCellValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl<T: Into<EnumCellValue>> From<Option<T>> for EnumCellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::None, Into::into)
    }
}

/// One input record: ordered `column name -> value` pairs.
///
/// The key order of the first record of a write call becomes the header order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRecord {
    fields: Vec<(String, EnumCellValue)>,
}

impl SpecRecord {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field and return the record (builder style).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<EnumCellValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a field; an existing key keeps its position and gets the new value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<EnumCellValue>) {
        let c_key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c_name, _)| *c_name == c_key) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((c_key, value)),
        }
    }

    /// Field value by key.
    pub fn get(&self, key: &str) -> Option<&EnumCellValue> {
        self.fields
            .iter()
            .find(|(c_name, _)| c_name == key)
            .map(|(_, value)| value)
    }

    /// Ordered keys.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c_name, _)| c_name.as_str())
    }

    /// Ordered `(key, value)` pairs.
    pub fn fields(&self) -> &[(String, EnumCellValue)] {
        &self.fields
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for SpecRecord
where
    K: Into<String>,
    V: Into<EnumCellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = SpecRecord::new();
        for (key, value) in iter {
            record.insert(key, value);
        }
        record
    }
}

/// Validated column-aligned table handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecRecordTable {
    /// Header row, in output order.
    pub columns: Vec<String>,
    /// Data rows aligned with `columns`.
    pub rows: Vec<Vec<EnumCellValue>>,
}

impl SpecRecordTable {
    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ServiceSpecification

/// Result of a lookup against the spreadsheet service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumLookup<T> {
    /// Target exists; carries its handle.
    Found(T),
    /// Target does not exist.
    NotFound,
}

impl<T> EnumLookup<T> {
    /// `true` for [`EnumLookup::Found`].
    pub fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }

    /// Convert into `Option`.
    pub fn into_option(self) -> Option<T> {
        match self {
            Self::Found(handle) => Some(handle),
            Self::NotFound => None,
        }
    }

    /// Unwrap the handle or return `err`.
    pub fn found_or(self, err: GsheetError) -> Result<T, GsheetError> {
        self.into_option().ok_or(err)
    }
}

/// How the service session is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumAuthMode {
    /// End-user OAuth flow.
    #[default]
    #[serde(alias = "oauth")]
    Interactive,
    /// Non-interactive service identity.
    #[serde(alias = "service_account")]
    Service,
}

impl EnumAuthMode {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Interactive => "interactive",
            Self::Service => "service",
        }
    }
}

impl FromStr for EnumAuthMode {
    type Err = GsheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "interactive" | "oauth" => Ok(Self::Interactive),
            "service" | "service_account" => Ok(Self::Service),
            _ => Err(GsheetError::InvalidInput(format!(
                "Invalid auth mode: `{value}`. Expected one of: ['interactive', 'service']"
            ))),
        }
    }
}

impl fmt::Display for EnumAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permission granted when a new document is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumShareRole {
    /// Read-only access.
    Reader,
    /// Read and comment.
    Commenter,
    /// Full edit access.
    #[default]
    Writer,
}

impl EnumShareRole {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reader => "reader",
            Self::Commenter => "commenter",
            Self::Writer => "writer",
        }
    }
}

impl FromStr for EnumShareRole {
    type Err = GsheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reader" => Ok(Self::Reader),
            "commenter" => Ok(Self::Commenter),
            "writer" => Ok(Self::Writer),
            _ => Err(GsheetError::InvalidInput(format!(
                "Invalid share role: `{value}`. Expected one of: ['reader', 'commenter', 'writer']"
            ))),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WriteOptions

/// Per-call write options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecGsheetWriteOptions {
    /// Rows per `write_range` call; `None` writes each sheet in one call.
    pub chunk_size: Option<usize>,
    /// Cell ceiling for one sheet.
    pub max_cells_per_sheet: usize,
    /// Cell ceiling for one spreadsheet document.
    pub max_cells_per_workbook: usize,
}

impl Default for SpecGsheetWriteOptions {
    fn default() -> Self {
        Self {
            chunk_size: Some(N_CHUNK_SIZE_DEFAULT),
            max_cells_per_sheet: N_MAX_CELLS_PER_SHEET_DEFAULT,
            max_cells_per_workbook: N_MAX_CELLS_PER_WORKBOOK_DEFAULT,
        }
    }
}

impl SpecGsheetWriteOptions {
    /// Parse options from JSON; absent keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, GsheetError> {
        serde_json::from_str(text)
            .map_err(|err| GsheetError::InvalidInput(format!("Invalid write options: {err}")))
    }
}

/// Writer-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecGsheetWriterConfig {
    /// Identity every newly created document is shared with.
    pub recipient_identity: Option<String>,
    /// Session authentication mode handed to the connector.
    pub auth_mode: EnumAuthMode,
    /// Role granted to `recipient_identity`.
    pub share_role: EnumShareRole,
}

impl SpecGsheetWriterConfig {
    /// Parse config from JSON; absent keys keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, GsheetError> {
        serde_json::from_str(text)
            .map_err(|err| GsheetError::InvalidInput(format!("Invalid writer config: {err}")))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region LayoutSpecification

/// Derived partition sizes for one dataset and limit pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpecLayoutDims {
    /// Record count.
    pub n_records: usize,
    /// Column count.
    pub n_cols: usize,
    /// `n_records * n_cols`.
    pub n_cells_total: usize,
    /// `ceil(n_cells_total / max_cells_per_workbook)`.
    pub n_spreadsheets_needed: usize,
    /// `ceil(n_cells_total / max_cells_per_sheet)`.
    pub n_sheets_needed_total: usize,
    /// `ceil(max_cells_per_workbook / max_cells_per_sheet)`.
    pub n_sheets_per_spreadsheet: usize,
    /// `ceil(max_cells_per_sheet / n_cols)`.
    pub n_rows_per_sheet: usize,
}

/// One planned sheet: a contiguous record range inside one spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSheetSlice {
    /// Sheet name (`<base>_<local index>`).
    pub sheet_name: String,
    /// 1-based index within the owning spreadsheet.
    pub idx_sheet_local: usize,
    /// Inclusive source record start.
    pub row_start_inclusive: usize,
    /// Exclusive source record end.
    pub row_end_exclusive: usize,
}

impl SpecSheetSlice {
    /// Number of data rows in this sheet.
    pub fn n_rows(&self) -> usize {
        self.row_end_exclusive - self.row_start_inclusive
    }
}

/// One planned spreadsheet and the sheets written into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSpreadsheetSlot {
    /// Document name (`<base>_<index>`).
    pub spreadsheet_name: String,
    /// 1-based spreadsheet index.
    pub idx_spreadsheet: usize,
    /// Planned sheets, in write order.
    pub sheets: Vec<SpecSheetSlice>,
}

impl SpecSpreadsheetSlot {
    /// Number of records assigned to this spreadsheet.
    pub fn n_records(&self) -> usize {
        self.sheets.iter().map(SpecSheetSlice::n_rows).sum()
    }
}

/// Full partition plan for one write call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLayoutPlan {
    /// Derived sizes the plan was built from.
    pub dims: SpecLayoutDims,
    /// Spreadsheet slots, in write order.
    pub spreadsheets: Vec<SpecSpreadsheetSlot>,
}

impl SpecLayoutPlan {
    /// Total planned sheets across all spreadsheets.
    pub fn n_sheets(&self) -> usize {
        self.spreadsheets.iter().map(|slot| slot.sheets.len()).sum()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ReportSpecification

/// Outcome for one spreadsheet slot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecSpreadsheetReport {
    /// Document name.
    pub spreadsheet_name: String,
    /// `true` when this run created the document.
    pub if_created: bool,
    /// Records written into this document.
    pub n_records_written: usize,
    /// Sheets written, in order.
    pub sheets: Vec<SpecSheetSlice>,
    /// Stale sheets removed by reconciliation.
    pub sheets_deleted: Vec<String>,
}

/// Per-write call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecGsheetReport {
    /// Derived layout sizes.
    pub dims: SpecLayoutDims,
    /// Per-spreadsheet outcomes.
    pub spreadsheets: Vec<SpecSpreadsheetReport>,
    /// Stale spreadsheets removed by reconciliation.
    pub spreadsheets_deleted: Vec<String>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecGsheetReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }

    /// Records written across all spreadsheets.
    pub fn n_records_written(&self) -> usize {
        self.spreadsheets
            .iter()
            .map(|report| report.n_records_written)
            .sum()
    }

    /// Sheets written across all spreadsheets.
    pub fn n_sheets_written(&self) -> usize {
        self.spreadsheets.iter().map(|report| report.sheets.len()).sum()
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        format!(
            "{prefix} records={} spreadsheets={} sheets={} sheets_deleted={} spreadsheets_deleted={} warnings={}",
            self.n_records_written(),
            self.spreadsheets.len(),
            self.n_sheets_written(),
            self.spreadsheets
                .iter()
                .map(|report| report.sheets_deleted.len())
                .sum::<usize>(),
            self.spreadsheets_deleted.len(),
            self.warnings.len()
        )
    }
}

impl fmt::Display for SpecGsheetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[GSHEET]"))
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_insert_keeps_first_position() {
        let mut record = SpecRecord::new().with("a", 1).with("b", "x");
        record.insert("a", 2);

        assert_eq!(record.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&EnumCellValue::Integer(2)));
        assert_eq!(record.get("missing"), None);
    }

    #[test]
    fn test_record_from_iter_with_optional_values() {
        let record: SpecRecord = [("x", Some(1.5)), ("y", None)].into_iter().collect();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get("x"), Some(&EnumCellValue::Float(1.5)));
        assert_eq!(record.get("y"), Some(&EnumCellValue::None));
    }

    #[test]
    fn test_auth_mode_parse_accepts_aliases() {
        assert_eq!("oauth".parse::<EnumAuthMode>().ok(), Some(EnumAuthMode::Interactive));
        assert_eq!(
            "service_account".parse::<EnumAuthMode>().ok(),
            Some(EnumAuthMode::Service)
        );
        assert!(matches!(
            "kerberos".parse::<EnumAuthMode>(),
            Err(GsheetError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_write_options_from_json_keeps_defaults() {
        let options = SpecGsheetWriteOptions::from_json_str(r#"{"chunk_size": 2}"#).unwrap();

        assert_eq!(options.chunk_size, Some(2));
        assert_eq!(options.max_cells_per_sheet, N_MAX_CELLS_PER_SHEET_DEFAULT);
        assert_eq!(options.max_cells_per_workbook, N_MAX_CELLS_PER_WORKBOOK_DEFAULT);

        let options = SpecGsheetWriteOptions::from_json_str(r#"{"chunk_size": null}"#).unwrap();
        assert_eq!(options.chunk_size, None);
    }

    #[test]
    fn test_writer_config_from_json() {
        let config = SpecGsheetWriterConfig::from_json_str(
            r#"{"recipient_identity": "ops@example.com", "auth_mode": "service_account"}"#,
        )
        .unwrap();

        assert_eq!(config.recipient_identity.as_deref(), Some("ops@example.com"));
        assert_eq!(config.auth_mode, EnumAuthMode::Service);
        assert_eq!(config.share_role, EnumShareRole::Writer);

        assert!(SpecGsheetWriterConfig::from_json_str("[1, 2]").is_err());
    }

    #[test]
    fn test_report_format() {
        let mut report = SpecGsheetReport::default();
        report.spreadsheets.push(SpecSpreadsheetReport {
            spreadsheet_name: "data_1".to_string(),
            n_records_written: 5,
            sheets_deleted: vec!["data_2".to_string()],
            ..Default::default()
        });
        report.warn("no recipient");

        assert_eq!(
            report.to_string(),
            "[GSHEET] records=5 spreadsheets=1 sheets=0 sheets_deleted=1 spreadsheets_deleted=0 warnings=1"
        );
    }
}
