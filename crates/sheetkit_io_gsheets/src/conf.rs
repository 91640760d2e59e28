//! Spreadsheet-service constants and default preset factories.

use crate::spec::{SpecGsheetWriteOptions, SpecGsheetWriterConfig};

/// Default number of data rows sent per `write_range` call.
pub const N_CHUNK_SIZE_DEFAULT: usize = 100_000;
/// Default cell ceiling for one sheet.
pub const N_MAX_CELLS_PER_SHEET_DEFAULT: usize = 2_500_000;
/// Default cell ceiling for one spreadsheet document (service hard limit).
pub const N_MAX_CELLS_PER_WORKBOOK_DEFAULT: usize = 10_000_000;

/// Name of the placeholder sheet the service adds to every new document.
pub const C_SHEET_NAME_PLACEHOLDER: &str = "Sheet1";
/// Row count of the placeholder sheet created with a new document.
pub const N_NROWS_PLACEHOLDER: usize = 1_000;
/// Column count of the placeholder sheet created with a new document.
pub const N_NCOLS_PLACEHOLDER: usize = 26;

/// Separator between a base name and its 1-based slot index.
pub const C_SLOT_SEPARATOR: &str = "_";

/// Excel sheet name maximum length (xlsx export).
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in Excel sheet names (xlsx export).
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Build default write options.
pub fn derive_default_gsheet_write_options() -> SpecGsheetWriteOptions {
    SpecGsheetWriteOptions::default()
}

/// Build default writer config (interactive auth, no share recipient).
pub fn derive_default_gsheet_writer_config() -> SpecGsheetWriterConfig {
    SpecGsheetWriterConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::EnumAuthMode;

    #[test]
    fn test_default_presets() {
        let options = derive_default_gsheet_write_options();
        assert_eq!(options.chunk_size, Some(N_CHUNK_SIZE_DEFAULT));
        assert!(options.max_cells_per_sheet <= options.max_cells_per_workbook);

        let config = derive_default_gsheet_writer_config();
        assert_eq!(config.recipient_identity, None);
        assert_eq!(config.auth_mode, EnumAuthMode::Interactive);
    }
}
