//! `sheetkit_io_gsheets` v1:
//! Rust-side partitioned spreadsheet writer kernel.
//!
//! Modules:
//! - `conf`    : constants and default presets
//! - `spec`    : specs/models/options/reports
//! - `util`    : pure helper functions (values, chunker, A1 addresses)
//! - `plan`    : pure layout planner
//! - `error`   : crate-wide error type
//! - `service` : spreadsheet service capability traits
//! - `memory`  : in-memory service with xlsx export
//! - `writer`  : orchestrator over a service session
pub mod conf;
pub mod error;
pub mod memory;
pub mod plan;
pub mod service;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_SHEET_NAME_PLACEHOLDER, N_CHUNK_SIZE_DEFAULT, N_MAX_CELLS_PER_SHEET_DEFAULT,
    N_MAX_CELLS_PER_WORKBOOK_DEFAULT, derive_default_gsheet_write_options,
    derive_default_gsheet_writer_config,
};
pub use error::GsheetError;
pub use memory::{EnumServiceCall, EnumServiceOp, MemorySheetStore};
pub use plan::{derive_layout_dims, plan_layout, validate_write_options};
pub use service::{SheetsConnector, SpreadsheetService};
pub use spec::{
    EnumAuthMode, EnumCellValue, EnumLookup, EnumShareRole, SpecGsheetReport,
    SpecGsheetWriteOptions, SpecGsheetWriterConfig, SpecLayoutDims, SpecLayoutPlan, SpecRecord,
    SpecRecordTable, SpecSheetSlice, SpecSpreadsheetReport, SpecSpreadsheetSlot,
};
pub use util::{
    EnumChunkedList, chunk_list, create_cell_address, create_slot_identifier,
    derive_display_value, parse_cell_address, sanitize_sheet_name,
};
pub use writer::{
    GsheetWriter, check_document_exists, check_sheet_exists, cleanup_sheets,
    cleanup_spreadsheets, derive_record_table_from_dataframe,
};
