//! Capability surface the writer needs from a spreadsheet service.
//!
//! Lookups return [`EnumLookup`]; only "not found" is expressed that way and
//! every other failure is an `Err`.

use crate::error::GsheetError;
use crate::spec::{EnumAuthMode, EnumLookup, EnumShareRole};

/// Blocking spreadsheet service session.
pub trait SpreadsheetService {
    /// Handle of an opened spreadsheet document.
    type Document;
    /// Handle of one sheet inside a document.
    type Sheet;

    /// Open a document by name.
    fn open_document(&mut self, name: &str) -> Result<EnumLookup<Self::Document>, GsheetError>;

    /// Create a new, empty document.
    fn create_document(&mut self, name: &str) -> Result<Self::Document, GsheetError>;

    /// Grant `identity` access to `document`.
    fn share_document(
        &mut self,
        document: &Self::Document,
        identity: &str,
        role: EnumShareRole,
    ) -> Result<(), GsheetError>;

    /// Look up a sheet by name inside `document`.
    fn find_sheet(
        &mut self,
        document: &Self::Document,
        sheet_name: &str,
    ) -> Result<EnumLookup<Self::Sheet>, GsheetError>;

    /// Add a sheet of `n_rows x n_cols` to `document`.
    fn create_sheet(
        &mut self,
        document: &Self::Document,
        sheet_name: &str,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self::Sheet, GsheetError>;

    /// Remove all values from `sheet`.
    fn clear_sheet(&mut self, sheet: &Self::Sheet) -> Result<(), GsheetError>;

    /// Set the grid size of `sheet` to exactly `n_rows x n_cols`.
    fn resize_sheet(
        &mut self,
        sheet: &Self::Sheet,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<(), GsheetError>;

    /// Remove `sheet` from `document`.
    fn delete_sheet(&mut self, document: &Self::Document, sheet: &Self::Sheet)
    -> Result<(), GsheetError>;

    /// Remove the whole document.
    fn delete_document(&mut self, document: &Self::Document) -> Result<(), GsheetError>;

    /// Filled extent of the first column (0 for an empty sheet).
    fn count_first_column_filled(&mut self, sheet: &Self::Sheet) -> Result<usize, GsheetError>;

    /// Write `rows` with their top-left cell at the A1 address `cell_top_left`.
    ///
    /// `None` is the explicit null marker, distinct from an empty string.
    fn write_range(
        &mut self,
        sheet: &Self::Sheet,
        cell_top_left: &str,
        rows: &[Vec<Option<String>>],
    ) -> Result<(), GsheetError>;
}

/// Establishes a service session; called at most once per writer.
pub trait SheetsConnector {
    /// Session type produced.
    type Service: SpreadsheetService;

    /// Authenticate with `auth_mode` and return a ready session.
    fn connect(&self, auth_mode: EnumAuthMode) -> Result<Self::Service, GsheetError>;
}

impl<F, S> SheetsConnector for F
where
    F: Fn(EnumAuthMode) -> Result<S, GsheetError>,
    S: SpreadsheetService,
{
    type Service = S;

    fn connect(&self, auth_mode: EnumAuthMode) -> Result<S, GsheetError> {
        self(auth_mode)
    }
}
