//! In-memory spreadsheet service with call journal, fault injection and xlsx export.
//!
//! Mirrors the behavior the writer relies on from a hosted service: every new
//! document starts with a placeholder `Sheet1`, the last sheet of a document
//! cannot be deleted, writes outside the sheet grid are rejected, and `None`
//! cells in a write leave the target cell untouched.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;
use rust_xlsxwriter::Workbook;

use crate::conf::{C_SHEET_NAME_PLACEHOLDER, N_NCOLS_PLACEHOLDER, N_NROWS_PLACEHOLDER};
use crate::error::GsheetError;
use crate::service::{SheetsConnector, SpreadsheetService};
use crate::spec::{EnumAuthMode, EnumLookup, EnumShareRole};
use crate::util::{parse_cell_address, sanitize_sheet_name};

////////////////////////////////////////////////////////////////////////////////
// #region JournalSpecification

/// Operation kinds of the capability surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnumServiceOp {
    OpenDocument,
    CreateDocument,
    ShareDocument,
    FindSheet,
    CreateSheet,
    ClearSheet,
    ResizeSheet,
    DeleteSheet,
    DeleteDocument,
    CountFirstColumnFilled,
    WriteRange,
}

impl EnumServiceOp {
    /// Snake-case operation name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenDocument => "open_document",
            Self::CreateDocument => "create_document",
            Self::ShareDocument => "share_document",
            Self::FindSheet => "find_sheet",
            Self::CreateSheet => "create_sheet",
            Self::ClearSheet => "clear_sheet",
            Self::ResizeSheet => "resize_sheet",
            Self::DeleteSheet => "delete_sheet",
            Self::DeleteDocument => "delete_document",
            Self::CountFirstColumnFilled => "count_first_column_filled",
            Self::WriteRange => "write_range",
        }
    }
}

/// One journaled service call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumServiceCall {
    OpenDocument {
        document: String,
    },
    CreateDocument {
        document: String,
    },
    ShareDocument {
        document: String,
        identity: String,
        role: EnumShareRole,
    },
    FindSheet {
        document: String,
        sheet: String,
    },
    CreateSheet {
        document: String,
        sheet: String,
        n_rows: usize,
        n_cols: usize,
    },
    ClearSheet {
        document: String,
        sheet: String,
    },
    ResizeSheet {
        document: String,
        sheet: String,
        n_rows: usize,
        n_cols: usize,
    },
    DeleteSheet {
        document: String,
        sheet: String,
    },
    DeleteDocument {
        document: String,
    },
    CountFirstColumnFilled {
        document: String,
        sheet: String,
    },
    WriteRange {
        document: String,
        sheet: String,
        cell_top_left: String,
        rows: Vec<Vec<Option<String>>>,
    },
}

impl EnumServiceCall {
    /// Operation kind of this call.
    pub fn op(&self) -> EnumServiceOp {
        match self {
            Self::OpenDocument { .. } => EnumServiceOp::OpenDocument,
            Self::CreateDocument { .. } => EnumServiceOp::CreateDocument,
            Self::ShareDocument { .. } => EnumServiceOp::ShareDocument,
            Self::FindSheet { .. } => EnumServiceOp::FindSheet,
            Self::CreateSheet { .. } => EnumServiceOp::CreateSheet,
            Self::ClearSheet { .. } => EnumServiceOp::ClearSheet,
            Self::ResizeSheet { .. } => EnumServiceOp::ResizeSheet,
            Self::DeleteSheet { .. } => EnumServiceOp::DeleteSheet,
            Self::DeleteDocument { .. } => EnumServiceOp::DeleteDocument,
            Self::CountFirstColumnFilled { .. } => EnumServiceOp::CountFirstColumnFilled,
            Self::WriteRange { .. } => EnumServiceOp::WriteRange,
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Handles

/// Handle of a document held by [`MemorySheetStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryDocumentHandle {
    id: u64,
    /// Document name at open time.
    pub name: String,
}

/// Handle of a sheet held by [`MemorySheetStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemorySheetHandle {
    document_id: u64,
    sheet_id: u64,
    /// Owning document name.
    pub document_name: String,
    /// Sheet name at lookup time.
    pub sheet_name: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StoreModel

#[derive(Debug, Clone)]
struct MemorySheet {
    id: u64,
    name: String,
    n_rows: usize,
    n_cols: usize,
    dict_cells: BTreeMap<(usize, usize), String>,
}

impl MemorySheet {
    fn n_cells(&self) -> usize {
        self.n_rows * self.n_cols
    }

    fn truncate_to_grid(&mut self) {
        let (n_rows, n_cols) = (self.n_rows, self.n_cols);
        self.dict_cells
            .retain(|(n_row, n_col), _| *n_row < n_rows && *n_col < n_cols);
    }
}

#[derive(Debug, Clone)]
struct MemoryDocument {
    id: u64,
    name: String,
    sheets: Vec<MemorySheet>,
    shares: Vec<(String, EnumShareRole)>,
}

impl MemoryDocument {
    fn n_cells(&self) -> usize {
        self.sheets.iter().map(MemorySheet::n_cells).sum()
    }
}

#[derive(Debug)]
struct MemoryStoreInner {
    documents: Vec<MemoryDocument>,
    n_id_next: u64,
    journal: Vec<EnumServiceCall>,
    dict_faults: BTreeMap<EnumServiceOp, String>,
    max_cells_per_document: Option<usize>,
    if_create_placeholder: bool,
}

impl Default for MemoryStoreInner {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            n_id_next: 1,
            journal: Vec::new(),
            dict_faults: BTreeMap::new(),
            max_cells_per_document: None,
            if_create_placeholder: true,
        }
    }
}

impl MemoryStoreInner {
    fn allocate_id(&mut self) -> u64 {
        let n_id = self.n_id_next;
        self.n_id_next += 1;
        n_id
    }

    /// Journal `call`, then fail if a fault is armed for its operation.
    fn record(&mut self, call: EnumServiceCall) -> Result<(), GsheetError> {
        let op = call.op();
        self.journal.push(call);
        match self.dict_faults.remove(&op) {
            Some(c_message) => Err(GsheetError::remote(op.as_str(), c_message)),
            None => Ok(()),
        }
    }

    fn document_by_name(&self, name: &str) -> Option<&MemoryDocument> {
        self.documents.iter().find(|doc| doc.name == name)
    }

    fn document_mut(&mut self, id: u64, op: EnumServiceOp) -> Result<&mut MemoryDocument, GsheetError> {
        self.documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| GsheetError::remote(op.as_str(), "document no longer exists"))
    }

    fn sheet_mut(
        &mut self,
        handle: &MemorySheetHandle,
        op: EnumServiceOp,
    ) -> Result<&mut MemorySheet, GsheetError> {
        self.document_mut(handle.document_id, op)?
            .sheets
            .iter_mut()
            .find(|sheet| sheet.id == handle.sheet_id)
            .ok_or_else(|| GsheetError::remote(op.as_str(), "sheet no longer exists"))
    }

    fn check_cell_limit(
        &self,
        document_id: u64,
        n_cells_delta_added: usize,
        n_cells_delta_removed: usize,
        op: EnumServiceOp,
    ) -> Result<(), GsheetError> {
        let Some(n_max) = self.max_cells_per_document else {
            return Ok(());
        };
        let n_cells_current = self
            .documents
            .iter()
            .find(|doc| doc.id == document_id)
            .map_or(0, MemoryDocument::n_cells);
        let n_cells_after = (n_cells_current + n_cells_delta_added).saturating_sub(n_cells_delta_removed);
        if n_cells_after > n_max {
            return Err(GsheetError::remote(
                op.as_str(),
                format!("document would hold {n_cells_after} cells; limit is {n_max}"),
            ));
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MemorySheetStore

/// Shared in-memory spreadsheet service.
///
/// Clones share the same state, so a test can hand one clone to a writer and
/// inspect documents and the journal through another.
#[derive(Debug, Clone, Default)]
pub struct MemorySheetStore {
    inner: Arc<Mutex<MemoryStoreInner>>,
}

impl MemorySheetStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enforce a cell ceiling per document on sheet create/resize.
    pub fn with_max_cells_per_document(self, max_cells: usize) -> Self {
        self.lock().max_cells_per_document = Some(max_cells);
        self
    }

    /// Toggle creation of the placeholder `Sheet1` on new documents.
    pub fn with_placeholder_sheet(self, if_create_placeholder: bool) -> Self {
        self.lock().if_create_placeholder = if_create_placeholder;
        self
    }

    fn lock(&self) -> MutexGuard<'_, MemoryStoreInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call of `op` fail with `message`.
    pub fn fail_next(&self, op: EnumServiceOp, message: impl Into<String>) {
        self.lock().dict_faults.insert(op, message.into());
    }

    /// Add a document with empty `n_rows x n_cols` sheets, bypassing the journal.
    pub fn seed_document(&self, name: &str, sheet_names: &[&str], n_rows: usize, n_cols: usize) {
        let mut inner = self.lock();
        let n_id_document = inner.allocate_id();
        let mut l_sheets = Vec::with_capacity(sheet_names.len());
        for c_sheet_name in sheet_names {
            let n_id_sheet = inner.allocate_id();
            l_sheets.push(MemorySheet {
                id: n_id_sheet,
                name: c_sheet_name.to_string(),
                n_rows,
                n_cols,
                dict_cells: BTreeMap::new(),
            });
        }
        inner.documents.push(MemoryDocument {
            id: n_id_document,
            name: name.to_string(),
            sheets: l_sheets,
            shares: Vec::new(),
        });
    }

    /// Names of all stored documents, in creation order.
    pub fn document_names(&self) -> Vec<String> {
        self.lock().documents.iter().map(|doc| doc.name.clone()).collect()
    }

    /// Sheet names of `document`, in creation order.
    pub fn sheet_names(&self, document: &str) -> Option<Vec<String>> {
        self.lock()
            .document_by_name(document)
            .map(|doc| doc.sheets.iter().map(|sheet| sheet.name.clone()).collect())
    }

    /// Grid size `(rows, cols)` of one sheet.
    pub fn sheet_size(&self, document: &str, sheet: &str) -> Option<(usize, usize)> {
        self.lock().document_by_name(document).and_then(|doc| {
            doc.sheets
                .iter()
                .find(|s| s.name == sheet)
                .map(|s| (s.n_rows, s.n_cols))
        })
    }

    /// Full grid of one sheet; empty cells are `None`.
    pub fn sheet_values(&self, document: &str, sheet: &str) -> Option<Vec<Vec<Option<String>>>> {
        let inner = self.lock();
        let doc = inner.document_by_name(document)?;
        let sheet = doc.sheets.iter().find(|s| s.name == sheet)?;

        let mut l_grid = vec![vec![None; sheet.n_cols]; sheet.n_rows];
        for ((n_row, n_col), c_value) in &sheet.dict_cells {
            l_grid[*n_row][*n_col] = Some(c_value.clone());
        }
        Some(l_grid)
    }

    /// Identities `document` was shared with.
    pub fn shares(&self, document: &str) -> Vec<(String, EnumShareRole)> {
        self.lock()
            .document_by_name(document)
            .map(|doc| doc.shares.clone())
            .unwrap_or_default()
    }

    /// Snapshot of every journaled call.
    pub fn journal(&self) -> Vec<EnumServiceCall> {
        self.lock().journal.clone()
    }

    /// Drop all journaled calls.
    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Export every document as `<dir>/<document>.xlsx`.
    ///
    /// Sheet names are sanitized to Excel rules; values are written as text.
    pub fn save_xlsx(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, GsheetError> {
        let path_dir = dir.as_ref();
        fs::create_dir_all(path_dir)?;

        let documents = self.lock().documents.clone();
        let mut l_paths = Vec::with_capacity(documents.len());
        for doc in documents {
            let mut workbook = Workbook::new();
            let mut set_sheet_names = BTreeSet::new();
            for sheet in &doc.sheets {
                let c_sheet_name = sanitize_sheet_name(&sheet.name, "_");
                if !set_sheet_names.insert(c_sheet_name.clone()) {
                    return Err(GsheetError::InvalidInput(format!(
                        "Sheet names collide after sanitizing in {:?}: {c_sheet_name:?}",
                        doc.name
                    )));
                }

                let worksheet = workbook.add_worksheet();
                worksheet.set_name(&c_sheet_name)?;
                for ((n_row, n_col), c_value) in &sheet.dict_cells {
                    worksheet.write_string(cast_row_num(*n_row)?, cast_col_num(*n_col)?, c_value)?;
                }
            }

            let path_file = path_dir.join(format!("{}.xlsx", doc.name.replace(['/', '\\'], "_")));
            workbook.save(&path_file)?;
            info!("Exported \"{}\" to {}.", doc.name, path_file.display());
            l_paths.push(path_file);
        }

        Ok(l_paths)
    }
}

fn cast_row_num(value: usize) -> Result<u32, GsheetError> {
    u32::try_from(value).map_err(|_| GsheetError::InvalidInput(format!("row index overflow: {value}")))
}

fn cast_col_num(value: usize) -> Result<u16, GsheetError> {
    u16::try_from(value)
        .map_err(|_| GsheetError::InvalidInput(format!("column index overflow: {value}")))
}

impl SheetsConnector for MemorySheetStore {
    type Service = MemorySheetStore;

    fn connect(&self, _auth_mode: EnumAuthMode) -> Result<Self::Service, GsheetError> {
        Ok(self.clone())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ServiceImpl

impl SpreadsheetService for MemorySheetStore {
    type Document = MemoryDocumentHandle;
    type Sheet = MemorySheetHandle;

    fn open_document(&mut self, name: &str) -> Result<EnumLookup<Self::Document>, GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::OpenDocument {
            document: name.to_string(),
        })?;
        Ok(match inner.document_by_name(name) {
            Some(doc) => EnumLookup::Found(MemoryDocumentHandle {
                id: doc.id,
                name: doc.name.clone(),
            }),
            None => EnumLookup::NotFound,
        })
    }

    fn create_document(&mut self, name: &str) -> Result<Self::Document, GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::CreateDocument {
            document: name.to_string(),
        })?;
        if inner.document_by_name(name).is_some() {
            return Err(GsheetError::remote(
                EnumServiceOp::CreateDocument.as_str(),
                format!("document {name:?} already exists"),
            ));
        }

        let n_id_document = inner.allocate_id();
        let mut l_sheets = Vec::new();
        if inner.if_create_placeholder {
            let n_id_sheet = inner.allocate_id();
            l_sheets.push(MemorySheet {
                id: n_id_sheet,
                name: C_SHEET_NAME_PLACEHOLDER.to_string(),
                n_rows: N_NROWS_PLACEHOLDER,
                n_cols: N_NCOLS_PLACEHOLDER,
                dict_cells: BTreeMap::new(),
            });
        }
        inner.documents.push(MemoryDocument {
            id: n_id_document,
            name: name.to_string(),
            sheets: l_sheets,
            shares: Vec::new(),
        });

        Ok(MemoryDocumentHandle {
            id: n_id_document,
            name: name.to_string(),
        })
    }

    fn share_document(
        &mut self,
        document: &Self::Document,
        identity: &str,
        role: EnumShareRole,
    ) -> Result<(), GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::ShareDocument {
            document: document.name.clone(),
            identity: identity.to_string(),
            role,
        })?;
        let doc = inner.document_mut(document.id, EnumServiceOp::ShareDocument)?;
        doc.shares.push((identity.to_string(), role));
        Ok(())
    }

    fn find_sheet(
        &mut self,
        document: &Self::Document,
        sheet_name: &str,
    ) -> Result<EnumLookup<Self::Sheet>, GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::FindSheet {
            document: document.name.clone(),
            sheet: sheet_name.to_string(),
        })?;
        let doc = inner.document_mut(document.id, EnumServiceOp::FindSheet)?;
        Ok(match doc.sheets.iter().find(|sheet| sheet.name == sheet_name) {
            Some(sheet) => EnumLookup::Found(MemorySheetHandle {
                document_id: doc.id,
                sheet_id: sheet.id,
                document_name: doc.name.clone(),
                sheet_name: sheet.name.clone(),
            }),
            None => EnumLookup::NotFound,
        })
    }

    fn create_sheet(
        &mut self,
        document: &Self::Document,
        sheet_name: &str,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self::Sheet, GsheetError> {
        let op = EnumServiceOp::CreateSheet;
        let mut inner = self.lock();
        inner.record(EnumServiceCall::CreateSheet {
            document: document.name.clone(),
            sheet: sheet_name.to_string(),
            n_rows,
            n_cols,
        })?;
        if n_rows == 0 || n_cols == 0 {
            return Err(GsheetError::remote(op.as_str(), "grid size must be >= 1 x 1"));
        }
        inner.check_cell_limit(document.id, n_rows * n_cols, 0, op)?;

        let n_id_sheet = inner.allocate_id();
        let doc = inner.document_mut(document.id, op)?;
        if doc.sheets.iter().any(|sheet| sheet.name == sheet_name) {
            return Err(GsheetError::remote(
                op.as_str(),
                format!("sheet {sheet_name:?} already exists"),
            ));
        }
        doc.sheets.push(MemorySheet {
            id: n_id_sheet,
            name: sheet_name.to_string(),
            n_rows,
            n_cols,
            dict_cells: BTreeMap::new(),
        });

        Ok(MemorySheetHandle {
            document_id: doc.id,
            sheet_id: n_id_sheet,
            document_name: doc.name.clone(),
            sheet_name: sheet_name.to_string(),
        })
    }

    fn clear_sheet(&mut self, sheet: &Self::Sheet) -> Result<(), GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::ClearSheet {
            document: sheet.document_name.clone(),
            sheet: sheet.sheet_name.clone(),
        })?;
        inner.sheet_mut(sheet, EnumServiceOp::ClearSheet)?.dict_cells.clear();
        Ok(())
    }

    fn resize_sheet(
        &mut self,
        sheet: &Self::Sheet,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<(), GsheetError> {
        let op = EnumServiceOp::ResizeSheet;
        let mut inner = self.lock();
        inner.record(EnumServiceCall::ResizeSheet {
            document: sheet.document_name.clone(),
            sheet: sheet.sheet_name.clone(),
            n_rows,
            n_cols,
        })?;
        if n_rows == 0 || n_cols == 0 {
            return Err(GsheetError::remote(op.as_str(), "grid size must be >= 1 x 1"));
        }
        let n_cells_before = inner.sheet_mut(sheet, op)?.n_cells();
        inner.check_cell_limit(sheet.document_id, n_rows * n_cols, n_cells_before, op)?;

        let target = inner.sheet_mut(sheet, op)?;
        target.n_rows = n_rows;
        target.n_cols = n_cols;
        target.truncate_to_grid();
        Ok(())
    }

    fn delete_sheet(
        &mut self,
        document: &Self::Document,
        sheet: &Self::Sheet,
    ) -> Result<(), GsheetError> {
        let op = EnumServiceOp::DeleteSheet;
        let mut inner = self.lock();
        inner.record(EnumServiceCall::DeleteSheet {
            document: document.name.clone(),
            sheet: sheet.sheet_name.clone(),
        })?;
        let doc = inner.document_mut(document.id, op)?;
        let Some(n_pos) = doc.sheets.iter().position(|s| s.id == sheet.sheet_id) else {
            return Err(GsheetError::remote(op.as_str(), "sheet no longer exists"));
        };
        if doc.sheets.len() == 1 {
            return Err(GsheetError::remote(
                op.as_str(),
                "cannot delete the only sheet of a document",
            ));
        }
        doc.sheets.remove(n_pos);
        Ok(())
    }

    fn delete_document(&mut self, document: &Self::Document) -> Result<(), GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::DeleteDocument {
            document: document.name.clone(),
        })?;
        let n_len_before = inner.documents.len();
        inner.documents.retain(|doc| doc.id != document.id);
        if inner.documents.len() == n_len_before {
            return Err(GsheetError::remote(
                EnumServiceOp::DeleteDocument.as_str(),
                "document no longer exists",
            ));
        }
        Ok(())
    }

    fn count_first_column_filled(&mut self, sheet: &Self::Sheet) -> Result<usize, GsheetError> {
        let mut inner = self.lock();
        inner.record(EnumServiceCall::CountFirstColumnFilled {
            document: sheet.document_name.clone(),
            sheet: sheet.sheet_name.clone(),
        })?;
        let target = inner.sheet_mut(sheet, EnumServiceOp::CountFirstColumnFilled)?;
        Ok(target
            .dict_cells
            .keys()
            .filter(|(_, n_col)| *n_col == 0)
            .map(|(n_row, _)| n_row + 1)
            .max()
            .unwrap_or(0))
    }

    fn write_range(
        &mut self,
        sheet: &Self::Sheet,
        cell_top_left: &str,
        rows: &[Vec<Option<String>>],
    ) -> Result<(), GsheetError> {
        let op = EnumServiceOp::WriteRange;
        let mut inner = self.lock();
        inner.record(EnumServiceCall::WriteRange {
            document: sheet.document_name.clone(),
            sheet: sheet.sheet_name.clone(),
            cell_top_left: cell_top_left.to_string(),
            rows: rows.to_vec(),
        })?;
        let (n_row_start, n_col_start) = parse_cell_address(cell_top_left)?;
        let target = inner.sheet_mut(sheet, op)?;

        let n_width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if n_row_start + rows.len() > target.n_rows || n_col_start + n_width > target.n_cols {
            return Err(GsheetError::remote(
                op.as_str(),
                format!(
                    "range at {cell_top_left} of {} x {n_width} exceeds grid limits {} x {}",
                    rows.len(),
                    target.n_rows,
                    target.n_cols
                ),
            ));
        }

        for (n_offset_row, row) in rows.iter().enumerate() {
            for (n_offset_col, value) in row.iter().enumerate() {
                let tup_key = (n_row_start + n_offset_row, n_col_start + n_offset_col);
                match value {
                    None => {}
                    Some(c_value) if c_value.is_empty() => {
                        target.dict_cells.remove(&tup_key);
                    }
                    Some(c_value) => {
                        target.dict_cells.insert(tup_key, c_value.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[Option<&str>]) -> Vec<Option<String>> {
        values.iter().map(|v| v.map(ToString::to_string)).collect()
    }

    #[test]
    fn test_create_document_adds_placeholder_sheet() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();

        assert_eq!(store.sheet_names("book"), Some(vec!["Sheet1".to_string()]));
        assert_eq!(store.sheet_size("book", "Sheet1"), Some((1_000, 26)));
        assert!(store.open_document("book").unwrap().is_found());
        assert!(!store.open_document("other").unwrap().is_found());
        assert!(store.create_document("book").is_err());
        assert_eq!(doc.name, "book");
    }

    #[test]
    fn test_find_sheet_not_found_is_not_an_error() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();

        assert!(store.find_sheet(&doc, "Sheet1").unwrap().is_found());
        assert_eq!(store.find_sheet(&doc, "nope").unwrap(), EnumLookup::NotFound);
    }

    #[test]
    fn test_write_range_and_first_column_extent() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();
        let sheet = store.create_sheet(&doc, "s", 4, 2).unwrap();

        assert_eq!(store.count_first_column_filled(&sheet).unwrap(), 0);
        store
            .write_range(&sheet, "A1", &[row(&[Some("h1"), Some("h2")])])
            .unwrap();
        store
            .write_range(&sheet, "A2", &[row(&[Some("a"), None]), row(&[Some("b"), Some("")])])
            .unwrap();
        assert_eq!(store.count_first_column_filled(&sheet).unwrap(), 3);

        let l_grid = store.sheet_values("book", "s").unwrap();
        assert_eq!(l_grid.len(), 4);
        assert_eq!(l_grid[0], row(&[Some("h1"), Some("h2")]));
        assert_eq!(l_grid[1], row(&[Some("a"), None]));
        assert_eq!(l_grid[2], row(&[Some("b"), None]));
        assert_eq!(l_grid[3], row(&[None, None]));
    }

    #[test]
    fn test_write_range_rejects_out_of_grid() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();
        let sheet = store.create_sheet(&doc, "s", 2, 2).unwrap();

        let err = store
            .write_range(&sheet, "A2", &[row(&[Some("a")]), row(&[Some("b")])])
            .unwrap_err();
        assert!(err.to_string().contains("exceeds grid limits"));
        assert!(store.write_range(&sheet, "B1", &[row(&[Some("a"), Some("b")])]).is_err());
    }

    #[test]
    fn test_clear_and_resize_truncate() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();
        let sheet = store.create_sheet(&doc, "s", 3, 2).unwrap();
        store
            .write_range(&sheet, "A1", &[row(&[Some("a"), Some("b")]), row(&[Some("c"), Some("d")])])
            .unwrap();

        store.resize_sheet(&sheet, 1, 1).unwrap();
        assert_eq!(store.sheet_values("book", "s").unwrap(), vec![row(&[Some("a")])]);

        store.clear_sheet(&sheet).unwrap();
        assert_eq!(store.sheet_values("book", "s").unwrap(), vec![row(&[None])]);
    }

    #[test]
    fn test_delete_last_sheet_is_rejected() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();
        let sheet = store.find_sheet(&doc, "Sheet1").unwrap().into_option().unwrap();

        assert!(store.delete_sheet(&doc, &sheet).is_err());
        store.create_sheet(&doc, "data", 1, 1).unwrap();
        store.delete_sheet(&doc, &sheet).unwrap();
        assert_eq!(store.sheet_names("book"), Some(vec!["data".to_string()]));
    }

    #[test]
    fn test_delete_document_and_stale_handle() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();
        store.delete_document(&doc).unwrap();

        assert!(store.document_names().is_empty());
        assert!(matches!(
            store.find_sheet(&doc, "Sheet1"),
            Err(GsheetError::RemoteOperation { .. })
        ));
        assert!(store.delete_document(&doc).is_err());
    }

    #[test]
    fn test_fail_next_is_one_shot_and_journaled() {
        let mut store = MemorySheetStore::new();
        store.fail_next(EnumServiceOp::OpenDocument, "backend down");

        let err = store.open_document("book").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Remote operation `open_document` failed: backend down"
        );
        assert!(store.open_document("book").is_ok());
        assert_eq!(store.journal().len(), 2);

        store.clear_journal();
        assert!(store.journal().is_empty());
    }

    #[test]
    fn test_cell_limit_enforced_on_create_and_resize() {
        let mut store = MemorySheetStore::new()
            .with_placeholder_sheet(false)
            .with_max_cells_per_document(10);
        let doc = store.create_document("book").unwrap();

        let sheet = store.create_sheet(&doc, "a", 2, 3).unwrap();
        assert!(store.create_sheet(&doc, "b", 5, 1).is_err());
        store.resize_sheet(&sheet, 5, 2).unwrap();
        assert!(store.resize_sheet(&sheet, 11, 1).is_err());
    }

    #[test]
    fn test_share_document_records_identity() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("book").unwrap();
        store
            .share_document(&doc, "ops@example.com", EnumShareRole::Writer)
            .unwrap();

        assert_eq!(
            store.shares("book"),
            vec![("ops@example.com".to_string(), EnumShareRole::Writer)]
        );
    }

    #[test]
    fn test_save_xlsx_writes_one_file_per_document() {
        let mut store = MemorySheetStore::new();
        let doc = store.create_document("report/2024").unwrap();
        let sheet = store.create_sheet(&doc, "data:1", 2, 2).unwrap();
        store
            .write_range(&sheet, "A1", &[row(&[Some("k"), Some("v")])])
            .unwrap();
        store.seed_document("other", &["x"], 1, 1);

        let dir = tempfile::tempdir().unwrap();
        let l_paths = store.save_xlsx(dir.path()).unwrap();

        assert_eq!(l_paths.len(), 2);
        assert_eq!(l_paths[0], dir.path().join("report_2024.xlsx"));
        assert!(l_paths.iter().all(|path| path.is_file()));
    }
}
