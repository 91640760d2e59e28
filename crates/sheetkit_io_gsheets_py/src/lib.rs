//! Python bridge for the partitioned spreadsheet writer.
//!
//! The Python side supplies `client_factory(auth_mode: str)`, called once on
//! first write. The returned client is duck-typed and must provide:
//!
//! - `open_document(name)` / `find_sheet(document, name)`: return a handle, or
//!   `None` / raise a not-found exception when absent
//! - `create_document(name)`, `share_document(document, identity, role)`
//! - `create_sheet(document, name, n_rows, n_cols)`, `clear_sheet(sheet)`,
//!   `resize_sheet(sheet, n_rows, n_cols)`
//! - `delete_sheet(document, sheet)`, `delete_document(document)`
//! - `count_first_column_filled(sheet) -> int`
//! - `write_range(sheet, cell_top_left, rows)` with rows of `str | None`

use std::collections::BTreeMap;
use std::str::FromStr;

use log::debug;
use pyo3::exceptions::{PyLookupError, PyOSError, PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::{PyAny, PyBool, PyDict, PyFloat, PyInt};
use sheetkit_io_gsheets::{
    EnumAuthMode, EnumCellValue, EnumLookup, EnumShareRole, GsheetError, GsheetWriter,
    N_CHUNK_SIZE_DEFAULT, N_MAX_CELLS_PER_SHEET_DEFAULT, N_MAX_CELLS_PER_WORKBOOK_DEFAULT,
    SheetsConnector, SpecGsheetReport, SpecGsheetWriteOptions, SpecRecord, SpreadsheetService,
    derive_default_gsheet_writer_config,
};

const N_BRIDGE_ABI_VERSION: u64 = 1;
const C_BRIDGE_CONTRACT_VERSION: &str = "sheetkit.gsheets.writer.v1";
const C_BRIDGE_TRANSPORT: &str = "python_client";
const TUP_NOT_FOUND_ERROR_NAMES: [&str; 4] = [
    "SpreadsheetNotFound",
    "WorksheetNotFound",
    "DocumentNotFound",
    "SheetNotFound",
];

////////////////////////////////////////////////////////////////////////////////
// #region PythonClient

struct PyClientService {
    client: Py<PyAny>,
}

struct PyClientFactory {
    factory: Py<PyAny>,
}

impl SheetsConnector for PyClientFactory {
    type Service = PyClientService;

    fn connect(&self, auth_mode: EnumAuthMode) -> Result<Self::Service, GsheetError> {
        Python::with_gil(|py| {
            let client = self
                .factory
                .call1(py, (auth_mode.as_str(),))
                .map_err(|err| derive_remote_error(py, "connect", &err))?;
            if client.is_none(py) {
                return Err(GsheetError::remote("connect", "client_factory returned None"));
            }
            Ok(PyClientService { client })
        })
    }
}

fn derive_remote_error(py: Python<'_>, op: &str, err: &PyErr) -> GsheetError {
    let c_type = err
        .get_type(py)
        .name()
        .map(|name| name.to_string())
        .unwrap_or_else(|_| "Exception".to_string());
    GsheetError::remote(op, format!("{c_type}: {}", err.value(py)))
}

fn check_not_found_error(py: Python<'_>, err: &PyErr) -> bool {
    err.get_type(py)
        .name()
        .map(|name| TUP_NOT_FOUND_ERROR_NAMES.contains(&name.to_string().as_str()))
        .unwrap_or(false)
}

fn derive_lookup(
    py: Python<'_>,
    op: &str,
    result: PyResult<Bound<'_, PyAny>>,
) -> Result<EnumLookup<Py<PyAny>>, GsheetError> {
    match result {
        Ok(handle) if handle.is_none() => Ok(EnumLookup::NotFound),
        Ok(handle) => Ok(EnumLookup::Found(handle.unbind())),
        Err(err) if check_not_found_error(py, &err) => {
            debug!("`{op}` raised {err}; treating as not found.");
            Ok(EnumLookup::NotFound)
        }
        Err(err) => Err(derive_remote_error(py, op, &err)),
    }
}

fn derive_unit(py: Python<'_>, op: &str, result: PyResult<Bound<'_, PyAny>>) -> Result<(), GsheetError> {
    result.map(|_| ()).map_err(|err| derive_remote_error(py, op, &err))
}

impl SpreadsheetService for PyClientService {
    type Document = Py<PyAny>;
    type Sheet = Py<PyAny>;

    fn open_document(&mut self, name: &str) -> Result<EnumLookup<Self::Document>, GsheetError> {
        Python::with_gil(|py| {
            let result = self.client.bind(py).call_method1("open_document", (name,));
            derive_lookup(py, "open_document", result)
        })
    }

    fn create_document(&mut self, name: &str) -> Result<Self::Document, GsheetError> {
        Python::with_gil(|py| {
            self.client
                .bind(py)
                .call_method1("create_document", (name,))
                .map(Bound::unbind)
                .map_err(|err| derive_remote_error(py, "create_document", &err))
        })
    }

    fn share_document(
        &mut self,
        document: &Self::Document,
        identity: &str,
        role: EnumShareRole,
    ) -> Result<(), GsheetError> {
        Python::with_gil(|py| {
            let result = self.client.bind(py).call_method1(
                "share_document",
                (document.bind(py), identity, role.as_str()),
            );
            derive_unit(py, "share_document", result)
        })
    }

    fn find_sheet(
        &mut self,
        document: &Self::Document,
        sheet_name: &str,
    ) -> Result<EnumLookup<Self::Sheet>, GsheetError> {
        Python::with_gil(|py| {
            let result = self
                .client
                .bind(py)
                .call_method1("find_sheet", (document.bind(py), sheet_name));
            derive_lookup(py, "find_sheet", result)
        })
    }

    fn create_sheet(
        &mut self,
        document: &Self::Document,
        sheet_name: &str,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<Self::Sheet, GsheetError> {
        Python::with_gil(|py| {
            self.client
                .bind(py)
                .call_method1("create_sheet", (document.bind(py), sheet_name, n_rows, n_cols))
                .map(Bound::unbind)
                .map_err(|err| derive_remote_error(py, "create_sheet", &err))
        })
    }

    fn clear_sheet(&mut self, sheet: &Self::Sheet) -> Result<(), GsheetError> {
        Python::with_gil(|py| {
            let result = self.client.bind(py).call_method1("clear_sheet", (sheet.bind(py),));
            derive_unit(py, "clear_sheet", result)
        })
    }

    fn resize_sheet(
        &mut self,
        sheet: &Self::Sheet,
        n_rows: usize,
        n_cols: usize,
    ) -> Result<(), GsheetError> {
        Python::with_gil(|py| {
            let result = self
                .client
                .bind(py)
                .call_method1("resize_sheet", (sheet.bind(py), n_rows, n_cols));
            derive_unit(py, "resize_sheet", result)
        })
    }

    fn delete_sheet(
        &mut self,
        document: &Self::Document,
        sheet: &Self::Sheet,
    ) -> Result<(), GsheetError> {
        Python::with_gil(|py| {
            let result = self
                .client
                .bind(py)
                .call_method1("delete_sheet", (document.bind(py), sheet.bind(py)));
            derive_unit(py, "delete_sheet", result)
        })
    }

    fn delete_document(&mut self, document: &Self::Document) -> Result<(), GsheetError> {
        Python::with_gil(|py| {
            let result = self
                .client
                .bind(py)
                .call_method1("delete_document", (document.bind(py),));
            derive_unit(py, "delete_document", result)
        })
    }

    fn count_first_column_filled(&mut self, sheet: &Self::Sheet) -> Result<usize, GsheetError> {
        Python::with_gil(|py| {
            self.client
                .bind(py)
                .call_method1("count_first_column_filled", (sheet.bind(py),))
                .and_then(|count| count.extract::<usize>())
                .map_err(|err| derive_remote_error(py, "count_first_column_filled", &err))
        })
    }

    fn write_range(
        &mut self,
        sheet: &Self::Sheet,
        cell_top_left: &str,
        rows: &[Vec<Option<String>>],
    ) -> Result<(), GsheetError> {
        Python::with_gil(|py| {
            let result = self.client.bind(py).call_method1(
                "write_range",
                (sheet.bind(py), cell_top_left, rows.to_vec()),
            );
            derive_unit(py, "write_range", result)
        })
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Reports

#[pyclass(name = "SpreadsheetReport")]
#[derive(Debug, Clone)]
struct PySpreadsheetReport {
    #[pyo3(get)]
    spreadsheet_name: String,
    #[pyo3(get)]
    if_created: bool,
    #[pyo3(get)]
    cnt_records: usize,
    #[pyo3(get)]
    sheets: Vec<String>,
    #[pyo3(get)]
    sheets_deleted: Vec<String>,
}

#[pyclass(name = "GsheetReport")]
#[derive(Debug, Clone)]
struct PyGsheetReport {
    inner: SpecGsheetReport,
}

#[pymethods]
impl PyGsheetReport {
    #[getter]
    fn cnt_records(&self) -> usize {
        self.inner.n_records_written()
    }

    #[getter]
    fn cnt_sheets(&self) -> usize {
        self.inner.n_sheets_written()
    }

    #[getter]
    fn spreadsheets(&self) -> Vec<PySpreadsheetReport> {
        self.inner
            .spreadsheets
            .iter()
            .map(|report| PySpreadsheetReport {
                spreadsheet_name: report.spreadsheet_name.clone(),
                if_created: report.if_created,
                cnt_records: report.n_records_written,
                sheets: report
                    .sheets
                    .iter()
                    .map(|sheet| sheet.sheet_name.clone())
                    .collect(),
                sheets_deleted: report.sheets_deleted.clone(),
            })
            .collect()
    }

    #[getter]
    fn spreadsheets_deleted(&self) -> Vec<String> {
        self.inner.spreadsheets_deleted.clone()
    }

    #[getter]
    fn warnings(&self) -> Vec<String> {
        self.inner.warnings.clone()
    }

    fn to_dict(&self) -> BTreeMap<String, usize> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_records".to_string(), self.cnt_records());
        dict_counts.insert("cnt_spreadsheets".to_string(), self.inner.spreadsheets.len());
        dict_counts.insert("cnt_sheets".to_string(), self.cnt_sheets());
        dict_counts.insert(
            "cnt_sheets_deleted".to_string(),
            self.inner
                .spreadsheets
                .iter()
                .map(|report| report.sheets_deleted.len())
                .sum(),
        );
        dict_counts.insert(
            "cnt_spreadsheets_deleted".to_string(),
            self.inner.spreadsheets_deleted.len(),
        );
        dict_counts.insert("cnt_warnings".to_string(), self.inner.warnings.len());
        dict_counts
    }

    #[pyo3(signature = (prefix = "[GSHEET]"))]
    fn format(&self, prefix: &str) -> String {
        self.inner.format(prefix)
    }

    fn __str__(&self) -> String {
        self.inner.to_string()
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Writer

#[pyclass(name = "GsheetWriter")]
struct PyGsheetWriter {
    inner: GsheetWriter<PyClientFactory>,
}

#[pymethods]
impl PyGsheetWriter {
    #[new]
    #[pyo3(signature = (
        client_factory,
        recipient_identity = None,
        auth_mode = "interactive",
        share_role = "writer"
    ))]
    fn new(
        client_factory: Py<PyAny>,
        recipient_identity: Option<String>,
        auth_mode: &str,
        share_role: &str,
    ) -> PyResult<Self> {
        let mut config = derive_default_gsheet_writer_config();
        config.recipient_identity = recipient_identity;
        config.auth_mode = EnumAuthMode::from_str(auth_mode).map_err(map_gsheet_error)?;
        config.share_role = EnumShareRole::from_str(share_role).map_err(map_gsheet_error)?;
        let connector = PyClientFactory {
            factory: client_factory,
        };
        Ok(Self {
            inner: GsheetWriter::new(config, connector),
        })
    }

    #[getter]
    fn recipient_identity(&self) -> Option<String> {
        self.inner.config().recipient_identity.clone()
    }

    #[getter]
    fn auth_mode(&self) -> &'static str {
        self.inner.config().auth_mode.as_str()
    }

    #[pyo3(signature = (
        records,
        base_name,
        chunk_size = Some(N_CHUNK_SIZE_DEFAULT),
        max_cells_per_sheet = N_MAX_CELLS_PER_SHEET_DEFAULT,
        max_cells_per_workbook = N_MAX_CELLS_PER_WORKBOOK_DEFAULT
    ))]
    fn write(
        &mut self,
        py: Python<'_>,
        records: &Bound<'_, PyAny>,
        base_name: &str,
        chunk_size: Option<usize>,
        max_cells_per_sheet: usize,
        max_cells_per_workbook: usize,
    ) -> PyResult<PyGsheetReport> {
        let l_records = parse_records(records)?;
        let options = SpecGsheetWriteOptions {
            chunk_size,
            max_cells_per_sheet,
            max_cells_per_workbook,
        };

        let inner = &mut self.inner;
        let report = py.allow_threads(|| inner.write(&l_records, base_name, &options));
        let report = report.map_err(map_gsheet_error)?;
        Ok(PyGsheetReport { inner: report })
    }

    /// Write a Polars DataFrame serialized with `DataFrame.write_ipc`.
    #[pyo3(signature = (
        ipc_bytes,
        base_name,
        chunk_size = Some(N_CHUNK_SIZE_DEFAULT),
        max_cells_per_sheet = N_MAX_CELLS_PER_SHEET_DEFAULT,
        max_cells_per_workbook = N_MAX_CELLS_PER_WORKBOOK_DEFAULT
    ))]
    fn write_ipc(
        &mut self,
        py: Python<'_>,
        ipc_bytes: &[u8],
        base_name: &str,
        chunk_size: Option<usize>,
        max_cells_per_sheet: usize,
        max_cells_per_workbook: usize,
    ) -> PyResult<PyGsheetReport> {
        let options = SpecGsheetWriteOptions {
            chunk_size,
            max_cells_per_sheet,
            max_cells_per_workbook,
        };

        let inner = &mut self.inner;
        let report = py.allow_threads(|| inner.write_from_ipc_bytes(ipc_bytes, base_name, &options));
        let report = report.map_err(map_gsheet_error)?;
        Ok(PyGsheetReport { inner: report })
    }
}

fn parse_records(records: &Bound<'_, PyAny>) -> PyResult<Vec<SpecRecord>> {
    let mut l_records = Vec::new();
    for item in records.try_iter()? {
        let item = item?;
        let dict_record = item.downcast::<PyDict>().map_err(|_| {
            PyValueError::new_err("records must be an iterable of dicts.")
        })?;

        let mut record = SpecRecord::new();
        for (key, value) in dict_record.iter() {
            let c_key = match key.extract::<String>() {
                Ok(val) => val,
                Err(_) => key.str()?.to_string(),
            };
            record.insert(c_key, parse_cell_value(&value)?);
        }
        l_records.push(record);
    }
    Ok(l_records)
}

fn parse_cell_value(value: &Bound<'_, PyAny>) -> PyResult<EnumCellValue> {
    if value.is_none() {
        return Ok(EnumCellValue::None);
    }
    if let Ok(val) = value.downcast::<PyBool>() {
        return Ok(EnumCellValue::Boolean(val.is_true()));
    }
    if value.is_instance_of::<PyInt>() {
        return Ok(match value.extract::<i64>() {
            Ok(val) => EnumCellValue::Integer(val),
            Err(_) => EnumCellValue::String(value.str()?.to_string()),
        });
    }
    if let Ok(val) = value.downcast::<PyFloat>() {
        return Ok(EnumCellValue::Float(val.value()));
    }
    Ok(EnumCellValue::String(value.str()?.to_string()))
}

fn map_gsheet_error(exception: GsheetError) -> PyErr {
    match exception {
        GsheetError::InvalidInput(message) => PyValueError::new_err(message),
        err @ (GsheetError::DocumentNotFound(_) | GsheetError::SheetNotFound { .. }) => {
            PyLookupError::new_err(err.to_string())
        }
        err @ GsheetError::Io(_) => PyOSError::new_err(err.to_string()),
        err => PyRuntimeError::new_err(err.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[pymodule]
fn _sheetkit_io_gsheets_rs(module: &Bound<'_, PyModule>) -> PyResult<()> {
    module.add_class::<PyGsheetWriter>()?;
    module.add_class::<PyGsheetReport>()?;
    module.add_class::<PySpreadsheetReport>()?;
    module.add("__bridge_abi__", N_BRIDGE_ABI_VERSION)?;
    module.add("__bridge_contract__", C_BRIDGE_CONTRACT_VERSION)?;
    module.add("__bridge_transport__", C_BRIDGE_TRANSPORT)?;
    Ok(())
}
