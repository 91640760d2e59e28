//! Crate-wide error type.

use thiserror::Error;

/// Errors raised by planning, the service seam and the ambient integrations.
#[derive(Error, Debug)]
pub enum GsheetError {
    /// A spreadsheet document could not be found where one was required.
    #[error("Spreadsheet not found: {0:?}")]
    DocumentNotFound(String),

    /// A sheet could not be found inside an existing document.
    #[error("Sheet {sheet:?} not found in spreadsheet {document:?}")]
    SheetNotFound {
        /// Owning document name.
        document: String,
        /// Missing sheet name.
        sheet: String,
    },

    /// Input records or options violate a precondition.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Any other failure reported by the spreadsheet service.
    #[error("Remote operation `{operation}` failed: {message}")]
    RemoteOperation {
        /// Service operation name.
        operation: String,
        /// Underlying service message.
        message: String,
    },

    /// XLSX export failure.
    #[error("xlsx write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// DataFrame intake failure.
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::prelude::PolarsError),

    /// Filesystem failure during export.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GsheetError {
    /// Build a [`GsheetError::RemoteOperation`].
    pub fn remote(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteOperation {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// `true` for the two lookup-failure variants.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::DocumentNotFound(_) | Self::SheetNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_display() {
        let err = GsheetError::remote("write_range", "quota exceeded");

        assert_eq!(
            err.to_string(),
            "Remote operation `write_range` failed: quota exceeded"
        );
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found_variants() {
        let err_doc = GsheetError::DocumentNotFound("data_1".to_string());
        let err_sheet = GsheetError::SheetNotFound {
            document: "data_1".to_string(),
            sheet: "data_3".to_string(),
        };

        assert!(err_doc.is_not_found());
        assert!(err_sheet.is_not_found());
        assert_eq!(
            err_sheet.to_string(),
            "Sheet \"data_3\" not found in spreadsheet \"data_1\""
        );
    }

    #[test]
    fn test_io_error_conversion_with_question_mark() {
        fn create_in_missing_dir() -> Result<(), GsheetError> {
            std::fs::File::open("/nonexistent/sheetkit/file.xlsx")?;
            Ok(())
        }

        assert!(matches!(create_in_missing_dir(), Err(GsheetError::Io(_))));
    }
}
