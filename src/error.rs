// Error taxonomy for the resolution pipeline.
// Configuration errors and empty-result errors are distinct variants so
// callers can match on them instead of parsing messages.

use thiserror::Error;

/// Standard result type for pipeline operations.
pub type ReconResult<T> = Result<T, ReconError>;

#[derive(Error, Debug)]
pub enum ReconError {
    /// A required column is absent from the input. Fatal before any
    /// group processing; nothing is written.
    #[error("required columns not found in input: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The input table has no data rows.
    #[error("input file is empty")]
    EmptyInput,

    /// No group of size >= 2 exists; there is nothing to resolve and no
    /// output file is produced.
    #[error("no duplicates found in input")]
    NoDuplicates,

    #[error("workbook has no worksheets")]
    NoWorksheet,

    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to read workbook: {0}")]
    WorkbookRead(#[from] calamine::XlsxError),

    #[error("failed to write workbook: {0}")]
    WorkbookWrite(#[from] rust_xlsxwriter::XlsxError),
}

impl ReconError {
    /// True for errors caused by the shape of the input (missing
    /// columns, wrong format) rather than by its contents.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ReconError::MissingColumns(_) | ReconError::UnsupportedFormat(_)
        )
    }
}
