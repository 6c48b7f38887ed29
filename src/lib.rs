// Debt Reconciliation Toolkit - Core Library
// Exposes all modules for use in the CLI and tests

pub mod convert;
pub mod cpf;
pub mod error;
pub mod extract;
pub mod field;
pub mod grouper;
pub mod report;
pub mod resolver;
pub mod table;
pub mod validate;

// Re-export commonly used types
pub use convert::{convert_batch, convert_file, ConversionFailure, ConversionSummary};
pub use error::{ReconError, ReconResult};
pub use extract::{extract_file, extract_payloads, ExtractedRecord, ExtractionSummary};
pub use field::Field;
pub use grouper::{
    group_duplicates, Group, GroupKey, KeyColumns, AGREEMENT_COLUMN, PAYMENT_COLUMN,
    REQUIRED_COLUMNS,
};
pub use report::{report_path, resolve_file, RULE_POLICY};
pub use resolver::{
    DuplicateResolver, Resolution, ResolutionOutcome, ResolutionSummary, RuleApplied,
};
pub use table::{Dataset, Row};
pub use validate::{Severity, SpreadsheetValidator, ValidationIssue, ValidationReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
