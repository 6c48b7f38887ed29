// 🔣 Field - sum-typed spreadsheet cell value
// Replaces implicit coercion with explicit normalization at ingestion

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment-date values treated as "no payment". Preserved verbatim from
/// the observed source data; the epoch-like placeholder dates are a
/// heuristic pending business confirmation, not a documented rule.
pub const PAYMENT_SENTINELS: [&str; 5] = ["", "0", "N/A", "0000-00-00", "1900-01-01"];

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Field {
    Text(String),
    Int(i64),
    Float(f64),
    Missing,
}

impl Field {
    /// Normalize a raw CSV cell: trim whitespace, map empty to Missing.
    /// No numeric coercion happens here; `as_number` converts on demand.
    pub fn from_csv_cell(raw: &str) -> Field {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Field::Missing
        } else {
            Field::Text(trimmed.to_string())
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }

    /// Numeric view of the cell. Text parses after trimming; anything
    /// unparsable is None (callers decide whether that is a warning).
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Field::Int(i) => Some(*i as f64),
            Field::Float(f) => Some(*f),
            Field::Text(s) => s.trim().parse::<f64>().ok(),
            Field::Missing => None,
        }
    }

    /// True when the cell means "no payment happened".
    ///
    /// Sentinels: Missing, numeric zero, and the exact strings in
    /// [`PAYMENT_SENTINELS`] after trimming.
    pub fn is_payment_sentinel(&self) -> bool {
        match self {
            Field::Missing => true,
            Field::Int(i) => *i == 0,
            Field::Float(f) => *f == 0.0,
            Field::Text(s) => PAYMENT_SENTINELS.contains(&s.trim()),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Text(s) => write!(f, "{}", s),
            Field::Int(i) => write!(f, "{}", i),
            Field::Float(v) => write!(f, "{}", v),
            Field::Missing => Ok(()),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
