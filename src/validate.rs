// ✅ Pre-flight validation - catch bad spreadsheets before a run
// Collects typed issues instead of failing on the first bad cell;
// only structural problems (missing columns) short-circuit.

use crate::cpf;
use crate::field::Field;
use crate::grouper::{self, KeyColumns};
use crate::table::Dataset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// The table cannot be processed at all.
    Critical,
    /// A cell violates a rule and would corrupt downstream queries.
    Error,
    /// Questionable data worth a look, processing can continue.
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// 1-based spreadsheet row (header included); None for issues that
    /// concern the whole table.
    pub row: Option<usize>,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub rows_checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        !self
            .issues
            .iter()
            .any(|i| matches!(i.severity, Severity::Critical | Severity::Error))
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} rows checked: {} critical, {} errors, {} warnings",
            self.rows_checked,
            self.count(Severity::Critical),
            self.count(Severity::Error),
            self.count(Severity::Warning),
        )
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct SpreadsheetValidator {
    /// Upper bound for client/agreement codes.
    pub max_code: i64,
}

impl SpreadsheetValidator {
    pub fn new() -> Self {
        SpreadsheetValidator {
            max_code: 999_999_999,
        }
    }

    /// Validate a loaded dataset. Missing required columns are critical
    /// and short-circuit: per-cell checks on a misshapen table would
    /// only produce noise.
    pub fn validate(&self, dataset: &Dataset, required_columns: &[&str]) -> ValidationReport {
        let mut report = ValidationReport {
            rows_checked: dataset.len(),
            ..Default::default()
        };

        let missing: Vec<&str> = required_columns
            .iter()
            .copied()
            .filter(|name| dataset.column(name).is_none())
            .collect();
        if !missing.is_empty() {
            report.issues.push(ValidationIssue {
                severity: Severity::Critical,
                row: None,
                field: missing.join(", "),
                message: "required columns are missing".to_string(),
            });
            return report;
        }

        for name in required_columns {
            let col = dataset.column(name).unwrap();
            for row in &dataset.rows {
                let cell = row.cell(col);
                let spreadsheet_row = row.index + 2;

                if cell.is_missing() {
                    report.issues.push(ValidationIssue {
                        severity: Severity::Error,
                        row: Some(spreadsheet_row),
                        field: name.to_string(),
                        message: "required value is empty".to_string(),
                    });
                    continue;
                }

                if let Some(issue) = self.check_cell(name, cell) {
                    report.issues.push(ValidationIssue {
                        severity: issue.0,
                        row: Some(spreadsheet_row),
                        field: name.to_string(),
                        message: issue.1,
                    });
                }
            }
        }

        self.check_duplicates(dataset, &mut report);
        report
    }

    /// Per-column rules, keyed by the column name.
    fn check_cell(&self, column: &str, cell: &Field) -> Option<(Severity, String)> {
        match column {
            "cpf" | "cpf_cnpj" => {
                let raw = cell.to_string();
                if !cpf::is_valid(&raw) {
                    return Some((
                        Severity::Error,
                        format!("'{}' is not a valid CPF (11 digits expected)", raw),
                    ));
                }
            }
            "cod_cliente" | "cod_acordo" => match cell.as_number() {
                Some(n) if n >= 1.0 && n <= self.max_code as f64 && n.fract() == 0.0 => {}
                _ => {
                    return Some((
                        Severity::Error,
                        format!("'{}' is not a positive integer code", cell),
                    ));
                }
            },
            "installment_code" => {
                if cell.as_number().is_none() {
                    return Some((
                        Severity::Error,
                        format!("'{}' is not numeric", cell),
                    ));
                }
            }
            "agreement_code" => {
                if cell.as_number().is_none() {
                    return Some((
                        Severity::Warning,
                        format!("'{}' is not numeric; the resolver treats it as non-zero", cell),
                    ));
                }
            }
            "due_date" | "data" | "data_vencimento" => {
                let raw = cell.to_string();
                if NaiveDate::parse_from_str(&raw, "%Y-%m-%d").is_err() {
                    return Some((
                        Severity::Warning,
                        format!("'{}' is not an ISO date (YYYY-MM-DD)", raw),
                    ));
                }
            }
            _ => {}
        }
        None
    }

    /// Warn when the composite key already has duplicate groups, so the
    /// operator knows a resolve pass is needed before querying.
    fn check_duplicates(&self, dataset: &Dataset, report: &mut ValidationReport) {
        let columns = match KeyColumns::locate(dataset) {
            Ok(columns) => columns,
            Err(_) => return, // key columns absent, nothing to scan
        };

        let groups = grouper::group_duplicates(dataset, &columns);
        if !groups.is_empty() {
            report.issues.push(ValidationIssue {
                severity: Severity::Warning,
                row: None,
                field: "subject_id, due_date, installment_number".to_string(),
                message: format!(
                    "{} duplicate groups share the composite key; run a resolve pass",
                    groups.len()
                ),
            });
        }
    }
}

impl Default for SpreadsheetValidator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    fn dataset(headers: &[&str], rows: Vec<Vec<Field>>) -> Dataset {
        let mut dataset = Dataset::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            dataset.push_row(row);
        }
        dataset
    }

    fn text(s: &str) -> Field {
        Field::Text(s.to_string())
    }

    #[test]
    fn test_missing_columns_are_critical_and_short_circuit() {
        let dataset = dataset(&["cpf"], vec![vec![text("not-a-cpf")]]);
        let report = SpreadsheetValidator::new().validate(&dataset, &["cpf", "cod_cliente"]);

        assert!(!report.is_valid());
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.issues[0].severity, Severity::Critical);
        assert_eq!(report.issues[0].field, "cod_cliente");
    }

    #[test]
    fn test_cpf_and_code_rules() {
        let dataset = dataset(
            &["cpf", "cod_cliente"],
            vec![
                vec![text("123.456.789-09"), Field::Int(77)],
                vec![text("123456789012"), Field::Int(0)],
                vec![Field::Missing, text("abc")],
            ],
        );
        let report = SpreadsheetValidator::new().validate(&dataset, &["cpf", "cod_cliente"]);

        // Row 3: 12-digit CPF. Row 4: empty cpf, zero and non-numeric codes.
        assert_eq!(report.count(Severity::Error), 4);
        assert!(!report.is_valid());

        let cpf_issues: Vec<_> = report
            .issues
            .iter()
            .filter(|i| i.field == "cpf")
            .collect();
        assert_eq!(cpf_issues.len(), 2);
        assert_eq!(cpf_issues[0].row, Some(3));
    }

    #[test]
    fn test_duplicate_scan_warns() {
        let dataset = dataset(
            &[
                "subject_id",
                "due_date",
                "installment_number",
                "installment_code",
            ],
            vec![
                vec![text("1"), text("2024-01-01"), Field::Int(1), Field::Int(10)],
                vec![text("1"), text("2024-01-01"), Field::Int(1), Field::Int(20)],
            ],
        );
        let report = SpreadsheetValidator::new().validate(&dataset, &["subject_id"]);

        assert_eq!(report.count(Severity::Warning), 1);
        assert!(report.issues[0].message.contains("1 duplicate groups"));
        // Duplicates alone do not make the table invalid.
        assert!(report.is_valid());
    }

    #[test]
    fn test_date_rule_is_a_warning() {
        let dataset = dataset(
            &["due_date"],
            vec![vec![text("01/02/2024")], vec![text("2024-02-01")]],
        );
        let report = SpreadsheetValidator::new().validate(&dataset, &["due_date"]);

        assert_eq!(report.count(Severity::Warning), 1);
        assert_eq!(report.issues[0].row, Some(2));
        assert!(report.is_valid());
    }

    #[test]
    fn test_clean_table_reports_valid() {
        let dataset = dataset(
            &["cpf", "cod_acordo"],
            vec![vec![text("12345678909"), Field::Int(42)]],
        );
        let report = SpreadsheetValidator::new().validate(&dataset, &["cpf", "cod_acordo"]);

        assert!(report.is_valid());
        assert!(report.summary().contains("1 rows checked"));
    }
}
