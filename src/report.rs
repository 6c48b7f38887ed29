// 📝 Report Writer - persist selected rows + companion text report
// Owns the file-level operation: all fatal checks happen before any
// byte is written, so a failed run leaves no partial output behind.

use crate::error::{ReconError, ReconResult};
use crate::field::Field;
use crate::resolver::{DuplicateResolver, Resolution, ResolutionSummary};
use crate::table::Dataset;
use chrono::Local;
use rust_xlsxwriter::{Color, Format, Workbook};
use std::fs;
use std::path::{Path, PathBuf};

/// Fixed policy description, written to every report for auditability.
/// This is documentation of the decision tree, not derived data.
pub const RULE_POLICY: [&str; 5] = [
    "1. Mixed payment status: keep the rows without a payment date",
    "2. Every row has a payment date: prefer agreement_code = 0",
    "3. Every row has a payment date and an agreement: lowest installment_code",
    "4. No row has a payment date: prefer agreement_code = 0",
    "5. No payment date and every row has an agreement: lowest installment_code",
];

const SENTINEL_NOTE: &str = "Payment dates equal to '', 0, N/A, 0000-00-00 or 1900-01-01 \
count as no payment (placeholder-date treatment pending business confirmation).";

const MAX_COLUMN_WIDTH: usize = 50;

/// Resolve duplicates in `input` and persist the selected rows to
/// `output` plus a text report next to it.
///
/// Fails atomically: missing columns, an empty input, or an input with
/// no duplicate groups all abort before any output file exists.
pub fn resolve_file(input: &Path, output: &Path) -> ReconResult<ResolutionSummary> {
    let dataset = Dataset::load(input)?;
    if dataset.is_empty() {
        return Err(ReconError::EmptyInput);
    }

    let resolver = DuplicateResolver::new(&dataset)?;
    let outcome = resolver.resolve(&dataset);
    if outcome.resolutions.is_empty() {
        return Err(ReconError::NoDuplicates);
    }

    write_workbook(&dataset, &outcome.resolutions, output)?;

    let report = render_report(input, output, &outcome.summary);
    fs::write(report_path(output), report)?;

    Ok(outcome.summary)
}

/// Companion report path: same base name with a `_report` suffix,
/// `.txt` extension.
pub fn report_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output.with_file_name(format!("{}_report.txt", stem))
}

/// Write the selected rows, highlighted, under a bold header row.
fn write_workbook(
    dataset: &Dataset,
    resolutions: &[Resolution],
    output: &Path,
) -> ReconResult<()> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Selected_Rows")?;

    let header_format = Format::new().set_bold();
    // Light green fill with dark green bold text marks the rows the
    // rules selected.
    let selected_format = Format::new()
        .set_background_color(Color::RGB(0x90EE90))
        .set_font_color(Color::RGB(0x006400))
        .set_bold();

    for (col, header) in dataset.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    let mut widths: Vec<usize> = dataset.headers.iter().map(|h| h.len()).collect();

    for (row_num, resolution) in resolutions.iter().enumerate() {
        let row = &dataset.rows[resolution.row_index];
        let out_row = (row_num + 1) as u32;

        for (col, cell) in row.cells.iter().enumerate() {
            let out_col = col as u16;
            match cell {
                Field::Int(i) => {
                    worksheet.write_number_with_format(out_row, out_col, *i as f64, &selected_format)?;
                }
                Field::Float(f) => {
                    worksheet.write_number_with_format(out_row, out_col, *f, &selected_format)?;
                }
                Field::Text(s) => {
                    worksheet.write_string_with_format(out_row, out_col, s, &selected_format)?;
                }
                Field::Missing => {
                    worksheet.write_blank(out_row, out_col, &selected_format)?;
                }
            }

            let width = cell.to_string().len();
            if width > widths[col] {
                widths[col] = width;
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        let fitted = (width + 2).min(MAX_COLUMN_WIDTH);
        worksheet.set_column_width(col as u16, fitted as f64)?;
    }

    workbook.save(output)?;
    Ok(())
}

fn render_report(input: &Path, output: &Path, summary: &ResolutionSummary) -> String {
    let mut report = String::new();

    report.push_str("=== DUPLICATE RESOLUTION REPORT ===\n");
    report.push_str(&format!(
        "Generated: {}\n",
        Local::now().format("%Y-%m-%d %H:%M:%S")
    ));
    report.push_str(&format!("Input file: {}\n", file_name(input)));
    report.push_str(&format!("Output file: {}\n", file_name(output)));
    report.push_str(&format!("Total input rows: {}\n", summary.total_rows));
    report.push_str(&format!(
        "Duplicate groups found: {}\n",
        summary.duplicate_groups
    ));
    report.push_str(&format!("Rows selected: {}\n", summary.rows_selected));
    report.push_str(&format!(
        "Duplication rate: {:.1}%\n",
        summary.duplication_rate
    ));
    report.push_str(&"=".repeat(60));
    report.push_str("\n\nRULES APPLIED:\n");
    for line in RULE_POLICY {
        report.push_str(line);
        report.push('\n');
    }
    report.push_str(SENTINEL_NOTE);
    report.push('\n');
    report.push_str(&"=".repeat(60));
    report.push_str("\n\nGROUPS PROCESSED:\n");
    report.push_str(&"-".repeat(30));
    report.push('\n');
    for line in &summary.group_log {
        report.push_str(line);
        report.push('\n');
    }

    if !summary.warnings.is_empty() {
        report.push_str("\nWARNINGS:\n");
        for warning in &summary.warnings {
            report.push_str(warning);
            report.push('\n');
        }
    }

    report
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn sample_summary() -> ResolutionSummary {
        let mut rule_counts = BTreeMap::new();
        rule_counts.insert("no-payment preference".to_string(), 2);
        ResolutionSummary {
            total_rows: 10,
            duplicate_groups: 2,
            rows_selected: 2,
            duplication_rate: 20.0,
            rule_counts,
            group_log: vec!["Group resolved: subject_id=1, due_date=d, installment_number=1 (2 rows) -> kept row 2 [no-payment preference]".to_string()],
            warnings: vec!["row 4: agreement_code 'x' is not numeric; treated as non-zero".to_string()],
        }
    }

    #[test]
    fn test_report_path_derivation() {
        assert_eq!(
            report_path(Path::new("/tmp/resolved.xlsx")),
            PathBuf::from("/tmp/resolved_report.txt")
        );
        assert_eq!(
            report_path(Path::new("out.xlsx")),
            PathBuf::from("out_report.txt")
        );
    }

    #[test]
    fn test_render_report_contains_counts_and_policy() {
        let text = render_report(
            Path::new("in.xlsx"),
            Path::new("out.xlsx"),
            &sample_summary(),
        );

        assert!(text.contains("Input file: in.xlsx"));
        assert!(text.contains("Total input rows: 10"));
        assert!(text.contains("Duplicate groups found: 2"));
        assert!(text.contains("Duplication rate: 20.0%"));
        for line in RULE_POLICY {
            assert!(text.contains(line));
        }
        assert!(text.contains("1900-01-01"));
        assert!(text.contains("GROUPS PROCESSED:"));
        assert!(text.contains("WARNINGS:"));
    }
}
