// CSV to XLSX conversion. Batch mode never aborts on a single bad
// file; failures are collected and appended to a log in the
// destination directory.

use crate::error::ReconResult;
use crate::field::Field;
use crate::table::Dataset;
use chrono::Local;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const FAILURE_LOG: &str = "conversion_log.txt";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionFailure {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionSummary {
    pub converted: usize,
    pub failures: Vec<ConversionFailure>,
}

/// Convert one CSV file to `<dest_dir>/<stem>.xlsx`. The delimiter is
/// sniffed from the first line and headers are cleaned on the way in.
pub fn convert_file(csv_path: &Path, dest_dir: &Path) -> ReconResult<PathBuf> {
    let dataset = Dataset::load_csv(csv_path)?;

    let stem = csv_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("converted");
    let output = dest_dir.join(format!("{}.xlsx", stem));

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, header) in dataset.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for row in &dataset.rows {
        let out_row = (row.index + 1) as u32;
        for (col, cell) in row.cells.iter().enumerate() {
            let out_col = col as u16;
            match cell {
                // Numeric-looking cells become real numbers in the
                // workbook, matching what a spreadsheet import does.
                Field::Text(s) => match s.parse::<f64>() {
                    Ok(n) => worksheet.write_number(out_row, out_col, n)?,
                    Err(_) => worksheet.write_string(out_row, out_col, s)?,
                },
                Field::Int(i) => worksheet.write_number(out_row, out_col, *i as f64)?,
                Field::Float(f) => worksheet.write_number(out_row, out_col, *f)?,
                Field::Missing => continue,
            };
        }
    }

    workbook.save(&output)?;
    Ok(output)
}

/// Convert a list of CSV files. One bad file does not stop the batch;
/// its failure is recorded in the summary and appended to
/// [`FAILURE_LOG`] in the destination directory.
pub fn convert_batch(csv_paths: &[PathBuf], dest_dir: &Path) -> ReconResult<ConversionSummary> {
    let mut summary = ConversionSummary::default();

    for csv_path in csv_paths {
        match convert_file(csv_path, dest_dir) {
            Ok(_) => summary.converted += 1,
            Err(e) => summary.failures.push(ConversionFailure {
                file: file_name(csv_path),
                reason: e.to_string(),
            }),
        }
    }

    append_failure_log(dest_dir, &summary.failures)?;
    Ok(summary)
}

fn append_failure_log(dest_dir: &Path, failures: &[ConversionFailure]) -> std::io::Result<()> {
    if failures.is_empty() {
        return Ok(());
    }

    let mut log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dest_dir.join(FAILURE_LOG))?;

    writeln!(log, "\n[LOG - {}]", Local::now().format("%Y-%m-%d %H:%M:%S"))?;
    for failure in failures {
        writeln!(log, "{}: {}", failure.file, failure.reason)?;
    }
    Ok(())
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
    use std::fs::{self, File};

    fn write_csv(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_convert_file_produces_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(
            dir.path(),
            "input.csv",
            "subject_id;amount\n12345678909;150.5\n",
        );

        let output = convert_file(&csv, dir.path()).unwrap();
        assert_eq!(output, dir.path().join("input.xlsx"));
        assert!(output.exists());
    }

    #[test]
    fn test_batch_continues_past_failures() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_csv(dir.path(), "good.csv", "a,b\n1,2\n");
        let missing = dir.path().join("missing.csv");

        let summary = convert_batch(&[good, missing], dir.path()).unwrap();

        assert_eq!(summary.converted, 1);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].file, "missing.csv");

        let log = fs::read_to_string(dir.path().join(FAILURE_LOG)).unwrap();
        assert!(log.contains("missing.csv"));
    }

    #[test]
    fn test_no_log_written_without_failures() {
        let dir = tempfile::tempdir().unwrap();
        let csv = write_csv(dir.path(), "clean.csv", "a\n1\n");
        File::create(dir.path().join("unrelated")).unwrap();

        let summary = convert_batch(&[csv], dir.path()).unwrap();
        assert_eq!(summary.converted, 1);
        assert!(!dir.path().join(FAILURE_LOG).exists());
    }
}
