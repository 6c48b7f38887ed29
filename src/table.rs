// 📊 Tabular ingestion - XLSX/CSV into an in-memory Dataset
// The whole table is held in memory for the duration of one pass.

use crate::error::{ReconError, ReconResult};
use crate::field::Field;
use calamine::{open_workbook, Data, Reader, Xlsx};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// One row of the dataset. `index` is the zero-based position in the
/// original file and never changes after loading; the tie-break resolver
/// depends on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub index: usize,
    pub cells: Vec<Field>,
}

impl Row {
    pub fn cell(&self, col: usize) -> &Field {
        self.cells.get(col).unwrap_or(&Field::Missing)
    }
}

/// An ordered, immutable table: headers plus rows of Fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>) -> Self {
        Dataset {
            headers,
            rows: Vec::new(),
        }
    }

    /// Append a row, padding or truncating cells to the header width.
    pub fn push_row(&mut self, mut cells: Vec<Field>) {
        cells.resize(self.headers.len(), Field::Missing);
        self.rows.push(Row {
            index: self.rows.len(),
            cells,
        });
    }

    /// Resolve a header name to a column index.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Load a table from disk, dispatching on the file extension.
    pub fn load(path: &Path) -> ReconResult<Dataset> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "xlsx" | "xlsm" => Dataset::load_xlsx(path),
            "csv" | "txt" => Dataset::load_csv(path),
            other => Err(ReconError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Read the first worksheet of an XLSX file. The first row is the
    /// header row.
    pub fn load_xlsx(path: &Path) -> ReconResult<Dataset> {
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let range = match workbook.worksheet_range_at(0) {
            Some(range) => range?,
            None => return Err(ReconError::NoWorksheet),
        };

        let mut rows = range.rows();
        let headers = match rows.next() {
            Some(header_row) => header_row
                .iter()
                .map(|cell| clean_header(&cell.to_string()))
                .collect(),
            None => Vec::new(),
        };

        let mut dataset = Dataset::new(headers);
        for row in rows {
            dataset.push_row(row.iter().map(field_from_xlsx).collect());
        }

        Ok(dataset)
    }

    /// Read a CSV file, sniffing the delimiter from the first line.
    pub fn load_csv(path: &Path) -> ReconResult<Dataset> {
        let delimiter = sniff_delimiter(path)?;

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_path(path)?;

        let headers = rdr
            .headers()?
            .iter()
            .map(clean_header)
            .collect();

        let mut dataset = Dataset::new(headers);
        for record in rdr.records() {
            let record = record?;
            dataset.push_row(record.iter().map(Field::from_csv_cell).collect());
        }

        Ok(dataset)
    }
}

/// Detect the CSV delimiter from the first line: `;` wins over `,`,
/// which wins over tab; anything else falls back to `,`.
pub fn sniff_delimiter(path: &Path) -> ReconResult<u8> {
    let file = File::open(path)?;
    let mut first_line = String::new();
    BufReader::new(file).read_line(&mut first_line)?;

    Ok(if first_line.contains(';') {
        b';'
    } else if first_line.contains(',') {
        b','
    } else if first_line.contains('\t') {
        b'\t'
    } else {
        b','
    })
}

/// Trim a header and strip stray quote characters that spreadsheet
/// exports leave behind.
pub fn clean_header(raw: &str) -> String {
    raw.trim().replace(['"', '\''], "")
}

fn field_from_xlsx(cell: &Data) -> Field {
    match cell {
        Data::Empty => Field::Missing,
        Data::String(s) => Field::from_csv_cell(s),
        Data::Int(i) => Field::Int(*i),
        Data::Float(f) => Field::Float(*f),
        Data::Bool(b) => Field::Text(b.to_string()),
        other => {
            let text = other.to_string();
            if text.trim().is_empty() {
                Field::Missing
            } else {
                Field::Text(text)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
