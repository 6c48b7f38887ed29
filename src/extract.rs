// 📦 Payload extraction - typed JSON schema over a spreadsheet column
// Each cell of the payload column holds a JSON request body; a serde
// schema replaces ad-hoc key scraping so schema drift surfaces as a
// per-row failure instead of silent corruption.

use crate::error::{ReconError, ReconResult};
use crate::field::Field;
use crate::table::Dataset;
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Default name of the column holding the JSON request body.
pub const PAYLOAD_COLUMN: &str = "corpo_requisicao";

/// Optional timestamp column carried through to the output unchanged.
pub const TIMESTAMP_COLUMN: &str = "data_hora";

const OUTPUT_HEADERS: [&str; 4] = ["idCarga", "origem", "nmArquivo", "data_hora"];

// ============================================================================
// PAYLOAD SCHEMA
// ============================================================================

#[derive(Debug, Default, Deserialize)]
struct RequestBody {
    #[serde(default)]
    carga: Carga,
    #[serde(default, rename = "clientesArquivo")]
    clientes_arquivo: Vec<ClienteArquivo>,
}

#[derive(Debug, Default, Deserialize)]
struct Carga {
    /// Numeric in most payloads, a string in older ones; both accepted.
    #[serde(default, rename = "idCarga")]
    id_carga: Option<Value>,
    #[serde(default)]
    origem: Option<String>,
    #[serde(default, rename = "nmArquivo")]
    nm_arquivo: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ClienteArquivo {
    #[serde(default, rename = "nmArquivo")]
    nm_arquivo: Option<String>,
}

// ============================================================================
// EXTRACTION OUTPUT
// ============================================================================

/// One flattened payload: the columns the reconciliation spreadsheets
/// are built from.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractedRecord {
    pub load_id: Field,
    pub origin: Field,
    pub file_name: Field,
    pub timestamp: Field,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionSummary {
    pub total_rows: usize,
    pub extracted: usize,
    /// One entry per skipped row, with its 1-based spreadsheet row
    /// number (header row included).
    pub failures: Vec<String>,
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Flatten the payload column of a dataset. Rows whose cell is not a
/// JSON string, fails to deserialize, or lacks `idCarga` are skipped
/// and recorded; they never abort the pass.
pub fn extract_payloads(
    dataset: &Dataset,
    payload_column: &str,
) -> ReconResult<(Vec<ExtractedRecord>, ExtractionSummary)> {
    let column = dataset
        .column(payload_column)
        .ok_or_else(|| ReconError::MissingColumns(vec![payload_column.to_string()]))?;
    let timestamp_column = dataset.column(TIMESTAMP_COLUMN);

    let mut records = Vec::new();
    let mut summary = ExtractionSummary {
        total_rows: dataset.len(),
        ..Default::default()
    };

    for row in &dataset.rows {
        let spreadsheet_row = row.index + 2;
        let cell = row.cell(column);

        let body = match cell {
            Field::Text(json) => match serde_json::from_str::<RequestBody>(json) {
                Ok(body) => body,
                Err(e) => {
                    summary.failures.push(format!("Row {}: {}", spreadsheet_row, e));
                    continue;
                }
            },
            _ => {
                summary
                    .failures
                    .push(format!("Row {}: value is not a JSON string", spreadsheet_row));
                continue;
            }
        };

        let load_id = match body.carga.id_carga {
            Some(Value::Null) | None => {
                summary
                    .failures
                    .push(format!("Row {}: idCarga empty, row skipped", spreadsheet_row));
                continue;
            }
            Some(value) => field_from_json(value),
        };

        // Older loads carry a routing prefix on the origin code.
        let origin = match body.carga.origem {
            Some(o) => {
                let stripped = o.strip_prefix("CGFF").unwrap_or(&o);
                Field::from_csv_cell(stripped)
            }
            None => Field::Missing,
        };

        // Prefer the per-client file name; fall back to the load's own.
        let file_name = body
            .clientes_arquivo
            .first()
            .and_then(|c| c.nm_arquivo.clone())
            .filter(|n| !n.trim().is_empty())
            .or(body.carga.nm_arquivo)
            .map(|n| Field::from_csv_cell(&n))
            .unwrap_or(Field::Missing);

        let timestamp = timestamp_column
            .map(|col| row.cell(col).clone())
            .unwrap_or(Field::Missing);

        records.push(ExtractedRecord {
            load_id,
            origin,
            file_name,
            timestamp,
        });
        summary.extracted += 1;
    }

    Ok((records, summary))
}

/// File-level operation: read `input`, flatten its payload column, and
/// write the extracted records to `output` as XLSX.
pub fn extract_file(
    input: &Path,
    output: &Path,
    payload_column: &str,
) -> ReconResult<ExtractionSummary> {
    let dataset = Dataset::load(input)?;
    if dataset.is_empty() {
        return Err(ReconError::EmptyInput);
    }

    let (records, summary) = extract_payloads(&dataset, payload_column)?;

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, header) in OUTPUT_HEADERS.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (row_num, record) in records.iter().enumerate() {
        let out_row = (row_num + 1) as u32;
        let cells = [
            &record.load_id,
            &record.origin,
            &record.file_name,
            &record.timestamp,
        ];
        for (col, cell) in cells.iter().enumerate() {
            let out_col = col as u16;
            match cell {
                Field::Int(i) => {
                    worksheet.write_number(out_row, out_col, *i as f64)?;
                }
                Field::Float(f) => {
                    worksheet.write_number(out_row, out_col, *f)?;
                }
                Field::Text(s) => {
                    worksheet.write_string(out_row, out_col, s)?;
                }
                Field::Missing => {}
            }
        }
    }

    workbook.save(output)?;
    Ok(summary)
}

fn field_from_json(value: Value) -> Field {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Field::Int(i)
            } else {
                Field::Float(n.as_f64().unwrap_or_default())
            }
        }
        Value::String(s) => Field::from_csv_cell(&s),
        other => Field::from_csv_cell(&other.to_string()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
