// Tabular loader: uploaded bytes -> Table

use chrono::{NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::{debug, info};

use crate::data::{CellValue, Table};
use crate::error::{ChartError, ChartResult};
use crate::xlsx;

/// Spreadsheet container formats accepted on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetFormat {
    #[default]
    Xlsx,
    Csv,
}

impl SheetFormat {
    /// Pick the format from a file name extension. Anything that is not
    /// `.csv` is treated as a workbook.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        match path
            .as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("csv") => SheetFormat::Csv,
            _ => SheetFormat::Xlsx,
        }
    }
}

/// Parse uploaded file bytes into a table.
pub fn load_table(bytes: &[u8], format: SheetFormat) -> ChartResult<Table> {
    let table = match format {
        SheetFormat::Xlsx => xlsx::read_first_sheet(bytes)?,
        SheetFormat::Csv => read_csv(bytes)?,
    };

    info!(
        ?format,
        columns = table.columns().len(),
        rows = table.row_count(),
        "loaded table"
    );
    Ok(table)
}

fn read_csv(bytes: &[u8]) -> ChartResult<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ChartError::UnsupportedFormat(
            "CSV has no header row".to_string(),
        ));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(parse_csv_cell).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "CSV parsed");
    Ok(Table::from_rows(headers, rows))
}

fn parse_csv_cell(raw: &str) -> CellValue {
    let s = raw.trim();
    if s.is_empty() {
        return CellValue::Empty;
    }
    if let Ok(n) = s.parse::<f64>() {
        return CellValue::Number(n);
    }
    if let Some(dt) = parse_csv_date(s) {
        return CellValue::Date(dt);
    }
    match s {
        "TRUE" | "True" | "true" => CellValue::Bool(true),
        "FALSE" | "False" | "false" => CellValue::Bool(false),
        _ => CellValue::Text(s.to_string()),
    }
}

fn parse_csv_date(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
