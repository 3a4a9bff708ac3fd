use std::path::Path;

use crate::data::parser::{self, Layout};
use crate::error::{HistoError, Result};

/// Files above this size need an explicit go-ahead before loading.
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 10_485_760;

/// Rows scanned when looking for the header.
const HEADER_SCAN_LINES: usize = 50;

#[derive(Debug, Clone, Copy)]
pub struct LoadOptions {
    /// The user confirmed loading a file above the threshold.
    pub accept_large_file: bool,
    pub large_file_threshold: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            accept_large_file: false,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    /// The `Time` column; kept for the header but never read as a value.
    Text,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub unit: Option<String>,
    pub kind: ColumnKind,
}

/// Immutable snapshot of one log file. Rows are stored row-major with
/// absent or unparseable cells as `None`.
#[derive(Debug, Clone, Default)]
pub struct LogTable {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Option<f64>>>,
    /// Data rows discarded because their width did not match the header.
    pub dropped_rows: usize,
}

impl LogTable {
    /// Build a table from raw records: header detection, the units row,
    /// then one numeric row per record of header width.
    pub fn from_records(records: &[Vec<String>]) -> Result<Self> {
        let layout = parser::detect_layout(records, HEADER_SCAN_LINES)
            .ok_or_else(|| HistoError::EmptyInput("no rows found".to_string()))?;
        Self::with_layout(records, layout)
    }

    fn with_layout(records: &[Vec<String>], layout: Layout) -> Result<Self> {
        let header = &records[layout.header];
        let width = header.len();
        if width == 0 || header.iter().all(|h| h.trim().is_empty()) {
            return Err(HistoError::MalformedInput("the header row is empty".to_string()));
        }

        let units = layout.units.map(|u| &records[u]);
        let columns: Vec<Column> = header
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let name = name.trim().to_string();
                let unit = units
                    .and_then(|u| u.get(i))
                    .map(|u| u.trim().to_string())
                    .filter(|u| !u.is_empty());
                let kind = if name.eq_ignore_ascii_case("time") {
                    ColumnKind::Text
                } else {
                    ColumnKind::Numeric
                };
                Column { name, unit, kind }
            })
            .collect();

        let mut rows = Vec::with_capacity(records.len().saturating_sub(layout.first_data_row()));
        let mut dropped_rows = 0usize;
        for record in records.iter().skip(layout.first_data_row()) {
            if record.len() != width {
                dropped_rows += 1;
                continue;
            }
            let row = record
                .iter()
                .zip(&columns)
                .map(|(cell, col)| match col.kind {
                    ColumnKind::Numeric => parser::parse_number(cell),
                    ColumnKind::Text => None,
                })
                .collect();
            rows.push(row);
        }

        if dropped_rows > 0 {
            tracing::warn!("Dropped {dropped_rows} rows whose width did not match the header");
        }

        Ok(LogTable { columns, rows, dropped_rows })
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Case-insensitive lookup by column name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_uppercase();
        self.columns.iter().position(|c| c.name.to_uppercase() == wanted)
    }

    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.rows.get(row)?.get(column).copied().flatten()
    }

    /// Every present value of one column, in row order.
    pub fn column_values(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().filter_map(move |r| r.get(column).copied().flatten())
    }
}

/// Load a CSV or Excel log.
pub fn load_file(path: &Path, options: &LoadOptions) -> Result<LogTable> {
    let size = std::fs::metadata(path)?.len();
    if size == 0 {
        return Err(HistoError::EmptyInput(path.display().to_string()));
    }
    if size > options.large_file_threshold && !options.accept_large_file {
        return Err(HistoError::LargeFile {
            size,
            threshold: options.large_file_threshold,
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let records = match ext.as_str() {
        "csv" | "txt" => read_csv_records(path)?,
        "xls" | "xlsx" => read_excel_records(path)?,
        _ => return Err(HistoError::UnsupportedFormat(ext)),
    };
    if records.is_empty() {
        return Err(HistoError::EmptyInput(path.display().to_string()));
    }

    let table = LogTable::from_records(&records)?;
    tracing::info!(
        "Loaded {:?}: {} columns, {} rows",
        path,
        table.column_count(),
        table.row_count()
    );
    Ok(table)
}

fn read_csv_records(path: &Path) -> Result<Vec<Vec<String>>> {
    let content = std::fs::read(path)?;
    // Logs from older tools are Latin-1; map bytes straight to code points.
    let text = match String::from_utf8(content) {
        Ok(text) => text,
        Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b',')
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut records = Vec::new();
    for result in reader.records() {
        match result {
            Ok(record) => records.push(record.iter().map(|s| s.to_string()).collect()),
            Err(e) => tracing::debug!("Skipping unreadable CSV record: {e}"),
        }
    }
    Ok(records)
}

fn read_excel_records(path: &Path) -> Result<Vec<Vec<String>>> {
    use calamine::{open_workbook_auto, Data, Reader};

    let mut workbook = open_workbook_auto(path)?;
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| HistoError::EmptyInput("no sheets found".to_string()))?;
    let range = workbook.worksheet_range(&sheet_name)?;

    Ok(range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => String::new(),
                    Data::String(s) => s.clone(),
                    Data::Float(f) => f.to_string(),
                    Data::Int(i) => i.to_string(),
                    Data::Bool(b) => b.to_string(),
                    Data::DateTime(dt) => dt.to_string(),
                    Data::DateTimeIso(s) => s.clone(),
                    Data::DurationIso(s) => s.clone(),
                    Data::Error(e) => format!("{e:?}"),
                })
                .collect()
        })
        .collect())
}
