use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime};

/// Where the header and optional units rows sit in a raw record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub header: usize,
    pub units: Option<usize>,
}

impl Layout {
    pub fn first_data_row(&self) -> usize {
        self.units.unwrap_or(self.header) + 1
    }
}

/// Detect the header row (and a units row directly below it) within the
/// first `max_lines` records.
///
/// Scans bottom-up for the last row of the most common width that holds
/// no numbers or dates. If the row above it is also pure text, that row is
/// the header and the later one carries units.
pub fn detect_layout(records: &[Vec<String>], max_lines: usize) -> Option<Layout> {
    let rows = &records[..records.len().min(max_lines)];
    if rows.is_empty() {
        return None;
    }

    let mut counts: HashMap<usize, usize> = HashMap::new();
    for row in rows {
        *counts.entry(row.len()).or_insert(0) += 1;
    }
    // Ties go to the wider row so a short preamble never wins.
    let most_common = counts
        .into_iter()
        .max_by_key(|&(len, c)| (c, len))
        .map(|(len, _)| len)
        .unwrap_or(0);

    for i in (0..rows.len()).rev() {
        let row = &rows[i];
        if row.len() != most_common || !is_text_row(row) {
            continue;
        }
        if i > 0 && rows[i - 1].len() == most_common && is_header_row(&rows[i - 1]) {
            return Some(Layout { header: i - 1, units: Some(i) });
        }
        return Some(Layout { header: i, units: None });
    }

    Some(Layout { header: 0, units: None })
}

/// At least one non-empty cell and none that read as a number or date.
fn is_text_row(row: &[String]) -> bool {
    let mut any = false;
    for cell in row {
        let trimmed = cell.trim();
        if trimmed.is_empty() {
            continue;
        }
        if parse_number(trimmed).is_some() || is_date_like(trimmed) {
            return false;
        }
        any = true;
    }
    any
}

fn is_header_row(row: &[String]) -> bool {
    is_text_row(row) && row.iter().all(|c| !c.trim().is_empty())
}

/// Invariant-culture number parse. Blank, unparseable and non-finite
/// cells are absent.
pub fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn is_date_like(s: &str) -> bool {
    let has_separators = s.contains('/') || s.contains(':') || s.contains('-');
    let lower = s.to_lowercase();
    let has_date_words = lower.contains("am") || lower.contains("pm");

    if !has_separators && !has_date_words {
        return false;
    }

    let formats = [
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%m/%d/%Y %I:%M:%S %p",
        "%Y-%m-%d",
        "%m/%d/%Y",
    ];
    for fmt in &formats {
        if NaiveDateTime::parse_from_str(s, fmt).is_ok() {
            return true;
        }
        if NaiveDate::parse_from_str(s, fmt).is_ok() {
            return true;
        }
    }
    false
}
