use crate::data::channels::{PidCatalog, PidInfo};
use crate::processing::histogram::{Cell, CellGrid};
use crate::processing::scale::Bucket;
use crate::processing::statistics::ChannelStats;
use crate::state::preferences::{CellColor, DisplayPreferences, SortOrder};

/// Text and tooltip of one axis header.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisHeader {
    pub label: String,
    pub tooltip: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellView {
    /// Empty for cells without samples.
    pub text: String,
    pub color: CellColor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// Index into the Y-axis scale.
    pub y_bucket: usize,
    pub header: AxisHeader,
    /// One per RPM bucket, lowest RPM first.
    pub cells: Vec<CellView>,
}

/// The grid as shown to the user: RPM across, Y-axis down.
#[derive(Debug, Clone, PartialEq)]
pub struct GridReport {
    pub columns: Vec<AxisHeader>,
    pub rows: Vec<GridRow>,
}

/// Lay out a processed grid for display.
///
/// Each PID with statistics in a cell gets a block of text, in catalogue
/// (name) order. Cells are coloured by the preferences' highlight rule.
pub fn format_grid(
    grid: &CellGrid,
    catalog: &PidCatalog,
    prefs: &DisplayPreferences,
    y_axis_name: &str,
) -> GridReport {
    let columns = grid
        .rpm_scale()
        .buckets()
        .iter()
        .map(|b| AxisHeader {
            label: b.value.to_string(),
            tooltip: format!("{} rpm - {} rpm", b.min, b.max),
        })
        .collect();

    let highlight = prefs.highlight.as_ref().and_then(|rule| {
        let pid = catalog.find(&rule.pid);
        if pid.is_none() {
            tracing::warn!("Highlight PID '{}' is not in this log", rule.pid);
        }
        pid.map(|p| (rule, p.kind))
    });

    let mut rows: Vec<GridRow> = grid
        .y_axis_scale()
        .buckets()
        .iter()
        .enumerate()
        .map(|(y, bucket)| GridRow {
            y_bucket: y,
            header: row_header(bucket, y_axis_name),
            cells: (0..grid.rpm_scale().buckets().len())
                .map(|rpm| {
                    let cell = grid.cell(rpm, y);
                    let color = if cell.is_empty() {
                        CellColor::Empty
                    } else {
                        highlight
                            .and_then(|(rule, kind)| {
                                cell.stats(kind)
                                    .copied()
                                    .or_else(|| ChannelStats::compute(cell.samples(kind)))
                                    .map(|s| rule.classify(s.get(rule.statistic)))
                            })
                            .unwrap_or(CellColor::Neutral)
                    };
                    CellView {
                        text: cell_text(cell, catalog, prefs),
                        color,
                    }
                })
                .collect(),
        })
        .collect();

    if prefs.y_axis_sort == SortOrder::Descending {
        rows.reverse();
    }
    GridReport { columns, rows }
}

fn row_header(bucket: &Bucket, y_axis_name: &str) -> AxisHeader {
    AxisHeader {
        label: bucket.value.to_string(),
        tooltip: format!("{} - {} {}", bucket.min, bucket.max, y_axis_name),
    }
}

/// Display text of one cell.
pub fn cell_text(cell: &Cell, catalog: &PidCatalog, prefs: &DisplayPreferences) -> String {
    if cell.is_empty() {
        return String::new();
    }

    let mut lines = Vec::new();
    for pid in catalog.pids() {
        let Some(stats) = cell.stats(pid.kind) else {
            continue;
        };
        if prefs.show_pid_labels {
            lines.push(pid_label(pid, prefs));
        }
        let values = stat_line(pid, stats, prefs);
        if !values.is_empty() {
            lines.push(values);
        }
    }
    if prefs.show_sample_size {
        lines.push(format!("SampleSize: {}", cell.sample_count()));
    }
    lines.join("\n")
}

fn pid_label(pid: &PidInfo, prefs: &DisplayPreferences) -> String {
    if prefs.show_custom_pid_labels {
        pid.display_name().to_string()
    } else {
        pid.name.clone()
    }
}

fn stat_line(pid: &PidInfo, stats: &ChannelStats, prefs: &DisplayPreferences) -> String {
    let shown = stats.displayed(pid.kind, &pid.unit);
    let mut parts = Vec::new();
    if prefs.show_min_and_max {
        parts.push(format!("{}{}", shown.min.0, shown.min.1));
        parts.push(format!("{}{}", shown.max.0, shown.max.1));
    }
    if prefs.show_average {
        parts.push(format!("{}{}", shown.average.0, shown.average.1));
    }
    if prefs.show_last_value {
        parts.push(format!("{}{}", shown.last.0, shown.last.1));
    }
    parts.join(" | ")
}
