use std::io::Write;

use crate::error::Result;
use crate::processing::derived::PidKind;
use crate::processing::histogram::CellGrid;
use crate::processing::statistics::{ChannelStats, Statistic};
use crate::state::preferences::SortOrder;

/// Field separator for exported grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Comma, for files.
    Comma,
    /// Tab, for pasting into a spreadsheet.
    Tab,
}

impl Delimiter {
    fn byte(self) -> u8 {
        match self {
            Delimiter::Comma => b',',
            Delimiter::Tab => b'\t',
        }
    }
}

/// Write one statistic of one PID as 17 rows of 17 values: one row per
/// Y-axis bucket, one column per RPM bucket. Cells without samples, or
/// without values for the PID, are written as `0`.
///
/// Statistics come from the cell when the PID was selected, otherwise
/// they are computed from the recorded samples.
pub fn write_grid<W: Write>(
    writer: W,
    grid: &CellGrid,
    pid: PidKind,
    statistic: Statistic,
    delimiter: Delimiter,
    sort: SortOrder,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter.byte())
        .has_headers(false)
        .from_writer(writer);

    let rpm_count = grid.rpm_scale().buckets().len();
    let mut rows: Vec<Vec<String>> = (0..grid.y_axis_scale().buckets().len())
        .map(|y| {
            (0..rpm_count)
                .map(|rpm| {
                    let cell = grid.cell(rpm, y);
                    if cell.is_empty() {
                        return "0".to_string();
                    }
                    cell.stats(pid)
                        .copied()
                        .or_else(|| ChannelStats::compute(cell.samples(pid)))
                        .map(|s| s.get(statistic).to_string())
                        .unwrap_or_else(|| "0".to_string())
                })
                .collect()
        })
        .collect();

    if sort == SortOrder::Descending {
        rows.reverse();
    }
    for row in &rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    tracing::info!("Exported {:?} of {:?} for {} rows", statistic, pid, rows.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::channels::ChannelMap;
    use crate::data::loader::{Column, ColumnKind, LogTable};
    use crate::processing::histogram::aggregate;
    use crate::processing::scale::{Scale, ScaleKind};
    use crate::processing::worker::JobContext;
    use crate::state::request::{ProcessingRequest, YAxisSource};
    use std::sync::Arc;

    fn grid() -> CellGrid {
        let table = LogTable {
            columns: ["RPM", "PRatio", "Knock"]
                .iter()
                .map(|n| Column { name: n.to_string(), unit: None, kind: ColumnKind::Numeric })
                .collect(),
            rows: vec![
                vec![Some(450.0), Some(0.16), Some(1.5)],
                vec![Some(460.0), Some(0.16), Some(2.5)],
                vec![Some(6000.0), Some(0.3), None],
            ],
            dropped_rows: 0,
        };
        let request = ProcessingRequest {
            channels: ChannelMap::identify(&table).unwrap(),
            y_axis: YAxisSource::PressureRatio(1),
            temperature_filter: None,
            recorded: vec![PidKind::Column(2)],
            selected: Vec::new(),
            rpm_scale: Arc::new(Scale::default_for(ScaleKind::Rpm)),
            y_axis_scale: Arc::new(Scale::default_for(ScaleKind::YAxis)),
        };
        aggregate(&table, &request, &JobContext::detached()).unwrap()
    }

    fn export(statistic: Statistic, delimiter: Delimiter, sort: SortOrder) -> Vec<String> {
        let mut out = Vec::new();
        write_grid(&mut out, &grid(), PidKind::Column(2), statistic, delimiter, sort).unwrap();
        String::from_utf8(out).unwrap().lines().map(str::to_string).collect()
    }

    #[test]
    fn writes_seventeen_rows_of_seventeen() {
        let lines = export(Statistic::Average, Delimiter::Comma, SortOrder::Ascending);
        assert_eq!(lines.len(), 17);
        let first: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(first.len(), 17);
        assert_eq!(first[0], "2");
        assert!(first[1..].iter().all(|v| *v == "0"));
        assert!(lines[3].split(',').all(|v| v == "0"));
    }

    #[test]
    fn tab_delimited_and_descending() {
        let lines = export(Statistic::Maximum, Delimiter::Tab, SortOrder::Descending);
        assert_eq!(lines[16].split('\t').next(), Some("2.5"));
        assert_eq!(lines[0].split('\t').count(), 17);
    }
}
