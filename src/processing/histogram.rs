use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::data::loader::LogTable;
use crate::error::Result;
use crate::processing::derived::PidKind;
use crate::processing::extract::sample_axes;
use crate::processing::scale::{Scale, BUCKET_COUNT};
use crate::processing::statistics::ChannelStats;
use crate::processing::worker::{JobContext, ROW_BATCH};
use crate::state::request::ProcessingRequest;

/// One RPM x Y-axis bucket.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    sample_count: usize,
    samples: BTreeMap<PidKind, Vec<f64>>,
    stats: BTreeMap<PidKind, ChannelStats>,
}

impl Cell {
    /// Rows that landed here, whether or not they carried every channel.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn is_empty(&self) -> bool {
        self.sample_count == 0
    }

    /// Raw values of one channel, in row order.
    pub fn samples(&self, pid: PidKind) -> &[f64] {
        self.samples.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Statistics of a selected channel. `None` for channels that were not
    /// selected or had no values in this cell.
    pub fn stats(&self, pid: PidKind) -> Option<&ChannelStats> {
        self.stats.get(&pid)
    }

    fn finalize(&mut self, selected: &[PidKind]) {
        for &pid in selected {
            if let Some(stats) = self.samples.get(&pid).and_then(|s| ChannelStats::compute(s)) {
                self.stats.insert(pid, stats);
            }
        }
    }
}

/// The finished 17x17 aggregation, with the scales it was binned against.
#[derive(Debug, Clone)]
pub struct CellGrid {
    cells: Vec<Cell>,
    rpm_scale: Arc<Scale>,
    y_axis_scale: Arc<Scale>,
    pub rows_read: usize,
    pub rows_binned: usize,
}

impl CellGrid {
    fn empty(rpm_scale: Arc<Scale>, y_axis_scale: Arc<Scale>) -> Self {
        Self {
            cells: vec![Cell::default(); BUCKET_COUNT * BUCKET_COUNT],
            rpm_scale,
            y_axis_scale,
            rows_read: 0,
            rows_binned: 0,
        }
    }

    pub fn cell(&self, rpm_bucket: usize, y_bucket: usize) -> &Cell {
        &self.cells[rpm_bucket * BUCKET_COUNT + y_bucket]
    }

    fn cell_mut(&mut self, rpm_bucket: usize, y_bucket: usize) -> &mut Cell {
        &mut self.cells[rpm_bucket * BUCKET_COUNT + y_bucket]
    }

    pub fn rpm_scale(&self) -> &Scale {
        &self.rpm_scale
    }

    pub fn y_axis_scale(&self) -> &Scale {
        &self.y_axis_scale
    }

    /// Sum of all cell sample counters.
    pub fn total_samples(&self) -> usize {
        self.cells.iter().map(Cell::sample_count).sum()
    }
}

/// Bin every row of `table` into the request's 17x17 grid and compute
/// statistics for the selected channels.
///
/// Rows without both axis values, rejected by the temperature filter, or
/// outside either scale are skipped. Cancellation is checked between
/// row batches; a cancelled run returns `Err(Cancelled)` and no grid.
pub fn aggregate(table: &LogTable, request: &ProcessingRequest, ctx: &JobContext) -> Result<CellGrid> {
    request.validate(table)?;
    let started = Instant::now();
    let rpm_scale = &request.rpm_scale;
    let y_scale = &request.y_axis_scale;
    let mut grid = CellGrid::empty(Arc::clone(rpm_scale), Arc::clone(y_scale));
    let total = table.row_count();

    ctx.report(format!("Processing {total} rows"));
    for (i, row) in table.rows.iter().enumerate() {
        if i % ROW_BATCH == 0 {
            ctx.check()?;
            if i > 0 && i % (ROW_BATCH * 16) == 0 {
                ctx.report(format!("Processed {i} of {total} rows"));
            }
        }
        grid.rows_read += 1;

        let Some(axes) = sample_axes(row, request) else {
            continue;
        };
        let (Some(rpm_bucket), Some(y_bucket)) =
            (rpm_scale.bucket_index(axes.rpm), y_scale.bucket_index(axes.y))
        else {
            continue;
        };

        let cell = grid.cell_mut(rpm_bucket, y_bucket);
        cell.sample_count += 1;
        for &pid in &request.recorded {
            if let Some(v) = pid.sample(row, &request.channels) {
                cell.samples.entry(pid).or_default().push(v);
            }
        }
        grid.rows_binned += 1;
    }

    ctx.check()?;
    ctx.report("Calculating cell statistics");
    for cell in grid.cells.iter_mut().filter(|c| !c.is_empty()) {
        cell.finalize(&request.selected);
    }

    tracing::info!(
        "Binned {} of {} rows into the grid in {:?}",
        grid.rows_binned,
        grid.rows_read,
        started.elapsed()
    );
    Ok(grid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::channels::ChannelMap;
    use crate::data::loader::{Column, ColumnKind};
    use crate::error::HistoError;
    use crate::processing::scale::ScaleKind;
    use crate::state::request::{TemperatureFilter, YAxisSource};

    fn table(rows: Vec<Vec<Option<f64>>>) -> LogTable {
        let names = ["RPM", "PRatio", "ECT", "Knock"];
        LogTable {
            columns: names
                .iter()
                .map(|n| Column { name: n.to_string(), unit: None, kind: ColumnKind::Numeric })
                .collect(),
            rows,
            dropped_rows: 0,
        }
    }

    fn request() -> ProcessingRequest {
        let pids = vec![PidKind::Column(0), PidKind::Column(3)];
        ProcessingRequest {
            channels: ChannelMap {
                rpm: 0,
                pressure_ratio: Some(1),
                coolant: Some(2),
                ..ChannelMap::default()
            },
            y_axis: YAxisSource::PressureRatio(1),
            temperature_filter: None,
            recorded: pids.clone(),
            selected: pids,
            rpm_scale: Arc::new(Scale::default_for(ScaleKind::Rpm)),
            y_axis_scale: Arc::new(Scale::default_for(ScaleKind::YAxis)),
        }
    }

    #[test]
    fn cancelled_context_yields_no_grid() {
        let rows = (0..ROW_BATCH * 3)
            .map(|i| vec![Some(800.0 + i as f64), Some(0.5), Some(190.0), Some(1.0)])
            .collect();
        let ctx = JobContext::detached();
        ctx.cancel();
        assert!(matches!(aggregate(&table(rows), &request(), &ctx), Err(HistoError::Cancelled)));
    }

    #[test]
    fn single_row_lands_in_first_cell() {
        let t = table(vec![vec![Some(500.0), Some(0.16), Some(190.0), Some(1.0)]]);
        let grid = aggregate(&t, &request(), &JobContext::detached()).unwrap();
        assert_eq!(grid.cell(0, 0).sample_count(), 1);
        assert_eq!(grid.total_samples(), 1);
        assert_eq!(grid.cell(0, 0).samples(PidKind::Column(3)), &[1.0]);
    }

    #[test]
    fn counts_rows_even_without_channel_values() {
        let t = table(vec![
            vec![Some(2000.0), Some(0.5), Some(190.0), Some(2.0)],
            vec![Some(2010.0), Some(0.49), Some(190.0), None],
            vec![Some(2020.0), Some(0.48), Some(190.0), Some(4.0)],
        ]);
        let grid = aggregate(&t, &request(), &JobContext::detached()).unwrap();
        let cell = grid.cell(7, 7);
        assert_eq!(cell.sample_count(), 3);
        let stats = cell.stats(PidKind::Column(3)).unwrap();
        assert_eq!(stats.count, 2);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.average, 3.0);
        assert_eq!(stats.last, 4.0);
    }

    #[test]
    fn out_of_range_and_missing_rows_are_skipped() {
        let t = table(vec![
            vec![Some(-5.0), Some(0.3), None, Some(1.0)],
            vec![Some(800.0), Some(100000.0), None, Some(1.0)],
            vec![None, Some(0.3), None, Some(1.0)],
            vec![Some(800.0), Some(0.3), None, Some(1.0)],
        ]);
        let grid = aggregate(&t, &request(), &JobContext::detached()).unwrap();
        assert_eq!(grid.rows_read, 4);
        assert_eq!(grid.rows_binned, 1);
        assert_eq!(grid.total_samples(), 1);
    }

    #[test]
    fn temperature_filter_excludes_rows() {
        let t = table(vec![
            vec![Some(800.0), Some(0.3), Some(150.0), Some(1.0)],
            vec![Some(800.0), Some(0.3), Some(190.0), Some(1.0)],
            vec![Some(800.0), Some(0.3), None, Some(1.0)],
        ]);
        let mut req = request();
        req.temperature_filter = Some(TemperatureFilter { column: 2, low: 160.0, high: 220.0 });
        let grid = aggregate(&t, &req, &JobContext::detached()).unwrap();
        assert_eq!(grid.total_samples(), 1);
    }

    #[test]
    fn unselected_channels_have_no_stats() {
        let t = table(vec![vec![Some(800.0), Some(0.3), Some(190.0), Some(1.0)]]);
        let mut req = request();
        req.selected = vec![PidKind::Column(0)];
        let grid = aggregate(&t, &req, &JobContext::detached()).unwrap();
        let cell = grid.cell(2, 3);
        assert!(cell.stats(PidKind::Column(0)).is_some());
        assert!(cell.stats(PidKind::Column(3)).is_none());
        assert_eq!(cell.samples(PidKind::Column(3)), &[1.0]);
    }
}
