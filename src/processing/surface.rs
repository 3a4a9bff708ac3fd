use std::collections::HashMap;
use std::time::Instant;

use crate::data::channels::{PidCatalog, PidInfo};
use crate::data::loader::LogTable;
use crate::error::{HistoError, Result};
use crate::processing::derived::PidKind;
use crate::processing::extract::{sample_axes, AxisSample};
use crate::processing::range::{rescale, round_to};
use crate::processing::statistics::Statistic;
use crate::processing::worker::{JobContext, ROW_BATCH};
use crate::state::request::{ProcessingRequest, YAxisSource, RATIO_AXIS_NAME};
use crate::triangulation::Point;

/// Half the edge of the render cube.
pub const RENDER_EXTENT: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceRequest {
    pub pid: PidKind,
    pub aggregation: Statistic,
}

/// One selected channel reduced to a value per distinct (RPM, Y-axis)
/// coordinate, ready for triangulation.
#[derive(Debug, Clone)]
pub struct SurfaceData {
    /// Rescaled into the [-50, 50] cube. `x` is RPM, `y` the Y-axis value.
    pub points: Vec<Point>,
    /// Same order as `points`, in log units.
    pub samples: Vec<Point>,
    pub lowest_x: f64,
    pub highest_x: f64,
    pub lowest_z: f64,
    pub highest_z: f64,
    pub lowest_value: f64,
    pub highest_value: f64,
    pub x_label: String,
    pub y_label: String,
    pub z_label: String,
    pub value_unit: String,
}

enum Reduction {
    Values(Vec<f64>),
    Running(f64),
}

/// Reduce one channel over every accepted row to one value per distinct
/// coordinate, then rescale coordinates and values into the render cube.
///
/// Two passes over the snapshot: the first finds the axis extents from
/// every accepted row, the second collects channel values.
pub fn build_surface(
    table: &LogTable,
    request: &ProcessingRequest,
    catalog: &PidCatalog,
    surface: SurfaceRequest,
    ctx: &JobContext,
) -> Result<SurfaceData> {
    request.validate(table)?;
    let pid = catalog
        .get(surface.pid)
        .ok_or_else(|| HistoError::UnknownPid(format!("{:?}", surface.pid)))?;
    let started = Instant::now();

    ctx.report("Finding axis ranges");
    let mut extents: Option<(f64, f64, f64, f64)> = None;
    for (i, row) in table.rows.iter().enumerate() {
        if i % ROW_BATCH == 0 {
            ctx.check()?;
        }
        let Some(AxisSample { rpm, y }) = sample_axes(row, request) else {
            continue;
        };
        extents = Some(match extents {
            None => (rpm, rpm, y, y),
            Some((lx, hx, lz, hz)) => (lx.min(rpm), hx.max(rpm), lz.min(y), hz.max(y)),
        });
    }
    let (lowest_x, highest_x, lowest_z, highest_z) = extents.ok_or_else(|| {
        HistoError::EmptyInput("no rows have both an RPM and a Y-axis value".to_string())
    })?;

    ctx.report(format!("Collecting {} values", pid.display_name()));
    let mut index: HashMap<(u64, u64), usize> = HashMap::new();
    let mut coords: Vec<(f64, f64)> = Vec::new();
    let mut reductions: Vec<Reduction> = Vec::new();
    for (i, row) in table.rows.iter().enumerate() {
        if i % ROW_BATCH == 0 {
            ctx.check()?;
        }
        let Some(AxisSample { rpm, y }) = sample_axes(row, request) else {
            continue;
        };
        let Some(value) = surface.pid.sample(row, &request.channels) else {
            continue;
        };

        let key = (rpm.to_bits(), y.to_bits());
        match index.get(&key) {
            Some(&slot) => match &mut reductions[slot] {
                Reduction::Values(values) => values.push(value),
                Reduction::Running(current) => {
                    *current = match surface.aggregation {
                        Statistic::Minimum => current.min(value),
                        Statistic::Maximum => current.max(value),
                        Statistic::Last | Statistic::Average => value,
                    }
                }
            },
            None => {
                index.insert(key, coords.len());
                coords.push((rpm, y));
                reductions.push(match surface.aggregation {
                    Statistic::Average => Reduction::Values(vec![value]),
                    _ => Reduction::Running(value),
                });
            }
        }
    }
    if coords.is_empty() {
        return Err(HistoError::EmptyInput(format!(
            "{} has no values to plot",
            pid.display_name()
        )));
    }

    ctx.check()?;
    let samples: Vec<Point> = coords
        .iter()
        .zip(&reductions)
        .map(|(&(x, y), reduction)| {
            let value = match reduction {
                Reduction::Values(values) => round_to(values.iter().sum::<f64>() / values.len() as f64, 3),
                Reduction::Running(v) => *v,
            };
            Point::new(x, y, value)
        })
        .collect();

    let lowest_value = samples.iter().map(|p| p.value).fold(f64::INFINITY, f64::min);
    let highest_value = samples.iter().map(|p| p.value).fold(f64::NEG_INFINITY, f64::max);

    let points = samples
        .iter()
        .map(|p| {
            Point::new(
                rescale(lowest_x, highest_x, -RENDER_EXTENT, RENDER_EXTENT, p.x),
                rescale(lowest_z, highest_z, -RENDER_EXTENT, RENDER_EXTENT, p.y),
                rescale(lowest_value, highest_value, -RENDER_EXTENT, RENDER_EXTENT, p.value),
            )
        })
        .collect();

    let z_label = match request.y_axis {
        YAxisSource::PressureRatio(col) | YAxisSource::Custom(col) => catalog
            .get(PidKind::Column(col))
            .map(axis_label)
            .unwrap_or_else(|| RATIO_AXIS_NAME.to_string()),
        YAxisSource::MapOverBaro { .. } => RATIO_AXIS_NAME.to_string(),
    };

    tracing::info!(
        "Built surface for {} from {} coordinates in {:?}",
        pid.display_name(),
        samples.len(),
        started.elapsed()
    );

    Ok(SurfaceData {
        points,
        samples,
        lowest_x,
        highest_x,
        lowest_z,
        highest_z,
        lowest_value,
        highest_value,
        x_label: "RPM".to_string(),
        y_label: axis_label(pid),
        z_label,
        value_unit: pid.unit.clone(),
    })
}

fn axis_label(pid: &PidInfo) -> String {
    if pid.unit.is_empty() {
        pid.display_name().to_string()
    } else {
        format!("{} ({})", pid.display_name(), pid.unit)
    }
}
