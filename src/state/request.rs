use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::channels::ChannelMap;
use crate::data::loader::LogTable;
use crate::error::{HistoError, Result};
use crate::processing::derived::PidKind;
use crate::processing::scale::{Scale, ScaleKind};

/// Y-axis label used when the axis comes from a logged or computed ratio.
pub const RATIO_AXIS_NAME: &str = "PRatio";

/// How the second histogram axis is read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum YAxisSource {
    /// A logged pressure-ratio column.
    PressureRatio(usize),
    /// MAP divided by barometric pressure.
    MapOverBaro { map: usize, baro: usize },
    /// Any user-chosen numeric column.
    Custom(usize),
}

impl YAxisSource {
    /// Name the axis goes by in scale files and tooltips.
    pub fn name(&self, table: &LogTable) -> String {
        match self {
            YAxisSource::Custom(col) => table
                .columns
                .get(*col)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            _ => RATIO_AXIS_NAME.to_string(),
        }
    }

    /// The axis value of one row. A MAP/baro ratio that is not finite
    /// (zero baro) counts as missing.
    pub fn read(&self, row: &[Option<f64>]) -> Option<f64> {
        let cell = |idx: usize| row.get(idx).copied().flatten();
        match *self {
            YAxisSource::PressureRatio(col) | YAxisSource::Custom(col) => cell(col),
            YAxisSource::MapOverBaro { map, baro } => {
                Some(cell(map)? / cell(baro)?).filter(|v| v.is_finite())
            }
        }
    }

    fn columns(&self) -> Vec<usize> {
        match *self {
            YAxisSource::PressureRatio(c) | YAxisSource::Custom(c) => vec![c],
            YAxisSource::MapOverBaro { map, baro } => vec![map, baro],
        }
    }
}

/// Inclusive coolant-temperature window; rows outside it, or without a
/// reading, are skipped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemperatureFilter {
    pub column: usize,
    pub low: f64,
    pub high: f64,
}

impl TemperatureFilter {
    pub fn accepts(&self, value: Option<f64>) -> bool {
        matches!(value, Some(v) if v >= self.low && v <= self.high)
    }
}

/// Everything one processing pass reads. Built once per open/process
/// cycle and shared read-only with the background job.
#[derive(Debug, Clone)]
pub struct ProcessingRequest {
    pub channels: ChannelMap,
    pub y_axis: YAxisSource,
    pub temperature_filter: Option<TemperatureFilter>,
    /// Channels whose samples are collected per cell.
    pub recorded: Vec<PidKind>,
    /// Channels whose statistics are computed per cell.
    pub selected: Vec<PidKind>,
    pub rpm_scale: Arc<Scale>,
    pub y_axis_scale: Arc<Scale>,
}

impl ProcessingRequest {
    /// Check every column the request touches against the table, once,
    /// before any row is read.
    pub fn validate(&self, table: &LogTable) -> Result<()> {
        let width = table.column_count();
        let check = |col: usize, what: &str| -> Result<()> {
            if col >= width {
                return Err(HistoError::MalformedInput(format!(
                    "{what} column {col} is outside the {width} columns of the log"
                )));
            }
            Ok(())
        };

        check(self.channels.rpm, "RPM")?;
        for col in self.y_axis.columns() {
            check(col, "Y-axis")?;
        }
        if let Some(filter) = &self.temperature_filter {
            check(filter.column, "Temperature filter")?;
            if filter.low > filter.high {
                return Err(HistoError::MalformedInput(format!(
                    "temperature filter low {} is above high {}",
                    filter.low, filter.high
                )));
            }
        }
        for pid in self.recorded.iter().chain(&self.selected) {
            match *pid {
                PidKind::Column(col) => check(col, "PID")?,
                derived if !derived.is_available(&self.channels) => {
                    return Err(HistoError::UnknownPid(
                        derived.derived_name().unwrap_or_default().to_string(),
                    ));
                }
                _ => {}
            }
        }
        if self.rpm_scale.kind() != ScaleKind::Rpm || self.y_axis_scale.kind() != ScaleKind::YAxis {
            return Err(HistoError::ScaleValidation(
                "scales are assigned to the wrong axes".to_string(),
            ));
        }
        Ok(())
    }
}
