use serde::{Deserialize, Serialize};

use crate::data::channels::ChannelMap;
use crate::processing::range::round_to;

/// Inches of mercury per unit of negative boost.
const VACUUM_FACTOR: f64 = 2.036;

/// A histogram channel: a raw log column or one computed from others.
///
/// Derived variants resolve their source columns through [`ChannelMap`],
/// which is fixed once per loaded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PidKind {
    Column(usize),
    InjectorDutyCycle,
    Boost,
    LtFuelAverage,
    StFuelAverage,
}

impl PidKind {
    pub fn is_derived(self) -> bool {
        !matches!(self, PidKind::Column(_))
    }

    /// Display name for derived channels; `None` for raw columns, whose
    /// name comes from the log header.
    pub fn derived_name(self) -> Option<&'static str> {
        match self {
            PidKind::Column(_) => None,
            PidKind::InjectorDutyCycle => Some("Injector Duty Cycle (calculated)"),
            PidKind::Boost => Some("Boost (calculated)"),
            PidKind::LtFuelAverage => Some("LT Fuel ADAP Avg (calculated)"),
            PidKind::StFuelAverage => Some("ST Fuel ADAP Avg (calculated)"),
        }
    }

    /// Whether the loaded log has every column this channel reads.
    pub fn is_available(self, channels: &ChannelMap) -> bool {
        match self {
            PidKind::Column(_) => true,
            PidKind::InjectorDutyCycle => channels.pulse_width.is_some(),
            PidKind::Boost => channels.map.is_some() && channels.baro.is_some(),
            PidKind::LtFuelAverage => channels.long_term_trims.is_some(),
            PidKind::StFuelAverage => channels.short_term_trims.is_some(),
        }
    }

    /// This channel's value for one row, or `None` when any input is
    /// missing from the row.
    pub fn sample(self, row: &[Option<f64>], channels: &ChannelMap) -> Option<f64> {
        let cell = |idx: usize| row.get(idx).copied().flatten();
        match self {
            PidKind::Column(idx) => cell(idx),
            PidKind::InjectorDutyCycle => {
                let pw = cell(channels.pulse_width?)?;
                let rpm = cell(channels.rpm)?;
                Some(injector_duty_cycle(pw, rpm))
            }
            PidKind::Boost => Some(boost(cell(channels.map?)?, cell(channels.baro?)?)),
            PidKind::LtFuelAverage => {
                let (a, b) = channels.long_term_trims?;
                Some(fuel_trim_average(cell(a)?, cell(b)?))
            }
            PidKind::StFuelAverage => {
                let (a, b) = channels.short_term_trims?;
                Some(fuel_trim_average(cell(a)?, cell(b)?))
            }
        }
    }
}

/// Percent of the available injection window used at this RPM.
pub fn injector_duty_cycle(pulse_width: f64, rpm: f64) -> f64 {
    round_to(pulse_width * rpm / 1_200_000.0, 1)
}

pub fn boost(map: f64, baro: f64) -> f64 {
    round_to(map - baro, 2)
}

pub fn fuel_trim_average(bank1: f64, bank2: f64) -> f64 {
    round_to((bank1 + bank2) / 2.0, 2)
}

/// Negative boost expressed as positive inches of mercury.
pub fn vacuum_inhg(boost: f64) -> f64 {
    round_to(boost * VACUUM_FACTOR * -1.0, 2)
}
