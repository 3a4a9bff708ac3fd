use serde::{Deserialize, Serialize};

use crate::processing::derived::{vacuum_inhg, PidKind};
use crate::processing::range::round_to;

pub const VACUUM_UNIT: &str = "inHg";

/// Which cell statistic a highlight rule or export reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Minimum,
    Maximum,
    Average,
    Last,
}

impl std::str::FromStr for Statistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "min" | "minimum" => Ok(Statistic::Minimum),
            "max" | "maximum" => Ok(Statistic::Maximum),
            "avg" | "average" => Ok(Statistic::Average),
            "last" => Ok(Statistic::Last),
            other => Err(format!("unknown statistic '{other}' (expected min, max, average or last)")),
        }
    }
}

/// Aggregate of one channel's samples within one cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelStats {
    pub count: usize,
    /// Arithmetic mean rounded to 2 decimals.
    pub average: f64,
    pub min: f64,
    pub max: f64,
    /// Final sample in insertion order.
    pub last: f64,
}

impl ChannelStats {
    /// Compute statistics from the samples, skipping non-finite values.
    pub fn compute(samples: &[f64]) -> Option<Self> {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut last = f64::NAN;
        for &v in samples.iter().filter(|v| v.is_finite()) {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
            last = v;
        }
        if count == 0 {
            return None;
        }
        Some(ChannelStats {
            count,
            average: round_to(sum / count as f64, 2),
            min,
            max,
            last,
        })
    }

    pub fn get(&self, stat: Statistic) -> f64 {
        match stat {
            Statistic::Minimum => self.min,
            Statistic::Maximum => self.max,
            Statistic::Average => self.average,
            Statistic::Last => self.last,
        }
    }

    /// Values as shown in the grid. Negative boost min, max and average
    /// each switch to vacuum in inHg independently; `last` is shown raw.
    pub fn displayed(&self, pid: PidKind, unit: &str) -> DisplayedStats {
        let show = |v: f64| -> (f64, String) {
            if pid == PidKind::Boost && v < 0.0 {
                (vacuum_inhg(v), VACUUM_UNIT.to_string())
            } else {
                (v, unit.to_string())
            }
        };
        DisplayedStats {
            min: show(self.min),
            max: show(self.max),
            average: show(self.average),
            last: (self.last, unit.to_string()),
        }
    }
}

/// `(value, unit)` pairs ready for formatting.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedStats {
    pub min: (f64, String),
    pub max: (f64, String),
    pub average: (f64, String),
    pub last: (f64, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn computes_min_max_average_last() {
        let stats = ChannelStats::compute(&[3.0, 1.0, 2.0, 1.5]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert_eq!(stats.average, 1.88);
        assert_eq!(stats.last, 1.5);
        assert_eq!(stats.get(Statistic::Maximum), 3.0);
        assert_eq!(stats.get(Statistic::Last), 1.5);
    }

    #[test]
    fn empty_and_non_finite_inputs() {
        assert!(ChannelStats::compute(&[]).is_none());
        assert!(ChannelStats::compute(&[f64::NAN]).is_none());
        let stats = ChannelStats::compute(&[f64::NAN, 4.0]).unwrap();
        assert_eq!(stats.count, 1);
        assert_eq!(stats.last, 4.0);
    }

    #[test]
    fn statistic_names() {
        assert_eq!("AVG".parse::<Statistic>(), Ok(Statistic::Average));
        assert_eq!("minimum".parse::<Statistic>(), Ok(Statistic::Minimum));
        assert!("median".parse::<Statistic>().is_err());
    }

    #[test]
    fn negative_boost_is_displayed_as_vacuum() {
        let stats = ChannelStats::compute(&[-5.0, 2.0]).unwrap();
        let shown = stats.displayed(PidKind::Boost, "kPa");
        assert_eq!(shown.min, (10.18, "inHg".to_string()));
        assert_eq!(shown.max, (2.0, "kPa".to_string()));
        assert_eq!(shown.average, (3.05, "inHg".to_string()));
        assert_eq!(shown.last, (2.0, "kPa".to_string()));

        let other = stats.displayed(PidKind::Column(3), "kPa");
        assert_eq!(other.min, (-5.0, "kPa".to_string()));
    }
}
