use serde::{Deserialize, Serialize};

use crate::error::{HistoError, Result};
use crate::processing::range::round_to;

/// Every scale has exactly this many buckets.
pub const BUCKET_COUNT: usize = 17;

/// Upper bound used by the default tables for the last bucket.
pub const OPEN_UPPER_BOUND: f64 = 99999.0;

/// Which histogram axis a scale belongs to. Decides rounding and the gap
/// between one bucket's max and the next bucket's min.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScaleKind {
    Rpm,
    YAxis,
}

impl ScaleKind {
    pub fn precision(self) -> u32 {
        match self {
            ScaleKind::Rpm => 1,
            ScaleKind::YAxis => 3,
        }
    }

    pub fn increment(self) -> f64 {
        match self {
            ScaleKind::Rpm => 0.1,
            ScaleKind::YAxis => 0.001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub min: f64,
    pub value: f64,
    pub max: f64,
}

impl Bucket {
    pub fn new(min: f64, value: f64, max: f64) -> Self {
        Self { min, value, max }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Seventeen ascending, non-overlapping buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scale {
    kind: ScaleKind,
    buckets: Vec<Bucket>,
}

impl Scale {
    /// Equal-width scale over `[lower, upper]`. Rejects an empty or inverted
    /// range, and a range so narrow that the rounded bucket width drops
    /// below one increment.
    pub fn create(kind: ScaleKind, lower: f64, upper: f64) -> Result<Self> {
        if !(lower < upper) {
            return Err(HistoError::ScaleValidation(format!(
                "The lower value ({lower}) must be less than the upper value ({upper})."
            )));
        }
        let precision = kind.precision();
        let width = round_to((upper - lower) / BUCKET_COUNT as f64, precision);
        if width < kind.increment() {
            return Err(HistoError::ScaleValidation(format!(
                "The range {lower} - {upper} is too small to split into {BUCKET_COUNT} buckets."
            )));
        }
        Ok(Self::build(kind, lower, width))
    }

    /// Scale spanning observed data bounds. Never fails; used by the
    /// auto-scale path where the bounds come straight from the log.
    pub fn from_bounds(kind: ScaleKind, lower: f64, upper: f64) -> Self {
        Self::build(kind, lower, (upper - lower) / BUCKET_COUNT as f64)
    }

    fn build(kind: ScaleKind, lower: f64, width: f64) -> Self {
        let precision = kind.precision();
        let mut start = round_to(lower, precision);
        let mut buckets = Vec::with_capacity(BUCKET_COUNT);
        for _ in 0..BUCKET_COUNT {
            let max = round_to(start + width, precision);
            buckets.push(Bucket {
                min: round_to(start, precision),
                value: round_to(start + width / 2.0, precision),
                max,
            });
            start = max + kind.increment();
        }
        Self { kind, buckets }
    }

    /// Built-in table used when nothing else supplies a scale.
    pub fn default_for(kind: ScaleKind) -> Self {
        let table: &[(f64, f64, f64); BUCKET_COUNT] = match kind {
            ScaleKind::Rpm => &DEFAULT_RPM,
            ScaleKind::YAxis => &DEFAULT_Y_AXIS,
        };
        Self {
            kind,
            buckets: table.iter().map(|&(min, value, max)| Bucket { min, value, max }).collect(),
        }
    }

    /// Wrap externally supplied buckets (a scale file), checking count and
    /// ordering.
    pub fn from_buckets(kind: ScaleKind, buckets: Vec<Bucket>) -> Result<Self> {
        if buckets.len() != BUCKET_COUNT {
            return Err(HistoError::ScaleValidation(format!(
                "expected {BUCKET_COUNT} buckets, found {}",
                buckets.len()
            )));
        }
        for (i, b) in buckets.iter().enumerate() {
            if b.min > b.max {
                return Err(HistoError::ScaleValidation(format!(
                    "bucket {i} has min {} above max {}",
                    b.min, b.max
                )));
            }
            if i > 0 && b.min <= buckets[i - 1].max {
                return Err(HistoError::ScaleValidation(format!(
                    "bucket {i} overlaps the bucket before it"
                )));
            }
        }
        Ok(Self { kind, buckets })
    }

    pub fn kind(&self) -> ScaleKind {
        self.kind
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn lower(&self) -> f64 {
        self.buckets[0].min
    }

    pub fn upper(&self) -> f64 {
        self.buckets[BUCKET_COUNT - 1].max
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.lower() && v <= self.upper()
    }

    /// Index of the bucket holding `v`, or `None` outside the scale.
    ///
    /// First match wins. A value that falls in the gap between two buckets
    /// (e.g. 506.05 with a 0.1 increment) goes to the lower neighbour.
    pub fn bucket_index(&self, v: f64) -> Option<usize> {
        if !self.contains(v) {
            return None;
        }
        for (i, b) in self.buckets.iter().enumerate() {
            if v <= b.max {
                return Some(if v >= b.min { i } else { i.saturating_sub(1) });
            }
        }
        None
    }

    /// New equal-width scale spanning buckets `first..=last`. A single
    /// bucket is widened by one neighbour so the new range is not empty.
    pub fn select_range(&self, first: usize, last: usize) -> Result<Self> {
        let mut low = first.min(last).min(BUCKET_COUNT - 1);
        let mut high = first.max(last).min(BUCKET_COUNT - 1);
        if low == high {
            if high + 1 < BUCKET_COUNT {
                high += 1;
            } else {
                low -= 1;
            }
        }
        Self::create(self.kind, self.buckets[low].min, self.buckets[high].max)
    }
}

const DEFAULT_RPM: [(f64, f64, f64); BUCKET_COUNT] = [
    (0.0, 416.0, 506.0),
    (506.1, 596.0, 686.0),
    (686.1, 776.0, 931.0),
    (931.1, 1086.0, 1185.0),
    (1185.1, 1284.0, 1366.5),
    (1366.6, 1449.0, 1589.5),
    (1589.6, 1730.0, 1900.0),
    (1900.1, 2070.0, 2240.0),
    (2240.1, 2410.0, 2655.0),
    (2655.1, 2900.0, 3179.0),
    (3179.1, 3458.0, 3660.5),
    (3660.6, 3863.0, 4047.5),
    (4047.6, 4232.0, 4376.5),
    (4376.6, 4521.0, 4703.5),
    (4703.6, 4886.0, 5069.0),
    (5069.1, 5252.0, 5435.0),
    (5435.1, 5618.0, OPEN_UPPER_BOUND),
];

const DEFAULT_Y_AXIS: [(f64, f64, f64); BUCKET_COUNT] = [
    (0.0, 0.15, 0.175),
    (0.176, 0.2, 0.22),
    (0.221, 0.24, 0.265),
    (0.266, 0.29, 0.315),
    (0.316, 0.34, 0.36),
    (0.361, 0.38, 0.405),
    (0.406, 0.43, 0.455),
    (0.456, 0.48, 0.505),
    (0.506, 0.53, 0.55),
    (0.551, 0.57, 0.595),
    (0.596, 0.62, 0.645),
    (0.646, 0.67, 0.69),
    (0.691, 0.71, 0.735),
    (0.736, 0.76, 0.785),
    (0.786, 0.81, 0.83),
    (0.831, 0.85, 0.875),
    (0.876, 0.9, OPEN_UPPER_BOUND),
];
