use std::ops::Range;

use tracing::info;

use crate::error::{GramEvalError, Result};

/// Lower edge of the normalized interval.
pub const NORMALIZED_LOW: f64 = 1.0;
/// Upper edge of the normalized interval.
pub const NORMALIZED_HIGH: f64 = 2.0;

/// Rows owned by one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub subject: String,
    pub rows: Range<usize>,
}

/// Subject-to-row-range mapping, in table order. Ranges are half-open and
/// never overlap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentIndex {
    segments: Vec<Segment>,
}

impl SegmentIndex {
    pub fn new(segments: Vec<Segment>) -> Self {
        debug_assert!(
            segments.windows(2).all(|w| w[0].rows.end <= w[1].rows.start),
            "segments must be ordered and disjoint"
        );
        Self { segments }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn get(&self, subject: &str) -> Option<&Range<usize>> {
        self.segments
            .iter()
            .find(|s| s.subject == subject)
            .map(|s| &s.rows)
    }
}

/// Per-column low/high bounds of the raw table.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationBounds {
    lows: Vec<f64>,
    highs: Vec<f64>,
}

impl NormalizationBounds {
    /// Scans the first `columns` columns of `rows`.
    pub fn compute(rows: &[Vec<f64>], columns: usize) -> Self {
        let mut lows = vec![f64::INFINITY; columns];
        let mut highs = vec![f64::NEG_INFINITY; columns];
        for row in rows {
            for (j, &v) in row.iter().take(columns).enumerate() {
                lows[j] = lows[j].min(v);
                highs[j] = highs[j].max(v);
            }
        }
        Self { lows, highs }
    }

    pub fn low(&self, column: usize) -> f64 {
        self.lows[column]
    }

    pub fn high(&self, column: usize) -> f64 {
        self.highs[column]
    }

    pub fn columns(&self) -> usize {
        self.lows.len()
    }

    /// Maps `value` of `column` into `[1, 2]`. A constant column maps to 1.
    pub fn normalize(&self, column: usize, value: f64) -> f64 {
        let (lo, hi) = (self.lows[column], self.highs[column]);
        if hi > lo {
            NORMALIZED_LOW + (NORMALIZED_HIGH - NORMALIZED_LOW) * (value - lo) / (hi - lo)
        } else {
            NORMALIZED_LOW
        }
    }

    pub fn denormalize(&self, column: usize, value: f64) -> f64 {
        let (lo, hi) = (self.lows[column], self.highs[column]);
        if hi > lo {
            lo + (value - NORMALIZED_LOW) * (hi - lo) / (NORMALIZED_HIGH - NORMALIZED_LOW)
        } else {
            lo
        }
    }
}

/// Dense numeric table. Every row is `num_input_columns + 1` wide; the last
/// slot is reserved for a predicted or known output value.
#[derive(Debug, Clone)]
pub struct TrainingTable {
    rows: Vec<Vec<f64>>,
    num_input_columns: usize,
    segments: SegmentIndex,
    bounds: Option<NormalizationBounds>,
    interval: Range<usize>,
}

impl TrainingTable {
    pub fn new(rows: Vec<Vec<f64>>, num_input_columns: usize, segments: SegmentIndex) -> Self {
        let interval = 0..rows.len();
        Self {
            rows,
            num_input_columns,
            segments,
            bounds: None,
            interval,
        }
    }

    /// Builds a table from rows that still lack the output slot.
    pub fn from_inputs(inputs: Vec<Vec<f64>>) -> Self {
        let mut builder = super::TableBuilder::new();
        inputs
            .into_iter()
            .for_each(|row| builder.push_record(row, None));
        builder.finalize()
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn num_input_columns(&self) -> usize {
        self.num_input_columns
    }

    /// Total row width, output slot included.
    pub fn width(&self) -> usize {
        self.num_input_columns + 1
    }

    pub fn output_column(&self) -> usize {
        self.num_input_columns
    }

    pub fn segments(&self) -> &SegmentIndex {
        &self.segments
    }

    pub fn bounds(&self) -> Option<&NormalizationBounds> {
        self.bounds.as_ref()
    }

    /// Rows that count towards fitness.
    pub fn interval(&self) -> Range<usize> {
        self.interval.clone()
    }

    /// Restricts fitness to `[begin, end)`. `None` keeps the table edge.
    pub fn with_interval(mut self, begin: Option<usize>, end: Option<usize>) -> Result<Self> {
        let begin = begin.unwrap_or(0);
        let end = end.unwrap_or(self.rows.len());
        if begin > end || end > self.rows.len() {
            return Err(GramEvalError::Configuration(format!(
                "training interval [{}, {}) is outside a table of {} rows",
                begin,
                end,
                self.rows.len()
            )));
        }
        info!("Evaluation interval: [{},{})", begin, end);
        self.interval = begin..end;
        Ok(self)
    }

    /// Rescales every input column into `[1, 2]` and keeps the bounds for
    /// reporting. Calling it twice is a no-op.
    pub fn normalize(mut self) -> Self {
        if self.bounds.is_some() {
            return self;
        }
        let bounds = NormalizationBounds::compute(&self.rows, self.num_input_columns);
        for row in &mut self.rows {
            for (j, v) in row.iter_mut().take(self.num_input_columns).enumerate() {
                *v = bounds.normalize(j, *v);
            }
        }
        self.bounds = Some(bounds);
        self
    }

    /// Copy of the rows, handed to a freshly bound evaluator.
    pub fn snapshot(&self) -> Vec<Vec<f64>> {
        self.rows.clone()
    }
}
