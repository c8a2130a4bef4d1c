use std::ops::Range;

use serde::Deserialize;

use super::{quantize, FitnessReducer};
use crate::compiler::{BoundEvaluator, WORST_FITNESS};
use crate::data::TrainingTable;

/// How one subject's prediction is obtained from its segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    /// One evaluation at `k = -1` inside the segment, which reads the
    /// segment's first row.
    #[default]
    Representative,
    /// Mean of the evaluations at every row of the segment.
    SegmentMean,
}

/// A subject's rows and its known clinical level.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectTarget {
    pub subject: String,
    pub rows: Range<usize>,
    pub level: f64,
}

/// Mean absolute error between the quantized prediction and the known level
/// over every subject that has rows.
#[derive(Debug, Clone)]
pub struct ClassifierFitness {
    targets: Vec<SubjectTarget>,
    mode: ClassifierMode,
}

impl ClassifierFitness {
    pub fn new(targets: Vec<SubjectTarget>, mode: ClassifierMode) -> Self {
        let targets = targets.into_iter().filter(|t| !t.rows.is_empty()).collect();
        Self { targets, mode }
    }

    /// Takes every subject of the table's segment index; the level is read
    /// from the output slot of the subject's first row.
    pub fn from_table(table: &TrainingTable, mode: ClassifierMode) -> Self {
        let output = table.output_column();
        let targets = table
            .segments()
            .iter()
            .filter_map(|segment| {
                let level = table.rows().get(segment.rows.start)?[output];
                Some(SubjectTarget {
                    subject: segment.subject.clone(),
                    rows: segment.rows.clone(),
                    level,
                })
            })
            .collect();
        Self::new(targets, mode)
    }

    pub fn targets(&self) -> &[SubjectTarget] {
        &self.targets
    }

    fn predict(&self, evaluator: &BoundEvaluator, idx: usize, rows: &Range<usize>) -> f64 {
        match self.mode {
            ClassifierMode::Representative => evaluator.evaluate_in(idx, -1, rows.clone()),
            ClassifierMode::SegmentMean => {
                let n = rows.len();
                (0..n)
                    .map(|k| evaluator.evaluate_in(idx, k as i64, rows.clone()))
                    .sum::<f64>()
                    / n as f64
            }
        }
    }
}

impl FitnessReducer for ClassifierFitness {
    fn reduce(&self, evaluator: &mut BoundEvaluator, idx: usize) -> f64 {
        if self.targets.is_empty() {
            return WORST_FITNESS;
        }
        let mut total = 0.0;
        for target in &self.targets {
            let raw = self.predict(evaluator, idx, &target.rows);
            if !raw.is_finite() {
                return WORST_FITNESS;
            }
            total += (quantize(raw) - target.level).abs();
        }
        total / self.targets.len() as f64
    }
}
