use std::ops::Range;

use serde::Deserialize;

use super::FitnessReducer;
use crate::compiler::{BoundEvaluator, WORST_FITNESS};

/// How residuals over the training interval are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualAggregation {
    /// Mean absolute residual.
    #[default]
    MeanAbsolute,
    /// Sum of squared residuals.
    SumSquared,
}

/// Residual fitness of a recursive one-step-ahead prediction.
///
/// The residual of a row is its first column (the observed value) minus its
/// output slot (the prediction written by the series evaluation).
#[derive(Debug, Clone)]
pub struct TemporalFitness {
    interval: Range<usize>,
    aggregation: ResidualAggregation,
}

impl TemporalFitness {
    pub fn new(interval: Range<usize>, aggregation: ResidualAggregation) -> Self {
        Self {
            interval,
            aggregation,
        }
    }

    pub fn interval(&self) -> Range<usize> {
        self.interval.clone()
    }
}

impl FitnessReducer for TemporalFitness {
    fn reduce(&self, evaluator: &mut BoundEvaluator, idx: usize) -> f64 {
        evaluator.evaluate_series(idx);
        let Some(rows) = evaluator.table().get(self.interval.clone()) else {
            return WORST_FITNESS;
        };
        if rows.is_empty() {
            return WORST_FITNESS;
        }

        let residuals = rows.iter().map(|row| match (row.first(), row.last()) {
            (Some(observed), Some(predicted)) => observed - predicted,
            _ => f64::NAN,
        });
        let fitness = match self.aggregation {
            ResidualAggregation::MeanAbsolute => {
                residuals.map(f64::abs).sum::<f64>() / rows.len() as f64
            }
            ResidualAggregation::SumSquared => residuals.map(|r| r * r).sum(),
        };
        if fitness.is_nan() {
            WORST_FITNESS
        } else {
            fitness
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{BatchCompiler, WorkerContext};
    use crate::phenotype::Phenotype;
    use tempfile::tempdir;

    fn bound(text: &str, table: Vec<Vec<f64>>) -> BoundEvaluator {
        let dir = tempdir().unwrap();
        BatchCompiler::interpreted(WorkerContext::new(0, dir.path()))
            .compile(&[Phenotype::valid(text)])
            .unwrap()
            .bind(table)
    }

    fn series() -> Vec<Vec<f64>> {
        vec![vec![1.0, 0.0], vec![2.0, 0.0], vec![4.0, 0.0], vec![8.0, 0.0]]
    }

    #[test]
    fn test_perfect_model_scores_zero() {
        let mut ev = bound("2 * getVariable(0, k)", series());
        let fitness = TemporalFitness::new(0..4, ResidualAggregation::MeanAbsolute);
        assert_eq!(fitness.reduce(&mut ev, 0), 0.0);
    }

    #[test]
    fn test_aggregations() {
        // predicts 1 everywhere: residuals 0, 1, 3, 7
        let mut ev = bound("1", series());
        let mean = TemporalFitness::new(0..4, ResidualAggregation::MeanAbsolute);
        assert_eq!(mean.reduce(&mut ev, 0), 11.0 / 4.0);
        let squared = TemporalFitness::new(0..4, ResidualAggregation::SumSquared);
        assert_eq!(squared.reduce(&mut ev, 0), 1.0 + 9.0 + 49.0);
        let tail = TemporalFitness::new(2..4, ResidualAggregation::MeanAbsolute);
        assert_eq!(tail.reduce(&mut ev, 0), 5.0);
    }

    #[test]
    fn test_degenerate_cases_are_worst() {
        let mut ev = bound("0 / 0", series());
        let fitness = TemporalFitness::new(0..4, ResidualAggregation::MeanAbsolute);
        assert_eq!(fitness.reduce(&mut ev, 0), WORST_FITNESS);

        let mut ev = bound("1", series());
        let empty = TemporalFitness::new(2..2, ResidualAggregation::MeanAbsolute);
        assert_eq!(empty.reduce(&mut ev, 0), WORST_FITNESS);
        let outside = TemporalFitness::new(2..9, ResidualAggregation::MeanAbsolute);
        assert_eq!(outside.reduce(&mut ev, 0), WORST_FITNESS);
    }

    #[test]
    fn test_score_does_not_depend_on_siblings() {
        let dir = tempdir().unwrap();
        let phenotypes = [Phenotype::valid("100"), Phenotype::valid("getVariable(1, k + 1)")];
        let compiler = BatchCompiler::interpreted(WorkerContext::new(0, dir.path()));
        let fitness = TemporalFitness::new(0..4, ResidualAggregation::MeanAbsolute);

        let mut shared = compiler.compile(&phenotypes).unwrap().bind(series());
        fitness.reduce(&mut shared, 0);
        let after_sibling = fitness.reduce(&mut shared, 1);

        let mut fresh = compiler.compile(&phenotypes).unwrap().bind(series());
        let alone = fitness.reduce(&mut fresh, 1);

        // predictions 1, 0, 0, 0 against 1, 2, 4, 8
        assert_eq!(alone, 14.0 / 4.0);
        assert_eq!(after_sibling, alone);
    }

    #[test]
    fn test_row_without_columns_is_worst() {
        let mut ev = bound("1", vec![vec![1.0, 0.0], vec![]]);
        let fitness = TemporalFitness::new(0..2, ResidualAggregation::MeanAbsolute);
        assert_eq!(fitness.reduce(&mut ev, 0), WORST_FITNESS);
    }

    #[test]
    fn test_aggregation_from_toml_name() {
        #[derive(Deserialize)]
        struct Holder {
            aggregation: ResidualAggregation,
        }
        let h: Holder = toml::from_str("aggregation = \"sum_squared\"").unwrap();
        assert_eq!(h.aggregation, ResidualAggregation::SumSquared);
    }
}
