//! # Fitness
//!
//! A [`FitnessReducer`] turns one dispatch case of a bound evaluator into a
//! single objective value, lower being better. Two reducers ship:
//!
//! - [`TemporalFitness`] predicts the series recursively and aggregates the
//!   residuals over the training interval.
//! - [`ClassifierFitness`] predicts one clinical scale value per subject,
//!   quantizes it and averages the absolute error.
//!
//! Whatever goes wrong during evaluation surfaces as `f64::INFINITY`.

mod classifier;
mod temporal;

use tracing::info;

use crate::compiler::BoundEvaluator;

pub use classifier::{ClassifierFitness, ClassifierMode, SubjectTarget};
pub use temporal::{ResidualAggregation, TemporalFitness};

/// Reduces the evaluation of case `idx` to one objective value.
pub trait FitnessReducer: Send + Sync {
    fn reduce(&self, evaluator: &mut BoundEvaluator, idx: usize) -> f64;
}

/// Snaps a raw prediction onto the clinical scale.
///
/// The `[0.5, 1.5)` band maps to 2 like the band above it, so a prediction
/// of 1 is never produced.
pub fn quantize(x: f64) -> f64 {
    if x >= 2.5 {
        3.0
    } else if x >= 1.5 {
        2.0
    } else if x >= 0.5 {
        2.0
    } else {
        0.0
    }
}

/// Rewrites variable lookups into readable aliases: column 0 becomes `yr`,
/// the output column (`width - 1`) becomes `yp`, any other column `i`
/// becomes `u<i>`.
pub fn alias_rewrite(expression: &str, width: usize) -> String {
    let mut text = expression.to_string();
    for i in 0..width {
        let alias = if i == 0 {
            "yr".to_string()
        } else if i + 1 == width {
            "yp".to_string()
        } else {
            format!("u{}", i)
        };
        text = text.replace(&format!("getVariable({},", i), &format!("{}(", alias));
    }
    text
}

/// Remembers the best fitness a worker has seen and logs every improvement.
#[derive(Debug, Clone)]
pub struct BestTracker {
    best: f64,
    width: usize,
}

impl BestTracker {
    /// `width` is the table width used for alias rewriting.
    pub fn new(width: usize) -> Self {
        Self {
            best: f64::INFINITY,
            width,
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Records `fitness`; returns whether it improved on the best so far.
    pub fn observe(&mut self, fitness: f64, expression: &str) -> bool {
        if fitness < self.best {
            self.best = fitness;
            info!(
                "Best FIT={}; Expression={}",
                100.0 * (1.0 - fitness),
                alias_rewrite(expression, self.width)
            );
            true
        } else {
            false
        }
    }
}
