//! # Genetic operators
//!
//! The variation and selection operators of the generational loop, plus the
//! Pareto dominance comparator they rank solutions with. Every operator is a
//! trait so a different implementation can be swapped in at the seam:
//!
//! - [`MutationOperator`], implemented by [`IntegerFlipMutation`]
//! - [`CrossoverOperator`], implemented by [`SinglePointCrossover`]
//! - [`SelectionOperator`], implemented by [`BinaryTournament`]
//! - [`Dominance`], implemented by [`SolutionDominance`]
//!
//! All objectives are minimized.

pub mod comparator;
pub mod crossover;
pub mod mutation;
pub mod selection;

pub use comparator::{
    compare_objectives, dominates, sort_by_dominance, Dominance, SolutionDominance,
};
pub use crossover::{CrossoverOperator, CrossoverPoint, SinglePointCrossover};
pub use mutation::{IntegerFlipMutation, MutationOperator};
pub use selection::{BinaryTournament, SelectionOperator};

use crate::error::{GramEvalError, Result};

pub(crate) fn check_probability(name: &str, p: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(GramEvalError::Configuration(format!(
            "{} probability must be in [0, 1], got {}",
            name, p
        )))
    }
}
