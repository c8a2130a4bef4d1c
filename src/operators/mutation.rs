use std::fmt::Debug;

use super::check_probability;
use crate::error::Result;
use crate::rng::RandomNumberGenerator;
use crate::solution::{CodonBounds, Solution};

/// Changes a solution in place.
pub trait MutationOperator: Debug + Send + Sync {
    /// Mutates `solution` and returns whether its genotype changed. A changed
    /// solution has its objectives cleared.
    fn mutate(&self, solution: &mut Solution, rng: &mut RandomNumberGenerator) -> bool;
}

/// Replaces each codon, independently with probability `p`, by a uniform
/// draw inside the codon bounds.
///
/// # Examples
///
/// ```
/// use grameval::operators::{IntegerFlipMutation, MutationOperator};
/// use grameval::rng::RandomNumberGenerator;
/// use grameval::solution::{CodonBounds, Solution};
///
/// let mutation = IntegerFlipMutation::new(1.0, CodonBounds::new(1, 9)).unwrap();
/// let mut solution = Solution::new(vec![0; 8], 1);
/// let mut rng = RandomNumberGenerator::from_seed(3);
///
/// assert!(mutation.mutate(&mut solution, &mut rng));
/// assert!(solution.genotype().iter().all(|&c| (1..=9).contains(&c)));
/// ```
#[derive(Debug, Clone)]
pub struct IntegerFlipMutation {
    probability: f64,
    bounds: CodonBounds,
}

impl IntegerFlipMutation {
    /// # Errors
    ///
    /// Returns a configuration error if `probability` is outside `[0, 1]`.
    pub fn new(probability: f64, bounds: CodonBounds) -> Result<Self> {
        Ok(Self {
            probability: check_probability("mutation", probability)?,
            bounds,
        })
    }

    /// Uses `1 / rule_count` as the per-codon probability.
    pub fn for_rule_count(rule_count: usize, bounds: CodonBounds) -> Self {
        Self {
            probability: 1.0 / rule_count.max(1) as f64,
            bounds,
        }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    pub fn bounds(&self) -> CodonBounds {
        self.bounds
    }
}

impl MutationOperator for IntegerFlipMutation {
    fn mutate(&self, solution: &mut Solution, rng: &mut RandomNumberGenerator) -> bool {
        let mut changed = false;
        for codon in solution.genotype_mut().iter_mut() {
            if rng.chance(self.probability) {
                let drawn = rng.next_codon(self.bounds);
                changed |= drawn != *codon;
                *codon = drawn;
            }
        }
        if changed {
            solution.clear_objectives();
        }
        changed
    }
}
