use std::fmt::Debug;

use super::check_probability;
use crate::error::Result;
use crate::rng::RandomNumberGenerator;
use crate::solution::Solution;

/// Combines two parents into two children.
pub trait CrossoverOperator: Debug + Send + Sync {
    fn crossover(
        &self,
        a: &Solution,
        b: &Solution,
        rng: &mut RandomNumberGenerator,
    ) -> (Solution, Solution);
}

/// Where a single-point crossover cuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrossoverPoint {
    /// Always cut before this codon.
    Fixed(usize),
    /// Cut uniformly in `1..len`.
    #[default]
    Random,
}

/// Cuts both parents at one point and swaps the tails.
///
/// With probability `1 - p` the parents are returned unchanged as clones.
/// Parents of different length are cut inside their shared prefix.
///
/// When `avoid_repetition_in_front` is set the cut must fall strictly after
/// the first codon where the parents differ; a cut inside an identical front
/// would only swap the parents. If no such cut exists the parents are
/// returned as clones.
#[derive(Debug, Clone)]
pub struct SinglePointCrossover {
    probability: f64,
    crossover_point: CrossoverPoint,
    avoid_repetition_in_front: bool,
}

impl Default for SinglePointCrossover {
    fn default() -> Self {
        Self {
            probability: 0.9,
            crossover_point: CrossoverPoint::Random,
            avoid_repetition_in_front: false,
        }
    }
}

impl SinglePointCrossover {
    /// # Errors
    ///
    /// Returns a configuration error if `probability` is outside `[0, 1]`.
    pub fn new(probability: f64) -> Result<Self> {
        Ok(Self {
            probability: check_probability("crossover", probability)?,
            ..Self::default()
        })
    }

    pub fn with_point(mut self, crossover_point: CrossoverPoint) -> Self {
        self.crossover_point = crossover_point;
        self
    }

    pub fn with_avoid_repetition_in_front(mut self, avoid: bool) -> Self {
        self.avoid_repetition_in_front = avoid;
        self
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }

    /// Picks the cut for parents sharing `len` codons, or `None` when no
    /// useful cut exists.
    fn cut(&self, a: &[u32], b: &[u32], rng: &mut RandomNumberGenerator) -> Option<usize> {
        let len = a.len().min(b.len());
        let lowest = if self.avoid_repetition_in_front {
            let first_diff = a.iter().zip(b).position(|(x, y)| x != y)?;
            first_diff + 1
        } else {
            1
        };
        if lowest >= len {
            return None;
        }
        match self.crossover_point {
            CrossoverPoint::Fixed(n) if (lowest..len).contains(&n) => Some(n),
            CrossoverPoint::Fixed(_) => None,
            CrossoverPoint::Random => Some(rng.next_in(lowest..len)),
        }
    }
}

impl CrossoverOperator for SinglePointCrossover {
    fn crossover(
        &self,
        a: &Solution,
        b: &Solution,
        rng: &mut RandomNumberGenerator,
    ) -> (Solution, Solution) {
        let mut first = a.clone();
        let mut second = b.clone();
        if !rng.chance(self.probability) {
            return (first, second);
        }
        let Some(cut) = self.cut(a.genotype(), b.genotype(), rng) else {
            return (first, second);
        };

        let len = a.genotype().len().min(b.genotype().len());
        first.genotype_mut()[cut..len].copy_from_slice(&b.genotype()[cut..len]);
        second.genotype_mut()[cut..len].copy_from_slice(&a.genotype()[cut..len]);
        first.clear_objectives();
        second.clear_objectives();
        (first, second)
    }
}
