use std::cmp::Ordering;
use std::fmt::Debug;

use super::{Dominance, SolutionDominance};
use crate::error::{GramEvalError, Result};
use crate::rng::RandomNumberGenerator;
use crate::solution::Solution;

/// Picks one parent from a population.
pub trait SelectionOperator: Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns [`GramEvalError::EmptyPopulation`] if `population` is empty.
    fn select<'a>(
        &self,
        population: &'a [Solution],
        rng: &mut RandomNumberGenerator,
    ) -> Result<&'a Solution>;
}

/// Binary tournament: two distinct members are drawn and the dominating one
/// wins. When neither dominates, the winner is picked uniformly at random.
#[derive(Debug, Clone, Default)]
pub struct BinaryTournament<C = SolutionDominance> {
    comparator: C,
}

impl<C: Dominance> BinaryTournament<C> {
    pub fn new(comparator: C) -> Self {
        Self { comparator }
    }
}

impl<C: Dominance> SelectionOperator for BinaryTournament<C> {
    fn select<'a>(
        &self,
        population: &'a [Solution],
        rng: &mut RandomNumberGenerator,
    ) -> Result<&'a Solution> {
        match population.len() {
            0 => Err(GramEvalError::EmptyPopulation),
            1 => Ok(&population[0]),
            n => {
                let i = rng.next_index(n);
                let mut j = rng.next_index(n - 1);
                if j >= i {
                    j += 1;
                }
                let (a, b) = (&population[i], &population[j]);
                Ok(match self.comparator.compare(a, Some(b)) {
                    Ordering::Less => a,
                    Ordering::Greater => b,
                    Ordering::Equal => {
                        if rng.chance(0.5) {
                            a
                        } else {
                            b
                        }
                    }
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(value: f64) -> Solution {
        let mut s = Solution::new(vec![value as u32], 1);
        s.set_objective(0, value);
        s
    }

    #[test]
    fn test_empty_and_single() {
        let tournament = BinaryTournament::<SolutionDominance>::default();
        let mut rng = RandomNumberGenerator::from_seed(0);
        assert!(matches!(
            tournament.select(&[], &mut rng),
            Err(GramEvalError::EmptyPopulation)
        ));
        let only = [scored(4.0)];
        assert_eq!(tournament.select(&only, &mut rng).unwrap(), &only[0]);
    }

    #[test]
    fn test_worst_never_wins() {
        let population = [scored(1.0), scored(2.0), scored(3.0)];
        let tournament = BinaryTournament::new(SolutionDominance);
        let mut rng = RandomNumberGenerator::from_seed(11);
        for _ in 0..200 {
            let winner = tournament.select(&population, &mut rng).unwrap();
            assert_ne!(winner.objective(0), Some(3.0));
        }
    }

    #[test]
    fn test_ties_pick_both_sides() {
        let mut a = Solution::new(vec![1], 2);
        a.set_objective(0, 1.0);
        a.set_objective(1, 2.0);
        let mut b = Solution::new(vec![2], 2);
        b.set_objective(0, 2.0);
        b.set_objective(1, 1.0);
        let population = [a, b];

        let tournament = BinaryTournament::new(SolutionDominance);
        let mut rng = RandomNumberGenerator::from_seed(5);
        let firsts = (0..200)
            .filter(|_| tournament.select(&population, &mut rng).unwrap().genotype() == [1])
            .count();
        assert!(firsts > 50 && firsts < 150, "{}", firsts);
    }
}
