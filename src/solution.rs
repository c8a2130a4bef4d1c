//! # Solutions
//!
//! A [`Solution`] pairs a genotype (a sequence of integer codons) with its
//! objective values. Objectives start unset and are written once per
//! evaluation pass; an unset objective ranks as the worst possible value.

use crate::rng::RandomNumberGenerator;

/// One integer in a genotype, selecting a grammar production.
pub type Codon = u32;

/// Ordered sequence of codons.
pub type Genotype = Vec<Codon>;

/// Inclusive legal range of a codon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodonBounds {
    pub lower: Codon,
    pub upper: Codon,
}

impl CodonBounds {
    pub fn new(lower: Codon, upper: Codon) -> Self {
        debug_assert!(lower <= upper, "codon bounds are inverted");
        Self { lower, upper }
    }

    pub fn contains(&self, codon: Codon) -> bool {
        (self.lower..=self.upper).contains(&codon)
    }
}

impl Default for CodonBounds {
    fn default() -> Self {
        Self::new(0, 255)
    }
}

/// A genotype plus its objective vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    genotype: Genotype,
    objectives: Vec<Option<f64>>,
}

impl Solution {
    /// Creates a solution with `num_objectives` unset objectives.
    pub fn new(genotype: Genotype, num_objectives: usize) -> Self {
        Self {
            genotype,
            objectives: vec![None; num_objectives],
        }
    }

    /// Creates a solution with `length` codons drawn uniformly in `bounds`.
    pub fn random(
        length: usize,
        bounds: CodonBounds,
        num_objectives: usize,
        rng: &mut RandomNumberGenerator,
    ) -> Self {
        let genotype = (0..length).map(|_| rng.next_codon(bounds)).collect();
        Self::new(genotype, num_objectives)
    }

    pub fn genotype(&self) -> &[Codon] {
        &self.genotype
    }

    pub fn genotype_mut(&mut self) -> &mut Genotype {
        &mut self.genotype
    }

    pub fn num_objectives(&self) -> usize {
        self.objectives.len()
    }

    pub fn objective(&self, idx: usize) -> Option<f64> {
        self.objectives.get(idx).copied().flatten()
    }

    /// Objective values with unset entries reported as `+inf`.
    pub fn objective_values(&self) -> Vec<f64> {
        self.objectives
            .iter()
            .map(|o| o.unwrap_or(f64::INFINITY))
            .collect()
    }

    pub fn set_objective(&mut self, idx: usize, value: f64) {
        self.objectives[idx] = Some(value);
    }

    /// Sets every objective to `value`.
    pub fn set_all_objectives(&mut self, value: f64) {
        self.objectives.iter_mut().for_each(|o| *o = Some(value));
    }

    /// Forgets the objectives, typically after the genotype changed.
    pub fn clear_objectives(&mut self) {
        self.objectives.iter_mut().for_each(|o| *o = None);
    }

    pub fn is_evaluated(&self) -> bool {
        self.objectives.iter().all(Option::is_some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_objectives_read_as_infinity() {
        let mut s = Solution::new(vec![1, 2, 3], 2);
        assert!(!s.is_evaluated());
        assert_eq!(s.objective_values(), vec![f64::INFINITY, f64::INFINITY]);
        s.set_objective(0, 0.5);
        assert_eq!(s.objective(0), Some(0.5));
        assert_eq!(s.objective(1), None);
        s.set_all_objectives(1.0);
        assert!(s.is_evaluated());
        s.clear_objectives();
        assert_eq!(s.objective(0), None);
    }

    #[test]
    fn test_random_respects_bounds() {
        let mut rng = RandomNumberGenerator::from_seed(1);
        let s = Solution::random(50, CodonBounds::new(3, 9), 1, &mut rng);
        assert_eq!(s.genotype().len(), 50);
        assert!(s.genotype().iter().all(|&c| (3..=9).contains(&c)));
    }
}
