//! # RandomNumberGenerator
//!
//! The `RandomNumberGenerator` struct wraps `rand`'s `StdRng` and exposes the
//! handful of draws the genetic operators need: probabilities, codons within
//! bounds and population indices.
//!
//! ## Example
//!
//! ```rust
//! use grameval::rng::RandomNumberGenerator;
//!
//! let mut rng = RandomNumberGenerator::from_seed(7);
//! let p = rng.next_probability();
//! assert!((0.0..1.0).contains(&p));
//! ```

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::solution::{Codon, CodonBounds};

/// A wrapper around the `rand` crate's `StdRng`.
#[derive(Clone, Debug)]
pub struct RandomNumberGenerator {
    pub rng: StdRng,
}

impl RandomNumberGenerator {
    /// Creates a new `RandomNumberGenerator` instance seeded from the system entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Creates a new `RandomNumberGenerator` instance with a specific seed.
    ///
    /// This is useful for reproducible tests and for giving every worker its
    /// own deterministic stream.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform draw in `[0, 1)`.
    pub fn next_probability(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform draw of an index in `0..len`. `len` must be non-zero.
    pub fn next_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Uniform draw in `range`.
    pub fn next_in<R>(&mut self, range: R) -> usize
    where
        R: rand::distributions::uniform::SampleRange<usize>,
    {
        self.rng.gen_range(range)
    }

    /// Uniform draw of a codon inside the inclusive `bounds`.
    pub fn next_codon(&mut self, bounds: CodonBounds) -> Codon {
        self.rng.gen_range(bounds.lower..=bounds.upper)
    }

    /// Returns `true` with probability `p`. Values outside `[0, 1]` are clamped.
    pub fn chance(&mut self, p: f64) -> bool {
        if p <= 0.0 {
            false
        } else if p >= 1.0 {
            true
        } else {
            self.next_probability() < p
        }
    }
}

impl Default for RandomNumberGenerator {
    fn default() -> Self {
        Self::new()
    }
}
