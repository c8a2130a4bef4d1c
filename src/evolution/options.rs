//! # EvolutionOptions
//!
//! The `EvolutionOptions` struct holds the knobs of the generational loop:
//! population size, number of generations, variation probabilities, elitism
//! and how much progress is logged.
//!
//! ## Example
//!
//! ```rust
//! use grameval::evolution::options::{EvolutionOptions, LogLevel};
//!
//! // Create a new EvolutionOptions instance with the builder
//! let options = EvolutionOptions::builder()
//!     .population_size(50)
//!     .num_generations(200)
//!     .crossover_probability(0.8)
//!     .log_level(LogLevel::Verbose)
//!     .build();
//! assert_eq!(options.get_mutation_probability(), None);
//!
//! // Create a new EvolutionOptions instance with default parameters
//! let default_options = EvolutionOptions::default();
//! assert_eq!(default_options.get_crossover_probability(), 0.9);
//! ```
//!
//! ## Fields
//!
//! - `num_generations`: Number of generations bred after the initial population.
//! - `population_size`: Number of solutions kept in each generation.
//! - `crossover_probability`: Probability that a pair of parents is recombined.
//! - `mutation_probability`: Per-codon mutation probability. When unset the
//!   loop uses one over the number of grammar rules.
//! - `avoid_repetition_in_front`: Forbid crossover cuts inside a shared front.
//! - `elitism`: Number of best solutions copied unchanged into the next generation.
//! - `log_level`: How much progress the loop logs, see [`LogLevel`].

use serde::Deserialize;

/// How much the generational loop logs.
///
/// - `Verbose`: one line per generation plus the best expression.
/// - `Minimal`: one line per generation.
/// - `None`: nothing; progress is only reported through the callback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Verbose,
    #[default]
    Minimal,
    None,
}

#[derive(Debug, Clone)]
pub struct EvolutionOptions {
    num_generations: usize,
    population_size: usize,
    crossover_probability: f64,
    mutation_probability: Option<f64>,
    avoid_repetition_in_front: bool,
    elitism: usize,
    log_level: LogLevel,
}

impl EvolutionOptions {
    pub fn get_num_generations(&self) -> usize {
        self.num_generations
    }

    pub fn get_population_size(&self) -> usize {
        self.population_size
    }

    pub fn get_crossover_probability(&self) -> f64 {
        self.crossover_probability
    }

    pub fn get_mutation_probability(&self) -> Option<f64> {
        self.mutation_probability
    }

    pub fn get_avoid_repetition_in_front(&self) -> bool {
        self.avoid_repetition_in_front
    }

    pub fn get_elitism(&self) -> usize {
        self.elitism
    }

    pub fn get_log_level(&self) -> LogLevel {
        self.log_level
    }

    /// Returns a builder for creating an `EvolutionOptions` instance.
    ///
    /// # Example
    ///
    /// ```rust
    /// use grameval::evolution::options::EvolutionOptions;
    ///
    /// let options = EvolutionOptions::builder()
    ///     .num_generations(10)
    ///     .mutation_probability(0.05)
    ///     .elitism(2)
    ///     .build();
    /// assert_eq!(options.get_elitism(), 2);
    /// ```
    pub fn builder() -> EvolutionOptionsBuilder {
        EvolutionOptionsBuilder::default()
    }
}

impl Default for EvolutionOptions {
    fn default() -> Self {
        Self {
            num_generations: 250,
            population_size: 100,
            crossover_probability: 0.9,
            mutation_probability: None,
            avoid_repetition_in_front: false,
            elitism: 1,
            log_level: LogLevel::Minimal,
        }
    }
}

/// Builder for `EvolutionOptions`.
///
/// Provides a fluent interface for constructing `EvolutionOptions` instances.
#[derive(Debug, Clone, Default)]
pub struct EvolutionOptionsBuilder {
    num_generations: Option<usize>,
    population_size: Option<usize>,
    crossover_probability: Option<f64>,
    mutation_probability: Option<f64>,
    avoid_repetition_in_front: Option<bool>,
    elitism: Option<usize>,
    log_level: Option<LogLevel>,
}

impl EvolutionOptionsBuilder {
    /// Sets the number of generations.
    pub fn num_generations(mut self, value: usize) -> Self {
        self.num_generations = Some(value);
        self
    }

    /// Sets the population size.
    pub fn population_size(mut self, value: usize) -> Self {
        self.population_size = Some(value);
        self
    }

    pub fn crossover_probability(mut self, value: f64) -> Self {
        self.crossover_probability = Some(value);
        self
    }

    /// Overrides the grammar-derived default.
    pub fn mutation_probability(mut self, value: f64) -> Self {
        self.mutation_probability = Some(value);
        self
    }

    pub fn avoid_repetition_in_front(mut self, value: bool) -> Self {
        self.avoid_repetition_in_front = Some(value);
        self
    }

    pub fn elitism(mut self, value: usize) -> Self {
        self.elitism = Some(value);
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, value: LogLevel) -> Self {
        self.log_level = Some(value);
        self
    }

    /// Builds the `EvolutionOptions` instance.
    pub fn build(self) -> EvolutionOptions {
        let defaults = EvolutionOptions::default();
        EvolutionOptions {
            num_generations: self.num_generations.unwrap_or(defaults.num_generations),
            population_size: self.population_size.unwrap_or(defaults.population_size),
            crossover_probability: self
                .crossover_probability
                .unwrap_or(defaults.crossover_probability),
            mutation_probability: self.mutation_probability,
            avoid_repetition_in_front: self
                .avoid_repetition_in_front
                .unwrap_or(defaults.avoid_repetition_in_front),
            elitism: self.elitism.unwrap_or(defaults.elitism),
            log_level: self.log_level.unwrap_or(defaults.log_level),
        }
    }
}
