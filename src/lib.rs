pub mod compiler;
pub mod config;
pub mod data;
pub mod error;
pub mod evolution;
pub mod fitness;
pub mod grammar;
pub mod operators;
pub mod phenotype;
pub mod problem;
pub mod rng;
pub mod solution;

// Re-export commonly used types for convenience
pub use compiler::{BatchCompiler, BoundEvaluator, Evaluator, WorkerContext};
pub use config::Config;
pub use data::TrainingTable;
pub use error::{GramEvalError, OptionExt, Result, ResultExt};
pub use phenotype::{Phenotype, PhenotypeSource};
pub use problem::{Classifier, Problem, TemporalModel};
pub use solution::{Codon, CodonBounds, Genotype, Solution};
