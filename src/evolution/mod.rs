//! # Evolution
//!
//! The generational loop ([`GeneticAlgorithm`]), its options and the worker
//! pool that runs several independent searches side by side.

pub mod launcher;
pub mod options;
pub mod workers;

pub use launcher::{EvolutionResult, GenerationReport, GeneticAlgorithm};
pub use options::{EvolutionOptions, EvolutionOptionsBuilder, LogLevel};
pub use workers::{run_worker, run_workers, run_workers_with, WorkerOutcome};
