use rayon::prelude::*;
use tracing::{error, info};

use super::launcher::{EvolutionResult, GeneticAlgorithm};
use crate::compiler::WorkerContext;
use crate::config::{Config, ProblemKind};
use crate::error::Result;
use crate::problem::{Classifier, Problem, TemporalModel};
use crate::rng::RandomNumberGenerator;

/// What one finished worker found.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerOutcome {
    pub worker_id: usize,
    pub result: EvolutionResult,
}

/// Runs one independent search per id in `worker_ids` on the rayon pool.
///
/// Workers share nothing but `config`; each builds its own problem, table
/// copy and scratch namespace. The outcomes come back in `worker_ids` order.
pub fn run_workers(config: &Config, worker_ids: &[usize]) -> Vec<Result<WorkerOutcome>> {
    run_workers_with(config, worker_ids, run_worker)
}

/// Like [`run_workers`], with `run` standing in for [`run_worker`], e.g. to
/// install a per-worker log subscriber around it. `run` is called on the
/// thread that runs the worker.
pub fn run_workers_with<F>(
    config: &Config,
    worker_ids: &[usize],
    run: F,
) -> Vec<Result<WorkerOutcome>>
where
    F: Fn(&Config, usize) -> Result<WorkerOutcome> + Sync,
{
    worker_ids
        .par_iter()
        .map(|&worker_id| {
            let outcome = run(config, worker_id);
            if let Err(e) = &outcome {
                error!(worker = worker_id, error = %e, "worker failed");
            }
            outcome
        })
        .collect()
}

/// Builds the configured problem for `worker_id` and evolves it.
pub fn run_worker(config: &Config, worker_id: usize) -> Result<WorkerOutcome> {
    let span = WorkerContext::new(worker_id, config.scratch_dir(worker_id)).span();
    let _entered = span.enter();

    let result = match config.problem {
        ProblemKind::Temporal => {
            let problem = TemporalModel::from_config(config, worker_id)?;
            evolve(problem, config, worker_id)?
        }
        ProblemKind::Classifier => {
            let problem = Classifier::from_config(config, worker_id)?;
            evolve(problem, config, worker_id)?
        }
    };
    info!(
        fitness = result.fitness(),
        expression = result.expression.as_deref().unwrap_or("<invalid>"),
        "worker finished"
    );
    Ok(WorkerOutcome { worker_id, result })
}

fn evolve<P: Problem>(problem: P, config: &Config, worker_id: usize) -> Result<EvolutionResult> {
    let mut rng = match config.seed {
        Some(seed) => RandomNumberGenerator::from_seed(seed.wrapping_add(worker_id as u64)),
        None => RandomNumberGenerator::new(),
    };
    let options = config.ga.evolution_options();
    let mut ga = GeneticAlgorithm::from_options(problem, &options)?;
    ga.evolve(&options, &mut rng, |_| {})
}
