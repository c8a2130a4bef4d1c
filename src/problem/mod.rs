//! # Problems
//!
//! A [`Problem`] evaluates a whole population at once. The grammatical
//! problems in this module all follow the same per-generation pass:
//!
//! 1. derive every genotype's phenotype through the [`PhenotypeSource`],
//! 2. compile the batch once,
//! 3. bind the evaluator to a fresh copy of the training table,
//! 4. reduce each genotype to its objective with a [`FitnessReducer`].
//!
//! A batch that fails to compile gives every member `+inf`. An invalid
//! phenotype gets `+inf` without being evaluated.

mod classifier;
mod temporal;

use tracing::{debug, error, warn};

use crate::compiler::{BatchCompiler, CodeSynthesizer, InterpretedSynthesizer, WORST_FITNESS};
use crate::data::TrainingTable;
use crate::fitness::{BestTracker, ClassifierFitness, FitnessReducer, TemporalFitness};
use crate::grammar::GrammarMapper;
use crate::phenotype::{Phenotype, PhenotypeSource};
use crate::rng::RandomNumberGenerator;
use crate::solution::{CodonBounds, Solution};

/// What the generational loop needs from the thing it optimizes.
pub trait Problem: Send {
    fn number_of_objectives(&self) -> usize;

    fn genotype_length(&self) -> usize;

    fn codon_bounds(&self) -> CodonBounds;

    /// Writes every objective of every member of `population`.
    fn evaluate(&mut self, population: &mut [Solution]);

    /// Human-readable form of a solution, if it has one.
    fn describe(&self, solution: &Solution) -> Option<String>;

    /// Number of grammar rules behind the genotype, used for the default
    /// mutation probability.
    fn rule_count(&self) -> usize {
        1
    }

    fn new_solution(&self, rng: &mut RandomNumberGenerator) -> Solution {
        Solution::random(
            self.genotype_length(),
            self.codon_bounds(),
            self.number_of_objectives(),
            rng,
        )
    }
}

/// Recursive series prediction scored by residuals.
pub type TemporalModel = GrammaticalProblem<TemporalFitness>;

/// Per-subject clinical scale prediction scored by quantized error.
pub type Classifier = GrammaticalProblem<ClassifierFitness>;

/// Single-objective grammatical evolution problem over one training table.
#[derive(Debug)]
pub struct GrammaticalProblem<F, P = GrammarMapper, S = InterpretedSynthesizer> {
    source: P,
    compiler: BatchCompiler<S>,
    table: TrainingTable,
    reducer: F,
    genotype_length: usize,
    bounds: CodonBounds,
    tracker: BestTracker,
}

impl<F, P, S> GrammaticalProblem<F, P, S>
where
    F: FitnessReducer,
    P: PhenotypeSource,
    S: CodeSynthesizer,
{
    pub fn new(
        source: P,
        compiler: BatchCompiler<S>,
        table: TrainingTable,
        reducer: F,
        genotype_length: usize,
        bounds: CodonBounds,
    ) -> Self {
        let tracker = BestTracker::new(table.width());
        Self {
            source,
            compiler,
            table,
            reducer,
            genotype_length,
            bounds,
            tracker,
        }
    }

    pub fn table(&self) -> &TrainingTable {
        &self.table
    }

    pub fn reducer(&self) -> &F {
        &self.reducer
    }

    pub fn compiler(&self) -> &BatchCompiler<S> {
        &self.compiler
    }

    /// Best objective seen so far by this problem instance.
    pub fn best_fitness(&self) -> f64 {
        self.tracker.best()
    }

    pub fn derive(&self, solution: &Solution) -> Phenotype {
        self.source.derive(solution.genotype())
    }
}

impl<F, P, S> Problem for GrammaticalProblem<F, P, S>
where
    F: FitnessReducer,
    P: PhenotypeSource,
    S: CodeSynthesizer,
{
    fn number_of_objectives(&self) -> usize {
        1
    }

    fn genotype_length(&self) -> usize {
        self.genotype_length
    }

    fn codon_bounds(&self) -> CodonBounds {
        self.bounds
    }

    fn evaluate(&mut self, population: &mut [Solution]) {
        let phenotypes: Vec<Phenotype> = population.iter().map(|s| self.derive(s)).collect();
        let evaluator = match self.compiler.compile(&phenotypes) {
            Ok(evaluator) => evaluator,
            Err(failure) => {
                error!(unit = %failure.unit_name, "batch failed to compile");
                for line in &failure.diagnostics {
                    error!("{}", line);
                }
                population
                    .iter_mut()
                    .for_each(|s| s.set_all_objectives(WORST_FITNESS));
                return;
            }
        };

        let mut bound = evaluator.bind(self.table.snapshot());
        for (idx, (solution, phenotype)) in population.iter_mut().zip(&phenotypes).enumerate() {
            let fitness = if phenotype.is_valid() {
                let fitness = self.reducer.reduce(&mut bound, idx);
                if fitness.is_nan() {
                    warn!(idx, expression = %phenotype, "fitness is NaN");
                    WORST_FITNESS
                } else {
                    fitness
                }
            } else {
                debug!(idx, "invalid phenotype");
                WORST_FITNESS
            };
            solution.set_all_objectives(fitness);
            self.tracker.observe(fitness, phenotype.text());
        }
    }

    fn describe(&self, solution: &Solution) -> Option<String> {
        let phenotype = self.derive(solution);
        phenotype.is_valid().then(|| phenotype.text().to_string())
    }

    fn rule_count(&self) -> usize {
        self.source.rule_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::WorkerContext;
    use crate::fitness::ResidualAggregation;
    use tempfile::tempdir;

    /// Maps the first codon to a fixed expression, codon 0 to an invalid one.
    struct Lookup(Vec<&'static str>);

    impl PhenotypeSource for Lookup {
        fn derive(&self, genotype: &[u32]) -> Phenotype {
            match genotype.first() {
                Some(0) | None => Phenotype::invalid("<expr>"),
                Some(&c) => Phenotype::valid(self.0[c as usize - 1]),
            }
        }
    }

    fn problem(
        dir: &std::path::Path,
        texts: Vec<&'static str>,
    ) -> GrammaticalProblem<TemporalFitness, Lookup> {
        let table = TrainingTable::from_inputs(vec![vec![1.0], vec![2.0], vec![4.0]]);
        let reducer = TemporalFitness::new(table.interval(), ResidualAggregation::MeanAbsolute);
        GrammaticalProblem::new(
            Lookup(texts),
            BatchCompiler::interpreted(WorkerContext::new(0, dir)),
            table,
            reducer,
            1,
            CodonBounds::new(0, 3),
        )
    }

    #[test]
    fn test_invalid_phenotypes_are_worst() {
        let dir = tempdir().unwrap();
        let mut problem = problem(dir.path(), vec!["2 * getVariable(0, k)", "1"]);
        let mut population = vec![
            Solution::new(vec![1], 1),
            Solution::new(vec![0], 1),
            Solution::new(vec![2], 1),
        ];
        problem.evaluate(&mut population);
        assert_eq!(population[0].objective(0), Some(0.0));
        assert_eq!(population[1].objective(0), Some(f64::INFINITY));
        assert_eq!(population[2].objective(0), Some(4.0 / 3.0));
        assert_eq!(problem.best_fitness(), 0.0);
        assert_eq!(problem.describe(&population[1]), None);
        assert_eq!(
            problem.describe(&population[0]).as_deref(),
            Some("2 * getVariable(0, k)")
        );
    }

    #[test]
    fn test_compile_failure_scores_whole_batch() {
        let dir = tempdir().unwrap();
        let mut problem = problem(dir.path(), vec!["1", "getVariable(0,"]);
        let mut population = vec![Solution::new(vec![1], 1), Solution::new(vec![2], 1)];
        problem.evaluate(&mut population);
        assert!(population
            .iter()
            .all(|s| s.objective(0) == Some(f64::INFINITY)));
    }

    #[test]
    fn test_table_is_not_mutated_between_generations() {
        let dir = tempdir().unwrap();
        let mut problem = problem(dir.path(), vec!["getVariable(1, k) + 1"]);
        let mut population = vec![Solution::new(vec![1], 1)];
        problem.evaluate(&mut population);
        let first = population[0].objective(0);
        problem.evaluate(&mut population);
        assert_eq!(population[0].objective(0), first);
        assert!(problem.table().rows().iter().all(|r| r[1] == 0.0));
    }
}
