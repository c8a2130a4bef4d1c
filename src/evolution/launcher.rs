use tracing::{debug, info};

use super::options::{EvolutionOptions, LogLevel};
use crate::error::{GramEvalError, OptionExt, Result};
use crate::operators::{
    sort_by_dominance, BinaryTournament, CrossoverOperator, CrossoverPoint, IntegerFlipMutation,
    MutationOperator, SelectionOperator, SinglePointCrossover, SolutionDominance,
};
use crate::problem::Problem;
use crate::rng::RandomNumberGenerator;
use crate::solution::Solution;

/// Progress of one generation, handed to the caller's callback.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    /// `0` is the initial random population.
    pub generation: usize,
    pub best_fitness: f64,
    /// Mean over the solutions with a finite fitness; `+inf` when none has one.
    pub mean_fitness: f64,
    /// Solutions that scored `+inf`.
    pub worst_count: usize,
    pub best_expression: Option<String>,
}

/// Represents the result of an evolution: the best solution found and its
/// readable form.
#[derive(Debug, Clone, PartialEq)]
pub struct EvolutionResult {
    pub best: Solution,
    pub expression: Option<String>,
    pub generations: usize,
}

impl EvolutionResult {
    pub fn fitness(&self) -> f64 {
        self.best.objective_values().first().copied().unwrap_or(f64::INFINITY)
    }
}

/// Elitist generational loop over a [`Problem`].
///
/// Each generation keeps the `elitism` best solutions, fills the rest of the
/// population with offspring (selection, crossover, mutation), evaluates the
/// offspring as one batch and ranks the result by dominance.
#[derive(Debug)]
pub struct GeneticAlgorithm<
    P,
    M = IntegerFlipMutation,
    X = SinglePointCrossover,
    S = BinaryTournament,
> {
    problem: P,
    mutation: M,
    crossover: X,
    selection: S,
}

impl<P: Problem> GeneticAlgorithm<P> {
    /// Builds the default operators from `options`. Without an explicit
    /// mutation probability one over the problem's rule count is used.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a probability is outside `[0, 1]`.
    pub fn from_options(problem: P, options: &EvolutionOptions) -> Result<Self> {
        let bounds = problem.codon_bounds();
        let mutation = match options.get_mutation_probability() {
            Some(p) => IntegerFlipMutation::new(p, bounds)?,
            None => IntegerFlipMutation::for_rule_count(problem.rule_count(), bounds),
        };
        let crossover = SinglePointCrossover::new(options.get_crossover_probability())?
            .with_point(CrossoverPoint::Random)
            .with_avoid_repetition_in_front(options.get_avoid_repetition_in_front());
        Ok(Self::new(
            problem,
            mutation,
            crossover,
            BinaryTournament::new(SolutionDominance),
        ))
    }
}

impl<P, M, X, S> GeneticAlgorithm<P, M, X, S>
where
    P: Problem,
    M: MutationOperator,
    X: CrossoverOperator,
    S: SelectionOperator,
{
    pub fn new(problem: P, mutation: M, crossover: X, selection: S) -> Self {
        Self {
            problem,
            mutation,
            crossover,
            selection,
        }
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn into_problem(self) -> P {
        self.problem
    }

    /// Runs the search and returns the best solution of the last generation.
    ///
    /// `on_generation` is called once for the initial population and once
    /// after every bred generation.
    ///
    /// # Errors
    ///
    /// This method will return an error if:
    /// - The population size in options is zero
    /// - The elitism in options exceeds the population size
    pub fn evolve<F>(
        &mut self,
        options: &EvolutionOptions,
        rng: &mut RandomNumberGenerator,
        mut on_generation: F,
    ) -> Result<EvolutionResult>
    where
        F: FnMut(&GenerationReport),
    {
        let size = options.get_population_size();
        if size == 0 {
            return Err(GramEvalError::Configuration(
                "Population size cannot be zero".to_string(),
            ));
        }
        let elitism = options.get_elitism();
        if elitism > size {
            return Err(GramEvalError::Configuration(format!(
                "Elitism {} exceeds the population size {}",
                elitism, size
            )));
        }

        let mut population: Vec<Solution> =
            (0..size).map(|_| self.problem.new_solution(rng)).collect();
        self.problem.evaluate(&mut population);
        sort_by_dominance(&mut population, &SolutionDominance);
        self.report(0, &population, options, &mut on_generation);

        for generation in 1..=options.get_num_generations() {
            let mut next: Vec<Solution> = population.iter().take(elitism).cloned().collect();
            while next.len() < size {
                let a = self.selection.select(&population, rng)?;
                let b = self.selection.select(&population, rng)?;
                let (mut c, mut d) = self.crossover.crossover(a, b, rng);
                self.mutation.mutate(&mut c, rng);
                self.mutation.mutate(&mut d, rng);
                next.push(c);
                if next.len() < size {
                    next.push(d);
                }
            }

            self.problem.evaluate(&mut next[elitism..]);
            sort_by_dominance(&mut next, &SolutionDominance);
            population = next;
            self.report(generation, &population, options, &mut on_generation);
        }

        let best = population
            .into_iter()
            .next()
            .ok_or_else_genetic(|| GramEvalError::EmptyPopulation)?;
        Ok(EvolutionResult {
            expression: self.problem.describe(&best),
            best,
            generations: options.get_num_generations(),
        })
    }

    fn report<F>(
        &self,
        generation: usize,
        population: &[Solution],
        options: &EvolutionOptions,
        on_generation: &mut F,
    ) where
        F: FnMut(&GenerationReport),
    {
        let fitness: Vec<f64> = population
            .iter()
            .map(|s| s.objective_values().first().copied().unwrap_or(f64::INFINITY))
            .collect();
        let finite: Vec<f64> = fitness.iter().copied().filter(|f| f.is_finite()).collect();
        let mean_fitness = if finite.is_empty() {
            f64::INFINITY
        } else {
            finite.iter().sum::<f64>() / finite.len() as f64
        };
        let report = GenerationReport {
            generation,
            best_fitness: fitness.first().copied().unwrap_or(f64::INFINITY),
            mean_fitness,
            worst_count: fitness.len() - finite.len(),
            best_expression: population.first().and_then(|s| self.problem.describe(s)),
        };

        match options.get_log_level() {
            LogLevel::Verbose => {
                info!(
                    generation,
                    best = report.best_fitness,
                    mean = report.mean_fitness,
                    worst = report.worst_count,
                    "generation done"
                );
                if let Some(expression) = &report.best_expression {
                    info!(generation, "best expression: {}", expression);
                }
            }
            LogLevel::Minimal => info!(generation, best = report.best_fitness, "generation done"),
            LogLevel::None => debug!(generation, "generation done"),
        }
        on_generation(&report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solution::CodonBounds;

    /// Minimizes the sum of the codons.
    struct CodonSum {
        evaluations: usize,
    }

    impl Problem for CodonSum {
        fn number_of_objectives(&self) -> usize {
            1
        }

        fn genotype_length(&self) -> usize {
            6
        }

        fn codon_bounds(&self) -> CodonBounds {
            CodonBounds::new(0, 20)
        }

        fn evaluate(&mut self, population: &mut [Solution]) {
            for s in population.iter_mut() {
                self.evaluations += 1;
                let sum: u32 = s.genotype().iter().sum();
                s.set_objective(0, sum as f64);
            }
        }

        fn describe(&self, solution: &Solution) -> Option<String> {
            Some(format!("{:?}", solution.genotype()))
        }

        fn rule_count(&self) -> usize {
            6
        }
    }

    #[test]
    fn test_evolution_improves_and_reports() {
        let options = EvolutionOptions::builder()
            .population_size(20)
            .num_generations(30)
            .elitism(2)
            .log_level(LogLevel::None)
            .build();
        let mut ga = GeneticAlgorithm::from_options(CodonSum { evaluations: 0 }, &options).unwrap();
        let mut rng = RandomNumberGenerator::from_seed(42);

        let mut reports = Vec::new();
        let result = ga
            .evolve(&options, &mut rng, |r| reports.push(r.clone()))
            .unwrap();

        assert_eq!(reports.len(), 31);
        assert_eq!(reports[0].generation, 0);
        // elitism never loses the best
        assert!(reports.windows(2).all(|w| w[1].best_fitness <= w[0].best_fitness));
        assert!(result.fitness() < reports[0].best_fitness);
        assert_eq!(result.fitness(), reports[30].best_fitness);
        assert!(result.expression.is_some());
        // elites are not re-evaluated
        assert_eq!(ga.problem().evaluations, 20 + 30 * 18);
    }

    #[test]
    fn test_rejects_bad_options() {
        let mut rng = RandomNumberGenerator::from_seed(1);
        let empty = EvolutionOptions::builder().population_size(0).build();
        let mut ga = GeneticAlgorithm::from_options(CodonSum { evaluations: 0 }, &empty).unwrap();
        assert!(ga.evolve(&empty, &mut rng, |_| {}).is_err());

        let elitist = EvolutionOptions::builder()
            .population_size(2)
            .elitism(3)
            .build();
        assert!(ga.evolve(&elitist, &mut rng, |_| {}).is_err());

        let bad = EvolutionOptions::builder().crossover_probability(1.5).build();
        assert!(GeneticAlgorithm::from_options(CodonSum { evaluations: 0 }, &bad).is_err());
    }

    #[test]
    fn test_default_mutation_from_rule_count() {
        let options = EvolutionOptions::default();
        let ga = GeneticAlgorithm::from_options(CodonSum { evaluations: 0 }, &options).unwrap();
        assert!((ga.mutation.probability() - 1.0 / 6.0).abs() < 1e-12);
    }
}
