use std::fs;
use std::path::Path;
use std::sync::Mutex;

use grameval::{
    compiler::{BatchCompiler, WorkerContext},
    config::Config,
    data::TrainingTable,
    evolution::{
        run_worker, run_workers, run_workers_with, EvolutionOptions, GeneticAlgorithm, LogLevel,
    },
    fitness::{FitnessReducer, ResidualAggregation, TemporalFitness},
    phenotype::Phenotype,
    problem::{Problem, TemporalModel},
    solution::Solution,
};
use tempfile::tempdir;

const GRAMMAR: &str = "\
# one-step-ahead series models
<func> ::= <expr>
<expr> ::= <expr> <op> <expr> | (<expr>) | getVariable(0,k<lag>) | <cte>
<op>   ::= + | - | *
<lag>  ::= -1 | -2 | +0
<cte>  ::= 1 | 2 | 0.5
";

fn write_fixture(dir: &Path, series: &[f64]) -> Config {
    let grammar = dir.join("series.bnf");
    fs::write(&grammar, GRAMMAR).unwrap();
    let data = dir.join("series.csv");
    let rows: Vec<String> = series.iter().map(|v| v.to_string()).collect();
    fs::write(&data, rows.join("\n")).unwrap();

    let text = format!(
        r#"
        work_dir = {work:?}
        grammar_path = {grammar:?}
        seed = 7
        workers = 2

        [training]
        path = {data:?}

        [ga]
        population_size = 30
        num_generations = 5
        genotype_length = 20
        log_level = "none"
        "#,
        work = dir.join("work").to_string_lossy(),
        grammar = grammar.to_string_lossy(),
        data = data.to_string_lossy(),
    );
    let path = dir.join("run.toml");
    fs::write(&path, text).unwrap();
    Config::load(&path).unwrap()
}

#[test]
fn test_series_end_to_end() {
    let dir = tempdir().unwrap();
    let table = TrainingTable::from_inputs(vec![vec![1.0], vec![2.0], vec![3.0]]);
    let evaluator = BatchCompiler::interpreted(WorkerContext::new(0, dir.path()))
        .compile(&[Phenotype::valid("2 * getVariable(0, k-1)")])
        .unwrap();
    let mut bound = evaluator.bind(table.snapshot());
    bound.evaluate_series(0);

    let outputs: Vec<f64> = bound.table().iter().map(|row| row[1]).collect();
    // row 0 seeds itself; the prediction made at row k reads row k-1
    assert_eq!(outputs[0], 1.0);
    assert_eq!(outputs[1], 2.0 * 1.0);
    assert_eq!(outputs[2], 2.0 * 1.0);
}

#[test]
fn test_negative_row_bootstrap() {
    let dir = tempdir().unwrap();
    let evaluator = BatchCompiler::interpreted(WorkerContext::new(0, dir.path()))
        .compile(&[
            Phenotype::valid("getVariable(0, k - 5)"),
            Phenotype::valid("getVariable(0, 0)"),
        ])
        .unwrap();
    let bound = evaluator.bind(vec![vec![3.0, 0.0], vec![9.0, 0.0]]);
    for k in 0..5 {
        assert_eq!(bound.evaluate(0, k), bound.evaluate(1, 0));
    }
}

#[test]
fn test_no_cross_talk_between_cases() {
    let dir = tempdir().unwrap();
    let phenotypes: Vec<Phenotype> = (0..25)
        .map(|i| Phenotype::valid(format!("{}", i)))
        .collect();
    let bound = BatchCompiler::interpreted(WorkerContext::new(3, dir.path()))
        .compile(&phenotypes)
        .unwrap()
        .bind(vec![vec![1.0, 0.0]; 4]);
    for i in 0..25 {
        for k in [-2, 0, 3] {
            assert_eq!(bound.evaluate(i, k), i as f64);
        }
    }
}

#[test]
fn test_temporal_fitness_interval() {
    let dir = tempdir().unwrap();
    let table = TrainingTable::from_inputs(vec![vec![1.0], vec![2.0], vec![4.0], vec![8.0]])
        .with_interval(Some(2), None)
        .unwrap();
    let mut bound = BatchCompiler::interpreted(WorkerContext::new(0, dir.path()))
        .compile(&[Phenotype::valid("getVariable(0, k) + 1")])
        .unwrap()
        .bind(table.snapshot());
    let fitness = TemporalFitness::new(table.interval(), ResidualAggregation::MeanAbsolute);
    // predictions at rows 2 and 3 are 3 and 5
    assert_eq!(fitness.reduce(&mut bound, 0), (1.0 + 3.0) / 2.0);
}

#[test]
fn test_problem_from_config_and_evolution() {
    let dir = tempdir().unwrap();
    let config = write_fixture(dir.path(), &[1.0, 2.0, 4.0, 8.0, 16.0, 32.0]);

    let problem = TemporalModel::from_config(&config, 0).unwrap();
    assert_eq!(problem.table().width(), 2);
    assert_eq!(problem.genotype_length(), 20);

    let options = EvolutionOptions::builder()
        .population_size(30)
        .num_generations(5)
        .log_level(LogLevel::None)
        .build();
    let mut ga = GeneticAlgorithm::from_options(problem, &options).unwrap();
    let mut rng = grameval::rng::RandomNumberGenerator::from_seed(1);
    let mut generations = 0;
    let result = ga.evolve(&options, &mut rng, |_| generations += 1).unwrap();
    assert_eq!(generations, 6);
    assert!(result.best.is_evaluated());
    assert!(dir
        .path()
        .join("work/worker_0/pop_evaluator_0.rs")
        .exists());

    let problem = ga.into_problem();
    assert!(problem.best_fitness() <= result.fitness());
}

#[test]
fn test_invalid_genotype_is_worst() {
    let dir = tempdir().unwrap();
    let config = write_fixture(dir.path(), &[1.0, 2.0, 3.0]);
    let mut problem = TemporalModel::from_config(&config, 0).unwrap();

    // <expr> choice 0 recurses forever, so an all-zero genotype never terminates
    let mut population = vec![Solution::new(vec![0; 20], 1)];
    problem.evaluate(&mut population);
    assert_eq!(population[0].objective(0), Some(f64::INFINITY));
    assert_eq!(problem.describe(&population[0]), None);
}

#[test]
fn test_parallel_workers_are_independent() {
    let dir = tempdir().unwrap();
    let config = write_fixture(dir.path(), &[1.0, 2.0, 4.0, 8.0]);

    let outcomes = run_workers(&config, &[0, 1]);
    assert_eq!(outcomes.len(), 2);
    for (id, outcome) in outcomes.into_iter().enumerate() {
        let outcome = outcome.unwrap();
        assert_eq!(outcome.worker_id, id);
        assert!(dir
            .path()
            .join(format!("work/worker_{id}/pop_evaluator_{id}.rs"))
            .exists());
    }
}

#[test]
fn test_worker_logs_go_to_their_own_files() {
    let dir = tempdir().unwrap();
    let mut config = write_fixture(dir.path(), &[1.0, 2.0, 4.0, 8.0]);
    fs::create_dir_all(dir.path().join("logs")).unwrap();
    config.logging.file = Some(dir.path().join("logs/run.log"));

    let outcomes = run_workers_with(&config, &[0, 1], |config, id| {
        let file = fs::File::create(config.logging.worker_file(id).unwrap()).unwrap();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .finish();
        tracing::dispatcher::with_default(&tracing::Dispatch::new(subscriber), || {
            run_worker(config, id)
        })
    });
    assert!(outcomes.iter().all(|o| o.is_ok()));

    for id in 0..2 {
        let log = fs::read_to_string(dir.path().join(format!("logs/run_{id}.log"))).unwrap();
        assert!(log.contains("worker finished"));
    }
}
