use std::fs;
use std::path::Path;

use grameval::{
    config::{Config, ProblemKind},
    evolution::run_worker,
    fitness::quantize,
    problem::{Classifier, Problem},
    solution::Solution,
};
use tempfile::tempdir;

const GRAMMAR: &str = "\
<func> ::= <expr>
<expr> ::= getVariable(<var>,k) | MyAvg(0,k,<var>) | <cte> | <expr> * <cte>
<var>  ::= 0 | 1
<cte>  ::= 0 | 1 | 3
";

/// Three subjects: 10 and 20 have source files, 30 has none.
fn write_fixture(dir: &Path) -> Config {
    fs::write(dir.join("clf.bnf"), GRAMMAR).unwrap();

    // id in column 1, level in column 8
    fs::write(
        dir.join("clinical.csv"),
        "# row;id;...;level\n\
         0;10;0;0;0;0;0;0;3\n\
         1;20;0;0;0;0;0;0;0\n\
         2;30;0;0;0;0;0;0;2\n",
    )
    .unwrap();

    let data = dir.join("data");
    fs::create_dir_all(data.join("GA10")).unwrap();
    fs::create_dir_all(data.join("GA20")).unwrap();
    fs::write(data.join("GA10/RightFoot_walk.csv"), "3;1\n2;1\n").unwrap();
    fs::write(data.join("GA10/LeftFoot_walk.csv"), "4;1\n").unwrap();
    fs::write(data.join("GA20/LeftFoot_walk.csv"), "0.1;0\n0.2;0\n").unwrap();

    let text = format!(
        r#"
        work_dir = {work:?}
        grammar_path = {grammar:?}
        problem = "classifier"
        seed = 3

        [classifier]
        clinical_path = {clinical:?}

        [classifier.layout]
        data_base = {data:?}
        exercises = ["walk"]

        [ga]
        population_size = 16
        num_generations = 4
        genotype_length = 12
        log_level = "none"
        "#,
        work = dir.join("work").to_string_lossy(),
        grammar = dir.join("clf.bnf").to_string_lossy(),
        clinical = dir.join("clinical.csv").to_string_lossy(),
        data = data.to_string_lossy(),
    );
    let path = dir.join("run.toml");
    fs::write(&path, text).unwrap();
    Config::load(&path).unwrap()
}

#[test]
fn test_subject_table_and_targets() {
    let dir = tempdir().unwrap();
    let config = write_fixture(dir.path());
    assert_eq!(config.problem, ProblemKind::Classifier);

    let problem = Classifier::from_config(&config, 0).unwrap();
    let table = problem.table();
    assert_eq!(table.len(), 5);
    assert_eq!(table.width(), 3);

    let segments = table.segments();
    assert_eq!(segments.get("10"), Some(&(0..3)));
    assert_eq!(segments.get("20"), Some(&(3..5)));
    assert_eq!(segments.get("30"), Some(&(5..5)));
    // the level fills the output slot of every subject row
    assert!(table.rows()[..3].iter().all(|r| r[2] == 3.0));
    assert!(table.rows()[3..].iter().all(|r| r[2] == 0.0));

    let subjects: Vec<&str> = problem
        .reducer()
        .targets()
        .iter()
        .map(|t| t.subject.as_str())
        .collect();
    assert_eq!(subjects, vec!["10", "20"]);
}

#[test]
fn test_quantized_fitness() {
    let dir = tempdir().unwrap();
    let config = write_fixture(dir.path());
    let mut problem = Classifier::from_config(&config, 0).unwrap();

    // <expr> codon 0 -> getVariable, <var> codon 0 -> column 0
    let mut population = vec![
        Solution::new(vec![0, 0], 1),
        // <expr> codon 2 -> <cte>, codon 2 -> 3
        Solution::new(vec![2, 2], 1),
        // <expr> codon 2 -> <cte>, codon 0 -> 0
        Solution::new(vec![2, 0], 1),
    ];
    problem.evaluate(&mut population);

    // subject 10 reads 3 -> 3 vs 3; subject 20 reads 0.1 -> 0 vs 0
    assert_eq!(population[0].objective(0), Some(0.0));
    // constant 3: |3 - 3| and |3 - 0|
    assert_eq!(population[1].objective(0), Some(1.5));
    // constant 0: |0 - 3| and |0 - 0|
    assert_eq!(population[2].objective(0), Some(1.5));
    assert_eq!(
        problem.describe(&population[0]).as_deref(),
        Some("getVariable(0,k)")
    );
    assert_eq!(quantize(0.1), 0.0);
}

#[test]
fn test_worker_runs_classifier() {
    let dir = tempdir().unwrap();
    let config = write_fixture(dir.path());
    let outcome = run_worker(&config, 5).unwrap();
    assert_eq!(outcome.worker_id, 5);
    assert!(outcome.result.fitness() <= 1.5);
    assert!(dir.path().join("work/worker_5/pop_evaluator_5.rs").exists());
}
