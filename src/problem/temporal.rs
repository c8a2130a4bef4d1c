use tracing::info;

use super::TemporalModel;
use crate::compiler::{BatchCompiler, WorkerContext};
use crate::config::Config;
use crate::data::load_table;
use crate::error::{GramEvalError, OptionExt, Result};
use crate::fitness::TemporalFitness;
use crate::grammar::{Grammar, GrammarMapper};

impl TemporalModel {
    /// Builds the temporal problem of worker `worker_id`: the series file is
    /// read, optionally normalized and restricted to the training interval.
    pub fn from_config(config: &Config, worker_id: usize) -> Result<Self> {
        let path = config.training.path.as_ref().ok_or_else_genetic(|| {
            GramEvalError::Configuration("the temporal problem needs training.path".to_string())
        })?;

        let mut table = load_table(path)?;
        if config.training.normalize {
            table = table.normalize();
        }
        let table = table.with_interval(config.training.idx_begin, config.training.idx_end)?;
        info!(
            rows = table.len(),
            inputs = table.num_input_columns(),
            "training table ready"
        );

        let mapper = mapper_from_config(config)?;
        let reducer = TemporalFitness::new(table.interval(), config.training.aggregation);
        let compiler = BatchCompiler::interpreted(WorkerContext::new(
            worker_id,
            config.scratch_dir(worker_id),
        ));
        Ok(Self::new(
            mapper,
            compiler,
            table,
            reducer,
            config.ga.genotype_length,
            config.ga.codon_bounds(),
        ))
    }
}

pub(super) fn mapper_from_config(config: &Config) -> Result<GrammarMapper> {
    let grammar = Grammar::new(&config.grammar_path)?;
    info!(
        path = ?config.grammar_path,
        rules = grammar.rule_count(),
        "grammar loaded"
    );
    Ok(GrammarMapper::new(grammar)
        .with_max_wraps(config.ga.max_wraps)
        .with_max_expansions(config.ga.max_expansions))
}
