use tracing::info;

use super::temporal::mapper_from_config;
use super::Classifier;
use crate::compiler::{BatchCompiler, WorkerContext};
use crate::config::Config;
use crate::error::{GramEvalError, OptionExt, Result};
use crate::fitness::ClassifierFitness;

impl Classifier {
    /// Builds the multi-subject classifier of worker `worker_id` from the
    /// clinical metadata and every subject's source files.
    pub fn from_config(config: &Config, worker_id: usize) -> Result<Self> {
        let section = config.classifier.as_ref().ok_or_else_genetic(|| {
            GramEvalError::Configuration(
                "the classifier problem needs a [classifier] section".to_string(),
            )
        })?;

        let clinical = section.layout.read_clinical(&section.clinical_path)?;
        let mut table = section.layout.build_table(&clinical)?;
        if config.training.normalize {
            table = table.normalize();
        }
        let reducer = ClassifierFitness::from_table(&table, section.mode);
        info!(
            subjects = clinical.len(),
            with_rows = reducer.targets().len(),
            rows = table.len(),
            "subject table ready"
        );

        let mapper = mapper_from_config(config)?;
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
