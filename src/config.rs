//! # Configuration
//!
//! A run is described by one TOML file:
//!
//! ```toml
//! work_dir = "runs/parkinson"
//! grammar_path = "grammar/temporal.bnf"
//! problem = "temporal"
//! workers = 4
//! seed = 42
//!
//! [logging]
//! level = "info"
//! file = "runs/parkinson/grameval.log"
//!
//! [training]
//! path = "data/series.csv"
//! normalize = true
//! idx_begin = 0
//! idx_end = 200
//! aggregation = "mean_absolute"
//!
//! [ga]
//! population_size = 100
//! num_generations = 250
//! genotype_length = 100
//! ```
//!
//! Missing sections take their defaults. [`Config::load`] parses and
//! validates in one step.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::data::SubjectLayout;
use crate::error::{GramEvalError, Result, ResultExt};
use crate::evolution::options::{EvolutionOptions, LogLevel};
use crate::fitness::{ClassifierMode, ResidualAggregation};
use crate::grammar::mapper::{DEFAULT_MAX_EXPANSIONS, DEFAULT_MAX_WRAPS};
use crate::solution::CodonBounds;

/// Which problem the workers solve.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemKind {
    #[default]
    Temporal,
    Classifier,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Scratch artifacts of every worker live below this directory.
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,
    pub grammar_path: PathBuf,
    #[serde(default)]
    pub problem: ProblemKind,
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Base seed; worker `i` uses `seed + i`. Entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub classifier: Option<ClassifierConfig>,
    #[serde(default)]
    pub ga: GaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Log to this file instead of stderr.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Log file of one worker: the configured file with `_<worker_id>`
    /// appended to its stem, e.g. `run.log` becomes `run_3.log`.
    pub fn worker_file(&self, worker_id: usize) -> Option<PathBuf> {
        let base = self.file.as_ref()?;
        let stem = base
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = match base.extension() {
            Some(ext) => format!("{}_{}.{}", stem, worker_id, ext.to_string_lossy()),
            None => format!("{}_{}", stem, worker_id),
        };
        Some(base.with_file_name(name))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Series file of the temporal problem.
    pub path: Option<PathBuf>,
    pub normalize: bool,
    pub idx_begin: Option<usize>,
    pub idx_end: Option<usize>,
    pub aggregation: ResidualAggregation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifierConfig {
    pub clinical_path: PathBuf,
    #[serde(default)]
    pub layout: SubjectLayout,
    #[serde(default)]
    pub mode: ClassifierMode,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GaConfig {
    pub population_size: usize,
    pub num_generations: usize,
    pub genotype_length: usize,
    pub codon_lower: u32,
    pub codon_upper: u32,
    pub max_wraps: usize,
    pub max_expansions: usize,
    pub crossover_probability: f64,
    /// Defaults to one over the number of grammar rules.
    pub mutation_probability: Option<f64>,
    pub avoid_repetition_in_front: bool,
    pub elitism: usize,
    pub log_level: LogLevel,
}

impl Default for GaConfig {
    fn default() -> Self {
        let bounds = CodonBounds::default();
        Self {
            population_size: 100,
            num_generations: 250,
            genotype_length: 100,
            codon_lower: bounds.lower,
            codon_upper: bounds.upper,
            max_wraps: DEFAULT_MAX_WRAPS,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
            crossover_probability: 0.9,
            mutation_probability: None,
            avoid_repetition_in_front: false,
            elitism: 1,
            log_level: LogLevel::Minimal,
        }
    }
}

impl GaConfig {
    pub fn codon_bounds(&self) -> CodonBounds {
        CodonBounds::new(self.codon_lower, self.codon_upper)
    }

    /// Generation-loop knobs.
    pub fn evolution_options(&self) -> EvolutionOptions {
        let mut builder = EvolutionOptions::builder()
            .population_size(self.population_size)
            .num_generations(self.num_generations)
            .crossover_probability(self.crossover_probability)
            .avoid_repetition_in_front(self.avoid_repetition_in_front)
            .elitism(self.elitism)
            .log_level(self.log_level);
        if let Some(p) = self.mutation_probability {
            builder = builder.mutation_probability(p);
        }
        builder.build()
    }
}

fn default_work_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_workers() -> usize {
    1
}

impl Config {
    /// Reads, parses and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).context(format!("Failed to read config {:?}", path))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(GramEvalError::Configuration(msg));
        let ga = &self.ga;
        if self.workers == 0 {
            return fail("workers must be at least 1".to_string());
        }
        if ga.population_size == 0 {
            return fail("ga.population_size must be at least 1".to_string());
        }
        if ga.genotype_length == 0 {
            return fail("ga.genotype_length must be at least 1".to_string());
        }
        if ga.codon_lower > ga.codon_upper {
            return fail(format!(
                "ga codon bounds [{}, {}] are inverted",
                ga.codon_lower, ga.codon_upper
            ));
        }
        if ga.elitism > ga.population_size {
            return fail(format!(
                "ga.elitism {} exceeds the population size {}",
                ga.elitism, ga.population_size
            ));
        }
        if !(0.0..=1.0).contains(&ga.crossover_probability) {
            return fail("ga.crossover_probability must be in [0, 1]".to_string());
        }
        if let Some(p) = ga.mutation_probability {
            if !(0.0..=1.0).contains(&p) {
                return fail("ga.mutation_probability must be in [0, 1]".to_string());
            }
        }
        if let (Some(begin), Some(end)) = (self.training.idx_begin, self.training.idx_end) {
            if begin > end {
                return fail(format!("training interval [{}, {}) is inverted", begin, end));
            }
        }
        match self.problem {
            ProblemKind::Temporal if self.training.path.is_none() => {
                fail("the temporal problem needs training.path".to_string())
            }
            ProblemKind::Classifier if self.classifier.is_none() => {
                fail("the classifier problem needs a [classifier] section".to_string())
            }
            _ => Ok(()),
        }
    }

    /// Scratch directory of one worker.
    pub fn scratch_dir(&self, worker_id: usize) -> PathBuf {
        self.work_dir.join(format!("worker_{}", worker_id))
    }
}
