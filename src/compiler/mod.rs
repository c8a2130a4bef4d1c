//! # Batch expression compiler
//!
//! Every generation the phenotypes of the whole population are turned into a
//! single evaluation unit, built once and then queried per genotype index:
//!
//! 1. A [`CodeSynthesizer`] renders a [`SourceUnit`]: the helper routines
//!    (`get_variable`, `my_drv`, `my_sum`, `my_avg`) plus an index dispatch
//!    with one case per genotype. Invalid phenotypes get a case that always
//!    yields `f64::INFINITY`.
//! 2. The unit text is written to `<scratch_dir>/pop_evaluator_<worker>.rs`
//!    so a broken generation can be inspected. Each generation overwrites the
//!    previous file.
//! 3. The synthesizer builds the unit into an [`Evaluator`]. If any entry
//!    fails to build, the whole batch fails with a [`CompileFailure`].
//! 4. The caller binds the evaluator to a copy of its training table and
//!    evaluates.
//!
//! The shipped backend, [`InterpretedSynthesizer`], parses each entry into an
//! expression tree and evaluates it directly.
//!
//! ## Example
//!
//! ```rust
//! use grameval::compiler::{BatchCompiler, WorkerContext};
//! use grameval::phenotype::Phenotype;
//!
//! let scratch = std::env::temp_dir().join("grameval-doc");
//! let compiler = BatchCompiler::interpreted(WorkerContext::new(0, scratch));
//! let batch = vec![
//!     Phenotype::valid("2 * getVariable(0, k - 1)"),
//!     Phenotype::invalid("2 * <expr>"),
//! ];
//! let evaluator = compiler.compile(&batch).unwrap();
//! let bound = evaluator.bind(vec![vec![1.0, 0.0], vec![2.0, 0.0]]);
//! assert_eq!(bound.evaluate(0, 1), 2.0);
//! assert_eq!(bound.evaluate(1, 1), f64::INFINITY);
//! ```

pub mod evaluator;
pub mod expr;
mod interpreter;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info_span, warn, Span};

use crate::phenotype::Phenotype;

pub use evaluator::{BoundEvaluator, EvalFault, Evaluator, WORST_FITNESS};
pub use expr::{Expr, ParseError};
pub use interpreter::InterpretedSynthesizer;

/// Identity of one independent search. Everything a worker writes to disk is
/// keyed by its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    worker_id: usize,
    scratch_dir: PathBuf,
}

impl WorkerContext {
    pub fn new(worker_id: usize, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            worker_id,
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn unit_name(&self) -> String {
        format!("pop_evaluator_{}", self.worker_id)
    }

    /// Where the synthesized unit of this worker is written.
    pub fn source_path(&self) -> PathBuf {
        self.scratch_dir.join(format!("{}.rs", self.unit_name()))
    }

    /// Span that tags every log line of this worker.
    pub fn span(&self) -> Span {
        info_span!("worker", id = self.worker_id)
    }
}

/// Rendered evaluation unit for one batch.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceUnit {
    pub unit_name: String,
    /// One entry per genotype index; `None` marks an invalid phenotype.
    pub entries: Vec<Option<String>>,
    pub text: String,
}

/// The batch could not be built. Carries one diagnostic line per bad entry.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("failed to build {unit_name}: {}", diagnostics.join("; "))]
pub struct CompileFailure {
    pub unit_name: String,
    pub diagnostics: Vec<String>,
}

/// Turns a batch of phenotypes into a loadable evaluator.
pub trait CodeSynthesizer: Send + Sync {
    fn synthesize(&self, ctx: &WorkerContext, phenotypes: &[Phenotype]) -> SourceUnit;

    fn build_and_load(
        &self,
        ctx: &WorkerContext,
        unit: &SourceUnit,
    ) -> Result<Evaluator, CompileFailure>;
}

/// Compiles one batch per call for a single worker.
#[derive(Debug, Clone)]
pub struct BatchCompiler<S = InterpretedSynthesizer> {
    ctx: WorkerContext,
    synthesizer: S,
}

impl BatchCompiler<InterpretedSynthesizer> {
    pub fn interpreted(ctx: WorkerContext) -> Self {
        Self::new(ctx, InterpretedSynthesizer)
    }
}

impl<S: CodeSynthesizer> BatchCompiler<S> {
    pub fn new(ctx: WorkerContext, synthesizer: S) -> Self {
        Self { ctx, synthesizer }
    }

    pub fn context(&self) -> &WorkerContext {
        &self.ctx
    }

    /// Synthesizes, writes and builds the unit for `phenotypes`. The
    /// evaluator's dispatch index is the position in `phenotypes`.
    pub fn compile(&self, phenotypes: &[Phenotype]) -> Result<Evaluator, CompileFailure> {
        let unit = self.synthesizer.synthesize(&self.ctx, phenotypes);
        let path = self.ctx.source_path();
        let written = fs::create_dir_all(self.ctx.scratch_dir())
            .and_then(|_| fs::write(&path, &unit.text));
        if let Err(e) = written {
            warn!(?path, error = %e, "could not write evaluator source");
        }

        let evaluator = self.synthesizer.build_and_load(&self.ctx, &unit)?;
        debug!(unit = %unit.unit_name, entries = evaluator.len(), "batch built");
        Ok(evaluator)
    }
}
