//! Runs grammatical evolution workers from a TOML configuration.
//!
//! ```text
//! grameval [config.toml] [worker_id]
//! ```
//!
//! Without a worker id every worker `0..workers` of the configuration runs in
//! parallel; with one, only that worker runs.
//!
//! Startup and summary lines go to stderr. When `logging.file` is set, each
//! worker logs to its own file, `run.log` becoming `run_<worker_id>.log`.

use std::env;
use std::fs::{self, File};
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Mutex;

use grameval::config::{Config, LoggingConfig};
use grameval::error::{GramEvalError, Result, ResultExt};
use grameval::evolution::{run_worker, run_workers_with, WorkerOutcome};
use tracing::{dispatcher, error, info, Dispatch, Level};

const DEFAULT_CONFIG: &str = "grameval.toml";

fn log_level(logging: &LoggingConfig) -> Result<Level> {
    Level::from_str(&logging.level).map_err(|_| {
        GramEvalError::Configuration(format!("unknown log level '{}'", logging.level))
    })
}

fn init_logging(level: Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Runs one worker, inside its own file subscriber when a log file is set.
fn run_logged(config: &Config, level: Level, worker_id: usize) -> Result<WorkerOutcome> {
    let Some(path) = config.logging.worker_file(worker_id) else {
        return run_worker(config, worker_id);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(format!("Failed to create {:?}", parent))?;
    }
    let file = File::create(&path).context(format!("Failed to create log {:?}", path))?;
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();
    dispatcher::with_default(&Dispatch::new(subscriber), || run_worker(config, worker_id))
}

fn run() -> Result<bool> {
    let mut args = env::args().skip(1);
    let config_path = PathBuf::from(args.next().unwrap_or_else(|| DEFAULT_CONFIG.to_string()));
    let worker = args
        .next()
        .map(|arg| {
            arg.parse::<usize>().map_err(|_| {
                GramEvalError::Configuration(format!("worker id '{}' is not a number", arg))
            })
        })
        .transpose()?;

    let config = Config::load(&config_path)?;
    let level = log_level(&config.logging)?;
    init_logging(level);
    info!(config = ?config_path, problem = ?config.problem, "starting");

    let worker_ids: Vec<usize> = match worker {
        Some(id) => vec![id],
        None => (0..config.workers).collect(),
    };
    let outcomes = run_workers_with(&config, &worker_ids, |config, worker_id| {
        run_logged(config, level, worker_id)
    });

    let mut all_ok = true;
    for outcome in outcomes {
        match outcome {
            Ok(outcome) => info!(
                worker = outcome.worker_id,
                fitness = outcome.result.fitness(),
                expression = outcome.result.expression.as_deref().unwrap_or("<invalid>"),
                "best solution"
            ),
            Err(_) => all_ok = false,
        }
    }
    Ok(all_ok)
}

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            // logging may not be up yet
            eprintln!("grameval: {}", e);
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
