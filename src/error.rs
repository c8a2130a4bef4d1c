//! # Error Types
//!
//! This module defines the error types shared across the crate. Evaluation
//! faults inside a generation never surface here: they are folded into the
//! worst-fitness sentinel by the evaluator. What remains are the failures
//! that stop a problem from being built or a configuration from loading.
//!
//! ## Examples
//!
//! Using the `ResultExt` trait to add context to errors:
//!
//! ```rust
//! use grameval::error::{Result, ResultExt};
//! use std::fs::File;
//!
//! fn open_grammar(path: &str) -> Result<()> {
//!     File::open(path).context("Failed to open grammar file")?;
//!     Ok(())
//! }
//! ```
//!
//! Using the `OptionExt` trait to convert `Option` to `Result`:
//!
//! ```rust
//! use grameval::error::{GramEvalError, OptionExt};
//!
//! fn first_codon(codons: &[u32]) -> grameval::error::Result<u32> {
//!     codons.first().copied().ok_or_else_genetic(|| GramEvalError::EmptyPopulation)
//! }
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::compiler::CompileFailure;
use crate::grammar::GrammarError;

/// Represents errors that can occur while building or running a search.
#[derive(Error, Debug)]
pub enum GramEvalError {
    /// Error that occurs when an invalid configuration is provided.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error that occurs when an empty population is encountered.
    #[error("Empty population error: Cannot operate on an empty population")]
    EmptyPopulation,

    /// The grammar file could not be read or is malformed.
    #[error("Grammar error: {0}")]
    Grammar(#[from] GrammarError),

    /// A data record could not be parsed.
    #[error("Data error in {path:?} at line {line}: {reason}")]
    Data {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// A synthesized batch failed to build.
    #[error("Compile error: {0}")]
    Compile(#[from] CompileFailure),

    /// Error that occurs when an I/O operation fails.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for [`crate::config::Config`].
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A generic error with a custom message.
    #[error("{0}")]
    Other(String),
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, GramEvalError>;

/// Extension trait for Result to add context to errors.
pub trait ResultExt<T, E> {
    /// Converts the error to a `GramEvalError::Other` prefixed with `context`.
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static;
}

impl<T, E> ResultExt<T, E> for std::result::Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context<C>(self, context: C) -> Result<T>
    where
        C: fmt::Display + Send + Sync + 'static,
    {
        self.map_err(|e| GramEvalError::Other(format!("{}: {}", context, e)))
    }
}

/// Extension trait for Option to convert to Result with a custom error.
pub trait OptionExt<T> {
    /// Converts an `Option<T>` to a `Result<T, GramEvalError>` using
    /// a closure to generate the error.
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GramEvalError;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_else_genetic<F>(self, err_fn: F) -> Result<T>
    where
        F: FnOnce() -> GramEvalError,
    {
        self.ok_or_else(err_fn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_context_wraps_message() {
        let res: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let err = res.context("Failed to open").unwrap_err();
        assert_eq!(err.to_string(), "Failed to open: gone");
    }

    #[test]
    fn test_option_ext() {
        let empty: Option<u32> = None;
        assert!(matches!(
            empty.ok_or_else_genetic(|| GramEvalError::EmptyPopulation),
            Err(GramEvalError::EmptyPopulation)
        ));
        assert_eq!(Some(3).ok_or_else_genetic(|| GramEvalError::EmptyPopulation).unwrap(), 3);
    }

    #[test]
    fn test_io_conversion() {
        fn read() -> Result<String> {
            Ok(std::fs::read_to_string("/definitely/not/here.csv")?)
        }
        assert!(matches!(read(), Err(GramEvalError::Io(_))));
    }
}
