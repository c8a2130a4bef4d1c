//! # Phenotype
//!
//! A phenotype is the expression text decoded from one genotype. Decoding is
//! done by a [`PhenotypeSource`], normally the grammar mapper in
//! [`crate::grammar`]. A decoding that runs out of codons or grows past its
//! expansion bound yields an invalid phenotype; its genotype gets the
//! worst-possible fitness without its text ever being compiled.
//!
//! ## Example
//!
//! ```rust
//! use grameval::phenotype::{Phenotype, PhenotypeSource};
//!
//! struct Constant;
//!
//! impl PhenotypeSource for Constant {
//!     fn derive(&self, genotype: &[u32]) -> Phenotype {
//!         match genotype.first() {
//!             Some(c) => Phenotype::valid(c.to_string()),
//!             None => Phenotype::invalid(""),
//!         }
//!     }
//! }
//!
//! assert_eq!(Constant.derive(&[4]).text(), "4");
//! assert!(!Constant.derive(&[]).is_valid());
//! ```

use std::fmt;

use crate::solution::Codon;

/// Decoded expression text for one genotype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phenotype {
    text: String,
    valid: bool,
}

impl Phenotype {
    pub fn valid(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            valid: true,
        }
    }

    /// A phenotype whose derivation did not terminate. `partial` is whatever
    /// text was produced before giving up; it is kept only for logging.
    pub fn invalid(partial: impl Into<String>) -> Self {
        Self {
            text: partial.into(),
            valid: false,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

impl fmt::Display for Phenotype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// The genotype-to-phenotype derivation collaborator.
///
/// Called once per genotype per generation, before the batch is compiled.
pub trait PhenotypeSource: Send + Sync {
    fn derive(&self, genotype: &[Codon]) -> Phenotype;

    /// Number of rules in the underlying grammar, used to pick the default
    /// mutation probability. Sources without a grammar report 1.
    fn rule_count(&self) -> usize {
        1
    }
}
