use tracing::trace;

use super::{Grammar, Symbol};
use crate::phenotype::{Phenotype, PhenotypeSource};
use crate::solution::Codon;

/// Default number of times the genotype may be re-read from the start.
pub const DEFAULT_MAX_WRAPS: usize = 3;
/// Default bound on non-terminal expansions for one derivation.
pub const DEFAULT_MAX_EXPANSIONS: usize = 10_000;

/// Maps genotypes to phenotypes by leftmost derivation over a [`Grammar`].
///
/// Each non-terminal with more than one production consumes one codon and
/// picks production `codon % productions.len()`. Single-production rules are
/// expanded without consuming a codon. When the codons run out the reading
/// wraps to the first codon; exceeding `max_wraps` wraps or `max_expansions`
/// expansions yields an invalid phenotype.
#[derive(Debug, Clone)]
pub struct GrammarMapper {
    grammar: Grammar,
    max_wraps: usize,
    max_expansions: usize,
}

impl GrammarMapper {
    pub fn new(grammar: Grammar) -> Self {
        Self {
            grammar,
            max_wraps: DEFAULT_MAX_WRAPS,
            max_expansions: DEFAULT_MAX_EXPANSIONS,
        }
    }

    pub fn with_max_wraps(mut self, max_wraps: usize) -> Self {
        self.max_wraps = max_wraps;
        self
    }

    pub fn with_max_expansions(mut self, max_expansions: usize) -> Self {
        self.max_expansions = max_expansions;
        self
    }

    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }
}

/// Codon reader with wrap-around accounting.
struct CodonCursor<'a> {
    genotype: &'a [Codon],
    idx: usize,
    wraps: usize,
}

impl<'a> CodonCursor<'a> {
    fn next(&mut self, max_wraps: usize) -> Option<Codon> {
        if self.genotype.is_empty() {
            return None;
        }
        if self.idx == self.genotype.len() {
            self.wraps += 1;
            if self.wraps > max_wraps {
                return None;
            }
            self.idx = 0;
        }
        let codon = self.genotype[self.idx];
        self.idx += 1;
        Some(codon)
    }
}

impl PhenotypeSource for GrammarMapper {
    fn derive(&self, genotype: &[Codon]) -> Phenotype {
        let mut text = String::new();
        let mut cursor = CodonCursor {
            genotype,
            idx: 0,
            wraps: 0,
        };
        let mut expansions = 0usize;
        let mut stack = vec![Symbol::NonTerminal(self.grammar.start_symbol().to_string())];

        while let Some(symbol) = stack.pop() {
            match symbol {
                Symbol::Terminal(t) => text.push_str(&t),
                Symbol::NonTerminal(name) => {
                    expansions += 1;
                    if expansions > self.max_expansions {
                        trace!(expansions, "derivation exceeded the expansion bound");
                        return Phenotype::invalid(text);
                    }
                    // validated grammars define every referenced non-terminal
                    let productions = match self.grammar.productions(&name) {
                        Some(p) if !p.is_empty() => p,
                        _ => return Phenotype::invalid(text),
                    };
                    let choice = if productions.len() == 1 {
                        0
                    } else {
                        match cursor.next(self.max_wraps) {
                            Some(codon) => codon as usize % productions.len(),
                            None => {
                                trace!(wraps = cursor.wraps, "derivation ran out of codons");
                                return Phenotype::invalid(text);
                            }
                        }
                    };
                    stack.extend(productions[choice].iter().rev().cloned());
                }
            }
        }

        Phenotype::valid(text)
    }

    fn rule_count(&self) -> usize {
        self.grammar.rule_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper(src: &str) -> GrammarMapper {
        GrammarMapper::new(src.parse().unwrap())
    }

    #[test]
    fn test_codon_selects_production() {
        let m = mapper("<e> ::= getVariable(<v>,k-<lag>)\n<v> ::= 0 | 1 | 2\n<lag> ::= 1 | 2");
        assert_eq!(m.derive(&[2, 1]).text(), "getVariable(2,k-2)");
        assert_eq!(m.derive(&[4, 0]).text(), "getVariable(1,k-1)");
        assert!(m.derive(&[0, 0]).is_valid());
    }

    #[test]
    fn test_single_production_rules_consume_nothing() {
        let m = mapper("<s> ::= <a>\n<a> ::= (<b>)\n<b> ::= x | y");
        assert_eq!(m.derive(&[1]).text(), "(y)");
    }

    #[test]
    fn test_wrapping_reuses_codons() {
        // three choices needed, one codon available: two wraps
        let m = mapper("<s> ::= <d><d><d>\n<d> ::= 0 | 1");
        assert_eq!(m.derive(&[1]).text(), "111");
        assert!(!m.clone().with_max_wraps(1).derive(&[1]).is_valid());
    }

    #[test]
    fn test_empty_genotype_is_invalid_when_a_choice_is_needed() {
        let m = mapper("<s> ::= a | b");
        assert!(!m.derive(&[]).is_valid());
        let trivial = mapper("<s> ::= a");
        assert_eq!(trivial.derive(&[]).text(), "a");
    }

    #[test]
    fn test_runaway_recursion_is_invalid() {
        // codon 0 always picks the recursive production
        let m = mapper("<e> ::= (<e>+<e>) | 1").with_max_wraps(1000);
        let p = m.with_max_expansions(50).derive(&[0]);
        assert!(!p.is_valid());
    }
}
