//! BNF grammars and the codon-driven mapper that turns genotypes into
//! expression text.
//!
//! Grammar files look like:
//!
//! ```text
//! # comments start with '#'
//! <func>   ::= <expr>
//! <expr>   ::= <expr> <op> <expr> | (<expr>) | getVariable(<idx>, k-<lag>)
//!            | <cte>
//! <op>     ::= + | - | * | /
//! <idx>    ::= 0 | 1
//! <lag>    ::= 1 | 2 | 3
//! <cte>    ::= 1.0 | 2.0 | 0.5
//! ```
//!
//! Non-terminals may be glued to terminal text. The first rule is the start
//! symbol. Lines starting with `|` continue the previous rule.

pub mod mapper;

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

pub use mapper::GrammarMapper;

#[derive(Error, Debug)]
pub enum GrammarError {
    #[error("Failed to read grammar file: {0}")]
    FileReadError(#[from] std::io::Error),
    #[error("Failed to parse rule on line {line}: '{text}'")]
    ParseError { line: usize, text: String },
    #[error("Grammar has no rules")]
    Empty,
    #[error("Undefined non-terminal referenced in grammar: '{0}'")]
    UndefinedNonTerminal(String),
    #[error("Unreachable rule in grammar: {0}")]
    UnreachableRule(String),
    #[error("Non-terminating rule in grammar: {0}")]
    NonTerminatingRule(String),
}

/// One element of a production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Terminal(String),
    NonTerminal(String),
}

pub type Production = Vec<Symbol>;

/// A parsed BNF grammar, validated for logical consistency.
#[derive(Debug, Clone)]
pub struct Grammar {
    rules: HashMap<String, Vec<Production>>,
    start: String,
}

impl Grammar {
    /// Reads and validates a grammar from a `.bnf` file.
    pub fn new(path: &Path) -> Result<Self, GrammarError> {
        let content = fs::read_to_string(path)?;
        content.parse()
    }

    pub fn start_symbol(&self) -> &str {
        &self.start
    }

    pub fn productions(&self, non_terminal: &str) -> Option<&[Production]> {
        self.rules.get(non_terminal).map(Vec::as_slice)
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Validates that every referenced non-terminal is defined, reachable from
    /// the start symbol, and able to derive a string of terminals.
    fn validate(&self) -> Result<(), GrammarError> {
        // 1. Undefined non-terminals
        for productions in self.rules.values() {
            for symbol in productions.iter().flatten() {
                if let Symbol::NonTerminal(name) = symbol {
                    if !self.rules.contains_key(name) {
                        return Err(GrammarError::UndefinedNonTerminal(name.clone()));
                    }
                }
            }
        }

        // 2. Unreachable rules, BFS from the start symbol
        let mut reachable = HashSet::new();
        let mut queue = VecDeque::new();
        reachable.insert(self.start.clone());
        queue.push_back(self.start.clone());
        while let Some(current) = queue.pop_front() {
            for symbol in self.rules[&current].iter().flatten() {
                if let Symbol::NonTerminal(name) = symbol {
                    if reachable.insert(name.clone()) {
                        queue.push_back(name.clone());
                    }
                }
            }
        }
        if let Some(rule) = self.rules.keys().find(|r| !reachable.contains(*r)) {
            return Err(GrammarError::UnreachableRule(rule.clone()));
        }

        // 3. Non-terminating rules, fixed point over "has an all-terminating production"
        let mut terminating: HashSet<&str> = HashSet::new();
        let mut changed = true;
        while changed {
            changed = false;
            for (lhs, productions) in &self.rules {
                if terminating.contains(lhs.as_str()) {
                    continue;
                }
                let ends = productions.iter().any(|production| {
                    production.iter().all(|s| match s {
                        Symbol::Terminal(_) => true,
                        Symbol::NonTerminal(name) => terminating.contains(name.as_str()),
                    })
                });
                if ends {
                    terminating.insert(lhs);
                    changed = true;
                }
            }
        }
        if let Some(rule) = self.rules.keys().find(|r| !terminating.contains(r.as_str())) {
            return Err(GrammarError::NonTerminatingRule(rule.clone()));
        }

        Ok(())
    }
}

impl FromStr for Grammar {
    type Err = GrammarError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let mut rules: HashMap<String, Vec<Production>> = HashMap::new();
        let mut start: Option<String> = None;
        let mut last: Option<String> = None;

        for (number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let (lhs, rhs) = if let Some(rest) = trimmed.strip_prefix('|') {
                match &last {
                    Some(lhs) => (lhs.clone(), rest),
                    None => {
                        return Err(GrammarError::ParseError {
                            line: number + 1,
                            text: line.to_string(),
                        })
                    }
                }
            } else {
                let mut parts = trimmed.splitn(2, "::=");
                let lhs = parts.next().unwrap_or_default().trim();
                let rhs = parts.next().ok_or_else(|| GrammarError::ParseError {
                    line: number + 1,
                    text: line.to_string(),
                })?;
                if !is_non_terminal(lhs) {
                    return Err(GrammarError::ParseError {
                        line: number + 1,
                        text: line.to_string(),
                    });
                }
                (lhs.to_string(), rhs)
            };

            let productions = rhs.split('|').map(parse_production);
            rules.entry(lhs.clone()).or_default().extend(productions);
            start.get_or_insert_with(|| lhs.clone());
            last = Some(lhs);
        }

        let start = start.ok_or(GrammarError::Empty)?;
        let grammar = Self { rules, start };
        grammar.validate()?;
        Ok(grammar)
    }
}

/// Checks if a given symbol is a non-terminal of the form `<name>`.
pub fn is_non_terminal(symbol: &str) -> bool {
    symbol.starts_with('<') && symbol.ends_with('>') && symbol.len() > 2
}

/// Splits one alternative into terminal runs and `<...>` references.
fn parse_production(alternative: &str) -> Production {
    let text = alternative.trim();
    let mut symbols = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let next_ref = next_reference(rest);

        match next_ref {
            Some((open, close)) => {
                if open > 0 {
                    symbols.push(Symbol::Terminal(rest[..open].to_string()));
                }
                symbols.push(Symbol::NonTerminal(rest[open..close].to_string()));
                rest = &rest[close..];
            }
            None => {
                symbols.push(Symbol::Terminal(rest.to_string()));
                rest = "";
            }
        }
    }

    symbols
}

/// Byte span of the first well-formed `<name>` in `text`.
fn next_reference(text: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(pos) = text[from..].find('<') {
        let open = from + pos;
        let name = &text[open + 1..];
        let len = name
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(name.len());
        if len > 0 && name[len..].starts_with('>') {
            return Some((open, open + len + 2));
        }
        from = open + 1;
    }
    None
}
