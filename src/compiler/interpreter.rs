use std::fmt::Write;

use super::evaluator::{Entry, Evaluator};
use super::expr::Expr;
use super::{CodeSynthesizer, CompileFailure, SourceUnit, WorkerContext};
use crate::phenotype::Phenotype;

const HELPERS: &str = r#"    fn get_variable(&self, var: usize, k: i64) -> f64 {
        let row = if k < 0 { 0 } else { k as usize };
        self.table[row][var]
    }

    fn span(from: i64, to: i64) -> f64 {
        (to as i128 - from as i128 + 1) as f64
    }

    fn my_drv(&self, from: i64, to: i64, var: usize) -> f64 {
        (self.get_variable(var, to) - self.get_variable(var, from)) / Self::span(from, to)
    }

    fn my_sum(&self, from: i64, to: i64, var: usize) -> f64 {
        (from..=to).map(|i| self.get_variable(var, i)).sum()
    }

    fn my_avg(&self, from: i64, to: i64, var: usize) -> f64 {
        self.my_sum(from, to, var) / Self::span(from, to)
    }
"#;

/// Builds batches by parsing every entry into an [`Expr`] tree.
///
/// The rendered listing is Rust-shaped but only serves as a diagnostic
/// artifact; evaluation walks the parsed trees.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterpretedSynthesizer;

impl InterpretedSynthesizer {
    fn render(unit_name: &str, entries: &[Option<String>]) -> String {
        let mut text = String::new();
        // writing into a String cannot fail
        let _ = writeln!(text, "// {} ({} entries)", unit_name, entries.len());
        let _ = writeln!(text, "pub struct PopEvaluator {{\n    table: Vec<Vec<f64>>,\n}}\n");
        let _ = writeln!(text, "impl PopEvaluator {{");
        text.push_str(HELPERS);
        text.push('\n');
        let _ = writeln!(text, "    pub fn evaluate(&self, idx: usize, k: i64) -> f64 {{");
        let _ = writeln!(text, "        let result = match idx {{");
        for (i, entry) in entries.iter().enumerate() {
            match entry {
                Some(expr) => {
                    let _ = writeln!(text, "            {} => {},", i, expr);
                }
                None => {
                    let _ = writeln!(text, "            {} => f64::INFINITY,", i);
                }
            }
        }
        let _ = writeln!(text, "            _ => f64::INFINITY,");
        let _ = writeln!(text, "        }};");
        let _ = writeln!(
            text,
            "        if result.is_nan() {{ f64::INFINITY }} else {{ result }}"
        );
        let _ = writeln!(text, "    }}\n}}");
        text
    }
}

impl CodeSynthesizer for InterpretedSynthesizer {
    fn synthesize(&self, ctx: &WorkerContext, phenotypes: &[Phenotype]) -> SourceUnit {
        let unit_name = ctx.unit_name();
        let entries: Vec<Option<String>> = phenotypes
            .iter()
            .map(|p| p.is_valid().then(|| p.text().to_string()))
            .collect();
        let text = Self::render(&unit_name, &entries);
        SourceUnit {
            unit_name,
            entries,
            text,
        }
    }

    fn build_and_load(
        &self,
        _ctx: &WorkerContext,
        unit: &SourceUnit,
    ) -> Result<Evaluator, CompileFailure> {
        let mut diagnostics = Vec::new();
        let mut dispatch = Vec::with_capacity(unit.entries.len());
        for (i, entry) in unit.entries.iter().enumerate() {
            match entry {
                None => dispatch.push(Entry::Invalid),
                Some(text) => match Expr::parse(text) {
                    Ok(expr) => dispatch.push(Entry::Expression(expr)),
                    Err(e) => diagnostics.push(format!("entry {}: {}", i, e)),
                },
            }
        }

        if diagnostics.is_empty() {
            Ok(Evaluator::new(unit.unit_name.clone(), dispatch))
        } else {
            Err(CompileFailure {
                unit_name: unit.unit_name.clone(),
                diagnostics,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_marks_invalid_entries() {
        let ctx = WorkerContext::new(7, "unused");
        let unit = InterpretedSynthesizer.synthesize(
            &ctx,
            &[
                Phenotype::valid("getVariable(0, k)"),
                Phenotype::invalid("<expr> + 1"),
            ],
        );
        assert_eq!(unit.unit_name, "pop_evaluator_7");
        assert_eq!(
            unit.entries,
            vec![Some("getVariable(0, k)".to_string()), None]
        );
        assert!(unit.text.contains("fn my_avg"));
        assert!(unit.text.contains("if result.is_nan()"));
        assert!(!unit.text.contains("<expr>"));
    }

    #[test]
    fn test_empty_batch_builds() {
        let ctx = WorkerContext::new(0, "unused");
        let unit = InterpretedSynthesizer.synthesize(&ctx, &[]);
        let evaluator = InterpretedSynthesizer.build_and_load(&ctx, &unit).unwrap();
        assert!(evaluator.is_empty());
    }

    #[test]
    fn test_overly_deep_entry_fails_the_batch() {
        let ctx = WorkerContext::new(2, "unused");
        let deep = format!("{}k{}", "(".repeat(1000), ")".repeat(1000));
        let unit = InterpretedSynthesizer
            .synthesize(&ctx, &[Phenotype::valid("k"), Phenotype::valid(deep)]);
        let failure = InterpretedSynthesizer.build_and_load(&ctx, &unit).unwrap_err();
        assert_eq!(failure.diagnostics.len(), 1);
        assert!(failure.diagnostics[0].starts_with("entry 1:"));
        assert!(failure.diagnostics[0].contains("deeper than"));
    }

    #[test]
    fn test_no_dispatch_cross_talk() {
        let ctx = WorkerContext::new(0, "unused");
        let phenotypes: Vec<Phenotype> =
            (0..40).map(|i| Phenotype::valid(i.to_string())).collect();
        let unit = InterpretedSynthesizer.synthesize(&ctx, &phenotypes);
        let bound = InterpretedSynthesizer
            .build_and_load(&ctx, &unit)
            .unwrap()
            .bind(vec![vec![0.0, 0.0]]);
        for i in 0..40 {
            assert_eq!(bound.evaluate(i, 0), i as f64);
            assert_eq!(bound.evaluate(i, -3), i as f64);
        }
    }
}
