use std::ops::Range;

use thiserror::Error;

use super::expr::{Expr, Function};

/// Fitness sentinel for broken or unusable expressions.
pub const WORST_FITNESS: f64 = f64::INFINITY;

/// A runtime failure inside one expression. Never leaves the evaluator:
/// every fault becomes [`WORST_FITNESS`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalFault {
    #[error("variable index {0} is outside the row")]
    VariableOutOfRange(i64),
    #[error("row {0} is past the end of the table")]
    RowOutOfRange(i64),
    #[error("the table is empty")]
    EmptyTable,
}

/// One dispatch case.
#[derive(Debug, Clone)]
pub(crate) enum Entry {
    Expression(Expr),
    /// Derivation failed; the case returns the sentinel unconditionally.
    Invalid,
}

/// A loaded batch unit that has not been given a table yet.
#[derive(Debug, Clone)]
pub struct Evaluator {
    unit_name: String,
    dispatch: Vec<Entry>,
}

impl Evaluator {
    pub(crate) fn new(unit_name: String, dispatch: Vec<Entry>) -> Self {
        Self {
            unit_name,
            dispatch,
        }
    }

    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    /// Number of dispatch cases, one per solution of the batch.
    pub fn len(&self) -> usize {
        self.dispatch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dispatch.is_empty()
    }

    /// Attaches the generation's table. The evaluator owns its copy.
    pub fn bind(self, table: Vec<Vec<f64>>) -> BoundEvaluator {
        let bound_outputs = table.iter().map(|row| row.last().copied()).collect();
        BoundEvaluator {
            unit_name: self.unit_name,
            dispatch: self.dispatch,
            table,
            bound_outputs,
        }
    }
}

/// An evaluator with a table attached. Only bound evaluators evaluate.
#[derive(Debug, Clone)]
pub struct BoundEvaluator {
    unit_name: String,
    dispatch: Vec<Entry>,
    table: Vec<Vec<f64>>,
    /// Output slots as they were when the table was bound.
    bound_outputs: Vec<Option<f64>>,
}

impl BoundEvaluator {
    pub fn unit_name(&self) -> &str {
        &self.unit_name
    }

    pub fn table(&self) -> &[Vec<f64>] {
        &self.table
    }

    pub fn into_table(self) -> Vec<Vec<f64>> {
        self.table
    }

    /// Whether case `idx` holds an expression (as opposed to the invalid case).
    pub fn is_valid(&self, idx: usize) -> bool {
        matches!(self.dispatch.get(idx), Some(Entry::Expression(_)))
    }

    /// Evaluates case `idx` at row `k` over the whole table.
    ///
    /// Never fails: faults, NaN and unknown indices all return
    /// [`WORST_FITNESS`].
    pub fn evaluate(&self, idx: usize, k: i64) -> f64 {
        self.guarded(idx, k, &self.table)
    }

    /// Evaluates case `idx` at row `k` with lookups relative to the window
    /// `rows` of the table.
    pub fn evaluate_in(&self, idx: usize, k: i64, rows: Range<usize>) -> f64 {
        match self.table.get(rows) {
            Some(window) => self.guarded(idx, k, window),
            None => WORST_FITNESS,
        }
    }

    /// Recursive one-step-ahead prediction for case `idx`.
    ///
    /// The output slots are first reset to their bound values, so a series
    /// never sees another case's predictions. Row 0's output slot is then
    /// seeded with its own first column, and row `k + 1`'s output slot
    /// receives the prediction made at row `k`, so later predictions may read
    /// earlier ones. Rows without columns are left alone.
    pub fn evaluate_series(&mut self, idx: usize) {
        for (row, bound) in self.table.iter_mut().zip(&self.bound_outputs) {
            if let (Some(slot), Some(value)) = (row.last_mut(), bound) {
                *slot = *value;
            }
        }

        let Some(first) = self.table.first_mut() else {
            return;
        };
        let Some(&observed) = first.first() else {
            return;
        };
        if let Some(slot) = first.last_mut() {
            *slot = observed;
        }

        for k in 1..self.table.len() {
            let prediction = self.evaluate(idx, k as i64 - 1);
            if let Some(slot) = self.table[k].last_mut() {
                *slot = prediction;
            }
        }
    }

    /// Value of variable `var` at row `k`; negative rows read row 0.
    pub fn get_variable(&self, var: i64, k: i64) -> Result<f64, EvalFault> {
        get_variable(&self.table, var, k)
    }

    fn guarded(&self, idx: usize, k: i64, rows: &[Vec<f64>]) -> f64 {
        let expr = match self.dispatch.get(idx) {
            Some(Entry::Expression(expr)) => expr,
            _ => return WORST_FITNESS,
        };
        match eval(expr, rows, k) {
            Ok(v) if !v.is_nan() => v,
            _ => WORST_FITNESS,
        }
    }
}

pub(crate) fn get_variable(rows: &[Vec<f64>], var: i64, k: i64) -> Result<f64, EvalFault> {
    let row = if k < 0 {
        rows.first().ok_or(EvalFault::EmptyTable)?
    } else {
        rows.get(k as usize).ok_or(EvalFault::RowOutOfRange(k))?
    };
    usize::try_from(var)
        .ok()
        .and_then(|v| row.get(v))
        .copied()
        .ok_or(EvalFault::VariableOutOfRange(var))
}

fn my_sum(rows: &[Vec<f64>], from: i64, to: i64, var: i64) -> Result<f64, EvalFault> {
    if to < from {
        return Ok(0.0);
    }
    // rows before the start of the table all read row 0
    let mut res = 0.0;
    let before = i128::from(to.min(-1)) - i128::from(from) + 1;
    if before > 0 {
        res += before as f64 * get_variable(rows, var, 0)?;
    }
    for i in from.max(0)..=to {
        res += get_variable(rows, var, i)?;
    }
    Ok(res)
}

/// Saturating: `±inf` and huge values land on `i64::MIN`/`i64::MAX`.
fn index(value: f64) -> i64 {
    value.trunc() as i64
}

/// Number of rows in `from..=to`, wide enough for saturated indices.
fn span(from: i64, to: i64) -> f64 {
    (i128::from(to) - i128::from(from) + 1) as f64
}

fn eval(expr: &Expr, rows: &[Vec<f64>], k: i64) -> Result<f64, EvalFault> {
    Ok(match expr {
        Expr::Number(n) => *n,
        Expr::Row => k as f64,
        Expr::Neg(e) => -eval(e, rows, k)?,
        Expr::Binary { op, lhs, rhs } => op.apply(eval(lhs, rows, k)?, eval(rhs, rows, k)?),
        Expr::Call { func, args } => {
            let mut values = [0.0; 3];
            for (slot, arg) in values.iter_mut().zip(args) {
                *slot = eval(arg, rows, k)?;
            }
            let [a, b, c] = values;
            match func {
                Function::GetVariable => get_variable(rows, index(a), index(b))?,
                Function::Drv => {
                    let (from, to, var) = (index(a), index(b), index(c));
                    (get_variable(rows, var, to)? - get_variable(rows, var, from)?)
                        / span(from, to)
                }
                Function::Sum => my_sum(rows, index(a), index(b), index(c))?,
                Function::Avg => {
                    let (from, to) = (index(a), index(b));
                    my_sum(rows, from, to, index(c))? / span(from, to)
                }
                Function::Exp => a.exp(),
                Function::Log => a.ln(),
                Function::Sqrt => a.sqrt(),
                Function::Abs => a.abs(),
                Function::Pow => a.powf(b),
                Function::Sin => a.sin(),
                Function::Cos => a.cos(),
                Function::Tan => a.tan(),
                Function::Min => a.min(b),
                Function::Max => a.max(b),
                Function::Floor => a.floor(),
                Function::Ceil => a.ceil(),
            }
        }
    })
}
