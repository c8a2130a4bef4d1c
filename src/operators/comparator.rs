use std::cmp::Ordering;
use std::fmt::Debug;

use crate::solution::Solution;

/// Orders two solutions by Pareto dominance.
///
/// `Less` means `a` dominates `b`, `Greater` means `b` dominates `a`, and
/// `Equal` means neither dominates (equal or mutually non-dominated).
pub trait Dominance: Debug + Send + Sync {
    fn compare(&self, a: &Solution, b: Option<&Solution>) -> Ordering;
}

/// Pareto dominance over minimized objectives.
///
/// A missing `b` is dominated by anything. Solutions with a different number
/// of objectives are compared over the objectives they share; unset
/// objectives count as `+inf`.
///
/// # Examples
///
/// ```
/// use std::cmp::Ordering;
/// use grameval::operators::{Dominance, SolutionDominance};
/// use grameval::solution::Solution;
///
/// let mut a = Solution::new(vec![1, 2], 2);
/// let mut b = Solution::new(vec![3, 4], 2);
/// a.set_objective(0, 1.0);
/// a.set_objective(1, 2.0);
/// b.set_objective(0, 1.0);
/// b.set_objective(1, 3.0);
///
/// assert_eq!(SolutionDominance.compare(&a, Some(&b)), Ordering::Less);
/// assert_eq!(SolutionDominance.compare(&b, Some(&a)), Ordering::Greater);
/// assert_eq!(SolutionDominance.compare(&a, None), Ordering::Less);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SolutionDominance;

impl Dominance for SolutionDominance {
    fn compare(&self, a: &Solution, b: Option<&Solution>) -> Ordering {
        match b {
            None => Ordering::Less,
            Some(b) => compare_objectives(&a.objective_values(), &b.objective_values()),
        }
    }
}

/// Dominance over raw objective vectors; see [`SolutionDominance`].
pub fn compare_objectives(a: &[f64], b: &[f64]) -> Ordering {
    let mut bigger = false;
    let mut smaller = false;
    for (x, y) in a.iter().zip(b) {
        if x > y {
            bigger = true;
        }
        if x < y {
            smaller = true;
        }
        if bigger && smaller {
            return Ordering::Equal;
        }
    }
    match (smaller, bigger) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Whether `a` dominates `b`.
pub fn dominates(a: &[f64], b: &[f64]) -> bool {
    compare_objectives(a, b) == Ordering::Less
}

/// Ranks `population` best first.
///
/// Dominance is only a partial order, so solutions are ordered by how many
/// members of the population dominate them; ties keep their relative order.
/// With a single objective this is a plain ascending sort.
pub fn sort_by_dominance<D: Dominance + ?Sized>(population: &mut Vec<Solution>, comparator: &D) {
    let dominated_by: Vec<usize> = population
        .iter()
        .map(|s| {
            population
                .iter()
                .filter(|other| comparator.compare(other, Some(s)) == Ordering::Less)
                .count()
        })
        .collect();
    let mut ranked: Vec<(usize, Solution)> =
        dominated_by.into_iter().zip(population.drain(..)).collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    population.extend(ranked.into_iter().map(|(_, s)| s));
}
