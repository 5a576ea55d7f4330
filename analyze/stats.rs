//! Descriptive statistics over a population snapshot.

use crate::shared::schema::{Attribute, PerAttribute, Student, outcome_vector};
use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Arithmetic mean.
///
/// Precondition: `values` is non-empty. An empty view yields `NaN`.
pub fn mean(values: ArrayView1<f64>) -> f64 {
    debug_assert!(!values.is_empty(), "mean of an empty sequence");
    values.sum() / values.len() as f64
}

/// Population standard deviation (divides by `n`, not `n - 1`).
///
/// Precondition: `values` is non-empty.
pub fn std_dev(values: ArrayView1<f64>) -> f64 {
    let m = mean(values);
    let variance = values.fold(0.0, |acc, &x| acc + (x - m) * (x - m)) / values.len() as f64;
    variance.sqrt()
}

fn is_constant(values: ArrayView1<f64>) -> bool {
    match values.iter().next() {
        Some(&head) => values.iter().all(|&x| x == head),
        None => true,
    }
}

/// Pearson correlation coefficient.
///
/// Returns exactly `0.0` when either sequence is constant (zero standard
/// deviation) instead of `NaN`. The result is clamped to `[-1, 1]` to absorb
/// rounding at perfect (anti-)correlation.
///
/// # Panics
/// If the two sequences differ in length.
pub fn pearson(x: ArrayView1<f64>, y: ArrayView1<f64>) -> f64 {
    assert_eq!(x.len(), y.len(), "pearson requires equal-length sequences");
    if is_constant(x) || is_constant(y) {
        return 0.0;
    }
    let (mx, my) = (mean(x), mean(y));
    let (sx, sy) = (std_dev(x), std_dev(y));
    let denominator = sx * sy;
    if denominator == 0.0 || !denominator.is_finite() {
        return 0.0;
    }
    let covariance = x
        .iter()
        .zip(y.iter())
        .fold(0.0, |acc, (&xi, &yi)| acc + (xi - mx) * (yi - my))
        / x.len() as f64;
    (covariance / denominator).clamp(-1.0, 1.0)
}

/// Headline statistics of a population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationSummary {
    pub mean_outcome: f64,
    /// Means on each attribute's native scale.
    pub mean_attributes: PerAttribute<f64>,
    /// Correlation of each attribute with `assessment_score`.
    pub correlations: PerAttribute<f64>,
}

/// Attribute column of `students` on its native scale.
pub fn attribute_column(students: &[Student], attribute: Attribute) -> Array1<f64> {
    students
        .iter()
        .map(|s| f64::from(s.value(attribute)))
        .collect()
}

/// Means and outcome correlations of every attribute.
///
/// Returns `None` for an empty population: there is nothing to summarize.
pub fn summarize(students: &[Student]) -> Option<PopulationSummary> {
    if students.is_empty() {
        return None;
    }
    let outcome = outcome_vector(students);
    let columns = PerAttribute::from_fn(|a| attribute_column(students, a));

    Some(PopulationSummary {
        mean_outcome: mean(outcome.view()),
        mean_attributes: PerAttribute::from_fn(|a| mean(columns.get(a).view())),
        correlations: PerAttribute::from_fn(|a| pearson(columns.get(a).view(), outcome.view())),
    })
}
