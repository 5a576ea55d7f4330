//! # Linear Regression by Batch Gradient Descent
//!
//! Predicts `assessment_score` from the five native attributes.
//!
//! - Every feature is min-max normalized onto `[0, 1]` with bounds observed in
//!   the training population. A column with zero range normalizes to 0.
//! - Weights and bias start at zero and follow plain batch gradient descent:
//!   each step accumulates the mean residual and the mean residual×feature over
//!   the whole population before touching any parameter, so identical input
//!   always yields an identical fit.
//! - R² is measured on the training population. It is an optimistic estimate
//!   of how the model behaves on unseen students.

use crate::shared::schema::{FeatureScale, NUM_FEATURES, Student, feature_matrix, outcome_vector};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use serde::{Deserialize, Serialize};

pub const DEFAULT_LEARNING_RATE: f64 = 0.05;
pub const DEFAULT_ITERATIONS: usize = 1200;

/// Optimizer settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegressionConfig {
    pub learning_rate: f64,
    pub iterations: usize,
}

impl Default for RegressionConfig {
    fn default() -> Self {
        Self {
            learning_rate: DEFAULT_LEARNING_RATE,
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Observed range of one feature column at fit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureBounds {
    pub min: f64,
    pub max: f64,
}

impl FeatureBounds {
    fn of(column: ArrayView1<f64>) -> Self {
        let (min, max) = column
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        Self { min, max }
    }

    /// Maps `value` onto the unit interval of these bounds. Values outside the
    /// fitted range extrapolate linearly.
    pub fn normalize(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range > 0.0 {
            (value - self.min) / range
        } else {
            0.0
        }
    }
}

/// A fitted linear model. Immutable once produced by [`fit_regression`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    /// One weight per attribute, in schema order, on the normalized scale.
    pub weights: Array1<f64>,
    pub bias: f64,
    /// Normalization bounds per attribute, captured from the training data.
    pub feature_bounds: [FeatureBounds; NUM_FEATURES],
    /// Coefficient of determination on the training population.
    pub r_squared: f64,
}

impl LinearModel {
    /// Predicted score of `student`, clamped to `[0, 100]`.
    pub fn score(&self, student: &Student) -> f64 {
        self.predict_features(&student.features(FeatureScale::Native))
    }

    /// Predicted score of a raw native-scale feature vector, clamped to `[0, 100]`.
    pub fn predict_features(&self, features: &[f64; NUM_FEATURES]) -> f64 {
        let linear = features
            .iter()
            .zip(&self.feature_bounds)
            .zip(self.weights.iter())
            .fold(self.bias, |acc, ((&x, bounds), &w)| {
                acc + w * bounds.normalize(x)
            });
        linear.clamp(0.0, 100.0)
    }
}

/// Fits the model with the default learning rate and iteration count.
///
/// Returns `None` for an empty population.
pub fn fit_regression(students: &[Student]) -> Option<LinearModel> {
    fit_regression_with(students, &RegressionConfig::default())
}

pub fn fit_regression_with(students: &[Student], config: &RegressionConfig) -> Option<LinearModel> {
    if students.is_empty() {
        return None;
    }
    let raw = feature_matrix(students, FeatureScale::Native);
    let y = outcome_vector(students);

    let feature_bounds: [FeatureBounds; NUM_FEATURES] =
        std::array::from_fn(|j| FeatureBounds::of(raw.column(j)));
    let x = normalize_columns(&raw, &feature_bounds);

    let n = students.len() as f64;
    let mut weights = Array1::<f64>::zeros(NUM_FEATURES);
    let mut bias = 0.0;

    for iteration in 0..config.iterations {
        let residual = x.dot(&weights) + bias - &y;
        let bias_gradient = residual.sum() / n;
        let weight_gradient = x.t().dot(&residual) / n;

        bias -= config.learning_rate * bias_gradient;
        weights.scaled_add(-config.learning_rate, &weight_gradient);

        if iteration % 200 == 0 {
            log::debug!(
                "gradient descent step {iteration}: mse = {:.4}",
                residual.mapv(|r| r * r).sum() / n
            );
        }
    }

    let predictions = x.dot(&weights) + bias;
    let r_squared = r_squared(y.view(), predictions.view());
    log::info!(
        "Fitted linear model on {} students ({} iterations, lr {}): R² = {:.4}",
        students.len(),
        config.iterations,
        config.learning_rate,
        r_squared
    );

    Some(LinearModel {
        weights,
        bias,
        feature_bounds,
        r_squared,
    })
}

fn normalize_columns(raw: &Array2<f64>, bounds: &[FeatureBounds; NUM_FEATURES]) -> Array2<f64> {
    let mut x = raw.clone();
    for (mut column, b) in x.axis_iter_mut(Axis(1)).zip(bounds) {
        column.mapv_inplace(|v| b.normalize(v));
    }
    x
}

/// Coefficient of determination of `predicted` against `observed`.
///
/// A constant target has no variance to explain and yields exactly 1.
pub fn r_squared(observed: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(observed.len(), predicted.len());
    if observed.is_empty() {
        return 1.0;
    }
    let mean = observed.sum() / observed.len() as f64;
    let ss_tot = observed.fold(0.0, |acc, &v| acc + (v - mean) * (v - mean));
    if ss_tot == 0.0 {
        return 1.0;
    }
    let ss_res = observed
        .iter()
        .zip(predicted.iter())
        .fold(0.0, |acc, (&o, &p)| acc + (o - p) * (o - p));
    1.0 - ss_res / ss_tot
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::schema::{Attribute, GradeLevel};
    use crate::synth::population::{PopulationBuilder, generate_population};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn student(features: [u8; 5], score: u8) -> Student {
        Student {
            student_id: "S1000".to_string(),
            name: "Isha Nair".to_string(),
            class: GradeLevel::Grade10,
            comprehension: features[0],
            attention: features[1],
            focus: features[2],
            retention: features[3],
            engagement_time: features[4],
            assessment_score: score,
        }
    }

    #[test]
    fn empty_population_has_no_model() {
        assert!(fit_regression(&[]).is_none());
    }

    #[test]
    fn noiseless_outcome_is_explained_almost_entirely() {
        let students = PopulationBuilder::new(300)
            .seed(123)
            .with_outcome_noise(0.0)
            .build();
        let model = fit_regression(&students).expect("non-empty population");
        assert!(model.r_squared >= 0.95, "R² = {}", model.r_squared);
        // Comprehension carries the largest weight in the outcome and has a
        // comparable observed range, so it should lead the fitted weights.
        let comprehension = model.weights[Attribute::Comprehension.index()];
        assert!(model.weights.iter().all(|&w| w <= comprehension + 1e-9));
    }

    #[test]
    fn noisy_outcome_still_fits_reasonably() {
        let students = generate_population(300, 123);
        let model = fit_regression(&students).expect("non-empty population");
        assert!(model.r_squared > 0.5, "R² = {}", model.r_squared);
        assert!(model.r_squared < 1.0);
    }

    #[test]
    fn constant_target_reports_r_squared_of_one() {
        let students = vec![
            student([10, 20, 30, 40, 50], 60),
            student([70, 80, 90, 15, 25], 60),
            student([35, 45, 55, 65, 75], 60),
        ];
        let model = fit_regression(&students).expect("non-empty population");
        assert_eq!(model.r_squared, 1.0);
        assert_eq!(r_squared(array![4.0, 4.0].view(), array![1.0, 9.0].view()), 1.0);
    }

    #[test]
    fn zero_range_feature_is_ignored() {
        let students = vec![
            student([10, 20, 30, 40, 60], 20),
            student([50, 60, 70, 80, 60], 60),
            student([90, 95, 85, 75, 60], 85),
        ];
        let model = fit_regression(&students).expect("non-empty population");
        let engagement = Attribute::EngagementTime.index();
        assert_eq!(model.weights[engagement], 0.0);
        assert_eq!(model.feature_bounds[engagement].normalize(60.0), 0.0);
        assert!(model.weights.iter().all(|w| w.is_finite()));
    }

    #[test]
    fn scoring_uses_fit_time_bounds_and_clamps() {
        let students = generate_population(80, 4);
        let model = fit_regression(&students).expect("non-empty population");

        let extreme_high = student([100, 100, 100, 100, 120], 0);
        let extreme_low = student([0, 0, 0, 0, 0], 0);
        let high = model.score(&extreme_high);
        let low = model.score(&extreme_low);
        assert!((0.0..=100.0).contains(&high));
        assert!((0.0..=100.0).contains(&low));
        assert!(high > low);

        // Bounds belong to the training data, not to whoever is being scored.
        let before = model.feature_bounds;
        model.score(&extreme_high);
        assert_eq!(model.feature_bounds, before);
    }

    #[test]
    fn predictions_are_clamped_to_score_range() {
        let mut model = LinearModel {
            weights: Array1::zeros(NUM_FEATURES),
            bias: 250.0,
            feature_bounds: [FeatureBounds { min: 0.0, max: 100.0 }; NUM_FEATURES],
            r_squared: 0.0,
        };
        assert_eq!(model.predict_features(&[50.0; NUM_FEATURES]), 100.0);
        model.bias = -40.0;
        assert_eq!(model.predict_features(&[50.0; NUM_FEATURES]), 0.0);
        model.bias = 10.0;
        model.weights[0] = 20.0;
        assert_abs_diff_eq!(
            model.predict_features(&[25.0, 0.0, 0.0, 0.0, 0.0]),
            15.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn fitting_is_deterministic() {
        let students = generate_population(120, 9);
        assert_eq!(fit_regression(&students), fit_regression(&students));
    }

    #[test]
    fn more_iterations_do_not_lose_fit() {
        let students = generate_population(150, 21);
        let short = fit_regression_with(
            &students,
            &RegressionConfig {
                learning_rate: DEFAULT_LEARNING_RATE,
                iterations: 50,
            },
        )
        .expect("non-empty population");
        let long = fit_regression(&students).expect("non-empty population");
        assert!(long.r_squared >= short.r_squared);
    }
}
