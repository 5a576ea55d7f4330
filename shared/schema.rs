//! # Student Schema
//!
//! The fixed record shape shared by the generator and every analysis. Column
//! names are not configurable: a student always carries exactly the five
//! input attributes and the derived `assessment_score`.
//!
//! Two feature scalings are exposed because the consumers need different views:
//! - `FeatureScale::Native` keeps `engagement_time` in minutes (0..=120). The
//!   regression engine min-max normalizes every column itself.
//! - `FeatureScale::Comparable` maps `engagement_time` onto 0..=100 so that no
//!   attribute dominates a Euclidean distance because of its native range.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of input attributes per student.
pub const NUM_FEATURES: usize = 5;

/// Weights of the composite score, in `Attribute::ALL` order.
/// The last weight applies to the comparably scaled engagement value.
pub const COMPOSITE_WEIGHTS: [f64; NUM_FEATURES] = [0.28, 0.22, 0.22, 0.18, 0.10];

/// Brings `engagement_time` (0..=120) onto the 0..=100 scale used by clustering.
pub const ENGAGEMENT_TO_PERCENT: f64 = 100.0 / 120.0;

/// Divisor applied to `engagement_time` inside the outcome formula.
pub const ENGAGEMENT_OUTCOME_DIVISOR: f64 = 1.2;

/// Upper bound of every attribute measured on a percentage scale.
pub const PERCENT_MAX: f64 = 100.0;

/// Upper bound of `engagement_time`, in minutes per day.
pub const ENGAGEMENT_MAX: f64 = 120.0;

/// The cohort a student belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeLevel {
    #[serde(rename = "Grade 8")]
    Grade8,
    #[serde(rename = "Grade 9")]
    Grade9,
    #[serde(rename = "Grade 10")]
    Grade10,
}

impl GradeLevel {
    pub const ALL: [GradeLevel; 3] = [GradeLevel::Grade8, GradeLevel::Grade9, GradeLevel::Grade10];

    pub fn label(self) -> &'static str {
        match self {
            Self::Grade8 => "Grade 8",
            Self::Grade9 => "Grade 9",
            Self::Grade10 => "Grade 10",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the five input attributes, in canonical schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attribute {
    Comprehension,
    Attention,
    Focus,
    Retention,
    EngagementTime,
}

impl Attribute {
    /// Canonical order. Every feature vector, weight vector and bounds vector
    /// in this crate is laid out in this order.
    pub const ALL: [Attribute; NUM_FEATURES] = [
        Attribute::Comprehension,
        Attribute::Attention,
        Attribute::Focus,
        Attribute::Retention,
        Attribute::EngagementTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Comprehension => "comprehension",
            Self::Attention => "attention",
            Self::Focus => "focus",
            Self::Retention => "retention",
            Self::EngagementTime => "engagement_time",
        }
    }

    /// Position of this attribute inside a feature vector.
    pub fn index(self) -> usize {
        match self {
            Self::Comprehension => 0,
            Self::Attention => 1,
            Self::Focus => 2,
            Self::Retention => 3,
            Self::EngagementTime => 4,
        }
    }

    /// Inclusive upper bound of the native scale. Every lower bound is 0.
    pub fn upper_bound(self) -> f64 {
        match self {
            Self::EngagementTime => ENGAGEMENT_MAX,
            _ => PERCENT_MAX,
        }
    }

    /// True for the four attributes measured on the 0..=100 scale.
    pub fn is_cognitive_skill(self) -> bool {
        self != Self::EngagementTime
    }

    pub fn composite_weight(self) -> f64 {
        COMPOSITE_WEIGHTS[self.index()]
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fixed-field table holding one value per attribute.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PerAttribute<T> {
    pub comprehension: T,
    pub attention: T,
    pub focus: T,
    pub retention: T,
    pub engagement_time: T,
}

impl<T> PerAttribute<T> {
    /// Builds the table by evaluating `f` once per attribute, in schema order.
    pub fn from_fn(mut f: impl FnMut(Attribute) -> T) -> Self {
        Self {
            comprehension: f(Attribute::Comprehension),
            attention: f(Attribute::Attention),
            focus: f(Attribute::Focus),
            retention: f(Attribute::Retention),
            engagement_time: f(Attribute::EngagementTime),
        }
    }

    pub fn get(&self, attribute: Attribute) -> &T {
        match attribute {
            Attribute::Comprehension => &self.comprehension,
            Attribute::Attention => &self.attention,
            Attribute::Focus => &self.focus,
            Attribute::Retention => &self.retention,
            Attribute::EngagementTime => &self.engagement_time,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Attribute, &T)> + '_ {
        Attribute::ALL.into_iter().map(move |a| (a, self.get(a)))
    }
}

/// One synthetic student.
///
/// All numeric fields are integers that already satisfy their range
/// invariants; the generator clamps and rounds before constructing a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: String,
    pub name: String,
    pub class: GradeLevel,
    pub comprehension: u8,
    pub attention: u8,
    pub focus: u8,
    pub retention: u8,
    /// Minutes per day, 0..=120.
    pub engagement_time: u8,
    pub assessment_score: u8,
}

impl Student {
    /// The raw value of one attribute on its native scale.
    pub fn value(&self, attribute: Attribute) -> u8 {
        match attribute {
            Attribute::Comprehension => self.comprehension,
            Attribute::Attention => self.attention,
            Attribute::Focus => self.focus,
            Attribute::Retention => self.retention,
            Attribute::EngagementTime => self.engagement_time,
        }
    }

    pub fn outcome(&self) -> f64 {
        f64::from(self.assessment_score)
    }

    pub fn features(&self, scale: FeatureScale) -> [f64; NUM_FEATURES] {
        Attribute::ALL.map(|a| {
            let raw = f64::from(self.value(a));
            match (scale, a) {
                (FeatureScale::Comparable, Attribute::EngagementTime) => raw * ENGAGEMENT_TO_PERCENT,
                _ => raw,
            }
        })
    }
}

/// How `engagement_time` is represented inside a feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureScale {
    Native,
    Comparable,
}

/// Weighted composite of a comparably scaled feature vector.
///
/// The same weights form the outcome, so the composite orders students (and
/// centroids) from weakest to strongest expected performance.
pub fn composite_score(features: ArrayView1<f64>) -> f64 {
    debug_assert_eq!(features.len(), NUM_FEATURES);
    features
        .iter()
        .zip(COMPOSITE_WEIGHTS.iter())
        .fold(0.0, |acc, (&x, &w)| acc + w * x)
}

/// Stacks the feature vectors of `students` into an `[n, NUM_FEATURES]` matrix.
pub fn feature_matrix(students: &[Student], scale: FeatureScale) -> Array2<f64> {
    let mut matrix = Array2::zeros((students.len(), NUM_FEATURES));
    for (mut row, student) in matrix.rows_mut().into_iter().zip(students) {
        for (slot, value) in row.iter_mut().zip(student.features(scale)) {
            *slot = value;
        }
    }
    matrix
}

/// The outcome column of `students`, as `f64`.
pub fn outcome_vector(students: &[Student]) -> ndarray::Array1<f64> {
    students.iter().map(Student::outcome).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn sample_student() -> Student {
        Student {
            student_id: "S1000".to_string(),
            name: "Meera Iyer".to_string(),
            class: GradeLevel::Grade9,
            comprehension: 80,
            attention: 62,
            focus: 83,
            retention: 66,
            engagement_time: 120,
            assessment_score: 72,
        }
    }

    #[test]
    fn comparable_scale_maps_engagement_onto_percent() {
        let s = sample_student();
        let native = s.features(FeatureScale::Native);
        let comparable = s.features(FeatureScale::Comparable);
        assert_eq!(native, [80.0, 62.0, 83.0, 66.0, 120.0]);
        assert_eq!(&comparable[..4], &native[..4]);
        assert_abs_diff_eq!(comparable[4], 100.0, epsilon = 1e-12);
    }

    #[test]
    fn composite_weights_sum_to_one() {
        let total: f64 = COMPOSITE_WEIGHTS.iter().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
        // A flat profile scores its own level.
        let flat = array![50.0, 50.0, 50.0, 50.0, 50.0];
        assert_abs_diff_eq!(composite_score(flat.view()), 50.0, epsilon = 1e-12);
    }

    #[test]
    fn feature_matrix_rows_follow_student_order() {
        let mut second = sample_student();
        second.student_id = "S1001".to_string();
        second.focus = 10;
        let matrix = feature_matrix(&[sample_student(), second], FeatureScale::Native);
        assert_eq!(matrix.dim(), (2, NUM_FEATURES));
        assert_eq!(matrix[[0, Attribute::Focus.index()]], 83.0);
        assert_eq!(matrix[[1, Attribute::Focus.index()]], 10.0);
    }

    #[test]
    fn per_attribute_iterates_in_schema_order() {
        let table = PerAttribute::from_fn(|a| a.index());
        let order: Vec<Attribute> = table.iter().map(|(a, _)| a).collect();
        assert_eq!(order, Attribute::ALL.to_vec());
        assert!(table.iter().all(|(a, &i)| a.index() == i));
    }

    #[test]
    fn grade_labels_serialize_as_display_text() {
        let encoded = serde_json::to_string(&GradeLevel::Grade10).unwrap();
        assert_eq!(encoded, "\"Grade 10\"");
        assert_eq!(GradeLevel::Grade8.to_string(), "Grade 8");
    }
}
