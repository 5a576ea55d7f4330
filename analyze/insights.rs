//! Headline findings derived from the three analyses.

use super::kmeans::{Clustering, Persona};
use super::stats::{PopulationSummary, attribute_column, pearson};
use crate::shared::schema::{Attribute, PerAttribute, Student, outcome_vector};
use itertools::Itertools;
use serde::Serialize;

/// Number of students carrying one persona.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersonaShare {
    pub persona: Persona,
    pub students: usize,
    /// Share of the population in `[0, 1]`.
    pub fraction: f64,
}

/// An attribute paired with the statistic that singled it out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AttributeFinding {
    pub attribute: Attribute,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    /// Attribute most strongly correlated with the outcome, with its correlation.
    pub top_driver: AttributeFinding,
    pub persona_mix: Vec<PersonaShare>,
    pub mean_cognitive_skill: f64,
    /// Best squared correlation of any single attribute with the outcome.
    pub single_attribute_baseline: AttributeFinding,
}

/// First attribute in schema order whose `key` is strictly the largest.
fn first_max_by(values: &PerAttribute<f64>, key: impl Fn(f64) -> f64) -> AttributeFinding {
    values.iter().fold(
        AttributeFinding {
            attribute: Attribute::Comprehension,
            value: values.comprehension,
        },
        |best, (attribute, &value)| {
            if key(value) > key(best.value) {
                AttributeFinding { attribute, value }
            } else {
                best
            }
        },
    )
}

/// Attribute with the largest absolute correlation. Ties keep the earlier attribute.
pub fn top_driver(correlations: &PerAttribute<f64>) -> AttributeFinding {
    first_max_by(correlations, f64::abs)
}

/// Students per persona, from the lowest tier to the highest.
pub fn persona_mix(clustering: &Clustering) -> Vec<PersonaShare> {
    let total = clustering.assignments.len();
    clustering
        .labels
        .iter()
        .copied()
        .zip(clustering.cluster_sizes())
        .sorted_by_key(|&(persona, _)| persona)
        .map(|(persona, students)| PersonaShare {
            persona,
            students,
            fraction: if total == 0 {
                0.0
            } else {
                students as f64 / total as f64
            },
        })
        .collect()
}

/// Mean of the four percentage-scale attribute means.
pub fn mean_cognitive_skill(summary: &PopulationSummary) -> f64 {
    let (sum, count) = summary
        .mean_attributes
        .iter()
        .filter(|(a, _)| a.is_cognitive_skill())
        .fold((0.0, 0_u32), |(sum, count), (_, &m)| (sum + m, count + 1));
    sum / f64::from(count)
}

/// The best R² reachable with a single attribute as the only predictor.
///
/// For one predictor the least-squares R² equals the squared Pearson
/// correlation, which is unaffected by rescaling the attribute.
pub fn best_single_attribute_r2(students: &[Student]) -> Option<AttributeFinding> {
    if students.is_empty() {
        return None;
    }
    let outcome = outcome_vector(students);
    let squared = PerAttribute::from_fn(|a| {
        let r = pearson(attribute_column(students, a).view(), outcome.view());
        r * r
    });
    Some(first_max_by(&squared, |v| v))
}

/// Collects every insight. Returns `None` for an empty population.
pub fn derive_insights(
    students: &[Student],
    summary: &PopulationSummary,
    clustering: &Clustering,
) -> Option<Insights> {
    Some(Insights {
        top_driver: top_driver(&summary.correlations),
        persona_mix: persona_mix(clustering),
        mean_cognitive_skill: mean_cognitive_skill(summary),
        single_attribute_baseline: best_single_attribute_r2(students)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::kmeans::cluster;
    use crate::analyze::stats::summarize;
    use crate::synth::population::generate_population;
    use approx::assert_abs_diff_eq;

    #[test]
    fn top_driver_uses_magnitude_and_keeps_first_on_ties() {
        let correlations = PerAttribute {
            comprehension: 0.3,
            attention: -0.6,
            focus: 0.6,
            retention: 0.1,
            engagement_time: 0.0,
        };
        let driver = top_driver(&correlations);
        assert_eq!(driver.attribute, Attribute::Attention);
        assert_eq!(driver.value, -0.6);

        let flat = PerAttribute::from_fn(|_| 0.0);
        assert_eq!(top_driver(&flat).attribute, Attribute::Comprehension);
    }

    #[test]
    fn persona_mix_is_ordered_by_tier_and_sums_to_population() {
        let students = generate_population(200, 3);
        let clustering = cluster(&students, 3);
        let mix = persona_mix(&clustering);
        let personas: Vec<Persona> = mix.iter().map(|s| s.persona).collect();
        assert_eq!(
            personas,
            vec![
                Persona::NeedsSupport,
                Persona::BalancedLearners,
                Persona::HighPerformers
            ]
        );
        assert_eq!(mix.iter().map(|s| s.students).sum::<usize>(), 200);
        assert_abs_diff_eq!(mix.iter().map(|s| s.fraction).sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn cognitive_skill_excludes_engagement() {
        let summary = PopulationSummary {
            mean_outcome: 0.0,
            mean_attributes: PerAttribute {
                comprehension: 60.0,
                attention: 70.0,
                focus: 80.0,
                retention: 90.0,
                engagement_time: 119.0,
            },
            correlations: PerAttribute::default(),
        };
        assert_abs_diff_eq!(mean_cognitive_skill(&summary), 75.0, epsilon = 1e-12);
    }

    #[test]
    fn single_attribute_baseline_matches_top_driver() {
        let students = generate_population(300, 123);
        let summary = summarize(&students).expect("non-empty population");
        let baseline = best_single_attribute_r2(&students).expect("non-empty population");
        let driver = top_driver(&summary.correlations);
        assert_eq!(baseline.attribute, driver.attribute);
        assert_abs_diff_eq!(baseline.value, driver.value * driver.value, epsilon = 1e-12);
        assert!((0.0..=1.0).contains(&baseline.value));
    }

    #[test]
    fn empty_population_has_no_insights() {
        assert!(best_single_attribute_r2(&[]).is_none());
        let clustering = cluster(&[], 3);
        assert!(persona_mix(&clustering).is_empty());
    }
}
