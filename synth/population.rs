//! # Synthetic Population Generator
//!
//! Builds a batch of students from a seed. Every student is drawn in a fixed
//! order from a single `Mulberry32` stream:
//!
//! 1. first name, last name and class (uniform picks from fixed pools)
//! 2. the five attributes, each from its own normal distribution, clamped to
//!    its range and rounded to an integer
//! 3. the outcome noise, added to the weighted composite of the rounded
//!    attributes before the result is clamped to 0..=100 and rounded
//!
//! The draw order is part of the contract: `(size, seed)` reproduces the same
//! students bit for bit.

use super::rng::Mulberry32;
use crate::shared::schema::{
    Attribute, ENGAGEMENT_OUTCOME_DIVISOR, GradeLevel, NUM_FEATURES, PerAttribute, Student,
};

pub const FIRST_NAMES: [&str; 20] = [
    "Aarav", "Ishita", "Rahul", "Sneha", "Vihaan", "Ananya", "Arjun", "Meera", "Rohan", "Priya",
    "Karan", "Isha", "Kabir", "Aditi", "Neha", "Sanjay", "Riya", "Dev", "Aarohi", "Ansh",
];

pub const LAST_NAMES: [&str; 10] = [
    "Patil", "Reddy", "Sharma", "Gupta", "Kumar", "Iyer", "Nair", "Singh", "Das", "Roy",
];

/// Identifiers are `S{ID_OFFSET + position}`.
pub const ID_OFFSET: usize = 1000;

pub const DEFAULT_POPULATION_SIZE: usize = 300;
pub const DEFAULT_SEED: i64 = 123;
pub const DEFAULT_OUTCOME_NOISE_STD: f64 = 5.0;

/// Normal distribution an attribute is drawn from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttributeDistribution {
    pub mean: f64,
    pub std_dev: f64,
}

/// Fixed generating distributions of the five attributes.
pub const ATTRIBUTE_DISTRIBUTIONS: PerAttribute<AttributeDistribution> = PerAttribute {
    comprehension: AttributeDistribution {
        mean: 70.0,
        std_dev: 15.0,
    },
    attention: AttributeDistribution {
        mean: 65.0,
        std_dev: 18.0,
    },
    focus: AttributeDistribution {
        mean: 68.0,
        std_dev: 16.0,
    },
    retention: AttributeDistribution {
        mean: 66.0,
        std_dev: 17.0,
    },
    engagement_time: AttributeDistribution {
        mean: 60.0,
        std_dev: 20.0,
    },
};

/// Builder for a synthetic population.
#[derive(Debug, Clone, PartialEq)]
pub struct PopulationBuilder {
    size: usize,
    seed: i64,
    outcome_noise_std: f64,
}

impl PopulationBuilder {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            seed: DEFAULT_SEED,
            outcome_noise_std: DEFAULT_OUTCOME_NOISE_STD,
        }
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    /// Scale of the additive outcome noise. The noise variate is drawn even
    /// when the scale is zero, so the stream of later students is unchanged.
    pub fn with_outcome_noise(mut self, std_dev: f64) -> Self {
        self.outcome_noise_std = std_dev;
        self
    }

    /// Generates the population from a fresh generator seeded with `seed`.
    pub fn build(&self) -> Vec<Student> {
        log::debug!(
            "Generating {} students (seed {}, outcome noise σ={})",
            self.size,
            self.seed,
            self.outcome_noise_std
        );
        let mut rng = Mulberry32::new(self.seed);
        self.build_with(&mut rng)
    }

    /// Generates the population from the caller's generator, advancing it.
    pub fn build_with(&self, rng: &mut Mulberry32) -> Vec<Student> {
        (0..self.size)
            .map(|position| draw_student(rng, position, self.outcome_noise_std))
            .collect()
    }
}

/// Generates `size` students from `seed` with the default outcome noise.
pub fn generate_population(size: usize, seed: i64) -> Vec<Student> {
    PopulationBuilder::new(size).seed(seed).build()
}

/// Noise-free composite outcome of rounded attribute values, before clamping.
pub fn expected_outcome(attributes: &[f64; NUM_FEATURES]) -> f64 {
    Attribute::ALL.iter().fold(0.0, |acc, &a| {
        let value = attributes[a.index()];
        let term = match a {
            Attribute::EngagementTime => value / ENGAGEMENT_OUTCOME_DIVISOR,
            _ => value,
        };
        acc + a.composite_weight() * term
    })
}

fn draw_student(rng: &mut Mulberry32, position: usize, outcome_noise_std: f64) -> Student {
    let first = rng.pick(&FIRST_NAMES);
    let last = rng.pick(&LAST_NAMES);
    let class = *rng.pick(&GradeLevel::ALL);

    let attributes = Attribute::ALL.map(|a| {
        let dist = ATTRIBUTE_DISTRIBUTIONS.get(a);
        rng.normal(dist.mean, dist.std_dev)
            .clamp(0.0, a.upper_bound())
            .round()
    });

    let noise = rng.normal(0.0, outcome_noise_std);
    let score = (expected_outcome(&attributes) + noise).clamp(0.0, 100.0).round();

    let [comprehension, attention, focus, retention, engagement_time] =
        attributes.map(|v| v as u8);

    Student {
        student_id: format!("S{}", ID_OFFSET + position),
        name: format!("{first} {last}"),
        class,
        comprehension,
        attention,
        focus,
        retention,
        engagement_time,
        assessment_score: score as u8,
    }
}
