//! # Analysis Reports
//!
//! Runs the full pipeline for one configuration and collects everything a
//! downstream client needs into a single serializable [`AnalysisReport`]:
//! - generator: size and seed of the population
//! - statistics: the population summary
//! - clustering: one profile per cluster plus run diagnostics
//! - regression: fitted weights and training R²
//! - insights: headline findings across the three
//!
//! Reports render as plain text through `Display` and as TOML through
//! [`AnalysisReport::to_toml`]. Seed sweeps run independent analyses on the
//! rayon pool; every analysis owns its generator, so the results equal the
//! sequential ones and come back in the order the seeds were given.

use crate::analyze::insights::{Insights, derive_insights};
use crate::analyze::kmeans::{Clustering, Persona, cluster_with};
use crate::analyze::regression::{LinearModel, fit_regression_with};
use crate::analyze::stats::{PopulationSummary, summarize};
use crate::config::AnalysisConfig;
use crate::shared::schema::{Attribute, PerAttribute, Student};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to serialize report to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Failed to write population as CSV: {0}")]
    CsvError(#[from] csv::Error),
    #[error("Failed to write output: {0}")]
    IoError(#[from] io::Error),
}

/// One cluster as seen by a reader of the report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterProfile {
    pub index: usize,
    #[serde(rename = "label")]
    pub persona: Persona,
    pub size: usize,
    /// Centroid on the comparable scale (engagement mapped onto 0..=100).
    pub centroid: PerAttribute<f64>,
    pub composite: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringSummary {
    pub clusters: usize,
    pub iterations: usize,
    pub converged: bool,
    pub profiles: Vec<ClusterProfile>,
}

impl ClusteringSummary {
    pub fn from_clustering(clustering: &Clustering) -> Self {
        let profiles = clustering
            .cluster_sizes()
            .into_iter()
            .zip(clustering.centroid_scores())
            .enumerate()
            .map(|(index, (size, composite))| ClusterProfile {
                index,
                persona: clustering.labels[index],
                size,
                centroid: PerAttribute::from_fn(|a| clustering.centroids[[index, a.index()]]),
                composite,
            })
            .collect();
        Self {
            clusters: clustering.k(),
            iterations: clustering.iterations,
            converged: clustering.converged,
            profiles,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegressionSummary {
    /// Weights on the min-max normalized scale.
    pub weights: PerAttribute<f64>,
    pub bias: f64,
    /// Measured on the training population, so optimistic for unseen students.
    pub r_squared: f64,
}

impl RegressionSummary {
    pub fn from_model(model: &LinearModel) -> Self {
        Self {
            weights: PerAttribute::from_fn(|a| model.weights[a.index()]),
            bias: model.bias,
            r_squared: model.r_squared,
        }
    }
}

/// Everything derived from one population.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    pub seed: i64,
    pub population_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<PopulationSummary>,
    pub clustering: ClusteringSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insights: Option<Insights>,
}

/// Generates the configured population and runs every analysis on it.
pub fn run_analysis(config: &AnalysisConfig) -> AnalysisReport {
    let students = config.population.builder().build();
    analyze_population(&students, config)
}

/// Runs every analysis on an existing population.
pub fn analyze_population(students: &[Student], config: &AnalysisConfig) -> AnalysisReport {
    log::info!(
        "Analyzing {} students (seed {})",
        students.len(),
        config.population.seed
    );
    let summary = summarize(students);
    let clustering = cluster_with(students, &config.clustering);
    let model = fit_regression_with(students, &config.regression);
    let insights = summary
        .as_ref()
        .and_then(|s| derive_insights(students, s, &clustering));

    AnalysisReport {
        seed: config.population.seed,
        population_size: students.len(),
        summary,
        clustering: ClusteringSummary::from_clustering(&clustering),
        regression: model.as_ref().map(RegressionSummary::from_model),
        insights,
    }
}

/// Runs one independent analysis per seed on the rayon pool.
///
/// Only the population seed differs between runs. Reports are returned in the
/// order of `seeds`.
pub fn sweep_seeds(config: &AnalysisConfig, seeds: &[i64]) -> Vec<AnalysisReport> {
    log::info!("Sweeping {} seeds", seeds.len());
    seeds
        .par_iter()
        .map(|&seed| {
            let mut run = *config;
            run.population.seed = seed;
            run_analysis(&run)
        })
        .collect()
}

impl AnalysisReport {
    pub fn to_toml(&self) -> Result<String, ReportError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Single-line digest, used for seed sweeps.
    pub fn summary_line(&self) -> String {
        let mut line = format!("seed {:>6}  n={}", self.seed, self.population_size);
        if let Some(summary) = &self.summary {
            line.push_str(&format!("  mean score {:6.2}", summary.mean_outcome));
        }
        if let Some(regression) = &self.regression {
            line.push_str(&format!("  R² {:.4}", regression.r_squared));
        }
        if let Some(insights) = &self.insights {
            line.push_str(&format!("  top driver {}", insights.top_driver.attribute));
        }
        let sizes: Vec<String> = self
            .clustering
            .profiles
            .iter()
            .map(|p| p.size.to_string())
            .collect();
        line.push_str(&format!("  clusters [{}]", sizes.join("/")));
        line
    }
}

impl fmt::Display for AnalysisReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Cohort analysis: {} students, seed {}",
            self.population_size, self.seed
        )?;

        let Some(summary) = &self.summary else {
            return writeln!(f, "Population is empty; nothing to analyze.");
        };

        writeln!(f)?;
        writeln!(f, "Summary")?;
        writeln!(f, "  mean assessment score  {:>7.2}", summary.mean_outcome)?;
        writeln!(f, "  {:<16} {:>8} {:>12}", "attribute", "mean", "correlation")?;
        for a in Attribute::ALL {
            writeln!(
                f,
                "  {:<16} {:>8.2} {:>12.3}",
                a.name(),
                summary.mean_attributes.get(a),
                summary.correlations.get(a)
            )?;
        }

        writeln!(f)?;
        let status = if self.clustering.converged {
            "converged"
        } else {
            "iteration cap reached"
        };
        writeln!(
            f,
            "Clusters (k={}, {} iterations, {})",
            self.clustering.clusters, self.clustering.iterations, status
        )?;
        for p in &self.clustering.profiles {
            writeln!(
                f,
                "  #{} {:<18} {:>5} students  composite {:>6.2}",
                p.index,
                p.persona.to_string(),
                p.size,
                p.composite
            )?;
        }

        if let Some(regression) = &self.regression {
            writeln!(f)?;
            writeln!(f, "Regression")?;
            writeln!(f, "  R² (training)          {:>7.4}", regression.r_squared)?;
            writeln!(f, "  bias                   {:>7.3}", regression.bias)?;
            for a in Attribute::ALL {
                writeln!(f, "  w[{:<16}]   {:>7.3}", a.name(), regression.weights.get(a))?;
            }
        }

        if let Some(insights) = &self.insights {
            writeln!(f)?;
            writeln!(f, "Insights")?;
            writeln!(
                f,
                "  top driver             {} (r = {:.3})",
                insights.top_driver.attribute, insights.top_driver.value
            )?;
            writeln!(
                f,
                "  mean cognitive skill   {:.2}",
                insights.mean_cognitive_skill
            )?;
            writeln!(
                f,
                "  best single attribute  {} (R² = {:.3})",
                insights.single_attribute_baseline.attribute,
                insights.single_attribute_baseline.value
            )?;
            let mix: Vec<String> = insights
                .persona_mix
                .iter()
                .map(|s| format!("{} {:.0}%", s.persona, s.fraction * 100.0))
                .collect();
            writeln!(f, "  persona mix            {}", mix.join(", "))?;
        }
        Ok(())
    }
}

/// Writes `students` as CSV with a header row.
pub fn write_population_csv<W: io::Write>(students: &[Student], writer: W) -> Result<(), ReportError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for student in students {
        csv_writer.serialize(student)?;
    }
    csv_writer.flush()?;
    Ok(())
}
