#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]

pub mod config;
pub mod report;

#[path = "../shared/mod.rs"]
pub mod shared;

#[path = "../synth/mod.rs"]
pub mod synth;

#[path = "../analyze/mod.rs"]
pub mod analyze;

pub use analyze::kmeans::{Clustering, Persona, cluster};
pub use analyze::regression::{LinearModel, fit_regression};
pub use analyze::stats::{PopulationSummary, summarize};
pub use shared::schema::{Attribute, GradeLevel, Student};
pub use synth::population::generate_population;
pub use config::AnalysisConfig;
pub use report::{AnalysisReport, run_analysis, sweep_seeds};
