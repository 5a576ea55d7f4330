pub mod insights;
pub mod kmeans;
pub mod regression;
pub mod stats;
