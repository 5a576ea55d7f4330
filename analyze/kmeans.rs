//! # K-means Personas
//!
//! Partitions students into `k` groups with Lloyd's algorithm and names each
//! group after its performance tier.
//!
//! Design constraints:
//! - Features are the four percentage attributes plus `engagement_time`
//!   rescaled onto 0..=100 (`FeatureScale::Comparable`).
//! - Initialization is deterministic. Students are ordered by composite score
//!   and the initial centroids are taken at evenly spaced positions of that
//!   ordering, so identical input always yields identical clusters.
//! - Ties in the assignment step go to the lowest cluster index.
//! - A cluster left empty by an assignment pass is re-seeded from its
//!   initialization position instead of keeping a stale centroid.
//! - At most `max_iterations` assignment/update cycles run; the loop stops
//!   early once a pass reassigns nobody.

use crate::shared::schema::{FeatureScale, NUM_FEATURES, Student, composite_score, feature_matrix};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

pub const DEFAULT_CLUSTERS: usize = 3;
pub const DEFAULT_MAX_ITERATIONS: usize = 15;

/// Hyperparameters of the clustering engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KMeansConfig {
    /// Requested number of clusters. Clamped to `[1, n]` at run time.
    pub clusters: usize,
    /// Cap on assignment/update cycles.
    pub max_iterations: usize,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            clusters: DEFAULT_CLUSTERS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

/// Performance tier attached to a cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Persona {
    NeedsSupport,
    BalancedLearners,
    /// Intermediate tier when more than three clusters are requested.
    /// Holds the 1-based ascending rank of the cluster.
    Tier(usize),
    HighPerformers,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsSupport => f.write_str("Needs Support"),
            Self::BalancedLearners => f.write_str("Balanced Learners"),
            Self::Tier(rank) => write!(f, "Tier {rank}"),
            Self::HighPerformers => f.write_str("High Performers"),
        }
    }
}

impl Serialize for Persona {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Cluster membership of one student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClusterAssignment {
    pub cluster_index: usize,
    #[serde(rename = "label")]
    pub persona: Persona,
}

/// Output of a clustering run.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    /// One entry per student, in population order.
    pub assignments: Vec<ClusterAssignment>,
    /// Final centroids, shape `[k, NUM_FEATURES]`, on the comparable scale.
    pub centroids: Array2<f64>,
    /// Persona of each cluster, indexed by cluster.
    pub labels: Vec<Persona>,
    /// Number of assignment/update cycles performed. The first pass always
    /// counts as a change, so a converged run has at least 2 cycles.
    pub iterations: usize,
    /// Whether the last pass left every assignment unchanged.
    pub converged: bool,
}

impl Clustering {
    fn empty() -> Self {
        Self {
            assignments: Vec::new(),
            centroids: Array2::zeros((0, NUM_FEATURES)),
            labels: Vec::new(),
            iterations: 0,
            converged: true,
        }
    }

    pub fn k(&self) -> usize {
        self.labels.len()
    }

    /// Number of students assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k()];
        for a in &self.assignments {
            sizes[a.cluster_index] += 1;
        }
        sizes
    }

    /// Composite score of each centroid.
    pub fn centroid_scores(&self) -> Vec<f64> {
        self.centroids
            .axis_iter(Axis(0))
            .map(composite_score)
            .collect()
    }
}

/// Clusters `students` into `k` personas with the default iteration cap.
pub fn cluster(students: &[Student], k: usize) -> Clustering {
    cluster_with(
        students,
        &KMeansConfig {
            clusters: k,
            ..KMeansConfig::default()
        },
    )
}

/// Clusters `students` according to `config`.
pub fn cluster_with(students: &[Student], config: &KMeansConfig) -> Clustering {
    let n = students.len();
    if n == 0 {
        return Clustering::empty();
    }
    let k = config.clusters.clamp(1, n);
    if k != config.clusters {
        log::debug!("Requested {} clusters for {} students; using {}", config.clusters, n, k);
    }

    let x = feature_matrix(students, FeatureScale::Comparable);
    let seeds = seed_positions(x.view(), k);

    let mut centroids = Array2::zeros((k, NUM_FEATURES));
    for (c, &row) in seeds.iter().enumerate() {
        centroids.row_mut(c).assign(&x.row(row));
    }

    let mut assignment: Option<Vec<usize>> = None;
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iterations {
        iterations += 1;

        let next = assign(x.view(), centroids.view());
        let changed = assignment.as_ref() != Some(&next);

        update_centroids(x.view(), &next, &seeds, &mut centroids);
        assignment = Some(next);

        if !changed {
            converged = true;
            break;
        }
    }

    if converged {
        log::debug!("k-means converged after {iterations} iterations (k={k})");
    } else {
        log::warn!("k-means stopped at the iteration cap ({iterations}) before converging");
    }

    let assignment = assignment.unwrap_or_else(|| assign(x.view(), centroids.view()));
    let labels = label_clusters(centroids.view());
    let assignments = assignment
        .into_iter()
        .map(|c| ClusterAssignment {
            cluster_index: c,
            persona: labels[c],
        })
        .collect();

    Clustering {
        assignments,
        centroids,
        labels,
        iterations,
        converged,
    }
}

/// Row index of the initialization point of every cluster.
///
/// Rows are stably ordered by composite score; cluster `c` takes the row at
/// ordering position `floor((c + 0.5) * n / k)`.
fn seed_positions(x: ArrayView2<f64>, k: usize) -> Vec<usize> {
    let n = x.nrows();
    let scores: Vec<f64> = x.axis_iter(Axis(0)).map(composite_score).collect();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    (0..k)
        .map(|c| {
            let position = ((2 * c + 1) * n) / (2 * k);
            order[position.min(n - 1)]
        })
        .collect()
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .fold(0.0, |acc, (&p, &q)| acc + (p - q) * (p - q))
}

/// Nearest centroid of every row. Strict comparison keeps the lowest index on ties.
fn assign(x: ArrayView2<f64>, centroids: ArrayView2<f64>) -> Vec<usize> {
    x.axis_iter(Axis(0))
        .map(|row| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, centroid) in centroids.axis_iter(Axis(0)).enumerate() {
                let d = squared_distance(row, centroid);
                if d < best_distance {
                    best_distance = d;
                    best = c;
                }
            }
            best
        })
        .collect()
}

fn update_centroids(
    x: ArrayView2<f64>,
    assignment: &[usize],
    seeds: &[usize],
    centroids: &mut Array2<f64>,
) {
    let k = centroids.nrows();
    let mut sums = Array2::<f64>::zeros((k, NUM_FEATURES));
    let mut counts = vec![0_usize; k];
    for (row, &c) in x.axis_iter(Axis(0)).zip(assignment) {
        let mut sum = sums.row_mut(c);
        sum += &row;
        counts[c] += 1;
    }

    for c in 0..k {
        if counts[c] == 0 {
            log::debug!("Cluster {c} is empty; re-seeding from row {}", seeds[c]);
            centroids.row_mut(c).assign(&x.row(seeds[c]));
        } else {
            let mean: Array1<f64> = sums.row(c).mapv(|s| s / counts[c] as f64);
            centroids.row_mut(c).assign(&mean);
        }
    }
}

/// Personas by ascending centroid composite.
fn label_clusters(centroids: ArrayView2<f64>) -> Vec<Persona> {
    let k = centroids.nrows();
    let scores: Vec<f64> = centroids.axis_iter(Axis(0)).map(composite_score).collect();
    let mut ascending: Vec<usize> = (0..k).collect();
    ascending.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut labels = vec![Persona::BalancedLearners; k];
    for (rank, &c) in ascending.iter().enumerate() {
        labels[c] = persona_for_rank(rank, k);
    }
    labels
}

/// Persona of the cluster at 0-based ascending `rank` among `k` clusters.
pub fn persona_for_rank(rank: usize, k: usize) -> Persona {
    match (k, rank) {
        (1, _) => Persona::BalancedLearners,
        (_, 0) => Persona::NeedsSupport,
        (_, r) if r + 1 == k => Persona::HighPerformers,
        (3, _) => Persona::BalancedLearners,
        (_, r) => Persona::Tier(r + 1),
    }
}
