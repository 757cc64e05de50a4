use crate::types::{ClassId, TerraError, TerraResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Unsupervised classification model
///
/// `classify` must tolerate a different row count than `fit` saw: the
/// pipeline fits on the valid-pixel subset and then assigns every valid
/// pixel of the full image.
pub trait ClusterModel {
    /// Learn cluster structure from unlabeled feature rows
    fn fit(&mut self, x: ArrayView2<f32>) -> TerraResult<()>;

    /// Assign every row to its nearest learned cluster
    fn classify(&self, x: ArrayView2<f32>) -> TerraResult<Vec<ClassId>>;
}

/// K-means parameters
///
/// The cluster count is a required configuration value; there is no
/// auto-detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    pub clusters: usize,
    pub max_iterations: usize,
    /// Convergence threshold on the largest centroid shift between rounds
    pub tolerance: f64,
    /// Seed for the k-means++ initialization
    pub seed: u64,
}

impl Default for KMeansParams {
    fn default() -> Self {
        Self {
            clusters: 5,
            max_iterations: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

impl KMeansParams {
    pub fn with_clusters(clusters: usize) -> Self {
        Self {
            clusters,
            ..Self::default()
        }
    }
}

/// K-means clustering with seeded k-means++ initialization
///
/// Lloyd iterations with an assignment step and a mean-update step; an
/// empty cluster keeps its previous centroid. Deterministic for a fixed
/// seed and input.
#[derive(Debug, Clone)]
pub struct KMeans {
    params: KMeansParams,
    centroids: Option<Array2<f32>>,
}

impl KMeans {
    pub fn new(params: KMeansParams) -> Self {
        Self {
            params,
            centroids: None,
        }
    }

    /// Fitted cluster centers (clusters x features)
    pub fn centroids(&self) -> Option<&Array2<f32>> {
        self.centroids.as_ref()
    }

    /// K-means++ initialization: the first centroid is a random row, each
    /// further centroid is drawn with probability proportional to squared
    /// distance from the nearest centroid chosen so far.
    fn init_centroids(&self, x: ArrayView2<f32>, rng: &mut SmallRng) -> Array2<f32> {
        let k = self.params.clusters;
        let n = x.nrows();
        let mut centroids = Array2::zeros((k, x.ncols()));

        let first = rng.random_range(0..n);
        centroids.row_mut(0).assign(&x.row(first));

        for c in 1..k {
            let mut weights = Vec::with_capacity(n);
            let mut total = 0.0f64;
            for row in x.rows() {
                let mut nearest = f64::INFINITY;
                for j in 0..c {
                    let d = squared_distance(row, centroids.row(j));
                    if d < nearest {
                        nearest = d;
                    }
                }
                weights.push(nearest);
                total += nearest;
            }

            if total > 0.0 {
                let target = rng.random::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = n - 1;
                for (i, &w) in weights.iter().enumerate() {
                    cumulative += w;
                    if cumulative >= target {
                        chosen = i;
                        break;
                    }
                }
                centroids.row_mut(c).assign(&x.row(chosen));
            } else {
                // All points coincide with an existing centroid
                let idx = rng.random_range(0..n);
                centroids.row_mut(c).assign(&x.row(idx));
            }
        }

        centroids
    }
}

impl ClusterModel for KMeans {
    fn fit(&mut self, x: ArrayView2<f32>) -> TerraResult<()> {
        let k = self.params.clusters;
        if k == 0 {
            return Err(TerraError::Training(
                "Cluster count must be at least 1".to_string(),
            ));
        }
        if x.nrows() == 0 {
            return Err(TerraError::Training(
                "Cannot fit a cluster model on an empty matrix".to_string(),
            ));
        }
        if k > x.nrows() {
            return Err(TerraError::Training(format!(
                "Cluster count {} exceeds sample count {}",
                k,
                x.nrows()
            )));
        }

        log::info!(
            "Fitting k-means: {} clusters over {} samples, {} features",
            k,
            x.nrows(),
            x.ncols()
        );

        let mut rng = SmallRng::seed_from_u64(self.params.seed);
        let mut centroids = self.init_centroids(x, &mut rng);
        let mut assignments = vec![0usize; x.nrows()];

        for iteration in 0..self.params.max_iterations {
            // Assignment step
            let mut changes = 0usize;
            for (i, row) in x.rows().into_iter().enumerate() {
                let cluster = nearest_centroid(row, &centroids);
                if assignments[i] != cluster {
                    assignments[i] = cluster;
                    changes += 1;
                }
            }
            if changes == 0 && iteration > 0 {
                log::debug!("Converged after {} iterations (stable assignments)", iteration);
                break;
            }

            // Update step: mean of each cluster; empty clusters keep their
            // previous centroid
            let mut sums = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; k];
            for (i, row) in x.rows().into_iter().enumerate() {
                let cluster = assignments[i];
                counts[cluster] += 1;
                for (j, &v) in row.iter().enumerate() {
                    sums[[cluster, j]] += v as f64;
                }
            }

            let mut max_shift = 0.0f64;
            for cluster in 0..k {
                if counts[cluster] == 0 {
                    continue;
                }
                let new_centroid = Array1::from_iter(
                    sums.row(cluster)
                        .iter()
                        .map(|&s| (s / counts[cluster] as f64) as f32),
                );
                let shift = squared_distance(centroids.row(cluster), new_centroid.view()).sqrt();
                if shift > max_shift {
                    max_shift = shift;
                }
                centroids.row_mut(cluster).assign(&new_centroid);
            }

            if max_shift < self.params.tolerance {
                log::debug!(
                    "Converged after {} iterations (max shift {:.2e})",
                    iteration + 1,
                    max_shift
                );
                break;
            }
        }

        self.centroids = Some(centroids);
        Ok(())
    }

    fn classify(&self, x: ArrayView2<f32>) -> TerraResult<Vec<ClassId>> {
        let centroids = self.centroids.as_ref().ok_or_else(|| {
            TerraError::Training("Cluster model has not been fitted".to_string())
        })?;

        if x.ncols() != centroids.ncols() {
            return Err(TerraError::Training(format!(
                "Feature width {} does not match fitted width {}",
                x.ncols(),
                centroids.ncols()
            )));
        }

        Ok(x.rows()
            .into_iter()
            .map(|row| nearest_centroid(row, centroids))
            .collect())
    }
}

fn squared_distance(a: ArrayView1<f32>, b: ArrayView1<f32>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum()
}

fn nearest_centroid(row: ArrayView1<f32>, centroids: &Array2<f32>) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best_dist {
            best_dist = d;
            best = c;
        }
    }
    best
}

/// Unsupervised algorithm registry, keyed by the names shells present
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClusterAlgorithm {
    KMeans(KMeansParams),
}

impl ClusterAlgorithm {
    /// Resolve an algorithm name to its default-parameter configuration
    pub fn from_name(name: &str) -> TerraResult<Self> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match key.as_str() {
            "k-means" | "kmeans" => Ok(ClusterAlgorithm::KMeans(KMeansParams::default())),
            _ => Err(TerraError::UnsupportedAlgorithm(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ClusterAlgorithm::KMeans(_) => "k-means",
        }
    }

    /// Construct an unfitted model for this configuration
    pub fn build(&self) -> Box<dyn ClusterModel> {
        match self {
            ClusterAlgorithm::KMeans(params) => Box::new(KMeans::new(params.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn two_blobs() -> Array2<f32> {
        array![
            [0.1, -0.2],
            [0.2, 0.0],
            [-0.1, 0.1],
            [9.8, 10.2],
            [10.1, 9.9],
            [10.0, 10.0],
        ]
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let data = two_blobs();
        let mut model = KMeans::new(KMeansParams::with_clusters(2));
        model.fit(data.view()).unwrap();

        let labels = model.classify(data.view()).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[0], labels[2]);
        assert_eq!(labels[3], labels[4]);
        assert_eq!(labels[3], labels[5]);
        assert_ne!(labels[0], labels[3]);
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let data = two_blobs();
        let mut first = KMeans::new(KMeansParams::with_clusters(2));
        first.fit(data.view()).unwrap();
        let mut second = KMeans::new(KMeansParams::with_clusters(2));
        second.fit(data.view()).unwrap();

        assert_eq!(
            first.classify(data.view()).unwrap(),
            second.classify(data.view()).unwrap()
        );
        assert_eq!(first.centroids(), second.centroids());
    }

    #[test]
    fn test_classify_twice_returns_identical_labels() {
        let data = two_blobs();
        let mut model = KMeans::new(KMeansParams::with_clusters(2));
        model.fit(data.view()).unwrap();

        let first = model.classify(data.view()).unwrap();
        let second = model.classify(data.view()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_classify_accepts_different_row_count() {
        let data = two_blobs();
        let mut model = KMeans::new(KMeansParams::with_clusters(2));
        model.fit(data.view()).unwrap();

        let probe = array![[0.0, 0.0], [10.0, 10.0], [9.5, 10.5]];
        let labels = model.classify(probe.view()).unwrap();
        assert_eq!(labels.len(), 3);
        assert_ne!(labels[0], labels[1]);
        assert_eq!(labels[1], labels[2]);
    }

    #[test]
    fn test_fit_rejects_bad_configurations() {
        let data = two_blobs();

        let mut zero = KMeans::new(KMeansParams::with_clusters(0));
        assert!(matches!(
            zero.fit(data.view()),
            Err(TerraError::Training(_))
        ));

        let mut too_many = KMeans::new(KMeansParams::with_clusters(10));
        assert!(matches!(
            too_many.fit(data.view()),
            Err(TerraError::Training(_))
        ));
    }

    #[test]
    fn test_classify_before_fit_fails() {
        let model = KMeans::new(KMeansParams::with_clusters(2));
        let result = model.classify(two_blobs().view());
        assert!(matches!(result, Err(TerraError::Training(_))));
    }

    #[test]
    fn test_registry_resolves_names() {
        assert!(ClusterAlgorithm::from_name("K-Means").is_ok());
        assert!(ClusterAlgorithm::from_name("kmeans").is_ok());
        assert!(matches!(
            ClusterAlgorithm::from_name("dbscan"),
            Err(TerraError::UnsupportedAlgorithm(_))
        ));
    }
}
