use crate::io::geometry_mask;
use crate::types::{
    BandStack, ClassId, LabeledSamples, TerraError, TerraResult, TrainTestSplit, TrainingPolygon,
};
use ndarray::{s, Array2, Axis};
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeSet;

/// Default held-out fraction for accuracy assessment
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

/// Default seed for the split shuffle
pub const DEFAULT_SEED: u64 = 42;

/// Extracts labeled pixel samples from training polygons over a band stack
///
/// Each polygon is rasterized into an inclusion mask with the stack's own
/// geotransform, the stacked pixel vectors under the mask are gathered, and
/// rows containing a missing value are dropped. The result is split into
/// train/test partitions with a fixed fraction and seed so accuracy figures
/// are reproducible across runs.
#[derive(Debug, Clone)]
pub struct TrainingSampleExtractor {
    test_fraction: f64,
    seed: u64,
}

impl Default for TrainingSampleExtractor {
    fn default() -> Self {
        Self {
            test_fraction: DEFAULT_TEST_FRACTION,
            seed: DEFAULT_SEED,
        }
    }
}

impl TrainingSampleExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an extractor with a custom held-out fraction and shuffle seed
    pub fn with_split(test_fraction: f64, seed: u64) -> Self {
        Self {
            test_fraction,
            seed,
        }
    }

    /// Extract labeled samples from the polygons and split them
    pub fn extract(
        &self,
        stack: &BandStack,
        polygons: &[TrainingPolygon],
    ) -> TerraResult<TrainTestSplit> {
        let samples = Self::collect_samples(stack, polygons)?;
        split_samples(samples, self.test_fraction, self.seed)
    }

    /// Gather all labeled pixel vectors without splitting.
    ///
    /// Class labels are encoded against the sorted distinct attribute values
    /// of the polygon set; the encoding travels with the samples so training
    /// and full-image inference agree on class ids.
    pub fn collect_samples(
        stack: &BandStack,
        polygons: &[TrainingPolygon],
    ) -> TerraResult<LabeledSamples> {
        let (rows, cols, bands) = stack.pixels.dim();

        let classes: Vec<String> = polygons
            .iter()
            .map(|p| p.label.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut features: Vec<f32> = Vec::new();
        let mut labels: Vec<ClassId> = Vec::new();

        for polygon in polygons {
            let class_id = classes.binary_search(&polygon.label).map_err(|_| {
                TerraError::Processing(format!(
                    "Label '{}' missing from the class encoding",
                    polygon.label
                ))
            })?;

            let mask = geometry_mask(
                &polygon.wkt,
                (rows, cols),
                &stack.metadata.geo_transform,
            )?;

            let mut inside = 0usize;
            let mut kept = 0usize;
            for r in 0..rows {
                for c in 0..cols {
                    if !mask[[r, c]] {
                        continue;
                    }
                    inside += 1;
                    let pixel = stack.pixels.slice(s![r, c, ..]);
                    if pixel.iter().any(|v| v.is_nan()) {
                        continue;
                    }
                    features.extend(pixel.iter());
                    labels.push(class_id);
                    kept += 1;
                }
            }

            log::debug!(
                "Polygon '{}': {} pixels inside, {} kept after NaN filtering",
                polygon.label,
                inside,
                kept
            );
        }

        if labels.is_empty() {
            return Err(TerraError::EmptyTrainingSet(
                "No usable labeled pixels remain after masking and NaN filtering".to_string(),
            ));
        }

        let features = Array2::from_shape_vec((labels.len(), bands), features)
            .map_err(|e| TerraError::Processing(format!("Failed to shape sample matrix: {}", e)))?;

        log::info!(
            "Extracted {} labeled samples across {} classes",
            labels.len(),
            classes.len()
        );

        Ok(LabeledSamples {
            features,
            labels,
            classes,
        })
    }
}

/// Split labeled samples into disjoint train/test partitions.
///
/// The partition is a seeded shuffle followed by a fixed-fraction holdout:
/// the same samples, fraction, and seed always produce the same row
/// assignment. The test partition holds ceil(n * fraction) samples, clamped
/// so both partitions stay non-empty.
pub fn split_samples(
    samples: LabeledSamples,
    test_fraction: f64,
    seed: u64,
) -> TerraResult<TrainTestSplit> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(TerraError::Processing(format!(
            "Test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let n = samples.len();
    if n < 2 {
        return Err(TerraError::EmptyTrainingSet(format!(
            "At least two labeled samples are required for a train/test split, got {}",
            n
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = SmallRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64) * test_fraction).ceil() as usize;
    let n_test = n_test.clamp(1, n - 1);

    let (test_idx, train_idx) = indices.split_at(n_test);

    let gather = |idx: &[usize]| -> (Array2<f32>, Vec<ClassId>) {
        let x = samples.features.select(Axis(0), idx);
        let y = idx.iter().map(|&i| samples.labels[i]).collect();
        (x, y)
    };

    let (x_test, y_test) = gather(test_idx);
    let (x_train, y_train) = gather(train_idx);

    log::debug!(
        "Split {} samples into {} train / {} test (seed {})",
        n,
        y_train.len(),
        y_test.len(),
        seed
    );

    Ok(TrainTestSplit {
        x_train,
        y_train,
        x_test,
        y_test,
        classes: samples.classes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn make_samples(n: usize) -> LabeledSamples {
        let features =
            Array2::from_shape_fn((n, 2), |(i, j)| (i * 2 + j) as f32);
        let labels = (0..n).map(|i| i % 2).collect();
        LabeledSamples {
            features,
            labels,
            classes: vec!["a".to_string(), "b".to_string()],
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let first = split_samples(make_samples(50), 0.2, 42).unwrap();
        let second = split_samples(make_samples(50), 0.2, 42).unwrap();

        assert_eq!(first.y_train, second.y_train);
        assert_eq!(first.y_test, second.y_test);
        assert_eq!(first.x_train, second.x_train);
        assert_eq!(first.x_test, second.x_test);
    }

    #[test]
    fn test_split_fraction_and_disjointness() {
        let split = split_samples(make_samples(50), 0.2, 42).unwrap();
        assert_eq!(split.y_test.len(), 10);
        assert_eq!(split.y_train.len(), 40);

        // Every sample row lands in exactly one partition
        let mut seen: Vec<f32> = split
            .x_train
            .column(0)
            .iter()
            .chain(split.x_test.column(0).iter())
            .copied()
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f32> = (0..50).map(|i| (i * 2) as f32).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_split_holds_out_at_least_one_sample() {
        let samples = LabeledSamples {
            features: array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
            labels: vec![0, 1, 0],
            classes: vec!["a".to_string(), "b".to_string()],
        };
        let split = split_samples(samples, 0.2, 7).unwrap();
        assert_eq!(split.y_test.len(), 1);
        assert_eq!(split.y_train.len(), 2);
    }

    #[test]
    fn test_split_rejects_tiny_sample_sets() {
        let samples = LabeledSamples {
            features: array![[1.0, 2.0]],
            labels: vec![0],
            classes: vec!["a".to_string()],
        };
        let result = split_samples(samples, 0.2, 42);
        assert!(matches!(result, Err(TerraError::EmptyTrainingSet(_))));
    }

    #[test]
    fn test_split_rejects_bad_fraction() {
        assert!(split_samples(make_samples(10), 0.0, 42).is_err());
        assert!(split_samples(make_samples(10), 1.0, 42).is_err());
    }
}
