use crate::core::accuracy::AccuracyAssessor;
use crate::core::band_stack::BandStacker;
use crate::core::classifier::SupervisedAlgorithm;
use crate::core::cluster::ClusterAlgorithm;
use crate::core::full_image::FullImageClassifier;
use crate::core::training::{TrainingSampleExtractor, DEFAULT_SEED, DEFAULT_TEST_FRACTION};
use crate::io::{ClassifiedWriter, VectorReader};
use crate::types::{AccuracyReport, TerraResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Completed pipeline milestones, reported to the surrounding shell.
///
/// Each stage maps to the coarse percentage a progress bar would show; the
/// core only signals stage completion, never fine-grained progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    /// Bands read and stacked
    BandsStacked,
    /// Training samples extracted and split
    TrainingExtracted,
    /// Model trained and held-out predictions made
    ModelTrained,
    /// Full image classified
    ImageClassified,
    /// Invalid pixels masked from the flattened image
    PixelsMasked,
    /// Cluster model fitted to the valid pixels
    ClustersFitted,
    /// Classified raster written to disk
    OutputWritten,
}

impl PipelineStage {
    /// Progress-bar percentage for this milestone
    pub fn percent(&self) -> u8 {
        match self {
            PipelineStage::BandsStacked => 30,
            PipelineStage::PixelsMasked => 40,
            PipelineStage::TrainingExtracted => 50,
            PipelineStage::ClustersFitted => 70,
            PipelineStage::ModelTrained => 80,
            PipelineStage::ImageClassified => 90,
            PipelineStage::OutputWritten => 100,
        }
    }
}

/// Receiver for coarse-grained pipeline progress
pub trait ProgressSink {
    fn stage_completed(&mut self, stage: PipelineStage);
}

/// Sink that discards all progress notifications
#[derive(Debug, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn stage_completed(&mut self, _stage: PipelineStage) {}
}

fn default_test_fraction() -> f64 {
    DEFAULT_TEST_FRACTION
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

/// Configuration of one supervised classification run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupervisedConfig {
    /// One single-band raster file per band, in stacking order
    pub band_paths: Vec<PathBuf>,
    /// Vector file with labeled training polygons
    pub training_vectors: PathBuf,
    /// Attribute column holding the class labels
    pub class_attribute: String,
    pub algorithm: SupervisedAlgorithm,
    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Destination of the classified GeoTIFF
    pub output_path: PathBuf,
}

/// Result of a supervised run: the accuracy report plus the label encoding
/// needed to interpret class ids
#[derive(Debug, Clone)]
pub struct SupervisedOutcome {
    pub report: AccuracyReport,
    /// Sorted attribute values; index = class id in the output raster
    pub classes: Vec<String>,
    pub output_path: PathBuf,
}

/// Runs the supervised classification pipeline end to end
///
/// Strictly sequential and all-or-nothing: an error at any stage aborts the
/// run and nothing is written.
pub struct SupervisedPipeline;

impl SupervisedPipeline {
    pub fn run(
        config: &SupervisedConfig,
        progress: &mut dyn ProgressSink,
    ) -> TerraResult<SupervisedOutcome> {
        // Resolve the model before touching any data so an unsupported
        // algorithm name fails without a single band read
        let mut model = config.algorithm.build();
        log::info!(
            "Starting supervised classification ({})",
            config.algorithm.name()
        );

        let stack = BandStacker::stack(&config.band_paths)?;
        progress.stage_completed(PipelineStage::BandsStacked);

        let polygons =
            VectorReader::read_labeled_polygons(&config.training_vectors, &config.class_attribute)?;
        let extractor = TrainingSampleExtractor::with_split(config.test_fraction, config.seed);
        let split = extractor.extract(&stack, &polygons)?;
        progress.stage_completed(PipelineStage::TrainingExtracted);

        model.train(split.x_train.view(), &split.y_train)?;
        let y_pred = model.predict(split.x_test.view())?;
        progress.stage_completed(PipelineStage::ModelTrained);

        let report = AccuracyAssessor::report(&split.y_test, &y_pred)?;
        log::info!("Accuracy assessment:\n{}", report.summary());

        let classified = FullImageClassifier::classify_all(&stack, model.as_ref())?;
        progress.stage_completed(PipelineStage::ImageClassified);

        ClassifiedWriter::write(&classified, &config.output_path)?;
        progress.stage_completed(PipelineStage::OutputWritten);

        log::info!("✅ Supervised classification completed");
        Ok(SupervisedOutcome {
            report,
            classes: split.classes,
            output_path: config.output_path.clone(),
        })
    }
}

/// Configuration of one unsupervised classification run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsupervisedConfig {
    /// One single-band raster file per band, in stacking order
    pub band_paths: Vec<PathBuf>,
    pub algorithm: ClusterAlgorithm,
    /// Destination of the classified GeoTIFF
    pub output_path: PathBuf,
}

/// Runs the unsupervised clustering pipeline end to end
pub struct UnsupervisedPipeline;

impl UnsupervisedPipeline {
    pub fn run(
        config: &UnsupervisedConfig,
        progress: &mut dyn ProgressSink,
    ) -> TerraResult<PathBuf> {
        let mut model = config.algorithm.build();
        log::info!(
            "Starting unsupervised classification ({})",
            config.algorithm.name()
        );

        let stack = BandStacker::stack(&config.band_paths)?;
        progress.stage_completed(PipelineStage::BandsStacked);

        let valid = FullImageClassifier::valid_pixel_matrix(&stack)?;
        progress.stage_completed(PipelineStage::PixelsMasked);

        model.fit(valid.view())?;
        progress.stage_completed(PipelineStage::ClustersFitted);

        let classified = FullImageClassifier::cluster_all(&stack, model.as_ref())?;

        ClassifiedWriter::write(&classified, &config.output_path)?;
        progress.stage_completed(PipelineStage::OutputWritten);

        log::info!("✅ Unsupervised classification completed");
        Ok(config.output_path.clone())
    }
}
