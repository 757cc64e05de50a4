//! terraclass: A Fast, Modular Land-Cover Classification Engine
//!
//! This library is the analytical core of a satellite-imagery exploration
//! application: it stacks co-registered raster bands, extracts labeled
//! training samples from vector polygons, trains supervised classifiers or
//! fits cluster models, scores them with standard remote-sensing accuracy
//! metrics, and applies the trained model to every pixel of the image.

pub mod core;
pub mod io;
pub mod types;

// Re-export main types and functions for easier access
pub use types::{
    AccuracyReport, BandStack, ClassId, ClassifiedRaster, GeoTransform, LabeledSamples,
    RasterMetadata, TerraError, TerraResult, TrainTestSplit, TrainingPolygon, INVALID_CLASS,
};

pub use crate::core::{
    AccuracyAssessor, BandStacker, Classifier, ClusterAlgorithm, ClusterModel, DecisionTree,
    DecisionTreeParams, FullImageClassifier, KMeans, KMeansParams, NoProgress, PipelineStage,
    ProgressSink, SplitCriterion, SupervisedAlgorithm, SupervisedConfig, SupervisedOutcome,
    SupervisedPipeline, TrainingSampleExtractor, UnsupervisedConfig, UnsupervisedPipeline,
};

pub use io::{BandReader, ClassifiedWriter, VectorReader};
