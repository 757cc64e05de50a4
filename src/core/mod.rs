//! Core classification pipeline modules

pub mod accuracy;
pub mod band_stack;
pub mod classifier;
pub mod cluster;
pub mod full_image;
pub mod pipeline;
pub mod training;

// Re-export main types
pub use accuracy::AccuracyAssessor;
pub use band_stack::BandStacker;
pub use classifier::{
    Classifier, DecisionTree, DecisionTreeParams, SplitCriterion, SupervisedAlgorithm,
};
pub use cluster::{ClusterAlgorithm, ClusterModel, KMeans, KMeansParams};
pub use full_image::FullImageClassifier;
pub use pipeline::{
    NoProgress, PipelineStage, ProgressSink, SupervisedConfig, SupervisedOutcome,
    SupervisedPipeline, UnsupervisedConfig, UnsupervisedPipeline,
};
pub use training::{split_samples, TrainingSampleExtractor};
