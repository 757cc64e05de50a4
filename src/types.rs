use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// Single pixel value within one spectral band
pub type BandValue = f32;

/// 2D raster band (rows x cols)
pub type BandArray = Array2<BandValue>;

/// Stacked multi-band pixel data (rows x cols x bands)
pub type StackArray = Array3<BandValue>;

/// Encoded class identifier (index into the label encoding)
pub type ClassId = usize;

/// Sentinel written to classified rasters where band data was missing.
/// Class ids are non-negative, so this value can never collide with one.
pub const INVALID_CLASS: i16 = -1;

/// Geospatial transformation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTransform {
    pub top_left_x: f64,
    pub pixel_width: f64,
    pub rotation_x: f64,
    pub top_left_y: f64,
    pub rotation_y: f64,
    pub pixel_height: f64,
}

impl GeoTransform {
    /// Build from the GDAL 6-element geotransform array
    pub fn from_gdal(transform: &[f64; 6]) -> Self {
        Self {
            top_left_x: transform[0],
            pixel_width: transform[1],
            rotation_x: transform[2],
            top_left_y: transform[3],
            rotation_y: transform[4],
            pixel_height: transform[5],
        }
    }

    /// Convert back to the GDAL 6-element geotransform array
    pub fn to_gdal(&self) -> [f64; 6] {
        [
            self.top_left_x,
            self.pixel_width,
            self.rotation_x,
            self.top_left_y,
            self.rotation_y,
            self.pixel_height,
        ]
    }
}

/// Reference geospatial metadata for a raster grid
///
/// Captured from the first band of a stack and reused for every product
/// derived from that stack, so outputs stay co-registered with the inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterMetadata {
    /// Raster width in pixels (columns)
    pub width: usize,
    /// Raster height in pixels (rows)
    pub height: usize,
    pub geo_transform: GeoTransform,
    /// Projection in WKT form; empty when the source carries none
    pub projection: String,
    /// Declared nodata value of the source band, if any
    pub nodata: Option<f64>,
}

/// Co-registered multi-band pixel data plus reference metadata
///
/// Immutable after construction; every band shares the same (rows, cols)
/// grid and the metadata of the first input band.
#[derive(Debug, Clone)]
pub struct BandStack {
    /// Pixel data of shape (rows, cols, bands), band order = input order
    pub pixels: StackArray,
    pub metadata: RasterMetadata,
}

impl BandStack {
    pub fn rows(&self) -> usize {
        self.pixels.dim().0
    }

    pub fn cols(&self) -> usize {
        self.pixels.dim().1
    }

    pub fn num_bands(&self) -> usize {
        self.pixels.dim().2
    }
}

/// One labeled training polygon: geometry as WKT plus its class attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPolygon {
    pub wkt: String,
    pub label: String,
}

/// Flat labeled sample set gathered from training polygons
///
/// `classes` is the label encoding: the distinct attribute values in sorted
/// order, so `labels[i]` indexes into it. The same encoding is used for
/// training, accuracy assessment, and full-image output.
#[derive(Debug, Clone)]
pub struct LabeledSamples {
    /// Feature matrix (n_samples x n_bands); contains no NaN rows
    pub features: Array2<BandValue>,
    /// Encoded class id per sample row
    pub labels: Vec<ClassId>,
    /// Sorted distinct attribute values; index = class id
    pub classes: Vec<String>,
}

impl LabeledSamples {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_bands(&self) -> usize {
        self.features.ncols()
    }
}

/// Disjoint train/test partition of a labeled sample set
///
/// Deterministic given the same samples, fraction, and seed.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: Array2<BandValue>,
    pub y_train: Vec<ClassId>,
    pub x_test: Array2<BandValue>,
    pub y_test: Vec<ClassId>,
    /// Label encoding carried over from the sample set
    pub classes: Vec<String>,
}

/// Standard remote-sensing accuracy metrics for one classification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccuracyReport {
    /// Fraction of test pixels classified correctly
    pub overall_accuracy: f64,
    /// Per-class recall, indexed like `classes`
    pub producer_accuracy: Vec<f64>,
    /// Per-class precision, indexed like `classes`
    pub user_accuracy: Vec<f64>,
    /// Cohen's kappa (chance-corrected agreement)
    pub kappa: f64,
    /// Sorted class ids observed in the true or predicted labels
    pub classes: Vec<ClassId>,
}

impl AccuracyReport {
    /// Human-readable multi-line summary of the report
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!("Overall Accuracy: {:.3}", self.overall_accuracy),
            format!("Kappa Coefficient: {:.3}", self.kappa),
            String::new(),
        ];
        for (i, class) in self.classes.iter().enumerate() {
            lines.push(format!(
                "Class {}: Producer Accuracy = {:.2}, User Accuracy = {:.2}",
                class, self.producer_accuracy[i], self.user_accuracy[i]
            ));
        }
        lines.join("\n")
    }
}

/// Classified raster on the same grid as its source stack
///
/// One class id per pixel, with `INVALID_CLASS` marking pixels that had
/// missing band data.
#[derive(Debug, Clone)]
pub struct ClassifiedRaster {
    /// Class id per pixel (rows, cols); `INVALID_CLASS` where invalid
    pub classes: Array2<i16>,
    pub metadata: RasterMetadata,
}

/// Error types for classification processing
#[derive(Debug, thiserror::Error)]
pub enum TerraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),

    #[error("Band shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Empty training set: {0}")]
    EmptyTrainingSet(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Processing error: {0}")]
    Processing(String),
}

/// Result type for classification operations
pub type TerraResult<T> = Result<T, TerraError>;
