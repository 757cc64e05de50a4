use crate::core::classifier::Classifier;
use crate::core::cluster::ClusterModel;
use crate::types::{
    BandStack, ClassId, ClassifiedRaster, TerraError, TerraResult, INVALID_CLASS,
};
use ndarray::Array2;

/// Applies a trained model to every pixel of a band stack
///
/// Pixels with a missing band value are never shown to the model; they come
/// back carrying the invalid sentinel instead of a class id.
pub struct FullImageClassifier;

impl FullImageClassifier {
    /// Classify every valid pixel with a trained supervised model
    pub fn classify_all(
        stack: &BandStack,
        model: &dyn Classifier,
    ) -> TerraResult<ClassifiedRaster> {
        Self::apply(stack, |x| model.predict(x))
    }

    /// Assign every valid pixel to a cluster with a fitted cluster model
    pub fn cluster_all(
        stack: &BandStack,
        model: &dyn ClusterModel,
    ) -> TerraResult<ClassifiedRaster> {
        Self::apply(stack, |x| model.classify(x))
    }

    /// Matrix of the pixel vectors with no missing band value, in
    /// flattened row-major order. This is what an unsupervised model is
    /// fitted on before full-image assignment.
    pub fn valid_pixel_matrix(stack: &BandStack) -> TerraResult<Array2<f32>> {
        let (_, matrix) = Self::flatten_valid(stack)?;
        Ok(matrix)
    }

    /// Flatten the stack row-major and keep the rows without NaN, returning
    /// their flat indices alongside the gathered matrix
    fn flatten_valid(stack: &BandStack) -> TerraResult<(Vec<usize>, Array2<f32>)> {
        let (rows, cols, bands) = stack.pixels.dim();
        let n_pixels = rows * cols;

        let flat = stack
            .pixels
            .view()
            .into_shape((n_pixels, bands))
            .map_err(|e| {
                TerraError::Processing(format!("Failed to flatten band stack: {}", e))
            })?;

        let mut valid_indices = Vec::new();
        let mut valid_data: Vec<f32> = Vec::new();
        for (i, row) in flat.rows().into_iter().enumerate() {
            if row.iter().any(|v| v.is_nan()) {
                continue;
            }
            valid_indices.push(i);
            valid_data.extend(row.iter());
        }

        let matrix = Array2::from_shape_vec((valid_indices.len(), bands), valid_data)
            .map_err(|e| {
                TerraError::Processing(format!("Failed to shape valid-pixel matrix: {}", e))
            })?;

        Ok((valid_indices, matrix))
    }

    /// Run the model on the valid rows and scatter the predictions back
    /// into the original grid. The reshape at the end uses the same
    /// row-major ordering as the flatten, so spatial positions are
    /// preserved.
    fn apply<F>(stack: &BandStack, predict: F) -> TerraResult<ClassifiedRaster>
    where
        F: FnOnce(ndarray::ArrayView2<f32>) -> TerraResult<Vec<ClassId>>,
    {
        let (rows, cols, _) = stack.pixels.dim();
        let n_pixels = rows * cols;

        let (valid_indices, x) = Self::flatten_valid(stack)?;

        log::info!(
            "Classifying {} of {} pixels ({} invalid)",
            valid_indices.len(),
            n_pixels,
            n_pixels - valid_indices.len()
        );

        let mut output = vec![INVALID_CLASS; n_pixels];
        if !valid_indices.is_empty() {
            let labels = predict(x.view())?;
            if labels.len() != valid_indices.len() {
                return Err(TerraError::Processing(format!(
                    "Model returned {} labels for {} pixels",
                    labels.len(),
                    valid_indices.len()
                )));
            }

            for (&i, &label) in valid_indices.iter().zip(labels.iter()) {
                let code = i16::try_from(label).map_err(|_| {
                    TerraError::Processing(format!(
                        "Class id {} does not fit the Int16 output type",
                        label
                    ))
                })?;
                output[i] = code;
            }
        }

        let classes = Array2::from_shape_vec((rows, cols), output).map_err(|e| {
            TerraError::Processing(format!("Failed to reshape classified output: {}", e))
        })?;

        Ok(ClassifiedRaster {
            classes,
            metadata: stack.metadata.clone(),
        })
    }
}
