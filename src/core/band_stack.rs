use crate::io::BandReader;
use crate::types::{BandStack, StackArray, TerraError, TerraResult};
use ndarray::Axis;
use std::path::Path;

/// Builds a co-registered band stack from single-band raster files
pub struct BandStacker;

impl BandStacker {
    /// Read the first band of each file, in input order, into one array of
    /// shape (rows, cols, bands).
    ///
    /// All bands must share the spatial dimensions of the first band; a
    /// mismatch is fatal rather than silently cropped or padded. The
    /// reference metadata (geotransform, projection, nodata) is taken from
    /// the first band read, so every derived product aligns with it.
    pub fn stack<P: AsRef<Path>>(band_paths: &[P]) -> TerraResult<BandStack> {
        if band_paths.is_empty() {
            return Err(TerraError::ShapeMismatch(
                "At least one band file is required".to_string(),
            ));
        }

        log::info!("Stacking {} band files", band_paths.len());

        let (first_band, metadata) = BandReader::read_first_band(&band_paths[0])?;
        let (rows, cols) = first_band.dim();
        log::debug!("Reference grid: {}x{} from first band", rows, cols);

        let mut pixels = StackArray::zeros((rows, cols, band_paths.len()));
        pixels.index_axis_mut(Axis(2), 0).assign(&first_band);

        for (index, path) in band_paths.iter().enumerate().skip(1) {
            let (band, _) = BandReader::read_first_band(path)?;
            if band.dim() != (rows, cols) {
                return Err(TerraError::ShapeMismatch(format!(
                    "Band '{}' is {}x{} but the first band is {}x{}",
                    path.as_ref().display(),
                    band.dim().0,
                    band.dim().1,
                    rows,
                    cols
                )));
            }
            pixels.index_axis_mut(Axis(2), index).assign(&band);
        }

        log::info!(
            "Stacked {} bands into {}x{}x{} array",
            band_paths.len(),
            rows,
            cols,
            band_paths.len()
        );

        Ok(BandStack { pixels, metadata })
    }
}
