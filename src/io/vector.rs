use crate::types::{TerraResult, TrainingPolygon};
use gdal::vector::{FieldValue, LayerAccess};
use gdal::Dataset;
use std::path::Path;

/// Reader for labeled training polygons from vector files
pub struct VectorReader;

impl VectorReader {
    /// Read (geometry, class attribute) pairs from the first layer of a
    /// vector file.
    ///
    /// Geometries are carried as WKT so they can be rasterized later without
    /// holding the source dataset open. Features without a geometry or with
    /// a null class attribute are skipped; the extractor reports an empty
    /// training set if nothing usable remains.
    pub fn read_labeled_polygons<P: AsRef<Path>>(
        path: P,
        class_attribute: &str,
    ) -> TerraResult<Vec<TrainingPolygon>> {
        log::info!(
            "Reading training polygons from: {} (attribute '{}')",
            path.as_ref().display(),
            class_attribute
        );

        let dataset = Dataset::open(path.as_ref())?;
        let mut layer = dataset.layer(0)?;

        let mut polygons = Vec::new();
        for feature in layer.features() {
            let geometry = match feature.geometry() {
                Some(g) => g,
                None => {
                    log::warn!("Skipping feature without geometry");
                    continue;
                }
            };

            let label = match feature.field(class_attribute)? {
                Some(value) => Self::field_to_label(value),
                None => {
                    log::warn!("Skipping feature with null '{}' attribute", class_attribute);
                    continue;
                }
            };

            polygons.push(TrainingPolygon {
                wkt: geometry.wkt()?,
                label,
            });
        }

        log::debug!("Read {} labeled polygons", polygons.len());
        Ok(polygons)
    }

    /// List the attribute column names of a vector file's first layer.
    ///
    /// Shells use this to offer a class-attribute choice before a run.
    pub fn field_names<P: AsRef<Path>>(path: P) -> TerraResult<Vec<String>> {
        let dataset = Dataset::open(path.as_ref())?;
        let layer = dataset.layer(0)?;
        Ok(layer.defn().fields().map(|f| f.name()).collect())
    }

    /// Render an attribute value as a class label string.
    ///
    /// Integer and real attributes are common in field shapefiles; all are
    /// carried as strings so the label encoding stays uniform.
    fn field_to_label(value: FieldValue) -> String {
        match value {
            FieldValue::StringValue(s) => s,
            FieldValue::IntegerValue(i) => i.to_string(),
            FieldValue::Integer64Value(i) => i.to_string(),
            FieldValue::RealValue(r) => r.to_string(),
            other => format!("{:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_to_label_conversions() {
        assert_eq!(
            VectorReader::field_to_label(FieldValue::StringValue("water".to_string())),
            "water"
        );
        assert_eq!(
            VectorReader::field_to_label(FieldValue::IntegerValue(3)),
            "3"
        );
        assert_eq!(
            VectorReader::field_to_label(FieldValue::Integer64Value(42)),
            "42"
        );
        assert_eq!(
            VectorReader::field_to_label(FieldValue::RealValue(2.5)),
            "2.5"
        );
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = VectorReader::read_labeled_polygons("nonexistent.shp", "class");
        assert!(result.is_err());
    }
}
