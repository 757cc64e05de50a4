use gdal::raster::Buffer;
use gdal::DriverManager;
use std::path::Path;
use terraclass::{BandStacker, TerraError};

fn write_band(
    path: &Path,
    width: usize,
    height: usize,
    transform: [f64; 6],
    nodata: Option<f64>,
    value_at: impl Fn(usize, usize) -> f32,
) {
    let driver = DriverManager::get_driver_by_name("GTiff").expect("GTiff driver");
    let mut dataset = driver
        .create_with_band_type::<f32, _>(path, width as isize, height as isize, 1)
        .expect("Failed to create test raster");
    dataset.set_geo_transform(&transform).expect("set transform");

    let mut band = dataset.rasterband(1).expect("raster band");
    if let Some(nd) = nodata {
        band.set_no_data_value(Some(nd)).expect("set nodata");
    }

    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(value_at(row, col));
        }
    }
    let buffer = Buffer::new((width, height), data);
    band.write((0, 0), (width, height), &buffer).expect("write band");
}

const TRANSFORM: [f64; 6] = [0.0, 1.0, 0.0, 10.0, 0.0, -1.0];

#[test]
fn test_stack_shape_and_band_order() {
    let dir = tempfile::tempdir().unwrap();
    let paths: Vec<_> = (0..3)
        .map(|i| dir.path().join(format!("band_{}.tif", i)))
        .collect();

    for (i, path) in paths.iter().enumerate() {
        let fill = (i + 1) as f32 * 10.0;
        write_band(path, 10, 10, TRANSFORM, None, |_, _| fill);
    }

    let stack = BandStacker::stack(&paths).expect("stacking failed");
    assert_eq!(stack.pixels.dim(), (10, 10, 3));

    // Band order follows input file order
    assert_eq!(stack.pixels[[4, 4, 0]], 10.0);
    assert_eq!(stack.pixels[[4, 4, 1]], 20.0);
    assert_eq!(stack.pixels[[4, 4, 2]], 30.0);
}

#[test]
fn test_stack_single_band() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("only.tif");
    write_band(&path, 8, 5, TRANSFORM, None, |r, c| (r * 8 + c) as f32);

    let stack = BandStacker::stack(&[&path]).expect("stacking failed");
    assert_eq!(stack.pixels.dim(), (5, 8, 1));
    assert_eq!(stack.pixels[[2, 3, 0]], 19.0);
}

#[test]
fn test_stack_rejects_shape_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.tif");
    let b = dir.path().join("b.tif");
    write_band(&a, 10, 10, TRANSFORM, None, |_, _| 1.0);
    write_band(&b, 11, 10, TRANSFORM, None, |_, _| 2.0);

    let result = BandStacker::stack(&[a, b]);
    assert!(matches!(result, Err(TerraError::ShapeMismatch(_))));
}

#[test]
fn test_stack_rejects_empty_path_list() {
    let paths: Vec<std::path::PathBuf> = Vec::new();
    assert!(BandStacker::stack(&paths).is_err());
}

#[test]
fn test_stack_fails_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.tif");
    write_band(&a, 4, 4, TRANSFORM, None, |_, _| 1.0);
    let missing = dir.path().join("missing.tif");

    assert!(BandStacker::stack(&[a, missing]).is_err());
}

#[test]
fn test_reference_metadata_comes_from_first_band() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.tif");
    let b = dir.path().join("b.tif");
    let other_transform = [100.0, 2.0, 0.0, 50.0, 0.0, -2.0];
    write_band(&a, 6, 6, TRANSFORM, None, |_, _| 1.0);
    write_band(&b, 6, 6, other_transform, None, |_, _| 2.0);

    let stack = BandStacker::stack(&[a, b]).expect("stacking failed");
    assert_eq!(stack.metadata.geo_transform.to_gdal(), TRANSFORM);
    assert_eq!(stack.metadata.width, 6);
    assert_eq!(stack.metadata.height, 6);
}

#[test]
fn test_nodata_values_become_nan() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nodata.tif");
    write_band(&path, 4, 4, TRANSFORM, Some(-9999.0), |r, c| {
        if (r, c) == (1, 2) {
            -9999.0
        } else {
            5.0
        }
    });

    let stack = BandStacker::stack(&[&path]).expect("stacking failed");
    assert!(stack.pixels[[1, 2, 0]].is_nan());
    assert_eq!(stack.pixels[[0, 0, 0]], 5.0);
}
