use ndarray::{array, Array3};
use terraclass::{
    BandStack, Classifier, ClusterModel, DecisionTree, FullImageClassifier, GeoTransform,
    KMeans, KMeansParams, RasterMetadata, INVALID_CLASS,
};

fn make_stack(rows: usize, cols: usize) -> BandStack {
    BandStack {
        pixels: Array3::zeros((rows, cols, 2)),
        metadata: RasterMetadata {
            width: cols,
            height: rows,
            geo_transform: GeoTransform::from_gdal(&[0.0, 1.0, 0.0, rows as f64, 0.0, -1.0]),
            projection: String::new(),
            nodata: None,
        },
    }
}

/// Tree trained to answer 0 for low band-0 values and 1 for high ones
fn trained_threshold_tree() -> DecisionTree {
    let x = array![[1.0, 0.0], [2.0, 0.0], [8.0, 0.0], [9.0, 0.0]];
    let y = vec![0, 0, 1, 1];
    let mut tree = DecisionTree::new();
    tree.train(x.view(), &y).unwrap();
    tree
}

#[test]
fn test_nan_row_is_sentinel_and_positions_survive() {
    let mut stack = make_stack(4, 5);
    for r in 0..4 {
        for c in 0..5 {
            // Alternate low/high by column so a transpose would misplace labels
            stack.pixels[[r, c, 0]] = if c % 2 == 0 { 1.0 } else { 9.0 };
            stack.pixels[[r, c, 1]] = 0.5;
        }
    }
    // Row 1 has no valid data in any band
    for c in 0..5 {
        stack.pixels[[1, c, 0]] = f32::NAN;
        stack.pixels[[1, c, 1]] = f32::NAN;
    }

    let tree = trained_threshold_tree();
    let classified = FullImageClassifier::classify_all(&stack, &tree).unwrap();

    assert_eq!(classified.classes.dim(), (4, 5));
    for c in 0..5 {
        assert_eq!(classified.classes[[1, c]], INVALID_CLASS);
    }
    for r in [0usize, 2, 3] {
        for c in 0..5 {
            let expected = if c % 2 == 0 { 0 } else { 1 };
            assert_eq!(classified.classes[[r, c]], expected, "pixel ({}, {})", r, c);
        }
    }
}

#[test]
fn test_single_nan_band_invalidates_pixel() {
    let mut stack = make_stack(3, 3);
    for r in 0..3 {
        for c in 0..3 {
            stack.pixels[[r, c, 0]] = 1.0;
            stack.pixels[[r, c, 1]] = 0.5;
        }
    }
    // NaN in only one of the two bands still disqualifies the pixel
    stack.pixels[[2, 2, 1]] = f32::NAN;

    let tree = trained_threshold_tree();
    let classified = FullImageClassifier::classify_all(&stack, &tree).unwrap();

    assert_eq!(classified.classes[[2, 2]], INVALID_CLASS);
    assert_eq!(classified.classes[[0, 0]], 0);
}

#[test]
fn test_all_invalid_stack_is_all_sentinel() {
    let mut stack = make_stack(2, 2);
    stack.pixels.fill(f32::NAN);

    let tree = trained_threshold_tree();
    let classified = FullImageClassifier::classify_all(&stack, &tree).unwrap();
    assert!(classified
        .classes
        .iter()
        .all(|&v| v == INVALID_CLASS));
}

#[test]
fn test_cluster_assignment_is_stable_across_calls() {
    let mut stack = make_stack(6, 4);
    for r in 0..6 {
        for c in 0..4 {
            let base = if r < 3 { 0.0 } else { 50.0 };
            stack.pixels[[r, c, 0]] = base + c as f32 * 0.1;
            stack.pixels[[r, c, 1]] = base - c as f32 * 0.1;
        }
    }

    let valid = FullImageClassifier::valid_pixel_matrix(&stack).unwrap();
    let mut model = KMeans::new(KMeansParams::with_clusters(2));
    model.fit(valid.view()).unwrap();

    let first = FullImageClassifier::cluster_all(&stack, &model).unwrap();
    let second = FullImageClassifier::cluster_all(&stack, &model).unwrap();
    assert_eq!(first.classes, second.classes);

    // Top and bottom halves land in different clusters
    assert_ne!(first.classes[[0, 0]], first.classes[[5, 0]]);
    assert_eq!(first.classes[[0, 0]], first.classes[[2, 3]]);
}

#[test]
fn test_cluster_all_marks_invalid_pixels() {
    let mut stack = make_stack(4, 4);
    for r in 0..4 {
        for c in 0..4 {
            stack.pixels[[r, c, 0]] = if r < 2 { 0.0 } else { 50.0 };
            stack.pixels[[r, c, 1]] = 1.0;
        }
    }
    stack.pixels[[0, 3, 0]] = f32::NAN;

    let valid = FullImageClassifier::valid_pixel_matrix(&stack).unwrap();
    assert_eq!(valid.nrows(), 15);

    let mut model = KMeans::new(KMeansParams::with_clusters(2));
    model.fit(valid.view()).unwrap();

    let classified = FullImageClassifier::cluster_all(&stack, &model).unwrap();
    assert_eq!(classified.classes[[0, 3]], INVALID_CLASS);
    assert!(classified.classes[[0, 0]] >= 0);
}
