use crate::types::{ClassId, TerraError, TerraResult};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Supervised classification model
///
/// `predict` must accept any row count with the trained feature width: the
/// pipeline reuses one trained model for both the held-out test matrix and
/// the full flattened image matrix.
pub trait Classifier {
    /// Fit the model on labeled feature rows
    fn train(&mut self, x: ArrayView2<f32>, y: &[ClassId]) -> TerraResult<()>;

    /// Predict one class id per feature row
    fn predict(&self, x: ArrayView2<f32>) -> TerraResult<Vec<ClassId>>;
}

/// Split quality criterion for decision tree construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitCriterion {
    Gini,
    Entropy,
}

impl SplitCriterion {
    /// Parse a criterion name as shells present it ("gini", "entropy")
    pub fn from_name(name: &str) -> TerraResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "gini" => Ok(SplitCriterion::Gini),
            "entropy" => Ok(SplitCriterion::Entropy),
            other => Err(TerraError::UnsupportedAlgorithm(format!(
                "Unknown split criterion '{}'",
                other
            ))),
        }
    }

    /// Impurity of a label set under this criterion
    fn impurity(&self, counts: &BTreeMap<ClassId, usize>, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let n = total as f64;
        match self {
            SplitCriterion::Gini => {
                let mut gini = 1.0;
                for &count in counts.values() {
                    let p = count as f64 / n;
                    gini -= p * p;
                }
                gini
            }
            SplitCriterion::Entropy => {
                let mut entropy = 0.0;
                for &count in counts.values() {
                    if count == 0 {
                        continue;
                    }
                    let p = count as f64 / n;
                    entropy -= p * p.log2();
                }
                entropy
            }
        }
    }
}

/// Decision tree parameters
///
/// These are the knobs a shell exposes for the tree family: split
/// criterion, optional depth limit, and the minimum node size to split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTreeParams {
    pub criterion: SplitCriterion,
    /// Maximum tree depth; unlimited when None
    pub max_depth: Option<usize>,
    /// Smallest node that may still be split (at least 2)
    pub min_samples_split: usize,
}

impl Default for DecisionTreeParams {
    fn default() -> Self {
        Self {
            criterion: SplitCriterion::Gini,
            max_depth: None,
            min_samples_split: 2,
        }
    }
}

/// One node of a fitted CART tree
#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        class: ClassId,
    },
    Split {
        feature: usize,
        threshold: f32,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// CART decision tree classifier
///
/// Recursive binary splitting on single-feature thresholds, scored by Gini
/// impurity or entropy. The reference supervised model; other families plug
/// in through the same [`Classifier`] trait.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    params: DecisionTreeParams,
    root: Option<TreeNode>,
    n_features: usize,
}

impl DecisionTree {
    /// Create a decision tree with default parameters
    pub fn new() -> Self {
        Self::with_params(DecisionTreeParams::default())
    }

    /// Create a decision tree with custom parameters
    pub fn with_params(params: DecisionTreeParams) -> Self {
        Self {
            params,
            root: None,
            n_features: 0,
        }
    }
}

impl Default for DecisionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl Classifier for DecisionTree {
    fn train(&mut self, x: ArrayView2<f32>, y: &[ClassId]) -> TerraResult<()> {
        if x.nrows() != y.len() {
            return Err(TerraError::Training(format!(
                "Feature and label counts disagree: {} rows vs {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(TerraError::Training(
                "Cannot train on an empty sample set".to_string(),
            ));
        }

        let distinct: BTreeSet<ClassId> = y.iter().copied().collect();
        if distinct.len() < 2 {
            return Err(TerraError::Training(format!(
                "Training labels contain {} distinct class(es); at least 2 are required",
                distinct.len()
            )));
        }

        let min_split = self.params.min_samples_split.max(2);
        log::info!(
            "Training decision tree on {} samples, {} features, {} classes",
            x.nrows(),
            x.ncols(),
            distinct.len()
        );

        self.n_features = x.ncols();
        let x_owned = x.to_owned();
        self.root = Some(build_tree(
            &x_owned,
            y,
            0,
            self.params.criterion,
            self.params.max_depth,
            min_split,
        ));
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f32>) -> TerraResult<Vec<ClassId>> {
        let root = self.root.as_ref().ok_or_else(|| {
            TerraError::Training("Classifier has not been trained".to_string())
        })?;

        if x.ncols() != self.n_features {
            return Err(TerraError::Training(format!(
                "Feature width {} does not match trained width {}",
                x.ncols(),
                self.n_features
            )));
        }

        Ok(x.rows().into_iter().map(|row| predict_one(root, row)).collect())
    }
}

fn predict_one(root: &TreeNode, row: ArrayView1<f32>) -> ClassId {
    let mut node = root;
    loop {
        match node {
            TreeNode::Leaf { class } => return *class,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                node = if row[*feature] <= *threshold {
                    left
                } else {
                    right
                };
            }
        }
    }
}

fn class_counts(y: &[ClassId]) -> BTreeMap<ClassId, usize> {
    let mut counts = BTreeMap::new();
    for &label in y {
        *counts.entry(label).or_insert(0) += 1;
    }
    counts
}

/// Most frequent class; ties resolve to the smallest class id
fn majority_class(y: &[ClassId]) -> ClassId {
    let counts = class_counts(y);
    let mut best: (usize, ClassId) = (0, 0);
    for (&class, &count) in &counts {
        if count > best.0 {
            best = (count, class);
        }
    }
    best.1
}

fn build_tree(
    x: &Array2<f32>,
    y: &[ClassId],
    depth: usize,
    criterion: SplitCriterion,
    max_depth: Option<usize>,
    min_samples_split: usize,
) -> TreeNode {
    let counts = class_counts(y);

    // Pure node, depth limit, or too small to split
    let depth_reached = max_depth.map(|d| depth >= d).unwrap_or(false);
    if counts.len() == 1 || depth_reached || y.len() < min_samples_split {
        return TreeNode::Leaf {
            class: majority_class(y),
        };
    }

    let Some((feature, threshold)) = find_best_split(x, y, criterion) else {
        return TreeNode::Leaf {
            class: majority_class(y),
        };
    };

    let mut left_idx = Vec::new();
    let mut right_idx = Vec::new();
    for (i, row) in x.rows().into_iter().enumerate() {
        if row[feature] <= threshold {
            left_idx.push(i);
        } else {
            right_idx.push(i);
        }
    }

    // find_best_split only returns thresholds that separate the rows
    let gather = |idx: &[usize]| -> (Array2<f32>, Vec<ClassId>) {
        let sub_x = x.select(Axis(0), idx);
        let sub_y = idx.iter().map(|&i| y[i]).collect();
        (sub_x, sub_y)
    };

    let (left_x, left_y) = gather(&left_idx);
    let (right_x, right_y) = gather(&right_idx);

    TreeNode::Split {
        feature,
        threshold,
        left: Box::new(build_tree(
            &left_x,
            &left_y,
            depth + 1,
            criterion,
            max_depth,
            min_samples_split,
        )),
        right: Box::new(build_tree(
            &right_x,
            &right_y,
            depth + 1,
            criterion,
            max_depth,
            min_samples_split,
        )),
    }
}

/// Best (feature, threshold) over all features, or None when no split
/// improves on the parent impurity
fn find_best_split(
    x: &Array2<f32>,
    y: &[ClassId],
    criterion: SplitCriterion,
) -> Option<(usize, f32)> {
    let n = y.len();
    if n < 2 {
        return None;
    }

    let parent_counts = class_counts(y);
    let parent_impurity = criterion.impurity(&parent_counts, n);

    let mut best: Option<(usize, f32)> = None;
    let mut best_gain = 1e-12;

    for feature in 0..x.ncols() {
        let column = x.column(feature);

        let mut values: Vec<f32> = column.iter().copied().collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();
        if values.len() < 2 {
            continue;
        }

        for window in values.windows(2) {
            let threshold = (window[0] + window[1]) / 2.0;

            let mut left = Vec::new();
            let mut right = Vec::new();
            for (i, &value) in column.iter().enumerate() {
                if value <= threshold {
                    left.push(y[i]);
                } else {
                    right.push(y[i]);
                }
            }
            if left.is_empty() || right.is_empty() {
                continue;
            }

            let left_impurity = criterion.impurity(&class_counts(&left), left.len());
            let right_impurity = criterion.impurity(&class_counts(&right), right.len());
            let weighted = (left.len() as f64 * left_impurity
                + right.len() as f64 * right_impurity)
                / n as f64;

            let gain = parent_impurity - weighted;
            if gain > best_gain {
                best_gain = gain;
                best = Some((feature, threshold));
            }
        }
    }

    best
}

/// Supervised algorithm registry, keyed by the names shells present.
///
/// New model families get a variant here and a `build` arm; the pipeline
/// itself never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SupervisedAlgorithm {
    DecisionTree(DecisionTreeParams),
}

impl SupervisedAlgorithm {
    /// Resolve an algorithm name to its default-parameter configuration.
    ///
    /// Fails with `UnsupportedAlgorithm` before any data is touched, so a
    /// bad name never costs a band read.
    pub fn from_name(name: &str) -> TerraResult<Self> {
        let key = name.trim().to_ascii_lowercase().replace([' ', '_'], "-");
        match key.as_str() {
            "decision-tree" => Ok(SupervisedAlgorithm::DecisionTree(
                DecisionTreeParams::default(),
            )),
            _ => Err(TerraError::UnsupportedAlgorithm(name.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SupervisedAlgorithm::DecisionTree(_) => "decision-tree",
        }
    }

    /// Construct an untrained model for this configuration
    pub fn build(&self) -> Box<dyn Classifier> {
        match self {
            SupervisedAlgorithm::DecisionTree(params) => {
                Box::new(DecisionTree::with_params(params.clone()))
            }
        }
    }
}
