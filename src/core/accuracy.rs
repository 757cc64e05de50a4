use crate::types::{AccuracyReport, ClassId, TerraError, TerraResult};
use std::collections::BTreeSet;

/// Computes standard remote-sensing accuracy metrics from predicted vs.
/// true label arrays
pub struct AccuracyAssessor;

impl AccuracyAssessor {
    /// Build an accuracy report from equal-length true/predicted labels.
    ///
    /// Metrics are computed over the sorted union of classes observed in
    /// either array. A class that never appears in the predictions has user
    /// accuracy 0.0 by convention (and symmetrically for producer accuracy);
    /// this is reported, never raised. Pure function of its two arguments.
    pub fn report(y_true: &[ClassId], y_pred: &[ClassId]) -> TerraResult<AccuracyReport> {
        if y_true.is_empty() || y_pred.is_empty() {
            return Err(TerraError::InsufficientData(
                "Cannot assess accuracy of empty label arrays".to_string(),
            ));
        }
        if y_true.len() != y_pred.len() {
            return Err(TerraError::InsufficientData(format!(
                "Label arrays differ in length: {} true vs {} predicted",
                y_true.len(),
                y_pred.len()
            )));
        }

        let classes: Vec<ClassId> = y_true
            .iter()
            .chain(y_pred.iter())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let k = classes.len();
        let index_of = |class: ClassId| -> usize {
            // classes is sorted and contains every observed label
            classes.binary_search(&class).unwrap_or(0)
        };

        // Confusion matrix: rows = true class, columns = predicted class
        let mut confusion = vec![vec![0usize; k]; k];
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            confusion[index_of(t)][index_of(p)] += 1;
        }

        let n = y_true.len() as f64;
        let mut correct = 0usize;
        let mut producer_accuracy = Vec::with_capacity(k);
        let mut user_accuracy = Vec::with_capacity(k);
        let mut expected = 0.0f64;

        for i in 0..k {
            let true_total: usize = confusion[i].iter().sum();
            let pred_total: usize = (0..k).map(|j| confusion[j][i]).sum();
            let tp = confusion[i][i];
            correct += tp;

            producer_accuracy.push(if true_total > 0 {
                tp as f64 / true_total as f64
            } else {
                0.0
            });
            user_accuracy.push(if pred_total > 0 {
                tp as f64 / pred_total as f64
            } else {
                0.0
            });

            expected += (true_total as f64 / n) * (pred_total as f64 / n);
        }

        let overall_accuracy = correct as f64 / n;
        let kappa = if (1.0 - expected).abs() < f64::EPSILON {
            // Degenerate marginals (single class on both sides): perfect
            // agreement scores 1, anything else scores 0
            if (overall_accuracy - 1.0).abs() < f64::EPSILON {
                1.0
            } else {
                0.0
            }
        } else {
            (overall_accuracy - expected) / (1.0 - expected)
        };

        Ok(AccuracyReport {
            overall_accuracy,
            producer_accuracy,
            user_accuracy,
            kappa,
            classes,
        })
    }
}
