//! Dataset splitting and evaluation

pub mod metrics;
pub mod split;

pub use metrics::{auroc, brier_score, log_loss, EvalHistory, Evaluation};
pub use split::{train_validation_split, SplitIndices};

use crate::{Result, VaepError};

/// Score predicted probabilities of one label column.
///
/// Fails with `UndefinedMetric` when the labels hold a single class, since
/// the AUROC is undefined there.
pub fn evaluate(label: &str, labels: &[bool], probs: &[f64]) -> Result<Evaluation> {
    if labels.len() != probs.len() {
        return Err(VaepError::ShapeMismatch {
            what: format!("probabilities for {}", label),
            expected: labels.len(),
            actual: probs.len(),
        });
    }
    let undefined = |metric: &str, reason: &str| VaepError::UndefinedMetric {
        metric: metric.to_string(),
        label: label.to_string(),
        reason: reason.to_string(),
    };
    let brier = brier_score(labels, probs).ok_or_else(|| undefined("Brier score", "no rows"))?;
    let auroc = auroc(labels, probs)
        .ok_or_else(|| undefined("AUROC", "only one class is present in the labels"))?;
    Ok(Evaluation { brier, auroc })
}
