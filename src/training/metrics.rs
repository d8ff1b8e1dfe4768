//! Probability metrics and validation history

use serde::Serialize;
use std::fmt;

/// Mean squared difference between predicted probability and outcome.
///
/// `None` for empty or mismatched inputs.
pub fn brier_score(labels: &[bool], probs: &[f64]) -> Option<f64> {
    if labels.is_empty() || labels.len() != probs.len() {
        return None;
    }
    let sum: f64 = labels
        .iter()
        .zip(probs)
        .map(|(&y, &p)| (p - f64::from(u8::from(y))).powi(2))
        .sum();
    Some(sum / labels.len() as f64)
}

/// Mean binary cross-entropy, probabilities clipped away from 0 and 1
pub fn log_loss(labels: &[bool], probs: &[f64]) -> Option<f64> {
    if labels.is_empty() || labels.len() != probs.len() {
        return None;
    }
    let eps = 1e-15;
    let sum: f64 = labels
        .iter()
        .zip(probs)
        .map(|(&y, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if y {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    Some(sum / labels.len() as f64)
}

/// Area under the ROC curve from the rank-sum statistic, ties averaged.
///
/// `None` unless both classes are present.
pub fn auroc(labels: &[bool], probs: &[f64]) -> Option<f64> {
    if labels.len() != probs.len() {
        return None;
    }
    let n_pos = labels.iter().filter(|&&y| y).count();
    let n_neg = labels.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    let mut order: Vec<usize> = (0..probs.len()).collect();
    order.sort_by(|&a, &b| probs[a].total_cmp(&probs[b]));

    let mut pos_rank_sum = 0.0;
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && probs[order[j + 1]] == probs[order[i]] {
            j += 1;
        }
        // ranks are 1-based; a tie group shares its mean rank
        let rank = (i + j) as f64 / 2.0 + 1.0;
        let positives = order[i..=j].iter().filter(|&&k| labels[k]).count();
        pos_rank_sum += rank * positives as f64;
        i = j + 1;
    }

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    Some((pos_rank_sum - n_pos * (n_pos + 1.0) / 2.0) / (n_pos * n_neg))
}

/// Evaluation of one probability column against its labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub brier: f64,
    pub auroc: f64,
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Brier: {:.5} | AUROC: {:.5}", self.brier, self.auroc)
    }
}

/// Validation metric per boosting round, with the best round so far
#[derive(Debug, Clone)]
pub struct EvalHistory {
    higher_is_better: bool,
    values: Vec<f64>,
    best_value: Option<f64>,
    best_round: usize,
}

impl EvalHistory {
    pub fn new(higher_is_better: bool) -> Self {
        EvalHistory {
            higher_is_better,
            values: Vec::new(),
            best_value: None,
            best_round: 0,
        }
    }

    /// Record the metric after a round; rounds are numbered from 0
    pub fn record(&mut self, value: f64) {
        let round = self.values.len();
        self.values.push(value);
        let improved = match self.best_value {
            None => true,
            Some(best) if self.higher_is_better => value > best,
            Some(best) => value < best,
        };
        if improved {
            self.best_value = Some(value);
            self.best_round = round;
        }
    }

    /// True once `patience` rounds passed without improvement
    pub fn should_early_stop(&self, patience: usize) -> bool {
        match self.values.len().checked_sub(1) {
            Some(current) => patience > 0 && current - self.best_round >= patience,
            None => false,
        }
    }

    pub fn best_round(&self) -> Option<usize> {
        self.best_value.map(|_| self.best_round)
    }

    pub fn best_value(&self) -> Option<f64> {
        self.best_value
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
