//! Booster hyperparameters and caller overrides

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::training::metrics;

/// Tree construction parameters after defaults and overrides are merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Shrinkage applied to every tree
    pub learning_rate: f64,
    /// Maximum tree depth (0 = unlimited, leaf-wise growth only)
    pub max_depth: usize,
    /// Maximum number of leaves per tree (leaf-wise growth)
    pub num_leaves: usize,
    /// Minimum hessian sum in a child
    pub min_child_weight: f64,
    /// Minimum number of rows in a child
    pub min_samples_leaf: usize,
    /// L2 regularization on leaf weights
    pub reg_lambda: f64,
    /// Minimum loss reduction to make a split
    pub gamma: f64,
    /// Maximum number of histogram bins per feature
    pub max_bins: usize,
}

/// Per-field overrides of [`TreeParams`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeParamOverrides {
    #[serde(default, alias = "iterations")]
    pub n_estimators: Option<usize>,
    #[serde(default)]
    pub learning_rate: Option<f64>,
    #[serde(default, alias = "depth")]
    pub max_depth: Option<usize>,
    #[serde(default)]
    pub num_leaves: Option<usize>,
    #[serde(default)]
    pub min_child_weight: Option<f64>,
    #[serde(default)]
    pub min_samples_leaf: Option<usize>,
    #[serde(default, alias = "l2_leaf_reg")]
    pub reg_lambda: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
    #[serde(default)]
    pub max_bins: Option<usize>,
}

impl TreeParamOverrides {
    /// Fill every unset field from `defaults`
    pub fn merge_onto(&self, defaults: TreeParams) -> TreeParams {
        TreeParams {
            n_estimators: self.n_estimators.unwrap_or(defaults.n_estimators),
            learning_rate: self.learning_rate.unwrap_or(defaults.learning_rate),
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            num_leaves: self.num_leaves.unwrap_or(defaults.num_leaves),
            min_child_weight: self.min_child_weight.unwrap_or(defaults.min_child_weight),
            min_samples_leaf: self.min_samples_leaf.unwrap_or(defaults.min_samples_leaf),
            reg_lambda: self.reg_lambda.unwrap_or(defaults.reg_lambda),
            gamma: self.gamma.unwrap_or(defaults.gamma),
            max_bins: self.max_bins.unwrap_or(defaults.max_bins),
        }
    }
}

/// Metric monitored on the validation set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMetric {
    #[serde(alias = "AUC")]
    Auc,
    #[serde(alias = "BrierScore")]
    Brier,
    #[serde(alias = "Logloss")]
    LogLoss,
}

impl EvalMetric {
    pub fn higher_is_better(&self) -> bool {
        matches!(self, EvalMetric::Auc)
    }

    /// `None` when the metric is undefined for these labels
    pub fn evaluate(&self, labels: &[bool], probs: &[f64]) -> Option<f64> {
        match self {
            EvalMetric::Auc => metrics::auroc(labels, probs),
            EvalMetric::Brier => metrics::brier_score(labels, probs),
            EvalMetric::LogLoss => metrics::log_loss(labels, probs),
        }
    }
}

impl fmt::Display for EvalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalMetric::Auc => write!(f, "auc"),
            EvalMetric::Brier => write!(f, "brier"),
            EvalMetric::LogLoss => write!(f, "logloss"),
        }
    }
}

/// Fit-time parameters after defaults and overrides are merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitParams {
    pub eval_metric: EvalMetric,
    /// Log the validation metric of every round
    pub verbose: bool,
    /// Rounds without improvement before training halts
    pub early_stopping_rounds: usize,
}

/// Per-field overrides of [`FitParams`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FitParamOverrides {
    #[serde(default)]
    pub eval_metric: Option<EvalMetric>,
    #[serde(default)]
    pub verbose: Option<bool>,
    #[serde(default)]
    pub early_stopping_rounds: Option<usize>,
}

impl FitParamOverrides {
    /// Fill every unset field from `defaults`
    pub fn merge_onto(&self, defaults: FitParams) -> FitParams {
        FitParams {
            eval_metric: self.eval_metric.unwrap_or(defaults.eval_metric),
            verbose: self.verbose.unwrap_or(defaults.verbose),
            early_stopping_rounds: self
                .early_stopping_rounds
                .unwrap_or(defaults.early_stopping_rounds),
        }
    }
}
