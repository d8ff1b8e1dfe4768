//! Gradient-boosted tree classifiers
//!
//! Three native backends share binning, split finding and the boosting
//! loop, and differ in how they grow a tree:
//!
//! - `depthwise`: level by level up to `max_depth`
//! - `leafwise`: best-first up to `num_leaves`
//! - `symmetric`: oblivious trees with one split per level
//!
//! A backend can be compiled out with its cargo feature; selecting it then
//! fails at fit time.

pub mod boosting;
pub mod histogram;
pub mod params;
pub mod tree;

#[cfg(feature = "depthwise")]
pub mod depthwise;
#[cfg(feature = "leafwise")]
pub mod leafwise;
#[cfg(feature = "symmetric")]
pub mod symmetric;

use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::table::FeatureTable;
use crate::{Result, VaepError};

pub use params::{EvalMetric, FitParamOverrides, FitParams, TreeParamOverrides, TreeParams};
pub use tree::Tree;

/// Tree growth strategy of a boosting backend.
///
/// Names parse case-insensitively, with the same rules on the command line
/// and in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Learner {
    #[serde(rename = "depthwise")]
    DepthWise,
    #[serde(rename = "leafwise")]
    LeafWise,
    #[serde(rename = "symmetric")]
    Symmetric,
}

impl Learner {
    pub const ALL: &'static [Learner] = &[Learner::DepthWise, Learner::LeafWise, Learner::Symmetric];

    pub fn name(&self) -> &'static str {
        match self {
            Learner::DepthWise => "depthwise",
            Learner::LeafWise => "leafwise",
            Learner::Symmetric => "symmetric",
        }
    }
}

impl fmt::Display for Learner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Learner {
    type Err = VaepError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "depthwise" | "xgboost" => Ok(Learner::DepthWise),
            "leafwise" | "lightgbm" => Ok(Learner::LeafWise),
            "symmetric" | "catboost" => Ok(Learner::Symmetric),
            _ => Err(VaepError::UnsupportedLearner(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Learner {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(de::Error::custom)
    }
}

/// Held-out rows monitored for early stopping
#[derive(Debug, Clone, Copy)]
pub struct EvalSet<'a> {
    pub x: &'a FeatureTable,
    pub y: &'a [bool],
}

/// A boosting backend
pub trait Booster {
    fn learner(&self) -> Learner;

    fn default_tree_params(&self) -> TreeParams;

    fn default_fit_params(&self) -> FitParams;

    /// Fit a classifier of `y` on `x`, early stopping on `eval_set` if given
    fn fit(
        &self,
        x: &FeatureTable,
        y: &[bool],
        eval_set: Option<EvalSet<'_>>,
        tree_params: &TreeParams,
        fit_params: &FitParams,
    ) -> Result<Classifier>;
}

/// The backend for a learner, if it was compiled in
pub fn backend(learner: Learner) -> Result<Box<dyn Booster>> {
    match learner {
        #[cfg(feature = "depthwise")]
        Learner::DepthWise => Ok(Box::new(depthwise::DepthWise)),
        #[cfg(feature = "leafwise")]
        Learner::LeafWise => Ok(Box::new(leafwise::LeafWise)),
        #[cfg(feature = "symmetric")]
        Learner::Symmetric => Ok(Box::new(symmetric::Symmetric)),
        #[allow(unreachable_patterns)]
        other => Err(VaepError::BackendUnavailable(other)),
    }
}

/// A fitted binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    pub learner: Learner,
    /// Feature columns, in the order the trees index them
    pub columns: Vec<String>,
    /// Initial margin shared by every row
    pub base_score: f64,
    pub learning_rate: f64,
    pub trees: Vec<Tree>,
    /// Best validation round when early stopping was active
    pub best_iteration: Option<usize>,
    pub best_score: Option<f64>,
}

impl Classifier {
    /// Probability of the positive class for every row of `x`.
    ///
    /// `x` may hold more columns than the model uses; missing ones are an
    /// error.
    pub fn predict_proba(&self, x: &FeatureTable) -> Result<Vec<f64>> {
        let x = x.select(&self.columns)?;
        let columns = x.columns();
        let probs = (0..x.n_rows())
            .map(|row| {
                let margin = self.trees.iter().fold(self.base_score, |m, tree| {
                    m + self.learning_rate * tree.predict(|f| columns[f].values[row])
                });
                boosting::sigmoid(margin)
            })
            .collect();
        Ok(probs)
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
