//! Level-by-level tree growth

use super::boosting::boost;
use super::params::{EvalMetric, FitParams, TreeParams};
use super::tree::{grow_binary, Expansion};
use super::{Booster, Classifier, EvalSet, Learner};
use crate::table::FeatureTable;
use crate::Result;

/// Grows every node that can split, one depth level at a time
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthWise;

impl Booster for DepthWise {
    fn learner(&self) -> Learner {
        Learner::DepthWise
    }

    fn default_tree_params(&self) -> TreeParams {
        TreeParams {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 3,
            num_leaves: 8,
            min_child_weight: 1.0,
            min_samples_leaf: 1,
            reg_lambda: 1.0,
            gamma: 0.0,
            max_bins: 256,
        }
    }

    fn default_fit_params(&self) -> FitParams {
        FitParams {
            eval_metric: EvalMetric::Auc,
            verbose: true,
            early_stopping_rounds: 10,
        }
    }

    fn fit(
        &self,
        x: &FeatureTable,
        y: &[bool],
        eval_set: Option<EvalSet<'_>>,
        tree_params: &TreeParams,
        fit_params: &FitParams,
    ) -> Result<Classifier> {
        boost(self.learner(), x, y, eval_set, tree_params, fit_params, |ctx| {
            grow_binary(ctx, Expansion::LevelOrder)
        })
    }
}
