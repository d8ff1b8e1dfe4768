//! Best-first tree growth

use super::boosting::boost;
use super::params::{EvalMetric, FitParams, TreeParams};
use super::tree::{grow_binary, Expansion};
use super::{Booster, Classifier, EvalSet, Learner};
use crate::table::FeatureTable;
use crate::Result;

/// Splits the leaf with the largest gain until `num_leaves` is reached.
///
/// `max_depth` still bounds every branch; 0 leaves depth unbounded.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeafWise;

impl Booster for LeafWise {
    fn learner(&self) -> Learner {
        Learner::LeafWise
    }

    fn default_tree_params(&self) -> TreeParams {
        TreeParams {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 3,
            num_leaves: 31,
            min_child_weight: 1e-3,
            min_samples_leaf: 20,
            reg_lambda: 0.0,
            gamma: 0.0,
            max_bins: 255,
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
        let expansion = Expansion::BestFirst {
            max_leaves: tree_params.num_leaves,
        };
        boost(self.learner(), x, y, eval_set, tree_params, fit_params, |ctx| {
            grow_binary(ctx, expansion)
        })
    }
}
