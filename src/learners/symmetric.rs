//! Oblivious tree growth
//!
//! Every level applies one (feature, threshold) test to all of its nodes, so
//! a tree of depth `d` has exactly `2^d` leaves, some possibly empty. The
//! split of a level maximizes the gain summed over the nodes it divides.

use super::boosting::boost;
use super::histogram::{GradSum, NodeHistogram, SplitConstraints};
use super::params::{EvalMetric, FitParams, TreeParams};
use super::tree::{GrowContext, Tree};
use super::{Booster, Classifier, EvalSet, Learner};
use crate::table::FeatureTable;
use crate::Result;

#[derive(Debug, Clone, Copy, Default)]
pub struct Symmetric;

impl Booster for Symmetric {
    fn learner(&self) -> Learner {
        Learner::Symmetric
    }

    fn default_tree_params(&self) -> TreeParams {
        TreeParams {
            n_estimators: 100,
            learning_rate: 0.03,
            max_depth: 6,
            num_leaves: 64,
            min_child_weight: 0.0,
            min_samples_leaf: 1,
            reg_lambda: 3.0,
            gamma: 0.0,
            max_bins: 254,
        }
    }

    fn default_fit_params(&self) -> FitParams {
        FitParams {
            eval_metric: EvalMetric::Brier,
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
        boost(self.learner(), x, y, eval_set, tree_params, fit_params, grow_oblivious)
    }
}

/// Best level split as (feature, bin, summed gain).
///
/// A bin is rejected when it gives any node a non-empty child that fails the
/// leaf constraints. Empty children are allowed, since a level splits nodes
/// that may not straddle its threshold.
fn best_level_split(
    hists: &[NodeHistogram],
    n_features: usize,
    constraints: &SplitConstraints,
) -> Option<(usize, usize, f64)> {
    let admissible = |child: GradSum| child.count == 0 || constraints.admissible(child);
    let mut best: Option<(usize, usize, f64)> = None;
    for feature in 0..n_features {
        let n_bins = hists.first().map_or(0, |h| h.feature(feature).len());
        let mut gains = vec![0.0; n_bins.saturating_sub(1)];
        let mut blocked = vec![false; gains.len()];
        for hist in hists {
            let total = hist.total();
            if total.count == 0 {
                continue;
            }
            let parent = constraints.score(total);
            let mut left = GradSum::default();
            for (bin, sum) in hist.feature(feature).iter().take(gains.len()).enumerate() {
                left.grad += sum.grad;
                left.hess += sum.hess;
                left.count += sum.count;
                let right = total.sub(left);
                if !admissible(left) || !admissible(right) {
                    blocked[bin] = true;
                    continue;
                }
                gains[bin] +=
                    0.5 * (constraints.score(left) + constraints.score(right) - parent);
            }
        }
        for (bin, gain) in gains.into_iter().enumerate() {
            if blocked[bin] {
                continue;
            }
            let gain = gain - constraints.gamma;
            if gain > 1e-12 && best.map_or(true, |b| gain > b.2) {
                best = Some((feature, bin, gain));
            }
        }
    }
    best
}

fn grow_oblivious(ctx: &GrowContext<'_>) -> Tree {
    let constraints = ctx.constraints();
    let mut partitions = vec![ctx.all_rows()];
    let mut levels = Vec::new();

    for _ in 0..ctx.params.max_depth {
        let hists: Vec<NodeHistogram> = partitions
            .iter()
            .map(|rows| NodeHistogram::build(ctx.data, rows, ctx.grads, ctx.hess))
            .collect();
        let Some((feature, bin, _)) =
            best_level_split(&hists, ctx.data.n_features(), &constraints)
        else {
            break;
        };
        levels.push((feature, ctx.data.cuts().threshold(feature, bin)));
        partitions = partitions
            .iter()
            .flat_map(|rows| {
                let (left, right): (Vec<u32>, Vec<u32>) = rows
                    .iter()
                    .partition(|&&r| ctx.data.bin(feature, r) <= bin);
                [left, right]
            })
            .collect();
    }

    let leaf_values = partitions
        .iter()
        .map(|rows| {
            let grad: f64 = rows.iter().map(|&r| ctx.grads[r as usize]).sum();
            let hess: f64 = rows.iter().map(|&r| ctx.hess[r as usize]).sum();
            constraints.leaf_weight(GradSum {
                grad,
                hess,
                count: rows.len(),
            })
        })
        .collect();
    Tree::Oblivious {
        levels,
        leaf_values,
    }
}
