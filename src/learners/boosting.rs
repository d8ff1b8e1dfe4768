//! The gradient-boosting loop shared by every backend
//!
//! Binary logistic loss: each round fits a tree to the gradient `p - y` and
//! hessian `p (1 - p)` of the current margins and adds it with shrinkage.

use super::histogram::QuantizedMatrix;
use super::params::{FitParams, TreeParams};
use super::tree::{GrowContext, Tree};
use super::{Classifier, EvalSet, Learner};
use crate::table::FeatureTable;
use crate::training::EvalHistory;
use crate::{Result, VaepError};

const MIN_HESSIAN: f64 = 1e-16;

pub fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn base_margin(y: &[bool]) -> f64 {
    let mean = y.iter().filter(|&&v| v).count() as f64 / y.len() as f64;
    let p = mean.clamp(1e-6, 1.0 - 1e-6);
    (p / (1.0 - p)).ln()
}

fn check_rows(what: &str, x: &FeatureTable, y: &[bool]) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(VaepError::ShapeMismatch {
            what: what.to_string(),
            expected: x.n_rows(),
            actual: y.len(),
        });
    }
    Ok(())
}

/// Add `learning_rate * tree` to the margin of every row of `x`
fn update_margins(margins: &mut [f64], x: &FeatureTable, tree: &Tree, learning_rate: f64) {
    let columns = x.columns();
    for (row, m) in margins.iter_mut().enumerate() {
        *m += learning_rate * tree.predict(|f| columns[f].values[row]);
    }
}

/// Run `params.n_estimators` boosting rounds with `grow` building each tree.
///
/// With an evaluation set the metric is tracked every round, training halts
/// after `early_stopping_rounds` rounds without improvement and the model is
/// truncated to its best round.
pub fn boost(
    learner: Learner,
    x: &FeatureTable,
    y: &[bool],
    eval_set: Option<EvalSet<'_>>,
    params: &TreeParams,
    fit_params: &FitParams,
    grow: impl Fn(&GrowContext<'_>) -> Tree,
) -> Result<Classifier> {
    check_rows("labels", x, y)?;
    if y.is_empty() {
        return Err(VaepError::InvalidParameter(
            "cannot fit a classifier on zero rows".to_string(),
        ));
    }
    if let Some(eval) = &eval_set {
        check_rows("validation labels", eval.x, eval.y)?;
        if eval.x.column_names() != x.column_names() {
            return Err(VaepError::InvalidParameter(
                "validation features must have the training columns".to_string(),
            ));
        }
    }

    let data = QuantizedMatrix::new(x, params.max_bins);
    let base_score = base_margin(y);
    let mut margins = vec![base_score; y.len()];
    let mut eval_margins = eval_set
        .as_ref()
        .map(|e| vec![base_score; e.y.len()])
        .unwrap_or_default();

    let metric = fit_params.eval_metric;
    let mut history = EvalHistory::new(metric.higher_is_better());
    let mut early_stopping = eval_set.is_some();
    let mut grads = vec![0.0; y.len()];
    let mut hess = vec![0.0; y.len()];
    let mut trees = Vec::with_capacity(params.n_estimators);

    for round in 0..params.n_estimators {
        for (i, (&m, &label)) in margins.iter().zip(y).enumerate() {
            let p = sigmoid(m);
            grads[i] = p - f64::from(u8::from(label));
            hess[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
        }
        let ctx = GrowContext {
            data: &data,
            grads: &grads,
            hess: &hess,
            params,
        };
        let tree = grow(&ctx);
        update_margins(&mut margins, x, &tree, params.learning_rate);

        if let (true, Some(eval)) = (early_stopping, &eval_set) {
            update_margins(&mut eval_margins, eval.x, &tree, params.learning_rate);
            let probs: Vec<f64> = eval_margins.iter().map(|&m| sigmoid(m)).collect();
            match metric.evaluate(eval.y, &probs) {
                Some(value) => {
                    if fit_params.verbose {
                        log::debug!("[{}] {} round {}: {:.5}", learner, metric, round, value);
                    }
                    history.record(value);
                }
                None => {
                    log::warn!(
                        "{} is undefined on the validation set, early stopping disabled",
                        metric
                    );
                    early_stopping = false;
                }
            }
        }
        trees.push(tree);

        if early_stopping && history.should_early_stop(fit_params.early_stopping_rounds) {
            log::info!(
                "[{}] early stopping at round {}, best round {}",
                learner,
                round,
                history.best_round().unwrap_or(round)
            );
            break;
        }
    }

    let best_iteration = if early_stopping {
        history.best_round()
    } else {
        None
    };
    if let Some(best) = best_iteration {
        trees.truncate(best + 1);
    }

    Ok(Classifier {
        learner,
        columns: x.column_names(),
        base_score,
        learning_rate: params.learning_rate,
        trees,
        best_iteration,
        best_score: if early_stopping {
            history.best_value()
        } else {
            None
        },
    })
}
