//! The Hybrid-VAEP estimator
//!
//! Four classifiers, `scores` and `concedes` each trained on the standard
//! feature set (the result of the anchor action included) and on the
//! result-free one. Rating an action combines all four through
//! [`formula::value`].

pub mod formula;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::features::{self, FeatureFn};
use crate::labels::{self, LabelFn};
use crate::learners::{self, Booster, Classifier, EvalSet};
use crate::spadl::{self, Game, RawAction};
use crate::table::{FeatureTable, LabelTable};
use crate::training::{self, Evaluation};
use crate::{Result, TrainingConfig, VaepError};

pub use formula::Rating;

/// Label columns the estimator is trained on, in fitting order
pub const LABELS: [&str; 2] = ["scores", "concedes"];

/// Lifecycle of an estimator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitState {
    Unfitted,
    Fitting,
    Fitted,
}

/// The classifiers of one label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPair {
    pub standard: Classifier,
    pub resultfree: Classifier,
}

/// All four fitted classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSet {
    pub scores: ModelPair,
    pub concedes: ModelPair,
}

impl ModelSet {
    fn pair(&self, label: &str) -> &ModelPair {
        if label == "scores" {
            &self.scores
        } else {
            &self.concedes
        }
    }
}

/// Probabilities of every row under the four classifiers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probabilities {
    pub scores_standard: Vec<f64>,
    pub scores_resultfree: Vec<f64>,
    pub concedes_standard: Vec<f64>,
    pub concedes_resultfree: Vec<f64>,
}

impl Probabilities {
    pub fn len(&self) -> usize {
        self.scores_standard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores_standard.is_empty()
    }
}

/// Brier score and AUROC of both feature sets of one label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelScores {
    pub standard: Evaluation,
    pub resultfree: Evaluation,
}

/// Evaluation of a fitted estimator
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scores {
    pub scores: LabelScores,
    pub concedes: LabelScores,
}

impl fmt::Display for Scores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, s) in [("scores", &self.scores), ("concedes", &self.concedes)] {
            writeln!(f, "{:<9} standard   {}", label, s.standard)?;
            writeln!(f, "{:<9} resultfree {}", label, s.resultfree)?;
        }
        Ok(())
    }
}

/// Hybrid-VAEP estimator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridVaep {
    /// Feature functions that leave the result of the anchor out
    xfns: Vec<FeatureFn>,
    /// Feature functions describing the result, standard set only
    result_xfns: Vec<FeatureFn>,
    /// Actions preceding the anchor in a game state
    window_size: usize,
    yfns: Vec<LabelFn>,
    state: FitState,
    models: Option<ModelSet>,
}

impl Default for HybridVaep {
    fn default() -> Self {
        HybridVaep::new(
            features::xfns_default(),
            features::xfns_result_default(),
            features::DEFAULT_WINDOW_SIZE,
        )
    }
}

impl HybridVaep {
    pub fn new(xfns: Vec<FeatureFn>, result_xfns: Vec<FeatureFn>, window_size: usize) -> Self {
        HybridVaep {
            xfns,
            result_xfns,
            window_size,
            yfns: labels::yfns_default(),
            state: FitState::Unfitted,
            models: None,
        }
    }

    /// Replace the label functions used by [`compute_labels`](Self::compute_labels)
    pub fn with_labels(mut self, yfns: Vec<LabelFn>) -> Self {
        self.yfns = yfns;
        self
    }

    pub fn state(&self) -> FitState {
        self.state
    }

    pub fn is_fitted(&self) -> bool {
        self.state == FitState::Fitted
    }

    pub fn models(&self) -> Option<&ModelSet> {
        self.models.as_ref()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Result-free functions followed by the result functions
    pub fn standard_fns(&self) -> Vec<FeatureFn> {
        self.xfns.iter().chain(&self.result_xfns).copied().collect()
    }

    pub fn resultfree_fns(&self) -> &[FeatureFn] {
        &self.xfns
    }

    pub fn standard_columns(&self) -> Vec<String> {
        features::expected_columns(&self.standard_fns(), self.window_size)
    }

    pub fn resultfree_columns(&self) -> Vec<String> {
        features::expected_columns(&self.xfns, self.window_size)
    }

    /// Standard feature table of every action of a game
    pub fn compute_features(&self, game: &Game, actions: &[RawAction]) -> Result<FeatureTable> {
        let actions = spadl::add_names(actions)?;
        let states = features::build_states(&actions, self.window_size);
        let states = features::normalize_direction(states, game.home_team_id);
        features::extract(&states, &self.standard_fns())
    }

    /// Label table of every action of a game
    pub fn compute_labels(&self, _game: &Game, actions: &[RawAction]) -> Result<LabelTable> {
        let actions = spadl::add_names(actions)?;
        labels::derive(&actions, &self.yfns)
    }

    /// Train all four classifiers with the backend named by `training.learner`.
    ///
    /// Any previous models are dropped first; on failure the estimator is
    /// left unfitted.
    pub fn fit(&mut self, x: &FeatureTable, y: &LabelTable, training: &TrainingConfig) -> Result<()> {
        self.begin_fit();
        let result = learners::backend(training.learner)
            .and_then(|backend| self.train_models(x, y, backend.as_ref(), training));
        self.finish_fit(result)
    }

    /// [`fit`](Self::fit) with an explicit backend instance
    pub fn fit_with_backend(
        &mut self,
        x: &FeatureTable,
        y: &LabelTable,
        backend: &dyn Booster,
        training: &TrainingConfig,
    ) -> Result<()> {
        self.begin_fit();
        let result = self.train_models(x, y, backend, training);
        self.finish_fit(result)
    }

    fn begin_fit(&mut self) {
        self.models = None;
        self.state = FitState::Fitting;
        log::debug!("Estimator state: {:?}", self.state);
    }

    fn finish_fit(&mut self, result: Result<ModelSet>) -> Result<()> {
        match result {
            Ok(models) => {
                self.models = Some(models);
                self.state = FitState::Fitted;
                log::debug!("Estimator state: {:?}", self.state);
                Ok(())
            }
            Err(e) => {
                self.state = FitState::Unfitted;
                log::warn!("Fit failed, estimator left unfitted: {}", e);
                Err(e)
            }
        }
    }

    fn check_feature_sets(&self) -> Result<(Vec<String>, Vec<String>)> {
        let standard = self.standard_columns();
        let resultfree = self.resultfree_columns();
        let standard_set: HashSet<&String> = standard.iter().collect();
        let is_strict_superset = resultfree.iter().all(|c| standard_set.contains(c))
            && standard.len() > resultfree.len();
        if !is_strict_superset {
            return Err(VaepError::InvalidParameter(
                "the result feature functions add no columns to the result-free set".to_string(),
            ));
        }
        Ok((standard, resultfree))
    }

    fn require_columns(x: &FeatureTable, columns: &[String]) -> Result<()> {
        let missing = x.missing_columns(columns);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(VaepError::MissingFeatures(missing))
        }
    }

    fn train_models(
        &self,
        x: &FeatureTable,
        y: &LabelTable,
        backend: &dyn Booster,
        training: &TrainingConfig,
    ) -> Result<ModelSet> {
        let (standard_cols, resultfree_cols) = self.check_feature_sets()?;
        Self::require_columns(x, &standard_cols)?;
        let missing_labels: Vec<String> = LABELS
            .iter()
            .filter(|l| !y.has_column(l))
            .map(|l| l.to_string())
            .collect();
        if !missing_labels.is_empty() {
            return Err(VaepError::MissingLabels(missing_labels));
        }
        if y.n_rows() != x.n_rows() {
            return Err(VaepError::ShapeMismatch {
                what: "labels table".to_string(),
                expected: x.n_rows(),
                actual: y.n_rows(),
            });
        }

        let tree_params = training
            .tree_params
            .merge_onto(backend.default_tree_params());
        let fit_params = training.fit_params.merge_onto(backend.default_fit_params());
        let split = training::train_validation_split(x.n_rows(), training.val_size, training.seed)?;

        let mut variants = Vec::with_capacity(2);
        for (columns, name) in [(&standard_cols, "standard"), (&resultfree_cols, "resultfree")] {
            let table = x.select(columns)?;
            variants.push((
                table.take_rows(&split.train),
                table.take_rows(&split.validation),
                name,
            ));
        }

        let mut fitted = Vec::with_capacity(4);
        for label in LABELS {
            let column = y
                .column(label)
                .ok_or_else(|| VaepError::MissingLabels(vec![label.to_string()]))?;
            let y_train: Vec<bool> = split.train.iter().map(|&i| column[i]).collect();
            let y_val: Vec<bool> = split.validation.iter().map(|&i| column[i]).collect();

            for (x_train, x_val, variant) in &variants {
                let eval_set = (!y_val.is_empty()).then_some(EvalSet { x: x_val, y: &y_val });
                log::info!(
                    "Fitting {} model for {}-{} on {} columns ({} train rows, {})",
                    backend.learner(),
                    label,
                    variant,
                    x_train.n_cols(),
                    x_train.n_rows(),
                    if eval_set.is_some() {
                        "early stopping"
                    } else {
                        "no validation set"
                    }
                );
                let model = backend.fit(x_train, &y_train, eval_set, &tree_params, &fit_params)?;
                log::info!(
                    "Fitted {}-{}: {} trees{}",
                    label,
                    variant,
                    model.n_trees(),
                    model
                        .best_iteration
                        .map(|b| format!(", best iteration {}", b))
                        .unwrap_or_default()
                );
                fitted.push(model);
            }
        }

        let mut fitted = fitted.into_iter();
        let mut next = || {
            fitted
                .next()
                .ok_or_else(|| VaepError::InvalidParameter("missing fitted model".to_string()))
        };
        Ok(ModelSet {
            scores: ModelPair {
                standard: next()?,
                resultfree: next()?,
            },
            concedes: ModelPair {
                standard: next()?,
                resultfree: next()?,
            },
        })
    }

    fn fitted_models(&self) -> Result<&ModelSet> {
        match (&self.state, &self.models) {
            (FitState::Fitted, Some(models)) => Ok(models),
            _ => Err(VaepError::NotFitted),
        }
    }

    /// Positive-class probabilities of every row under the four classifiers
    pub fn estimate_probabilities(&self, x: &FeatureTable) -> Result<Probabilities> {
        let models = self.fitted_models()?;
        Self::require_columns(x, &self.standard_columns())?;
        Ok(Probabilities {
            scores_standard: models.scores.standard.predict_proba(x)?,
            scores_resultfree: models.scores.resultfree.predict_proba(x)?,
            concedes_standard: models.concedes.standard.predict_proba(x)?,
            concedes_resultfree: models.concedes.resultfree.predict_proba(x)?,
        })
    }

    /// Rate every action of a game.
    ///
    /// `features` must be the standard feature table of exactly these
    /// actions; it is computed when absent.
    pub fn rate(
        &self,
        game: &Game,
        actions: &[RawAction],
        features: Option<&FeatureTable>,
    ) -> Result<Vec<Rating>> {
        self.fitted_models()?;
        let named = spadl::add_names(actions)?;
        let computed;
        let features = match features {
            Some(f) => f,
            None => {
                computed = self.compute_features(game, actions)?;
                &computed
            }
        };
        if features.n_rows() != named.len() {
            return Err(VaepError::ShapeMismatch {
                what: "features table".to_string(),
                expected: named.len(),
                actual: features.n_rows(),
            });
        }

        let p = self.estimate_probabilities(features)?;
        formula::value(
            &named,
            &p.scores_standard,
            &p.scores_resultfree,
            &p.concedes_standard,
            &p.concedes_resultfree,
        )
    }

    /// Brier score and AUROC of every classifier against the labels
    pub fn score(&self, x: &FeatureTable, y: &LabelTable) -> Result<Scores> {
        let models = self.fitted_models()?;
        Self::require_columns(x, &self.standard_columns())?;
        let evaluate = |label: &str| -> Result<LabelScores> {
            let truth = y
                .column(label)
                .ok_or_else(|| VaepError::MissingLabels(vec![label.to_string()]))?;
            let pair = models.pair(label);
            Ok(LabelScores {
                standard: training::evaluate(label, truth, &pair.standard.predict_proba(x)?)?,
                resultfree: training::evaluate(label, truth, &pair.resultfree.predict_proba(x)?)?,
            })
        };
        Ok(Scores {
            scores: evaluate("scores")?,
            concedes: evaluate("concedes")?,
        })
    }

    /// Write the estimator, models included, as JSON
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string(self)?)?;
        log::info!("Saved estimator to {}", path.display());
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learners::{EvalMetric, FitParams, Learner, TreeParams};
    use crate::spadl::{ActionResult, ActionType, BodyPart};
    use crate::{GameId, TeamId};
    use std::cell::RefCell;

    /// Records every call and fails on call number `fail_at`
    struct RecordingBooster {
        calls: RefCell<Vec<(usize, bool)>>,
        fail_at: Option<usize>,
    }

    impl RecordingBooster {
        fn new(fail_at: Option<usize>) -> Self {
            RecordingBooster {
                calls: RefCell::new(Vec::new()),
                fail_at,
            }
        }
    }

    impl Booster for RecordingBooster {
        fn learner(&self) -> Learner {
            Learner::DepthWise
        }

        fn default_tree_params(&self) -> TreeParams {
            TreeParams {
                n_estimators: 1,
                learning_rate: 0.1,
                max_depth: 1,
                num_leaves: 2,
                min_child_weight: 0.0,
                min_samples_leaf: 1,
                reg_lambda: 1.0,
                gamma: 0.0,
                max_bins: 16,
            }
        }

        fn default_fit_params(&self) -> FitParams {
            FitParams {
                eval_metric: EvalMetric::Auc,
                verbose: false,
                early_stopping_rounds: 10,
            }
        }

        fn fit(
            &self,
            x: &FeatureTable,
            _y: &[bool],
            eval_set: Option<EvalSet<'_>>,
            _tree_params: &TreeParams,
            _fit_params: &FitParams,
        ) -> Result<Classifier> {
            let call = self.calls.borrow().len();
            self.calls.borrow_mut().push((x.n_cols(), eval_set.is_some()));
            if Some(call) == self.fail_at {
                return Err(VaepError::InvalidParameter("backend failure".to_string()));
            }
            Ok(Classifier {
                learner: Learner::DepthWise,
                columns: x.column_names(),
                base_score: 0.0,
                learning_rate: 0.1,
                trees: Vec::new(),
                best_iteration: None,
                best_score: None,
            })
        }
    }

    fn raw(t: f64, team: i64, type_id: u8, result_id: u8) -> RawAction {
        RawAction {
            game_id: GameId(1),
            action_id: (t * 10.0) as i64,
            period_id: 1,
            time_seconds: t,
            team_id: TeamId(team),
            player_id: None,
            start_x: 50.0,
            start_y: 34.0,
            end_x: 60.0,
            end_y: 30.0,
            type_id: Some(type_id),
            result_id: Some(result_id),
            bodypart_id: Some(BodyPart::Foot.code()),
        }
    }

    fn game() -> (Game, Vec<RawAction>) {
        let pass = ActionType::Pass.code();
        let shot = ActionType::Shot.code();
        let ok = ActionResult::Success.code();
        let fail = ActionResult::Fail.code();
        let actions = vec![
            raw(1.0, 1, pass, ok),
            raw(2.0, 1, pass, ok),
            raw(3.0, 1, shot, ok),
            raw(4.0, 2, pass, ok),
            raw(5.0, 2, pass, fail),
            raw(6.0, 1, shot, fail),
            raw(7.0, 2, pass, ok),
            raw(8.0, 2, shot, ok),
        ];
        let game = Game {
            game_id: GameId(1),
            home_team_id: TeamId(1),
            away_team_id: Some(TeamId(2)),
            game_date: None,
        };
        (game, actions)
    }

    fn training(val_size: f64) -> TrainingConfig {
        TrainingConfig {
            val_size,
            seed: Some(3),
            ..Default::default()
        }
    }

    #[test]
    fn test_rate_before_fit_is_not_fitted() {
        let (game, actions) = game();
        let vaep = HybridVaep::default();
        assert_eq!(vaep.state(), FitState::Unfitted);
        assert!(matches!(vaep.rate(&game, &actions, None), Err(VaepError::NotFitted)));
        let x = vaep.compute_features(&game, &actions).unwrap();
        assert!(matches!(vaep.estimate_probabilities(&x), Err(VaepError::NotFitted)));
    }

    #[test]
    fn test_fit_trains_four_models_on_their_columns() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        let booster = RecordingBooster::new(None);

        vaep.fit_with_backend(&x, &y, &booster, &training(0.25)).unwrap();
        assert!(vaep.is_fitted());

        let standard = vaep.standard_columns().len();
        let resultfree = vaep.resultfree_columns().len();
        let calls = booster.calls.borrow();
        let widths: Vec<usize> = calls.iter().map(|c| c.0).collect();
        assert_eq!(widths, vec![standard, resultfree, standard, resultfree]);
        assert!(calls.iter().all(|c| c.1));
    }

    #[test]
    fn test_zero_val_size_passes_no_eval_set() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        let booster = RecordingBooster::new(None);

        vaep.fit_with_backend(&x, &y, &booster, &training(0.0)).unwrap();
        assert!(vaep.is_fitted());
        assert!(booster.calls.borrow().iter().all(|c| !c.1));
    }

    #[test]
    fn test_failed_fit_keeps_no_partial_models() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();

        vaep.fit_with_backend(&x, &y, &RecordingBooster::new(None), &training(0.0))
            .unwrap();
        assert!(vaep.models().is_some());

        let failing = RecordingBooster::new(Some(2));
        assert!(vaep.fit_with_backend(&x, &y, &failing, &training(0.0)).is_err());
        assert_eq!(vaep.state(), FitState::Unfitted);
        assert!(vaep.models().is_none());
        assert_eq!(failing.calls.borrow().len(), 3);
        assert!(matches!(vaep.rate(&game, &actions, Some(&x)), Err(VaepError::NotFitted)));
    }

    #[test]
    fn test_fit_reports_missing_columns() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        let keep: Vec<String> = x
            .column_names()
            .into_iter()
            .filter(|c| c != "start_x_a0" && c != "end_y_a1")
            .collect();
        let partial = x.select(&keep).unwrap();

        let err = vaep
            .fit_with_backend(&partial, &y, &RecordingBooster::new(None), &training(0.0))
            .unwrap_err();
        match err {
            VaepError::MissingFeatures(cols) => {
                assert_eq!(cols.len(), 2);
                assert!(cols.contains(&"start_x_a0".to_string()));
                assert!(cols.contains(&"end_y_a1".to_string()));
            }
            other => panic!("unexpected error {other}"),
        }
        assert_eq!(vaep.state(), FitState::Unfitted);
    }

    #[test]
    fn test_fit_requires_result_columns() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::new(features::xfns_default(), Vec::new(), 1);
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        let result = vaep.fit_with_backend(&x, &y, &RecordingBooster::new(None), &training(0.0));
        assert!(matches!(result, Err(VaepError::InvalidParameter(_))));
    }

    #[test]
    fn test_fit_requires_both_labels() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = labels::derive(&spadl::add_names(&actions).unwrap(), &[LabelFn::scores()]).unwrap();
        let result = vaep.fit_with_backend(&x, &y, &RecordingBooster::new(None), &training(0.0));
        assert!(matches!(result, Err(VaepError::MissingLabels(ref l)) if l == &["concedes".to_string()]));
    }

    #[test]
    fn test_rate_after_fit() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        vaep.fit_with_backend(&x, &y, &RecordingBooster::new(None), &training(0.0))
            .unwrap();

        let ratings = vaep.rate(&game, &actions, None).unwrap();
        assert_eq!(ratings.len(), actions.len());
        // trees-free models predict 0.5 everywhere
        assert_eq!(ratings[0].vaep_value, 0.0);
        let with_features = vaep.rate(&game, &actions, Some(&x)).unwrap();
        assert_eq!(ratings, with_features);
    }

    #[test]
    fn test_rate_rejects_mismatched_features() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        vaep.fit_with_backend(&x, &y, &RecordingBooster::new(None), &training(0.0))
            .unwrap();
        let fewer = x.take_rows(&[0, 1]);
        assert!(matches!(
            vaep.rate(&game, &actions, Some(&fewer)),
            Err(VaepError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_save_and_load() {
        let (game, actions) = game();
        let mut vaep = HybridVaep::default();
        let x = vaep.compute_features(&game, &actions).unwrap();
        let y = vaep.compute_labels(&game, &actions).unwrap();
        vaep.fit_with_backend(&x, &y, &RecordingBooster::new(None), &training(0.0))
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("vaep.json");
        vaep.save(&path).unwrap();
        let loaded = HybridVaep::load(&path).unwrap();
        assert!(loaded.is_fitted());
        assert_eq!(loaded.models(), vaep.models());
        assert_eq!(loaded.standard_columns(), vaep.standard_columns());
    }
}
