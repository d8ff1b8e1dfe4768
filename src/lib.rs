//! Hybrid-VAEP action valuation for soccer
//!
//! Values every on-ball action by how it changes the short-term probability
//! that the acting team scores and concedes. Four gradient-boosted
//! classifiers (scores/concedes × standard/result-free feature sets) are
//! trained on windowed game states and combined by the hybrid value formula.

pub mod features;
pub mod labels;
pub mod learners;
pub mod spadl;
pub mod table;
pub mod training;
pub mod vaep;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::features::FeatureFn;
use crate::labels::StopRule;
use crate::learners::{FitParamOverrides, Learner, TreeParamOverrides};

pub use spadl::{Action, Game, RawAction};
pub use table::{FeatureTable, LabelTable};
pub use vaep::{HybridVaep, Rating};

/// Unique identifier for a team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TeamId(pub i64);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GameId(pub i64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Game({})", self.0)
    }
}

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum VaepError {
    #[error("Schema error in action {action_id}: {message}")]
    Schema { action_id: i64, message: String },

    #[error("{} are not available in the features table", .0.join(" and "))]
    MissingFeatures(Vec<String>),

    #[error("{} are not available in the labels table", .0.join(" and "))]
    MissingLabels(Vec<String>),

    #[error("A {0} learner is not supported")]
    UnsupportedLearner(String),

    #[error("The {0} learner is not available in this build")]
    BackendUnavailable(Learner),

    #[error("Model not fitted - call `fit` first")]
    NotFitted,

    #[error("Shape mismatch: {what} has {actual} rows, expected {expected}")]
    ShapeMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{metric} is undefined for {label}: {reason}")]
    UndefinedMetric {
        metric: String,
        label: String,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, VaepError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub labels: LabelConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Number of actions preceding the anchor action in a game state
    pub window_size: usize,
    /// Feature functions that do not describe the result of an action
    pub xfns: Vec<FeatureFn>,
    /// Feature functions describing the result, only in the standard set
    pub result_xfns: Vec<FeatureFn>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            window_size: features::DEFAULT_WINDOW_SIZE,
            xfns: features::xfns_default(),
            result_xfns: features::xfns_result_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    /// Number of actions (the labelled one included) scanned for a goal
    pub lookahead: usize,
    /// Events that end the scan before a goal is found
    #[serde(default)]
    pub stop_on: Vec<StopRule>,
}

impl Default for LabelConfig {
    fn default() -> Self {
        LabelConfig {
            lookahead: labels::DEFAULT_LOOKAHEAD,
            stop_on: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub learner: Learner,
    /// Fraction of the states held out for early stopping (0 disables it)
    pub val_size: f64,
    /// Seed for the train/validation permutation
    pub seed: Option<u64>,
    #[serde(default)]
    pub tree_params: TreeParamOverrides,
    #[serde(default)]
    pub fit_params: FitParamOverrides,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            learner: Learner::DepthWise,
            val_size: 0.25,
            seed: None,
            tree_params: TreeParamOverrides::default(),
            fit_params: FitParamOverrides::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub games_path: String,
    pub actions_path: String,
    pub model_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            games_path: "data/games.json".to_string(),
            actions_path: "data/actions.json".to_string(),
            model_path: "model/hybrid_vaep.json".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            VaepError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        toml::from_str(&content)
            .map_err(|e| VaepError::Config(format!("Failed to parse config: {}", e)))
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| VaepError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Build an estimator with the feature and label settings of this config
    pub fn estimator(&self) -> HybridVaep {
        HybridVaep::new(
            self.features.xfns.clone(),
            self.features.result_xfns.clone(),
            self.features.window_size,
        )
        .with_labels(labels::LabelFn::defaults_with(
            self.labels.lookahead,
            &self.labels.stop_on,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.training.seed = Some(7);
        config.labels.stop_on = vec![StopRule::Clearance];
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.features.window_size, config.features.window_size);
        assert_eq!(loaded.features.xfns, config.features.xfns);
        assert_eq!(loaded.training.seed, Some(7));
        assert_eq!(loaded.labels.stop_on, vec![StopRule::Clearance]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [training]
            learner = "leafwise"
            val_size = 0.1
            "#,
        )
        .unwrap();
        assert_eq!(config.training.learner, Learner::LeafWise);
        assert_eq!(config.features.window_size, features::DEFAULT_WINDOW_SIZE);
        assert_eq!(config.labels.lookahead, labels::DEFAULT_LOOKAHEAD);
    }

    #[test]
    fn test_missing_features_message_lists_columns() {
        let err = VaepError::MissingFeatures(vec!["start_x_a0".into(), "end_x_a0".into()]);
        assert_eq!(
            err.to_string(),
            "start_x_a0 and end_x_a0 are not available in the features table"
        );
    }
}
