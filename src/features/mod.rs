//! Feature extraction
//!
//! Turns game states into fixed-width numeric rows. Every feature function
//! knows its column names for a given window size, so the schema can be
//! checked before any extraction runs.

pub mod gamestate;
pub mod transforms;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::table::FeatureTable;
use crate::Result;

pub use gamestate::{build_states, normalize_direction, GameState, GameStates};

/// Default number of actions preceding the anchor in a game state
pub const DEFAULT_WINDOW_SIZE: usize = 2;

/// A feature transformer over a sequence of game states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeatureFn {
    /// One-hot action type per slot
    #[serde(rename = "actiontype_onehot")]
    ActionTypeOnehot,
    /// One-hot result per slot
    #[serde(rename = "result_onehot")]
    ResultOnehot,
    /// One-hot (action type, result) pair per slot
    #[serde(rename = "actiontype_result_onehot")]
    ActionTypeResultOnehot,
    /// One-hot body part per slot
    #[serde(rename = "bodypart_onehot")]
    BodypartOnehot,
    /// Period and clock per slot
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "startlocation")]
    StartLocation,
    #[serde(rename = "endlocation")]
    EndLocation,
    /// Distance and angle from the start location to the opponent's goal
    #[serde(rename = "startpolar")]
    StartPolar,
    /// Distance and angle from the end location to the opponent's goal
    #[serde(rename = "endpolar")]
    EndPolar,
    /// Displacement of the ball per slot
    #[serde(rename = "movement")]
    Movement,
    /// Whether each history slot was performed by the anchor's team
    #[serde(rename = "team")]
    Team,
    /// Seconds elapsed between each history slot and the anchor
    #[serde(rename = "time_delta")]
    TimeDelta,
    /// Distance between where each history slot ended and the anchor started
    #[serde(rename = "space_delta")]
    SpaceDelta,
    /// Goals scored so far by the anchor's team and its opponent
    #[serde(rename = "goalscore")]
    GoalScore,
}

impl FeatureFn {
    pub const ALL: &'static [FeatureFn] = &[
        FeatureFn::ActionTypeOnehot,
        FeatureFn::ResultOnehot,
        FeatureFn::ActionTypeResultOnehot,
        FeatureFn::BodypartOnehot,
        FeatureFn::Time,
        FeatureFn::StartLocation,
        FeatureFn::EndLocation,
        FeatureFn::StartPolar,
        FeatureFn::EndPolar,
        FeatureFn::Movement,
        FeatureFn::Team,
        FeatureFn::TimeDelta,
        FeatureFn::SpaceDelta,
        FeatureFn::GoalScore,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureFn::ActionTypeOnehot => "actiontype_onehot",
            FeatureFn::ResultOnehot => "result_onehot",
            FeatureFn::ActionTypeResultOnehot => "actiontype_result_onehot",
            FeatureFn::BodypartOnehot => "bodypart_onehot",
            FeatureFn::Time => "time",
            FeatureFn::StartLocation => "startlocation",
            FeatureFn::EndLocation => "endlocation",
            FeatureFn::StartPolar => "startpolar",
            FeatureFn::EndPolar => "endpolar",
            FeatureFn::Movement => "movement",
            FeatureFn::Team => "team",
            FeatureFn::TimeDelta => "time_delta",
            FeatureFn::SpaceDelta => "space_delta",
            FeatureFn::GoalScore => "goalscore",
        }
    }

    /// Whether the columns describe the outcome of the actions
    pub fn describes_result(&self) -> bool {
        matches!(
            self,
            FeatureFn::ResultOnehot | FeatureFn::ActionTypeResultOnehot
        )
    }

    /// The columns this function produces for states with `window_size` history slots
    pub fn columns(&self, window_size: usize) -> Vec<String> {
        transforms::column_names(*self, window_size)
    }

    /// Apply the function to every state
    pub fn apply(&self, states: &GameStates) -> Result<FeatureTable> {
        let mut table = FeatureTable::new(states.len());
        for (name, values) in transforms::compute(*self, states) {
            table.push_column(name, values)?;
        }
        Ok(table)
    }
}

impl fmt::Display for FeatureFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Feature functions that leave the result of the actions out
pub fn xfns_default() -> Vec<FeatureFn> {
    vec![
        FeatureFn::ActionTypeOnehot,
        FeatureFn::BodypartOnehot,
        FeatureFn::Time,
        FeatureFn::StartLocation,
        FeatureFn::EndLocation,
        FeatureFn::StartPolar,
        FeatureFn::EndPolar,
        FeatureFn::Movement,
        FeatureFn::Team,
        FeatureFn::TimeDelta,
        FeatureFn::SpaceDelta,
        FeatureFn::GoalScore,
    ]
}

/// Feature functions describing the result of the actions
pub fn xfns_result_default() -> Vec<FeatureFn> {
    vec![FeatureFn::ResultOnehot, FeatureFn::ActionTypeResultOnehot]
}

/// Apply every function to the states and concatenate the columns in order.
pub fn extract(states: &GameStates, feature_fns: &[FeatureFn]) -> Result<FeatureTable> {
    let mut table = FeatureTable::new(states.len());
    for f in feature_fns {
        table.hstack(f.apply(states)?)?;
    }
    Ok(table)
}

/// The columns `extract` produces for these functions, without extracting.
pub fn expected_columns(feature_fns: &[FeatureFn], window_size: usize) -> Vec<String> {
    feature_fns
        .iter()
        .flat_map(|f| f.columns(window_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::gamestate::tests::action;
    use super::*;
    use std::collections::HashSet;

    fn states(window: usize) -> GameStates {
        let actions = vec![
            action(1, 1, 1.0, 10.0, 10.0),
            action(1, 2, 2.0, 20.0, 10.0),
            action(1, 1, 4.0, 30.0, 15.0),
            action(1, 1, 7.0, 40.0, 20.0),
        ];
        build_states(&actions, window)
    }

    #[test]
    fn test_expected_columns_match_extraction() {
        for window in 0..4 {
            let s = states(window);
            let table = extract(&s, FeatureFn::ALL).unwrap();
            assert_eq!(table.column_names(), expected_columns(FeatureFn::ALL, window));
            assert_eq!(table.n_rows(), 4);
        }
    }

    #[test]
    fn test_columns_are_unique() {
        for window in [0, 1, 2, 5, 12] {
            let cols = expected_columns(FeatureFn::ALL, window);
            let unique: HashSet<_> = cols.iter().collect();
            assert_eq!(unique.len(), cols.len(), "window {}", window);
        }
    }

    #[test]
    fn test_standard_is_strict_superset() {
        let free = expected_columns(&xfns_default(), 2);
        let mut standard_fns = xfns_default();
        standard_fns.extend(xfns_result_default());
        let standard = expected_columns(&standard_fns, 2);

        let standard_set: HashSet<_> = standard.iter().collect();
        assert!(free.iter().all(|c| standard_set.contains(c)));
        assert!(standard.len() > free.len());
    }

    #[test]
    fn test_extract_is_idempotent() {
        let s = states(2);
        let first = extract(&s, FeatureFn::ALL).unwrap();
        let second = extract(&s, FeatureFn::ALL).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_default_sets_are_split_by_result() {
        assert!(xfns_default().iter().all(|f| !f.describes_result()));
        assert!(xfns_result_default().iter().all(|f| f.describes_result()));
    }

    #[test]
    fn test_feature_fn_serde_names() {
        for f in FeatureFn::ALL {
            let json = serde_json::to_string(f).unwrap();
            assert_eq!(json, format!("\"{}\"", f.name()));
        }
    }
}
