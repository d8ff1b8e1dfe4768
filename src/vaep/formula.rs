//! The Hybrid-VAEP value formula
//!
//! An action is valued against the state before it. The baseline comes from
//! the standard (result-aware) probabilities of the previous state, which
//! already know how the previous action ended. The current state uses the
//! result-free probabilities, so the value of an action does not depend on
//! its own outcome.

use serde::{Deserialize, Serialize};

use crate::spadl::{Action, ActionType};
use crate::{Result, VaepError};

/// Scoring probability of a penalty kick
pub const PENALTY_SCORE_PROB: f64 = 0.792453;

/// Scoring probability of a corner
pub const CORNER_SCORE_PROB: f64 = 0.046500;

/// The baseline is dropped when the previous action is longer ago than this
pub const MAX_BASELINE_GAP_SECONDS: f64 = 10.0;

/// The value of one action
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub offensive_value: f64,
    pub defensive_value: f64,
    pub vaep_value: f64,
}

/// Baselines of every action: the previous state's (scores, concedes)
/// probabilities from the acting team's point of view.
fn baselines(
    actions: &[Action],
    p_scores: &[f64],
    p_concedes: &[f64],
) -> Vec<(f64, f64)> {
    actions
        .iter()
        .enumerate()
        .map(|(i, action)| {
            // the first action of a game is its own predecessor
            let prev = match i.checked_sub(1) {
                Some(j) if actions[j].game_id == action.game_id => j,
                _ => i,
            };
            let prev_action = &actions[prev];

            let (mut scores, mut concedes) = if prev_action.team_id == action.team_id {
                (p_scores[prev], p_concedes[prev])
            } else {
                (p_concedes[prev], p_scores[prev])
            };

            let too_long = (action.time_seconds - prev_action.time_seconds).abs()
                > MAX_BASELINE_GAP_SECONDS;
            if too_long || (prev != i && prev_action.is_goal()) {
                scores = 0.0;
                concedes = 0.0;
            }

            if action.action_type == ActionType::ShotPenalty {
                scores = PENALTY_SCORE_PROB;
            } else if action.action_type.is_corner() {
                scores = CORNER_SCORE_PROB;
            }
            (scores, concedes)
        })
        .collect()
}

/// Value every action of an ordered sequence.
///
/// `offensive = P_free(scores) - baseline(scores)` and
/// `defensive = -(P_free(concedes) - baseline(concedes))`, the baselines
/// taken from the standard probabilities of the preceding state.
pub fn value(
    actions: &[Action],
    p_scores_standard: &[f64],
    p_scores_resultfree: &[f64],
    p_concedes_standard: &[f64],
    p_concedes_resultfree: &[f64],
) -> Result<Vec<Rating>> {
    let n = actions.len();
    for (what, len) in [
        ("scores (standard)", p_scores_standard.len()),
        ("scores (result-free)", p_scores_resultfree.len()),
        ("concedes (standard)", p_concedes_standard.len()),
        ("concedes (result-free)", p_concedes_resultfree.len()),
    ] {
        if len != n {
            return Err(VaepError::ShapeMismatch {
                what: format!("{} probabilities", what),
                expected: n,
                actual: len,
            });
        }
    }

    let ratings = baselines(actions, p_scores_standard, p_concedes_standard)
        .into_iter()
        .enumerate()
        .map(|(i, (prev_scores, prev_concedes))| {
            let offensive_value = p_scores_resultfree[i] - prev_scores;
            let defensive_value = -(p_concedes_resultfree[i] - prev_concedes);
            Rating {
                offensive_value,
                defensive_value,
                vaep_value: offensive_value + defensive_value,
            }
        })
        .collect();
    Ok(ratings)
}
