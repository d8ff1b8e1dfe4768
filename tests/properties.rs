//! Property tests over random action sequences

mod common;

use common::{raw, AWAY, HOME};
use hybrid_vaep::features::{self, FeatureFn};
use hybrid_vaep::labels;
use hybrid_vaep::spadl::{self, Action, ActionResult, ActionType, RawAction};
use hybrid_vaep::vaep::formula;
use proptest::prelude::*;

/// (starts a new game, home team acts, x, y, is a shot, shot succeeds)
type Step = (bool, bool, f64, f64, bool, bool);

fn step() -> impl Strategy<Value = Step> {
    (
        prop::bool::weighted(0.1),
        any::<bool>(),
        0.0f64..105.0,
        0.0f64..68.0,
        prop::bool::weighted(0.2),
        any::<bool>(),
    )
}

fn to_actions(steps: &[Step]) -> Vec<Action> {
    let mut game_id = 1;
    let mut raws: Vec<RawAction> = Vec::with_capacity(steps.len());
    for (i, &(new_game, home, x, y, shot, success)) in steps.iter().enumerate() {
        if new_game && i > 0 {
            game_id += 1;
        }
        let team = if home { HOME } else { AWAY };
        let (action_type, result) = if shot {
            (ActionType::Shot, if success { ActionResult::Success } else { ActionResult::Fail })
        } else {
            (ActionType::Pass, ActionResult::Success)
        };
        let end = ((x + 5.0).min(105.0), y);
        raws.push(raw(game_id, i as i64, 1, i as f64, team, (x, y), end, action_type, result));
    }
    spadl::add_names(&raws).unwrap()
}

fn feature_subset() -> impl Strategy<Value = Vec<FeatureFn>> {
    prop::sample::subsequence(FeatureFn::ALL.to_vec(), 1..FeatureFn::ALL.len())
}

proptest! {
    /// Property: no history slot holds an action from another game
    #[test]
    fn prop_window_stays_in_game(
        steps in prop::collection::vec(step(), 1..40),
        window_size in 0usize..6,
    ) {
        let actions = to_actions(&steps);
        let states = features::build_states(&actions, window_size);
        prop_assert_eq!(states.len(), actions.len());
        for state in states.iter() {
            prop_assert_eq!(state.window_size(), window_size);
            let game = state.anchor().game_id;
            let mut padded = false;
            for offset in 1..=window_size {
                match state.slot(offset) {
                    Some(prev) => {
                        prop_assert!(!padded);
                        prop_assert_eq!(prev.game_id, game);
                    }
                    None => padded = true,
                }
            }
        }
    }

    /// Property: extracted columns are exactly the declared ones, in order
    #[test]
    fn prop_extract_matches_expected_columns(
        steps in prop::collection::vec(step(), 1..20),
        fns in feature_subset(),
        window_size in 0usize..4,
    ) {
        let actions = to_actions(&steps);
        let states = features::normalize_direction(
            features::build_states(&actions, window_size),
            HOME,
        );
        let table = features::extract(&states, &fns).unwrap();
        prop_assert_eq!(table.column_names(), features::expected_columns(&fns, window_size));
        prop_assert_eq!(table.n_rows(), actions.len());
    }

    /// Property: extraction is deterministic
    #[test]
    fn prop_extract_is_repeatable(
        steps in prop::collection::vec(step(), 1..20),
        window_size in 0usize..4,
    ) {
        let actions = to_actions(&steps);
        let fns = features::xfns_default();
        let states = features::build_states(&actions, window_size);
        let once = features::extract(&states, &fns).unwrap();
        let twice = features::extract(&states, &fns).unwrap();
        prop_assert_eq!(once, twice);
    }

    /// Property: without goals every label is false
    #[test]
    fn prop_no_goal_no_label(steps in prop::collection::vec(step(), 1..40)) {
        let steps: Vec<Step> = steps
            .into_iter()
            .map(|(g, h, x, y, shot, _)| (g, h, x, y, shot, false))
            .collect();
        let actions = to_actions(&steps);
        let table = labels::derive(&actions, &labels::yfns_default()).unwrap();
        for column in table.columns() {
            prop_assert!(column.values.iter().all(|v| !v));
        }
    }

    /// Property: the total value is the sum of its offensive and defensive parts
    #[test]
    fn prop_value_is_sum_of_parts(
        steps in prop::collection::vec(step(), 1..30),
        seed in prop::collection::vec(0.0f64..1.0, 4),
    ) {
        let actions = to_actions(&steps);
        let n = actions.len();
        let probs: Vec<Vec<f64>> = seed
            .iter()
            .map(|s| (0..n).map(|i| (s + i as f64 * 0.37).fract()).collect())
            .collect();
        let ratings = formula::value(&actions, &probs[0], &probs[1], &probs[2], &probs[3]).unwrap();
        prop_assert_eq!(ratings.len(), n);
        for r in ratings {
            prop_assert!((r.vaep_value - (r.offensive_value + r.defensive_value)).abs() < 1e-12);
        }
    }
}
