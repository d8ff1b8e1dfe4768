//! Column computations behind each feature function
//!
//! Slot-wise functions describe every action in the window and suffix their
//! columns with `_a<offset>`. Padded slots produce zeros.

use std::collections::HashMap;

use super::{FeatureFn, GameStates};
use crate::spadl::{Action, ActionResult, ActionType, BodyPart, FIELD_LENGTH, FIELD_WIDTH};
use crate::{GameId, TeamId};

/// Length of a regular period, used to put both halves on one clock
const PERIOD_SECONDS: f64 = 45.0 * 60.0;

/// Centre of the goal the acting team attacks
const GOAL_X: f64 = FIELD_LENGTH;
const GOAL_Y: f64 = FIELD_WIDTH / 2.0;

pub fn column_names(f: FeatureFn, window_size: usize) -> Vec<String> {
    match slot_bases(f) {
        Some(bases) => (0..=window_size)
            .flat_map(|i| bases.iter().map(move |b| format!("{}_a{}", b, i)))
            .collect(),
        None => match f {
            FeatureFn::Team => (1..=window_size).map(|i| format!("team_{}", i)).collect(),
            FeatureFn::TimeDelta => (1..=window_size)
                .map(|i| format!("time_delta_{}", i))
                .collect(),
            FeatureFn::SpaceDelta => (1..=window_size)
                .flat_map(|i| {
                    [
                        format!("dx_a0{}", i),
                        format!("dy_a0{}", i),
                        format!("mov_a0{}", i),
                    ]
                })
                .collect(),
            FeatureFn::GoalScore => vec![
                "goalscore_team".to_string(),
                "goalscore_opponent".to_string(),
                "goalscore_diff".to_string(),
            ],
            _ => Vec::new(),
        },
    }
}

pub fn compute(f: FeatureFn, states: &GameStates) -> Vec<(String, Vec<f64>)> {
    let names = column_names(f, states.window_size());
    let columns: Vec<Vec<Vec<f64>>> = match f {
        FeatureFn::Team => cross_slot(states, |a0, ai| indicator(ai.team_id == a0.team_id))
            .into_iter()
            .map(|c| vec![c])
            .collect(),
        FeatureFn::TimeDelta => cross_slot(states, |a0, ai| a0.time_seconds - ai.time_seconds)
            .into_iter()
            .map(|c| vec![c])
            .collect(),
        FeatureFn::SpaceDelta => space_delta(states),
        FeatureFn::GoalScore => vec![goalscore(states)],
        _ => slotwise(f, states),
    };
    names.into_iter().zip(columns.into_iter().flatten()).collect()
}

/// Base column names of slot-wise functions, `None` for the others
fn slot_bases(f: FeatureFn) -> Option<Vec<String>> {
    let bases = match f {
        FeatureFn::ActionTypeOnehot => ActionType::ALL
            .iter()
            .map(|t| format!("actiontype_{}", t.name()))
            .collect(),
        FeatureFn::ResultOnehot => ActionResult::ALL
            .iter()
            .map(|r| format!("result_{}", r.name()))
            .collect(),
        FeatureFn::ActionTypeResultOnehot => ActionType::ALL
            .iter()
            .flat_map(|t| {
                ActionResult::ALL
                    .iter()
                    .map(move |r| format!("actiontype_{}_result_{}", t.name(), r.name()))
            })
            .collect(),
        FeatureFn::BodypartOnehot => BodyPart::ALL
            .iter()
            .map(|b| format!("bodypart_{}", b.name()))
            .collect(),
        FeatureFn::Time => strings(&["period_id", "time_seconds", "time_seconds_overall"]),
        FeatureFn::StartLocation => strings(&["start_x", "start_y"]),
        FeatureFn::EndLocation => strings(&["end_x", "end_y"]),
        FeatureFn::StartPolar => strings(&["start_dist_to_goal", "start_angle_to_goal"]),
        FeatureFn::EndPolar => strings(&["end_dist_to_goal", "end_angle_to_goal"]),
        FeatureFn::Movement => strings(&["dx", "dy", "movement"]),
        FeatureFn::Team | FeatureFn::TimeDelta | FeatureFn::SpaceDelta | FeatureFn::GoalScore => {
            return None
        }
    };
    Some(bases)
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn indicator(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn onehot(n: usize, hot: usize) -> Vec<f64> {
    let mut v = vec![0.0; n];
    v[hot] = 1.0;
    v
}

/// Feature values of a single action, in the order of `slot_bases`
fn slot_values(f: FeatureFn, a: &Action) -> Vec<f64> {
    match f {
        FeatureFn::ActionTypeOnehot => onehot(ActionType::ALL.len(), a.action_type.code() as usize),
        FeatureFn::ResultOnehot => onehot(ActionResult::ALL.len(), a.result.code() as usize),
        FeatureFn::ActionTypeResultOnehot => {
            let n_results = ActionResult::ALL.len();
            onehot(
                ActionType::ALL.len() * n_results,
                a.action_type.code() as usize * n_results + a.result.code() as usize,
            )
        }
        FeatureFn::BodypartOnehot => onehot(BodyPart::ALL.len(), a.bodypart.code() as usize),
        FeatureFn::Time => vec![
            a.period_id as f64,
            a.time_seconds,
            (a.period_id.saturating_sub(1)) as f64 * PERIOD_SECONDS + a.time_seconds,
        ],
        FeatureFn::StartLocation => vec![a.start_x, a.start_y],
        FeatureFn::EndLocation => vec![a.end_x, a.end_y],
        FeatureFn::StartPolar => polar(a.start_x, a.start_y).to_vec(),
        FeatureFn::EndPolar => polar(a.end_x, a.end_y).to_vec(),
        FeatureFn::Movement => {
            let dx = a.end_x - a.start_x;
            let dy = a.end_y - a.start_y;
            vec![dx, dy, dx.hypot(dy)]
        }
        FeatureFn::Team | FeatureFn::TimeDelta | FeatureFn::SpaceDelta | FeatureFn::GoalScore => {
            Vec::new()
        }
    }
}

/// Distance and angle to the centre of the goal
pub fn polar(x: f64, y: f64) -> [f64; 2] {
    let dx = (GOAL_X - x).abs();
    let dy = (GOAL_Y - y).abs();
    let angle = if dx == 0.0 && dy == 0.0 {
        0.0
    } else {
        dy.atan2(dx)
    };
    [dx.hypot(dy), angle]
}

/// Columns grouped per slot, each group in `slot_bases` order
fn slotwise(f: FeatureFn, states: &GameStates) -> Vec<Vec<Vec<f64>>> {
    let width = slot_bases(f).map(|b| b.len()).unwrap_or(0);
    (0..=states.window_size())
        .map(|offset| {
            let mut columns = vec![Vec::with_capacity(states.len()); width];
            for state in states.iter() {
                let values = match state.slot(offset) {
                    Some(a) => slot_values(f, a),
                    None => vec![0.0; width],
                };
                for (column, v) in columns.iter_mut().zip(values) {
                    column.push(v);
                }
            }
            columns
        })
        .collect()
}

/// One column per history slot comparing it with the anchor
fn cross_slot(states: &GameStates, f: impl Fn(&Action, &Action) -> f64) -> Vec<Vec<f64>> {
    (1..=states.window_size())
        .map(|offset| {
            states
                .iter()
                .map(|s| s.slot(offset).map(|ai| f(s.anchor(), ai)).unwrap_or(0.0))
                .collect()
        })
        .collect()
}

fn space_delta(states: &GameStates) -> Vec<Vec<Vec<f64>>> {
    (1..=states.window_size())
        .map(|offset| {
            let mut dx = Vec::with_capacity(states.len());
            let mut dy = Vec::with_capacity(states.len());
            let mut mov = Vec::with_capacity(states.len());
            for s in states.iter() {
                let (x, y) = match s.slot(offset) {
                    Some(ai) => (ai.end_x - s.anchor().start_x, ai.end_y - s.anchor().start_y),
                    None => (0.0, 0.0),
                };
                dx.push(x);
                dy.push(y);
                mov.push(x.hypot(y));
            }
            vec![dx, dy, mov]
        })
        .collect()
}

/// Score before each anchor action, from the anchor team's point of view.
///
/// Counts restart for every game. An own goal counts for the other team.
fn goalscore(states: &GameStates) -> Vec<Vec<f64>> {
    #[derive(Default)]
    struct Tally {
        goals: HashMap<TeamId, usize>,
        owngoals: HashMap<TeamId, usize>,
        total_goals: usize,
        total_owngoals: usize,
    }

    impl Tally {
        fn score(&self, team: TeamId) -> (usize, usize) {
            let goals = self.goals.get(&team).copied().unwrap_or(0);
            let owngoals = self.owngoals.get(&team).copied().unwrap_or(0);
            let team_score = goals + (self.total_owngoals - owngoals);
            let opponent_score = (self.total_goals - goals) + owngoals;
            (team_score, opponent_score)
        }
    }

    let mut tallies: HashMap<GameId, Tally> = HashMap::new();
    let mut team_col = Vec::with_capacity(states.len());
    let mut opp_col = Vec::with_capacity(states.len());
    let mut diff_col = Vec::with_capacity(states.len());

    for a in states.anchors() {
        let tally = tallies.entry(a.game_id).or_default();
        let (team, opponent) = tally.score(a.team_id);
        team_col.push(team as f64);
        opp_col.push(opponent as f64);
        diff_col.push(team as f64 - opponent as f64);

        if a.is_goal() {
            *tally.goals.entry(a.team_id).or_default() += 1;
            tally.total_goals += 1;
        } else if a.is_owngoal() {
            *tally.owngoals.entry(a.team_id).or_default() += 1;
            tally.total_owngoals += 1;
        }
    }

    vec![team_col, opp_col, diff_col]
}
