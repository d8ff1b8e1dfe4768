//! Synthetic SPADL games for integration tests

#![allow(dead_code)]

use hybrid_vaep::spadl::{ActionResult, ActionType, BodyPart, Game, RawAction, FIELD_LENGTH, FIELD_WIDTH};
use hybrid_vaep::{GameId, TeamId};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const HOME: TeamId = TeamId(100);
pub const AWAY: TeamId = TeamId(200);

pub fn game(id: i64) -> Game {
    Game {
        game_id: GameId(id),
        home_team_id: HOME,
        away_team_id: Some(AWAY),
        game_date: None,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn raw(
    game_id: i64,
    action_id: i64,
    period_id: u8,
    t: f64,
    team: TeamId,
    (start_x, start_y): (f64, f64),
    (end_x, end_y): (f64, f64),
    action_type: ActionType,
    result: ActionResult,
) -> RawAction {
    RawAction {
        game_id: GameId(game_id),
        action_id,
        period_id,
        time_seconds: t,
        team_id: team,
        player_id: None,
        start_x,
        start_y,
        end_x,
        end_y,
        type_id: Some(action_type.code()),
        result_id: Some(result.code()),
        bodypart_id: Some(BodyPart::Foot.code()),
    }
}

/// Coordinates of the team's own frame in the home team's frame
fn to_home_frame(team: TeamId, x: f64, y: f64) -> (f64, f64) {
    if team == HOME {
        (x, y)
    } else {
        (FIELD_LENGTH - x, FIELD_WIDTH - y)
    }
}

fn other(team: TeamId) -> TeamId {
    if team == HOME {
        AWAY
    } else {
        HOME
    }
}

/// A game of passes moving up the pitch and shots near goal.
///
/// Shots from closer in score more often, so location carries signal.
pub fn synthetic_game(id: i64, n_actions: usize, rng: &mut StdRng) -> (Game, Vec<RawAction>) {
    let mut actions = Vec::with_capacity(n_actions);
    let mut team = HOME;
    let mut x = 52.5;
    let mut y = 34.0;
    let mut t = 0.0;

    for i in 0..n_actions {
        let period_id = if i < n_actions / 2 { 1 } else { 2 };
        if i == n_actions / 2 {
            t = 0.0;
            x = 52.5;
            y = 34.0;
            team = AWAY;
        }
        t += rng.gen_range(1.0..6.0);

        let start = to_home_frame(team, x, y);
        if x > 88.0 {
            let p_goal = if x > 97.0 { 0.6 } else { 0.15 };
            let scored = rng.gen_bool(p_goal);
            let result = if scored {
                ActionResult::Success
            } else {
                ActionResult::Fail
            };
            let end = to_home_frame(team, FIELD_LENGTH, 34.0);
            actions.push(raw(id, i as i64, period_id, t, team, start, end, ActionType::Shot, result));
            team = other(team);
            if scored {
                x = 52.5;
                y = 34.0;
            } else {
                x = rng.gen_range(5.0..20.0);
                y = rng.gen_range(10.0..58.0);
            }
            continue;
        }

        let nx = (x + rng.gen_range(-5.0..18.0)).clamp(0.0, 104.0);
        let ny = (y + rng.gen_range(-10.0..10.0)).clamp(0.0, 68.0);
        let end = to_home_frame(team, nx, ny);
        let success = rng.gen_bool(0.8);
        let result = if success {
            ActionResult::Success
        } else {
            ActionResult::Fail
        };
        actions.push(raw(id, i as i64, period_id, t, team, start, end, ActionType::Pass, result));
        if success {
            x = nx;
            y = ny;
        } else {
            team = other(team);
            x = FIELD_LENGTH - nx;
            y = FIELD_WIDTH - ny;
        }
    }
    (game(id), actions)
}

pub fn synthetic_games(n_games: usize, n_actions: usize, seed: u64) -> Vec<(Game, Vec<RawAction>)> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n_games)
        .map(|g| synthetic_game(g as i64 + 1, n_actions, &mut rng))
        .collect()
}
