//! Game states: an action together with the actions leading up to it

use crate::spadl::Action;
use crate::TeamId;

/// The anchor action and its `window_size` predecessors, most recent first.
///
/// History slots that would reach before the first action of the game are
/// `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    anchor: Action,
    history: Vec<Option<Action>>,
}

impl GameState {
    pub fn new(anchor: Action, history: Vec<Option<Action>>) -> Self {
        GameState { anchor, history }
    }

    /// The action being valued
    pub fn anchor(&self) -> &Action {
        &self.anchor
    }

    /// Slot `offset` of the window: 0 is the anchor, 1 the action before it
    pub fn slot(&self, offset: usize) -> Option<&Action> {
        if offset == 0 {
            Some(&self.anchor)
        } else {
            self.history.get(offset - 1).and_then(|a| a.as_ref())
        }
    }

    /// Number of history slots (padded ones included)
    pub fn window_size(&self) -> usize {
        self.history.len()
    }

    fn mirrored(&self) -> Self {
        GameState {
            anchor: self.anchor.mirrored(),
            history: self
                .history
                .iter()
                .map(|a| a.as_ref().map(Action::mirrored))
                .collect(),
        }
    }
}

/// The game states of an action sequence, all with the same window size
#[derive(Debug, Clone, PartialEq)]
pub struct GameStates {
    window_size: usize,
    states: Vec<GameState>,
}

impl GameStates {
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GameState> {
        self.states.iter()
    }

    pub fn get(&self, i: usize) -> Option<&GameState> {
        self.states.get(i)
    }

    /// The anchor actions, in order
    pub fn anchors(&self) -> impl Iterator<Item = &Action> {
        self.states.iter().map(GameState::anchor)
    }
}

impl std::ops::Index<usize> for GameStates {
    type Output = GameState;

    fn index(&self, i: usize) -> &GameState {
        &self.states[i]
    }
}

/// Build one game state per action.
///
/// Actions must be ordered by game, period and time. The look-back stops at
/// the first action belonging to another game, so a state never carries
/// actions from a different game.
pub fn build_states(actions: &[Action], window_size: usize) -> GameStates {
    let states = actions
        .iter()
        .enumerate()
        .map(|(i, anchor)| {
            let mut history = Vec::with_capacity(window_size);
            let mut boundary = false;
            for offset in 1..=window_size {
                let prev = i
                    .checked_sub(offset)
                    .map(|j| &actions[j])
                    .filter(|prev| !boundary && prev.game_id == anchor.game_id);
                boundary = prev.is_none();
                history.push(prev.cloned());
            }
            GameState::new(anchor.clone(), history)
        })
        .collect();
    GameStates {
        window_size,
        states,
    }
}

/// Mirror every state whose anchor was performed by the away team.
///
/// Input coordinates are in the home team's frame. All slots of a mirrored
/// state are flipped, whichever team performed them, so each state ends up
/// in the frame where the anchor's team attacks left to right.
pub fn normalize_direction(states: GameStates, home_team_id: TeamId) -> GameStates {
    let window_size = states.window_size;
    let states = states
        .states
        .into_iter()
        .map(|state| {
            if state.anchor.team_id != home_team_id {
                state.mirrored()
            } else {
                state
            }
        })
        .collect();
    GameStates {
        window_size,
        states,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::spadl::{ActionResult, ActionType, BodyPart};
    use crate::GameId;

    pub(crate) fn action(game: i64, team: i64, t: f64, x: f64, y: f64) -> Action {
        Action {
            game_id: GameId(game),
            action_id: (t * 10.0) as i64,
            period_id: 1,
            time_seconds: t,
            team_id: TeamId(team),
            player_id: None,
            start_x: x,
            start_y: y,
            end_x: x + 5.0,
            end_y: y,
            action_type: ActionType::Pass,
            result: ActionResult::Success,
            bodypart: BodyPart::Foot,
        }
    }

    #[test]
    fn test_window_pads_start_of_game() {
        let actions = vec![
            action(1, 1, 1.0, 10.0, 10.0),
            action(1, 1, 2.0, 20.0, 10.0),
            action(1, 2, 3.0, 30.0, 10.0),
        ];
        let states = build_states(&actions, 2);
        assert_eq!(states.len(), 3);

        assert!(states[0].slot(1).is_none());
        assert!(states[0].slot(2).is_none());
        assert_eq!(states[1].slot(1), Some(&actions[0]));
        assert!(states[1].slot(2).is_none());
        assert_eq!(states[2].slot(1), Some(&actions[1]));
        assert_eq!(states[2].slot(2), Some(&actions[0]));
    }

    #[test]
    fn test_window_does_not_cross_games() {
        let actions = vec![
            action(1, 1, 1.0, 10.0, 10.0),
            action(1, 1, 2.0, 20.0, 10.0),
            action(2, 3, 1.0, 30.0, 10.0),
            action(2, 3, 2.0, 40.0, 10.0),
        ];
        let states = build_states(&actions, 3);
        assert!(states[2].slot(1).is_none());
        assert_eq!(states[3].slot(1), Some(&actions[2]));
        assert!(states[3].slot(2).is_none());
        assert!(states[3].slot(3).is_none());
    }

    #[test]
    fn test_zero_window_keeps_anchor_only() {
        let actions = vec![action(1, 1, 1.0, 10.0, 10.0), action(1, 1, 2.0, 20.0, 10.0)];
        let states = build_states(&actions, 0);
        assert_eq!(states[1].window_size(), 0);
        assert_eq!(states[1].anchor(), &actions[1]);
        assert!(states[1].slot(1).is_none());
    }

    #[test]
    fn test_away_anchor_mirrors_whole_window() {
        // A1 by the home team, A2 by the away team, one slot of history
        let a1 = action(1, 1, 1.0, 30.0, 20.0);
        let a2 = action(1, 2, 2.0, 60.0, 50.0);
        let states = normalize_direction(build_states(&[a1.clone(), a2.clone()], 1), TeamId(1));

        // Home anchor: untouched
        assert_eq!(states[0].anchor(), &a1);

        // Away anchor: both slots in the away team's frame
        let s = &states[1];
        assert_eq!(s.anchor().start_x, 45.0);
        assert_eq!(s.anchor().start_y, 18.0);
        let hist = s.slot(1).unwrap();
        assert_eq!(hist.team_id, TeamId(1));
        assert_eq!(hist.start_x, 75.0);
        assert_eq!(hist.start_y, 48.0);
        assert_eq!(hist.end_x, 70.0);
    }
}
