//! Label derivation by looking ahead in the action sequence
//!
//! `scores` is set when the acting team scores within the next actions of
//! the same game and period, `concedes` when its opponent does. An own goal
//! counts for the other team.

use serde::{Deserialize, Serialize};

use crate::spadl::{Action, ActionResult, ActionType};
use crate::table::LabelTable;
use crate::Result;

/// Default number of actions scanned per label, the labelled action included
pub const DEFAULT_LOOKAHEAD: usize = 10;

/// Events that end a lookahead scan without a goal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    /// A set-piece restart (throw-in, corner, goal kick, free kick)
    Restart,
    /// A clearance by the opponent of the labelled action's team
    Clearance,
    /// A foul by either team
    Foul,
    /// Any action that drew a yellow or red card
    Card,
}

impl StopRule {
    fn stops(&self, labelled: &Action, later: &Action) -> bool {
        match self {
            StopRule::Restart => matches!(
                later.action_type,
                ActionType::ThrowIn
                    | ActionType::CornerCrossed
                    | ActionType::CornerShort
                    | ActionType::Goalkick
                    | ActionType::FreekickCrossed
                    | ActionType::FreekickShort
            ),
            StopRule::Clearance => {
                later.action_type == ActionType::Clearance && later.team_id != labelled.team_id
            }
            StopRule::Foul => later.action_type == ActionType::Foul,
            StopRule::Card => matches!(
                later.result,
                ActionResult::YellowCard | ActionResult::RedCard
            ),
        }
    }
}

/// What a label function looks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    /// The acting team scores
    Scores,
    /// The acting team concedes
    Concedes,
    /// The action itself is a goal
    GoalFromShot,
}

/// A label function with its lookahead configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelFn {
    pub kind: LabelKind,
    pub lookahead: usize,
    pub stop_on: Vec<StopRule>,
}

impl LabelFn {
    pub fn scores() -> Self {
        LabelFn {
            kind: LabelKind::Scores,
            lookahead: DEFAULT_LOOKAHEAD,
            stop_on: Vec::new(),
        }
    }

    pub fn concedes() -> Self {
        LabelFn {
            kind: LabelKind::Concedes,
            lookahead: DEFAULT_LOOKAHEAD,
            stop_on: Vec::new(),
        }
    }

    pub fn goal_from_shot() -> Self {
        LabelFn {
            kind: LabelKind::GoalFromShot,
            lookahead: 1,
            stop_on: Vec::new(),
        }
    }

    /// `scores` and `concedes` sharing one lookahead configuration
    pub fn defaults_with(lookahead: usize, stop_on: &[StopRule]) -> Vec<LabelFn> {
        [LabelFn::scores(), LabelFn::concedes()]
            .into_iter()
            .map(|f| LabelFn {
                lookahead,
                stop_on: stop_on.to_vec(),
                ..f
            })
            .collect()
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            LabelKind::Scores => "scores",
            LabelKind::Concedes => "concedes",
            LabelKind::GoalFromShot => "goal_from_shot",
        }
    }

    fn qualifies(&self, labelled: &Action, later: &Action) -> bool {
        let same_team = later.team_id == labelled.team_id;
        match self.kind {
            LabelKind::Scores => {
                (later.is_goal() && same_team) || (later.is_owngoal() && !same_team)
            }
            LabelKind::Concedes => {
                (later.is_goal() && !same_team) || (later.is_owngoal() && same_team)
            }
            LabelKind::GoalFromShot => {
                std::ptr::eq(labelled, later) && labelled.is_goal()
            }
        }
    }

    /// Label every action of the sequence
    pub fn apply(&self, actions: &[Action]) -> Vec<bool> {
        (0..actions.len()).map(|i| self.label_at(actions, i)).collect()
    }

    fn label_at(&self, actions: &[Action], i: usize) -> bool {
        let labelled = &actions[i];
        let end = (i + self.lookahead).min(actions.len());
        for later in &actions[i..end] {
            if later.game_id != labelled.game_id || later.period_id != labelled.period_id {
                return false;
            }
            if self.qualifies(labelled, later) {
                return true;
            }
            if !std::ptr::eq(labelled, later)
                && self.stop_on.iter().any(|rule| rule.stops(labelled, later))
            {
                return false;
            }
        }
        false
    }
}

/// The default label functions: `scores` and `concedes`
pub fn yfns_default() -> Vec<LabelFn> {
    vec![LabelFn::scores(), LabelFn::concedes()]
}

/// Apply every label function and collect the columns in order.
pub fn derive(actions: &[Action], label_fns: &[LabelFn]) -> Result<LabelTable> {
    let mut table = LabelTable::new(actions.len());
    for f in label_fns {
        table.push_column(f.name(), f.apply(actions))?;
    }
    Ok(table)
}
