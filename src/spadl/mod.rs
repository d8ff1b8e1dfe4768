//! SPADL action representation
//!
//! Registries of action types, results and body parts, the raw (coded) and
//! named action records, and game metadata.

pub mod adapter;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{GameId, PlayerId, TeamId};

pub use adapter::add_names;

/// Pitch length in metres
pub const FIELD_LENGTH: f64 = 105.0;
/// Pitch width in metres
pub const FIELD_WIDTH: f64 = 68.0;

/// Declares a closed registry of SPADL codes with their canonical names.
macro_rules! registry {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = ($code:literal, $label:literal)),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every entry in code order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn code(&self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.pad(self.name())
            }
        }
    };
}

registry! {
    /// On-ball action types
    ActionType {
        Pass = (0, "pass"),
        Cross = (1, "cross"),
        ThrowIn = (2, "throw_in"),
        FreekickCrossed = (3, "freekick_crossed"),
        FreekickShort = (4, "freekick_short"),
        CornerCrossed = (5, "corner_crossed"),
        CornerShort = (6, "corner_short"),
        TakeOn = (7, "take_on"),
        Foul = (8, "foul"),
        Tackle = (9, "tackle"),
        Interception = (10, "interception"),
        Shot = (11, "shot"),
        ShotPenalty = (12, "shot_penalty"),
        ShotFreekick = (13, "shot_freekick"),
        KeeperSave = (14, "keeper_save"),
        KeeperClaim = (15, "keeper_claim"),
        KeeperPunch = (16, "keeper_punch"),
        KeeperPickUp = (17, "keeper_pick_up"),
        Clearance = (18, "clearance"),
        BadTouch = (19, "bad_touch"),
        NonAction = (20, "non_action"),
        Dribble = (21, "dribble"),
        Goalkick = (22, "goalkick"),
    }
}

registry! {
    /// Outcome of an action
    ActionResult {
        Fail = (0, "fail"),
        Success = (1, "success"),
        Offside = (2, "offside"),
        Owngoal = (3, "owngoal"),
        YellowCard = (4, "yellow_card"),
        RedCard = (5, "red_card"),
    }
}

registry! {
    /// Body part used to perform an action
    BodyPart {
        Foot = (0, "foot"),
        Head = (1, "head"),
        Other = (2, "other"),
        HeadOther = (3, "head/other"),
        FootLeft = (4, "foot_left"),
        FootRight = (5, "foot_right"),
    }
}

impl ActionType {
    pub fn is_shot(&self) -> bool {
        matches!(
            self,
            ActionType::Shot | ActionType::ShotPenalty | ActionType::ShotFreekick
        )
    }

    pub fn is_corner(&self) -> bool {
        matches!(self, ActionType::CornerCrossed | ActionType::CornerShort)
    }
}

/// Game metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub game_id: GameId,
    pub home_team_id: TeamId,
    pub away_team_id: Option<TeamId>,
    #[serde(default)]
    pub game_date: Option<NaiveDateTime>,
}

/// An action as delivered by a provider converter, with coded fields
///
/// The coded fields are optional so that a table with a missing column can
/// still be read and rejected by [`add_names`] with a schema error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawAction {
    pub game_id: GameId,
    #[serde(default)]
    pub action_id: i64,
    pub period_id: u8,
    pub time_seconds: f64,
    pub team_id: TeamId,
    #[serde(default)]
    pub player_id: Option<PlayerId>,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    pub type_id: Option<u8>,
    pub result_id: Option<u8>,
    pub bodypart_id: Option<u8>,
}

/// An action with its codes resolved to names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub game_id: GameId,
    pub action_id: i64,
    pub period_id: u8,
    pub time_seconds: f64,
    pub team_id: TeamId,
    pub player_id: Option<PlayerId>,
    pub start_x: f64,
    pub start_y: f64,
    pub end_x: f64,
    pub end_y: f64,
    #[serde(rename = "type_name")]
    pub action_type: ActionType,
    #[serde(rename = "result_name")]
    pub result: ActionResult,
    #[serde(rename = "bodypart_name")]
    pub bodypart: BodyPart,
}

impl Action {
    /// A shot that went in
    pub fn is_goal(&self) -> bool {
        self.action_type.is_shot() && self.result == ActionResult::Success
    }

    /// A shot-type action put into the actor's own net
    pub fn is_owngoal(&self) -> bool {
        self.action_type.is_shot() && self.result == ActionResult::Owngoal
    }

    /// The same action seen from the other end of the pitch
    pub fn mirrored(&self) -> Self {
        Action {
            start_x: FIELD_LENGTH - self.start_x,
            start_y: FIELD_WIDTH - self.start_y,
            end_x: FIELD_LENGTH - self.end_x,
            end_y: FIELD_WIDTH - self.end_y,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip_through_registry() {
        for t in ActionType::ALL {
            assert_eq!(ActionType::from_code(t.code()), Some(*t));
            assert_eq!(ActionType::from_name(t.name()), Some(*t));
        }
        assert_eq!(ActionType::ALL.len(), 23);
        assert_eq!(ActionResult::ALL.len(), 6);
        assert_eq!(BodyPart::ALL.len(), 6);
        assert_eq!(ActionType::from_code(23), None);
    }

    #[test]
    fn test_shot_types() {
        assert!(ActionType::Shot.is_shot());
        assert!(ActionType::ShotPenalty.is_shot());
        assert!(ActionType::ShotFreekick.is_shot());
        assert!(!ActionType::Pass.is_shot());
        assert!(ActionType::CornerShort.is_corner());
    }

    #[test]
    fn test_serde_uses_names() {
        let json = serde_json::to_string(&BodyPart::HeadOther).unwrap();
        assert_eq!(json, "\"head_other\"");
        assert_eq!(BodyPart::HeadOther.name(), "head/other");
        assert_eq!(ActionType::KeeperPickUp.to_string(), "keeper_pick_up");
    }

    #[test]
    fn test_mirrored() {
        let action = Action {
            game_id: GameId(1),
            action_id: 0,
            period_id: 1,
            time_seconds: 0.0,
            team_id: TeamId(1),
            player_id: None,
            start_x: 10.0,
            start_y: 20.0,
            end_x: 30.0,
            end_y: 40.0,
            action_type: ActionType::Pass,
            result: ActionResult::Success,
            bodypart: BodyPart::Foot,
        };
        let m = action.mirrored();
        assert_eq!(m.start_x, 95.0);
        assert_eq!(m.start_y, 48.0);
        assert_eq!(m.end_x, 75.0);
        assert_eq!(m.end_y, 28.0);
        assert_eq!(m.mirrored(), action);
    }
}
