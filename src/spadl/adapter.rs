//! Resolve coded SPADL fields to their names

use super::{Action, ActionResult, ActionType, BodyPart, RawAction};
use crate::{Result, VaepError};

/// Resolve the type, result and body-part codes of every action.
///
/// All other fields are carried over unchanged and the row order is kept.
pub fn add_names(actions: &[RawAction]) -> Result<Vec<Action>> {
    actions.iter().map(name_action).collect()
}

fn name_action(raw: &RawAction) -> Result<Action> {
    let action_type = resolve(raw, "type_id", raw.type_id, ActionType::from_code)?;
    let result = resolve(raw, "result_id", raw.result_id, ActionResult::from_code)?;
    let bodypart = resolve(raw, "bodypart_id", raw.bodypart_id, BodyPart::from_code)?;

    Ok(Action {
        game_id: raw.game_id,
        action_id: raw.action_id,
        period_id: raw.period_id,
        time_seconds: raw.time_seconds,
        team_id: raw.team_id,
        player_id: raw.player_id,
        start_x: raw.start_x,
        start_y: raw.start_y,
        end_x: raw.end_x,
        end_y: raw.end_y,
        action_type,
        result,
        bodypart,
    })
}

fn resolve<T>(
    raw: &RawAction,
    field: &str,
    code: Option<u8>,
    lookup: impl Fn(u8) -> Option<T>,
) -> Result<T> {
    let code = code.ok_or_else(|| VaepError::Schema {
        action_id: raw.action_id,
        message: format!("required field `{}` is missing", field),
    })?;
    lookup(code).ok_or_else(|| VaepError::Schema {
        action_id: raw.action_id,
        message: format!("unknown {} code {}", field, code),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GameId, TeamId};

    fn raw(type_id: Option<u8>, result_id: Option<u8>, bodypart_id: Option<u8>) -> RawAction {
        RawAction {
            game_id: GameId(8),
            action_id: 3,
            period_id: 2,
            time_seconds: 61.5,
            team_id: TeamId(5),
            player_id: None,
            start_x: 50.0,
            start_y: 30.0,
            end_x: 70.0,
            end_y: 35.0,
            type_id,
            result_id,
            bodypart_id,
        }
    }

    #[test]
    fn test_add_names_resolves_codes() {
        let actions = add_names(&[raw(Some(11), Some(1), Some(1))]).unwrap();
        assert_eq!(actions.len(), 1);
        let a = &actions[0];
        assert_eq!(a.action_type, ActionType::Shot);
        assert_eq!(a.result, ActionResult::Success);
        assert_eq!(a.bodypart, BodyPart::Head);
        assert_eq!(a.time_seconds, 61.5);
        assert_eq!(a.period_id, 2);
        assert!(a.is_goal());
    }

    #[test]
    fn test_missing_code_is_schema_error() {
        let err = add_names(&[raw(Some(0), None, Some(0))]).unwrap_err();
        match err {
            VaepError::Schema { action_id, message } => {
                assert_eq!(action_id, 3);
                assert!(message.contains("result_id"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_code_is_schema_error() {
        let err = add_names(&[raw(Some(99), Some(0), Some(0))]).unwrap_err();
        assert!(matches!(err, VaepError::Schema { .. }));
    }

    #[test]
    fn test_empty_table() {
        assert!(add_names(&[]).unwrap().is_empty());
    }
}
