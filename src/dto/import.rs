use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::ActionKind,
    dto::{game::GameSummary, point::PointSnapshot},
};

/// Payload ingesting a complete, already-played game in one call.
#[derive(Debug, Deserialize, Validate)]
pub struct ImportGameRequest {
    /// Identity reference of team one.
    pub team_one_id: Uuid,
    /// Identity reference of team two.
    pub team_two_id: Uuid,
    /// The side submitting the import; the other side stays a guest record.
    pub importing_team_id: Uuid,
    /// Tournament the game belongs to, matched by external event id.
    #[validate(nested)]
    pub tournament: Option<TournamentInput>,
    /// Guest players declared locally on the importing roster.
    #[validate(nested)]
    #[serde(default)]
    pub guests: Vec<GuestPlayerInput>,
    /// Every point of the game, in order.
    #[validate(length(min = 1), nested)]
    pub points: Vec<ImportPointInput>,
}

/// Tournament details supplied with an import.
#[derive(Debug, Deserialize, Validate)]
pub struct TournamentInput {
    /// Identifier of the event in the external scheduling system.
    #[validate(length(min = 1))]
    pub external_event_id: String,
    /// Display name.
    #[validate(length(min = 1))]
    pub name: String,
    /// Free-text location.
    pub location: Option<String>,
}

/// Guest player declared locally on the importing roster.
#[derive(Debug, Deserialize, Validate)]
pub struct GuestPlayerInput {
    /// Display name of the guest.
    #[validate(length(min = 1))]
    pub name: String,
    /// Jersey number, when known.
    pub number: Option<u8>,
}

/// One imported point with its play-by-play.
///
/// Also serializable: validator embeds the offending list in the error params
/// when the `points` length rule fails.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ImportPointInput {
    /// 1-based number within the game.
    #[validate(range(min = 1))]
    pub point_number: u32,
    /// Team pulling on this point.
    pub pulling_team_id: Uuid,
    /// Team one's cumulative score after this point.
    pub team_one_score: u32,
    /// Team two's cumulative score after this point.
    pub team_two_score: u32,
    /// Team credited with the score.
    pub scoring_team_id: Option<Uuid>,
    /// Play-by-play of the importing side, in order.
    #[serde(default)]
    pub actions: Vec<ImportActionInput>,
}

/// One imported action.
#[derive(Debug, Serialize, Deserialize)]
pub struct ImportActionInput {
    /// What happened.
    pub kind: ActionKind,
    /// Players involved, in roster order.
    #[serde(default)]
    pub player_ids: Vec<Uuid>,
    /// Free-text reporter comment.
    pub comment: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Result of a completed import.
#[derive(Debug, Serialize)]
pub struct ImportGameDetail {
    /// The persisted game.
    pub game: GameSummary,
    /// Every persisted point, in order.
    pub points: Vec<PointSnapshot>,
    /// Resolved or created tournament, when one was supplied.
    pub tournament_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn an_import_without_points_fails_validation() {
        let request = ImportGameRequest {
            team_one_id: Uuid::new_v4(),
            team_two_id: Uuid::new_v4(),
            importing_team_id: Uuid::new_v4(),
            tournament: None,
            guests: vec![],
            points: vec![],
        };

        let report = request.validate().unwrap_err();
        assert!(report.field_errors().contains_key("points"));
    }
}
