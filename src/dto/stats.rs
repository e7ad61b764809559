//! Payloads queued for the downstream statistics system and the finalize
//! task callback.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    dao::models::{ActionEntity, GameEntity, PointEntity},
    state::point::TeamSide,
};

/// Consolidated point summary sent once both teams are finalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointStatsPayload {
    /// Owning game.
    pub game_id: Uuid,
    /// The settled point.
    pub point_id: Uuid,
    /// Number within the game.
    pub point_number: u32,
    /// Team one's cumulative score.
    pub team_one_score: u32,
    /// Team two's cumulative score.
    pub team_two_score: u32,
    /// Team credited with the score.
    pub scoring_team_id: Option<Uuid>,
    /// Pulling team.
    pub pulling_team_id: Uuid,
    /// Receiving team.
    pub receiving_team_id: Uuid,
    /// Team one's persisted play-by-play.
    pub team_one_actions: Vec<ActionEntity>,
    /// Team two's persisted play-by-play.
    pub team_two_actions: Vec<ActionEntity>,
}

impl PointStatsPayload {
    /// Assemble the payload from a settled point and both action lists.
    pub fn new(
        point: &PointEntity,
        team_one_actions: Vec<ActionEntity>,
        team_two_actions: Vec<ActionEntity>,
    ) -> Self {
        Self {
            game_id: point.game_id,
            point_id: point.id,
            point_number: point.point_number,
            team_one_score: point.team_one_score,
            team_two_score: point.team_two_score,
            scoring_team_id: point.scoring_team_id,
            pulling_team_id: point.pulling_team_id,
            receiving_team_id: point.receiving_team_id,
            team_one_actions,
            team_two_actions,
        }
    }
}

/// Notification that a previously settled point was reopened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointRetractionPayload {
    /// Owning game.
    pub game_id: Uuid,
    /// The reopened point.
    pub point_id: Uuid,
    /// Number within the game.
    pub point_number: u32,
    /// Team whose record was pulled back into the live buffer.
    pub team_id: Uuid,
}

/// Game-level summary sent once per imported game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatsPayload {
    /// The persisted game.
    pub game_id: Uuid,
    /// Team one reference.
    pub team_one_id: Uuid,
    /// Team two reference.
    pub team_two_id: Uuid,
    /// Team one's final score.
    pub team_one_score: u32,
    /// Team two's final score.
    pub team_two_score: u32,
    /// Tournament, when assigned.
    pub tournament_id: Option<Uuid>,
}

impl From<&GameEntity> for GameStatsPayload {
    fn from(game: &GameEntity) -> Self {
        Self {
            game_id: game.id,
            team_one_id: game.team_one_id,
            team_two_id: game.team_two_id,
            team_one_score: game.team_one_score,
            team_two_score: game.team_two_score,
            tournament_id: game.tournament_id,
        }
    }
}

/// Task payload queued after a finish and redelivered to the finalize
/// callback endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizeTask {
    /// Owning game.
    pub game_id: Uuid,
    /// The point to finalize.
    pub point_id: Uuid,
    /// Side whose buffer should be drained.
    pub team: TeamSide,
}
