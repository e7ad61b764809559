use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{GameEntity, LiveAction},
    dto::point::PointSnapshot,
    state::point::{GameTeamStatus, TeamSide},
};

/// Payload closing out a game for one side.
#[derive(Debug, Deserialize, Validate)]
pub struct FinishGameRequest {
    /// Side of the reporting team.
    pub team: TeamSide,
}

/// Payload resuming live reporting after a disconnect or a mistaken finish.
#[derive(Debug, Deserialize, Validate)]
pub struct ReenterGameRequest {
    /// Identity reference of the reentering team.
    pub team_id: Uuid,
}

/// Serializable view of a game.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GameSummary {
    /// Game identity.
    pub id: Uuid,
    /// Team one reference.
    pub team_one_id: Uuid,
    /// Team two reference.
    pub team_two_id: Uuid,
    /// Team one's participation status.
    pub team_one_status: GameTeamStatus,
    /// Team two's participation status.
    pub team_two_status: GameTeamStatus,
    /// Team one's score mirror.
    pub team_one_score: u32,
    /// Team two's score mirror.
    pub team_two_score: u32,
    /// Ordered point references.
    pub point_ids: Vec<Uuid>,
    /// Tournament, when assigned.
    pub tournament_id: Option<Uuid>,
}

impl From<GameEntity> for GameSummary {
    fn from(game: GameEntity) -> Self {
        Self {
            id: game.id,
            team_one_id: game.team_one_id,
            team_two_id: game.team_two_id,
            team_one_status: game.team_one_status,
            team_two_status: game.team_two_status,
            team_one_score: game.team_one_score,
            team_two_score: game.team_two_score,
            point_ids: game.point_ids,
            tournament_id: game.tournament_id,
        }
    }
}

/// Everything a reentering team needs to resume reporting.
#[derive(Debug, Serialize)]
pub struct ReentryDetail {
    /// The game after reentry.
    pub game: GameSummary,
    /// The point to resume on, when one exists.
    pub point: Option<PointSnapshot>,
    /// The team's restored live buffer for that point, in order.
    pub actions: Vec<LiveAction>,
    /// Fresh reconnection token for the manager session.
    pub token: String,
}
