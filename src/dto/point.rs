use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dao::models::{ActionKind, LiveAction, PointEntity},
    state::point::{PointTeamStatus, TeamSide},
};

/// Payload opening the next point after `point_number`.
#[derive(Debug, Deserialize, Validate)]
pub struct StartPointRequest {
    /// Side of the reporting team.
    pub team: TeamSide,
    /// Number of the point just settled; the new point lands at
    /// `point_number + 1`. Zero opens the first point.
    pub point_number: u32,
    /// Team pulling on the new point.
    pub pulling_team_id: Uuid,
}

/// Payload appending one action to a team's live buffer.
#[derive(Debug, Deserialize, Validate)]
pub struct RecordActionRequest {
    /// Side of the reporting team.
    pub team: TeamSide,
    /// What happened.
    pub kind: ActionKind,
    /// Players involved, in roster order.
    #[serde(default)]
    pub player_ids: Vec<Uuid>,
    /// Free-text reporter comment.
    #[validate(length(max = 500))]
    pub comment: Option<String>,
    /// Free-form tags.
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Payload declaring a point finished for one side.
#[derive(Debug, Deserialize, Validate)]
pub struct FinishPointRequest {
    /// Side of the reporting team.
    pub team: TeamSide,
}

/// Payload rolling a point back for one side.
#[derive(Debug, Deserialize, Validate)]
pub struct BackPointRequest {
    /// Side of the reporting team.
    pub team: TeamSide,
}

/// Serializable view of a point.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PointSnapshot {
    /// Point identity.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// Number within the game.
    pub point_number: u32,
    /// Team one's reporting status.
    pub team_one_status: PointTeamStatus,
    /// Team two's reporting status.
    pub team_two_status: PointTeamStatus,
    /// Team one's score.
    pub team_one_score: u32,
    /// Team two's score.
    pub team_two_score: u32,
    /// Pulling team.
    pub pulling_team_id: Uuid,
    /// Receiving team.
    pub receiving_team_id: Uuid,
    /// Scoring team, once decided.
    pub scoring_team_id: Option<Uuid>,
    /// Team one's live-buffer flag.
    pub team_one_active: bool,
    /// Team two's live-buffer flag.
    pub team_two_active: bool,
}

impl From<PointEntity> for PointSnapshot {
    fn from(point: PointEntity) -> Self {
        Self {
            id: point.id,
            game_id: point.game_id,
            point_number: point.point_number,
            team_one_status: point.team_one_status,
            team_two_status: point.team_two_status,
            team_one_score: point.team_one_score,
            team_two_score: point.team_two_score,
            pulling_team_id: point.pulling_team_id,
            receiving_team_id: point.receiving_team_id,
            scoring_team_id: point.scoring_team_id,
            team_one_active: point.team_one_active,
            team_two_active: point.team_two_active,
        }
    }
}

/// Point state plus the caller's current live buffer contents.
#[derive(Debug, Serialize)]
pub struct PointDetail {
    /// The point after the operation.
    pub point: PointSnapshot,
    /// The caller's buffered actions, in order.
    pub actions: Vec<LiveAction>,
}

/// Index assigned to a freshly buffered action.
#[derive(Debug, Serialize)]
pub struct RecordedAction {
    /// 1-based buffer index of the action.
    pub index: u32,
}
