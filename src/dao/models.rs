use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::point::{GameTeamStatus, PointTeamStatus, TeamSide};

/// Kind of a recorded play-by-play action.
///
/// `TeamOneScore` and `TeamTwoScore` are the two score sentinels: a point can
/// only be declared finished by a first reporter whose last buffered action is
/// one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Opening throw of the point.
    Pull,
    /// Completed catch.
    Catch,
    /// Dropped disc.
    Drop,
    /// Throwaway turnover.
    Throwaway,
    /// Defensive block.
    Block,
    /// Stall-out turnover.
    Stall,
    /// Team timeout.
    Timeout,
    /// Line change.
    Substitution,
    /// Team one scored; closes the point for the reporting side.
    TeamOneScore,
    /// Team two scored; closes the point for the reporting side.
    TeamTwoScore,
}

impl ActionKind {
    /// The side credited with the score, when this is a score sentinel.
    pub fn scoring_side(self) -> Option<TeamSide> {
        match self {
            ActionKind::TeamOneScore => Some(TeamSide::One),
            ActionKind::TeamTwoScore => Some(TeamSide::Two),
            _ => None,
        }
    }
}

/// Aggregate game entity persisted by the storage layer.
///
/// Scores are a mirror of the latest settled point; the authoritative
/// per-point record lives on [`PointEntity`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameEntity {
    /// Primary key of the game.
    pub id: Uuid,
    /// Identity-service reference of team one.
    pub team_one_id: Uuid,
    /// Identity-service reference of team two.
    pub team_two_id: Uuid,
    /// Team one's participation status.
    pub team_one_status: GameTeamStatus,
    /// Team two's participation status.
    pub team_two_status: GameTeamStatus,
    /// Team one's score mirror.
    pub team_one_score: u32,
    /// Team two's score mirror.
    pub team_two_score: u32,
    /// Ordered references of the points played in this game.
    pub point_ids: Vec<Uuid>,
    /// Reconnection token issued to team one's manager on reentry.
    pub team_one_token: Option<String>,
    /// Reconnection token issued to team two's manager on reentry.
    pub team_two_token: Option<String>,
    /// Tournament this game belongs to, when imported or assigned.
    pub tournament_id: Option<Uuid>,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the game entity was updated.
    pub updated_at: SystemTime,
}

impl GameEntity {
    /// Build a fresh game between two teams, both sides still `Defined`.
    pub fn new(team_one_id: Uuid, team_two_id: Uuid) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            team_one_id,
            team_two_id,
            team_one_status: GameTeamStatus::Defined,
            team_two_status: GameTeamStatus::Defined,
            team_one_score: 0,
            team_two_score: 0,
            point_ids: Vec::new(),
            team_one_token: None,
            team_two_token: None,
            tournament_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The side a team plays on, if it belongs to this game.
    pub fn side_of(&self, team_id: Uuid) -> Option<TeamSide> {
        if team_id == self.team_one_id {
            Some(TeamSide::One)
        } else if team_id == self.team_two_id {
            Some(TeamSide::Two)
        } else {
            None
        }
    }

    /// Identity reference of the team on a side.
    pub fn team_id(&self, side: TeamSide) -> Uuid {
        match side {
            TeamSide::One => self.team_one_id,
            TeamSide::Two => self.team_two_id,
        }
    }

    /// Participation status of a side.
    pub fn status(&self, side: TeamSide) -> GameTeamStatus {
        match side {
            TeamSide::One => self.team_one_status,
            TeamSide::Two => self.team_two_status,
        }
    }

    /// Set the participation status of a side.
    pub fn set_status(&mut self, side: TeamSide, status: GameTeamStatus) {
        match side {
            TeamSide::One => self.team_one_status = status,
            TeamSide::Two => self.team_two_status = status,
        }
    }

    /// Score mirror as a `(team one, team two)` pair.
    pub fn scores(&self) -> (u32, u32) {
        (self.team_one_score, self.team_two_score)
    }

    /// Overwrite the score mirror from a `(team one, team two)` pair.
    pub fn set_scores(&mut self, scores: (u32, u32)) {
        self.team_one_score = scores.0;
        self.team_two_score = scores.1;
    }

    /// Store the reconnection token issued to a side's manager.
    pub fn set_token(&mut self, side: TeamSide, token: String) {
        match side {
            TeamSide::One => self.team_one_token = Some(token),
            TeamSide::Two => self.team_two_token = Some(token),
        }
    }
}

/// One possession-to-score unit of play, tracked per reporting side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PointEntity {
    /// Primary key of the point.
    pub id: Uuid,
    /// Owning game.
    pub game_id: Uuid,
    /// 1-based, strictly increasing number within the game.
    pub point_number: u32,
    /// Team one's reporting status on this point.
    pub team_one_status: PointTeamStatus,
    /// Team two's reporting status on this point.
    pub team_two_status: PointTeamStatus,
    /// Team one's cumulative score once this point settles.
    pub team_one_score: u32,
    /// Team two's cumulative score once this point settles.
    pub team_two_score: u32,
    /// Team that pulls to open the point.
    pub pulling_team_id: Uuid,
    /// Team that receives the pull.
    pub receiving_team_id: Uuid,
    /// Team credited with the score, set by the first reporter.
    pub scoring_team_id: Option<Uuid>,
    /// Whether team one's live buffer for this point is still authoritative.
    pub team_one_active: bool,
    /// Whether team two's live buffer for this point is still authoritative.
    pub team_two_active: bool,
    /// Persisted action references for team one, in play order.
    pub team_one_action_ids: Vec<Uuid>,
    /// Persisted action references for team two, in play order.
    pub team_two_action_ids: Vec<Uuid>,
    /// Optimistic version token, bumped on every save.
    pub version: u64,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the point entity was updated.
    pub updated_at: SystemTime,
}

impl PointEntity {
    /// Build a fresh point, FUTURE for both sides, carrying the game's current
    /// score mirror.
    pub fn new(
        game_id: Uuid,
        point_number: u32,
        scores: (u32, u32),
        pulling_team_id: Uuid,
        receiving_team_id: Uuid,
    ) -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            game_id,
            point_number,
            team_one_status: PointTeamStatus::Future,
            team_two_status: PointTeamStatus::Future,
            team_one_score: scores.0,
            team_two_score: scores.1,
            pulling_team_id,
            receiving_team_id,
            scoring_team_id: None,
            team_one_active: false,
            team_two_active: false,
            team_one_action_ids: Vec::new(),
            team_two_action_ids: Vec::new(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reporting status of a side.
    pub fn status(&self, side: TeamSide) -> PointTeamStatus {
        match side {
            TeamSide::One => self.team_one_status,
            TeamSide::Two => self.team_two_status,
        }
    }

    /// Set the reporting status of a side.
    pub fn set_status(&mut self, side: TeamSide, status: PointTeamStatus) {
        match side {
            TeamSide::One => self.team_one_status = status,
            TeamSide::Two => self.team_two_status = status,
        }
    }

    /// Score of a side.
    pub fn score(&self, side: TeamSide) -> u32 {
        match side {
            TeamSide::One => self.team_one_score,
            TeamSide::Two => self.team_two_score,
        }
    }

    /// Set the score of a side.
    pub fn set_score(&mut self, side: TeamSide, score: u32) {
        match side {
            TeamSide::One => self.team_one_score = score,
            TeamSide::Two => self.team_two_score = score,
        }
    }

    /// Scores as a `(team one, team two)` pair.
    pub fn scores(&self) -> (u32, u32) {
        (self.team_one_score, self.team_two_score)
    }

    /// Overwrite both scores from a `(team one, team two)` pair.
    pub fn set_scores(&mut self, scores: (u32, u32)) {
        self.team_one_score = scores.0;
        self.team_two_score = scores.1;
    }

    /// Live-buffer flag of a side.
    pub fn active(&self, side: TeamSide) -> bool {
        match side {
            TeamSide::One => self.team_one_active,
            TeamSide::Two => self.team_two_active,
        }
    }

    /// Set the live-buffer flag of a side.
    pub fn set_active(&mut self, side: TeamSide, active: bool) {
        match side {
            TeamSide::One => self.team_one_active = active,
            TeamSide::Two => self.team_two_active = active,
        }
    }

    /// Persisted action references of a side.
    pub fn action_ids(&self, side: TeamSide) -> &[Uuid] {
        match side {
            TeamSide::One => &self.team_one_action_ids,
            TeamSide::Two => &self.team_two_action_ids,
        }
    }

    /// Overwrite the persisted action references of a side.
    pub fn set_action_ids(&mut self, side: TeamSide, ids: Vec<Uuid>) {
        match side {
            TeamSide::One => self.team_one_action_ids = ids,
            TeamSide::Two => self.team_two_action_ids = ids,
        }
    }
}

/// A single persisted play-by-play action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionEntity {
    /// Primary key of the action.
    pub id: Uuid,
    /// Owning point.
    pub point_id: Uuid,
    /// 1-based sequence number scoped to `(point, team)`.
    pub action_number: u32,
    /// What happened.
    pub kind: ActionKind,
    /// Team whose reporter recorded the action.
    pub team_id: Uuid,
    /// Players involved, in roster order.
    pub player_ids: Vec<Uuid>,
    /// Free-text reporter comment.
    pub comment: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

/// Ephemeral action payload held in the live buffer.
///
/// Same shape as [`ActionEntity`] minus identity and the owning-point key; the
/// buffer addresses it purely by cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LiveAction {
    /// What happened.
    pub kind: ActionKind,
    /// Team whose reporter recorded the action.
    pub team_id: Uuid,
    /// Players involved, in roster order.
    pub player_ids: Vec<Uuid>,
    /// Free-text reporter comment.
    pub comment: Option<String>,
    /// Free-form tags.
    pub tags: Vec<String>,
}

impl From<ActionEntity> for LiveAction {
    fn from(action: ActionEntity) -> Self {
        Self {
            kind: action.kind,
            team_id: action.team_id,
            player_ids: action.player_ids,
            comment: action.comment,
            tags: action.tags,
        }
    }
}

/// Tournament a game belongs to, matched by its external event identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TournamentEntity {
    /// Primary key of the tournament.
    pub id: Uuid,
    /// Identifier of the event in the external scheduling system.
    pub external_event_id: String,
    /// Display name.
    pub name: String,
    /// Free-text location.
    pub location: Option<String>,
}
