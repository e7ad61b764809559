//! Per-team point status lattice and side addressing.
//!
//! Each point tracks an independent status for both reporting teams. The
//! forward path is FUTURE -> ACTIVE -> COMPLETE; COMPLETE -> ACTIVE is only
//! reachable through an explicit back-point or a reentry reversal, and
//! ACTIVE -> FUTURE only through a back-point on the following point.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One of the two reporting sides of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    /// The side stored in the `team_one` slots.
    One,
    /// The side stored in the `team_two` slots.
    Two,
}

impl TeamSide {
    /// The other reporting side.
    pub fn opponent(self) -> Self {
        match self {
            TeamSide::One => TeamSide::Two,
            TeamSide::Two => TeamSide::One,
        }
    }
}

impl std::fmt::Display for TeamSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamSide::One => write!(f, "one"),
            TeamSide::Two => write!(f, "two"),
        }
    }
}

/// Status of one team's reporting on a single point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointTeamStatus {
    /// The point exists (usually created by the other side) but this team has
    /// not started reporting it.
    Future,
    /// This team is currently reporting the point.
    Active,
    /// This team has declared the point finished.
    Complete,
}

/// Status of one team's participation in a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameTeamStatus {
    /// The team slot was declared but no manager has joined yet.
    Defined,
    /// An unregistered opponent imported or mirrored by the other side.
    Guest,
    /// The team is live-reporting the game.
    Active,
    /// The team has finished reporting the game.
    Complete,
}

/// Error returned when a point pair is not in the state required by a
/// back-point request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "cannot back point {point_number}: status is {status:?} and the preceding point is {previous_status:?}"
)]
pub struct InvalidTransition {
    /// Number of the point the caller asked to roll back.
    pub point_number: u32,
    /// The caller's status on that point.
    pub status: PointTeamStatus,
    /// The caller's status on the preceding point.
    pub previous_status: PointTeamStatus,
}

/// Validate that a back-point may run for a team, given its status on the
/// rolled-back point and on the point preceding it.
///
/// The rolled-back point must be ACTIVE and the preceding one COMPLETE; the
/// pair then swaps to FUTURE/ACTIVE.
pub fn validate_back_point(
    point_number: u32,
    status: PointTeamStatus,
    previous_status: PointTeamStatus,
) -> Result<(), InvalidTransition> {
    if status == PointTeamStatus::Active && previous_status == PointTeamStatus::Complete {
        Ok(())
    } else {
        Err(InvalidTransition {
            point_number,
            status,
            previous_status,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_swaps_sides() {
        assert_eq!(TeamSide::One.opponent(), TeamSide::Two);
        assert_eq!(TeamSide::Two.opponent(), TeamSide::One);
    }

    #[test]
    fn back_point_requires_active_over_complete() {
        assert!(validate_back_point(4, PointTeamStatus::Active, PointTeamStatus::Complete).is_ok());
    }

    #[test]
    fn back_point_rejects_other_pairs() {
        let pairs = [
            (PointTeamStatus::Future, PointTeamStatus::Complete),
            (PointTeamStatus::Complete, PointTeamStatus::Complete),
            (PointTeamStatus::Active, PointTeamStatus::Active),
            (PointTeamStatus::Active, PointTeamStatus::Future),
        ];
        for (status, previous) in pairs {
            let err = validate_back_point(2, status, previous).unwrap_err();
            assert_eq!(err.point_number, 2);
            assert_eq!(err.status, status);
            assert_eq!(err.previous_status, previous);
        }
    }
}
