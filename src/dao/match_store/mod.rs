//! Persistence boundary for games, points, actions, and tournaments.

/// In-memory store used by tests and storage-less development runs.
pub mod memory;
/// MongoDB-backed store.
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::{ActionEntity, GameEntity, PointEntity, TournamentEntity};
use crate::dao::storage::StorageResult;
use crate::state::point::TeamSide;

/// Abstraction over the persistence layer for match entities.
///
/// Every method is a single request to the backend; failures propagate
/// unrecovered to the caller.
pub trait MatchStore: Send + Sync {
    /// Upsert a game, replacing any previous state.
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a game by id.
    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>>;

    /// Fetch a point by id.
    fn find_point(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PointEntity>>>;
    /// Fetch a point by its number within a game.
    fn find_point_by_number(
        &self,
        game_id: Uuid,
        point_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>>;
    /// Find the point keyed by the template's `(game_id, point_number)`,
    /// inserting the template when no such point exists yet.
    ///
    /// Returns the stored point and whether it was freshly created. Safe
    /// against the two sides racing to create the same point.
    fn find_or_create_point(
        &self,
        template: PointEntity,
    ) -> BoxFuture<'static, StorageResult<(PointEntity, bool)>>;
    /// Upsert a point, bumping its version.
    fn save_point(&self, point: PointEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Record a team's finalized action ids and clear its active flag, but
    /// only if the flag is still set.
    ///
    /// Returns the updated point when the conditional update matched, `None`
    /// when another delivery already claimed the flag. This is what keeps
    /// duplicate finalizer deliveries from double-firing.
    fn record_finalized_actions(
        &self,
        point_id: Uuid,
        side: TeamSide,
        action_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>>;
    /// The point a side is currently reporting, if any.
    fn active_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>>;
    /// The highest-numbered point a side has completed, if any.
    fn latest_complete_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>>;
    /// Delete every point of a game still FUTURE for both sides, returning
    /// the ids removed so callers can prune their references.
    fn delete_future_points(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<Uuid>>>;

    /// Upsert an action keyed by `(point_id, team_id, action_number)`,
    /// returning the id of the stored document.
    fn upsert_action(&self, action: ActionEntity) -> BoxFuture<'static, StorageResult<Uuid>>;
    /// All persisted actions of a team on a point, ordered by action number.
    fn actions_for(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActionEntity>>>;
    /// The most recent persisted action of a team on a point.
    fn last_action(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ActionEntity>>>;
    /// Delete a team's persisted actions on a point, returning the number
    /// removed. Deleting an empty set is a no-op.
    fn delete_actions(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>>;

    /// Fetch a tournament by its external event identifier.
    fn find_tournament_by_event(
        &self,
        external_event_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>>;
    /// Upsert a tournament.
    fn save_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;

    /// Verify the backend is reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
