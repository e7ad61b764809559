//! DashMap-backed match store.
//!
//! Backs the service tests and storage-less development runs; behavior matches
//! the MongoDB store operation by operation, including the conditional update
//! semantics of `record_finalized_actions`.

use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    match_store::MatchStore,
    models::{ActionEntity, GameEntity, PointEntity, TournamentEntity},
    storage::StorageResult,
};
use crate::state::point::{PointTeamStatus, TeamSide};

/// In-memory [`MatchStore`].
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    games: DashMap<Uuid, GameEntity>,
    points: DashMap<Uuid, PointEntity>,
    actions: DashMap<Uuid, ActionEntity>,
    tournaments: DashMap<Uuid, TournamentEntity>,
    // Serializes find-or-create so two sides cannot both insert the same
    // (game, point_number) pair.
    point_creation: Mutex<()>,
}

impl MemoryMatchStore {
    /// Fresh, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn point_by_number(&self, game_id: Uuid, point_number: u32) -> Option<PointEntity> {
        self.inner
            .points
            .iter()
            .find(|entry| entry.game_id == game_id && entry.point_number == point_number)
            .map(|entry| entry.clone())
    }

    fn team_points(&self, game_id: Uuid, side: TeamSide, status: PointTeamStatus) -> Vec<PointEntity> {
        self.inner
            .points
            .iter()
            .filter(|entry| entry.game_id == game_id && entry.status(side) == status)
            .map(|entry| entry.clone())
            .collect()
    }

    fn sorted_actions(&self, point_id: Uuid, team_id: Uuid) -> Vec<ActionEntity> {
        let mut actions: Vec<ActionEntity> = self
            .inner
            .actions
            .iter()
            .filter(|entry| entry.point_id == point_id && entry.team_id == team_id)
            .map(|entry| entry.clone())
            .collect();
        actions.sort_by_key(|action| action.action_number);
        actions
    }
}

impl MatchStore for MemoryMatchStore {
    fn save_game(&self, mut game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            game.updated_at = SystemTime::now();
            store.inner.games.insert(game.id, game);
            Ok(())
        })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.games.get(&id).map(|entry| entry.clone())) })
    }

    fn find_point(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.inner.points.get(&id).map(|entry| entry.clone())) })
    }

    fn find_point_by_number(
        &self,
        game_id: Uuid,
        point_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.point_by_number(game_id, point_number)) })
    }

    fn find_or_create_point(
        &self,
        template: PointEntity,
    ) -> BoxFuture<'static, StorageResult<(PointEntity, bool)>> {
        let store = self.clone();
        Box::pin(async move {
            let _guard = store
                .inner
                .point_creation
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(existing) = store.point_by_number(template.game_id, template.point_number) {
                return Ok((existing, false));
            }
            store.inner.points.insert(template.id, template.clone());
            Ok((template, true))
        })
    }

    fn save_point(&self, mut point: PointEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            point.version += 1;
            point.updated_at = SystemTime::now();
            store.inner.points.insert(point.id, point);
            Ok(())
        })
    }

    fn record_finalized_actions(
        &self,
        point_id: Uuid,
        side: TeamSide,
        action_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let Some(mut entry) = store.inner.points.get_mut(&point_id) else {
                return Ok(None);
            };
            if !entry.active(side) || entry.status(side) != PointTeamStatus::Complete {
                return Ok(None);
            }
            entry.set_action_ids(side, action_ids);
            entry.set_active(side, false);
            entry.version += 1;
            Ok(Some(entry.clone()))
        })
    }

    fn active_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut points = store.team_points(game_id, side, PointTeamStatus::Active);
            points.sort_by_key(|point| point.point_number);
            Ok(points.into_iter().next())
        })
    }

    fn latest_complete_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let mut points = store.team_points(game_id, side, PointTeamStatus::Complete);
            points.sort_by_key(|point| point.point_number);
            Ok(points.pop())
        })
    }

    fn delete_future_points(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move {
            let doomed: Vec<Uuid> = store
                .inner
                .points
                .iter()
                .filter(|entry| {
                    entry.game_id == game_id
                        && entry.team_one_status == PointTeamStatus::Future
                        && entry.team_two_status == PointTeamStatus::Future
                })
                .map(|entry| entry.id)
                .collect();
            for id in &doomed {
                store.inner.points.remove(id);
            }
            Ok(doomed)
        })
    }

    fn upsert_action(&self, action: ActionEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move {
            // Re-deliveries keep the already-stored identity.
            let existing = store
                .inner
                .actions
                .iter()
                .find(|entry| {
                    entry.point_id == action.point_id
                        && entry.team_id == action.team_id
                        && entry.action_number == action.action_number
                })
                .map(|entry| entry.id);
            if let Some(id) = existing {
                return Ok(id);
            }
            let id = action.id;
            store.inner.actions.insert(id, action);
            Ok(id)
        })
    }

    fn actions_for(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.sorted_actions(point_id, team_id)) })
    }

    fn last_action(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ActionEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.sorted_actions(point_id, team_id).pop()) })
    }

    fn delete_actions(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            let doomed: Vec<Uuid> = store
                .sorted_actions(point_id, team_id)
                .into_iter()
                .map(|action| action.id)
                .collect();
            let count = doomed.len() as u64;
            for id in doomed {
                store.inner.actions.remove(&id);
            }
            Ok(count)
        })
    }

    fn find_tournament_by_event(
        &self,
        external_event_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            Ok(store
                .inner
                .tournaments
                .iter()
                .find(|entry| entry.external_event_id == external_event_id)
                .map(|entry| entry.clone()))
        })
    }

    fn save_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.inner.tournaments.insert(tournament.id, tournament);
            Ok(())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
