//! Migration of a finished side's live buffer into the store.
//!
//! Runs from redelivered tasks, so every step tolerates duplicate delivery:
//! actions upsert by their `(point, team, number)` key, the active-flag flip is
//! conditional, and cache deletes are no-ops the second time.

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{match_store::MatchStore as _, models::ActionEntity},
    dto::stats::{FinalizeTask, PointStatsPayload},
    error::ServiceError,
    gateway::DispatchMethod,
    services::{POINT_STATS_ENDPOINT, point_service::load_game, task_payload},
    state::{SharedState, point::PointTeamStatus},
};

/// Move one side's buffered actions into the store and, once both sides are
/// migrated, emit the consolidated point summary.
pub async fn finalize_point(state: &SharedState, task: FinalizeTask) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    let game = load_game(&store, task.game_id).await?;
    let side = task.team;
    let team_id = game.team_id(side);
    let buffer = state.buffer(task.game_id, task.point_id);

    // A delivery only applies while the side's finish still stands; reentry
    // and back-point reopen the point and make older tasks stale.
    let snapshot = store
        .find_point(task.point_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("point `{}`", task.point_id)))?;
    if !snapshot.active(side) || snapshot.status(side) != PointTeamStatus::Complete {
        debug!(point_id = %task.point_id, %side, "finalize delivery no longer applies");
        return Ok(());
    }

    let live = buffer.read_all(side).await?;
    let mut action_ids = Vec::with_capacity(live.len());
    for (offset, action) in live.iter().enumerate() {
        let entity = ActionEntity {
            id: Uuid::new_v4(),
            point_id: task.point_id,
            action_number: offset as u32 + 1,
            kind: action.kind,
            team_id,
            player_ids: action.player_ids.clone(),
            comment: action.comment.clone(),
            tags: action.tags.clone(),
        };
        action_ids.push(store.upsert_action(entity).await?);
    }

    // The conditional flip is the idempotence pivot: only the delivery that
    // actually clears the flag may emit the summary.
    let settled = store
        .record_finalized_actions(task.point_id, side, action_ids)
        .await?;

    let Some(point) = settled else {
        // Lost the race against a reentry or a concurrent duplicate; the live
        // buffer stays as it is.
        debug!(point_id = %task.point_id, %side, "finalize delivery superseded");
        return Ok(());
    };
    buffer.drain_team(side).await?;

    if !point.team_one_active && !point.team_two_active {
        buffer.drain_team(side.opponent()).await?;
        buffer.drain_shared().await?;

        let team_one_actions = store.actions_for(task.point_id, game.team_one_id).await?;
        let team_two_actions = store.actions_for(task.point_id, game.team_two_id).await?;
        let payload = PointStatsPayload::new(&point, team_one_actions, team_two_actions);
        state
            .dispatcher()
            .enqueue(
                POINT_STATS_ENDPOINT.into(),
                task_payload(POINT_STATS_ENDPOINT, &payload)?,
                DispatchMethod::Post,
            )
            .await?;
        info!(point_id = %task.point_id, point_number = point.point_number, "point summary dispatched");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cache::memory::MemoryLiveCache,
        dao::{
            match_store::{MatchStore, memory::MemoryMatchStore},
            models::{ActionKind, GameEntity},
        },
        dto::point::{RecordActionRequest, StartPointRequest},
        gateway::memory::{FakeIdentityGateway, RecordingDispatcher},
        services::{FINALIZE_TASK_ENDPOINT, game_service, point_service},
        state::{
            AppState, SharedState,
            point::{GameTeamStatus, TeamSide},
        },
    };

    struct Harness {
        state: SharedState,
        store: MemoryMatchStore,
        cache: MemoryLiveCache,
        dispatcher: RecordingDispatcher,
        game: GameEntity,
    }

    async fn harness() -> Harness {
        let store = MemoryMatchStore::new();
        let cache = MemoryLiveCache::new();
        let dispatcher = RecordingDispatcher::new();
        let state = AppState::new(
            Arc::new(cache.clone()),
            Arc::new(FakeIdentityGateway::allowing()),
            Arc::new(dispatcher.clone()),
        );
        state.install_store(Arc::new(store.clone())).await;

        let mut game = GameEntity::new(Uuid::new_v4(), Uuid::new_v4());
        game.set_status(TeamSide::One, GameTeamStatus::Active);
        game.set_status(TeamSide::Two, GameTeamStatus::Active);
        store.save_game(game.clone()).await.unwrap();
        Harness {
            state,
            store,
            cache,
            dispatcher,
            game,
        }
    }

    async fn play_point(harness: &Harness, team: TeamSide, kinds: &[ActionKind]) -> Uuid {
        let opened = point_service::start_point(
            &harness.state,
            harness.game.id,
            StartPointRequest {
                team,
                point_number: 0,
                pulling_team_id: harness.game.team_one_id,
            },
        )
        .await
        .unwrap();
        for kind in kinds {
            point_service::record_action(
                &harness.state,
                harness.game.id,
                opened.point.id,
                RecordActionRequest {
                    team,
                    kind: *kind,
                    player_ids: vec![],
                    comment: None,
                    tags: vec![],
                },
            )
            .await
            .unwrap();
        }
        point_service::finish_point(&harness.state, harness.game.id, opened.point.id, team)
            .await
            .unwrap();
        opened.point.id
    }

    fn task(harness: &Harness, point_id: Uuid, team: TeamSide) -> FinalizeTask {
        FinalizeTask {
            game_id: harness.game.id,
            point_id,
            team,
        }
    }

    #[tokio::test]
    async fn migrates_the_buffer_into_the_store() {
        let harness = harness().await;
        // Side two joined the point, so its flag holds the summary back.
        point_service::start_point(
            &harness.state,
            harness.game.id,
            StartPointRequest {
                team: TeamSide::Two,
                point_number: 0,
                pulling_team_id: harness.game.team_one_id,
            },
        )
        .await
        .unwrap();
        let point_id = play_point(
            &harness,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::Catch, ActionKind::TeamOneScore],
        )
        .await;

        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();

        let persisted = harness
            .store
            .actions_for(point_id, harness.game.team_one_id)
            .await
            .unwrap();
        assert_eq!(persisted.len(), 3);
        assert_eq!(
            persisted.iter().map(|a| a.action_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        let point = harness.store.find_point(point_id).await.unwrap().unwrap();
        assert!(!point.team_one_active);
        assert!(point.team_two_active);
        assert_eq!(point.team_one_action_ids.len(), 3);

        // Buffer emptied for side one, untouched for side two, no summary yet.
        let buffer = harness.state.buffer(harness.game.id, point_id);
        assert_eq!(buffer.count_for(TeamSide::One).await.unwrap(), 0);
        assert!(harness.dispatcher.tasks_for(POINT_STATS_ENDPOINT).is_empty());
    }

    #[tokio::test]
    async fn second_finalizer_emits_one_summary() {
        let harness = harness().await;
        let point_id = play_point(&harness, TeamSide::One, &[ActionKind::TeamOneScore]).await;
        point_service::start_point(
            &harness.state,
            harness.game.id,
            StartPointRequest {
                team: TeamSide::Two,
                point_number: 0,
                pulling_team_id: harness.game.team_one_id,
            },
        )
        .await
        .unwrap();
        point_service::record_action(
            &harness.state,
            harness.game.id,
            point_id,
            RecordActionRequest {
                team: TeamSide::Two,
                kind: ActionKind::TeamOneScore,
                player_ids: vec![],
                comment: None,
                tags: vec![],
            },
        )
        .await
        .unwrap();
        point_service::finish_point(&harness.state, harness.game.id, point_id, TeamSide::Two)
            .await
            .unwrap();

        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();
        assert!(harness.dispatcher.tasks_for(POINT_STATS_ENDPOINT).is_empty());
        finalize_point(&harness.state, task(&harness, point_id, TeamSide::Two))
            .await
            .unwrap();

        let summaries = harness.dispatcher.tasks_for(POINT_STATS_ENDPOINT);
        assert_eq!(summaries.len(), 1);
        let payload = &summaries[0].payload;
        assert_eq!(payload["team_one_actions"].as_array().unwrap().len(), 1);
        assert_eq!(payload["team_two_actions"].as_array().unwrap().len(), 1);

        // Every cache key of the point is gone.
        assert!(harness.cache.keys().is_empty());
    }

    #[tokio::test]
    async fn duplicate_delivery_changes_nothing() {
        let harness = harness().await;
        let point_id = play_point(
            &harness,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::TeamOneScore],
        )
        .await;

        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();
        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();

        let persisted = harness
            .store
            .actions_for(point_id, harness.game.team_one_id)
            .await
            .unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(harness.dispatcher.tasks_for(POINT_STATS_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn stale_delivery_after_a_reentry_is_ignored() {
        let harness = harness().await;
        let point_id = play_point(
            &harness,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::Catch, ActionKind::TeamOneScore],
        )
        .await;
        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();
        // Reentry takes the finish back and pulls the persisted log into the
        // live buffer.
        game_service::reenter_game(
            &harness.state,
            harness.game.id,
            "jwt".into(),
            harness.game.team_one_id,
        )
        .await
        .unwrap();

        // A redelivered copy of the old task arrives while the side reports.
        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();

        let buffer = harness.state.buffer(harness.game.id, point_id);
        assert_eq!(buffer.count_for(TeamSide::One).await.unwrap(), 3);
        assert!(
            harness
                .store
                .actions_for(point_id, harness.game.team_one_id)
                .await
                .unwrap()
                .is_empty()
        );
        let point = harness.store.find_point(point_id).await.unwrap().unwrap();
        assert_eq!(point.status(TeamSide::One), PointTeamStatus::Active);
        assert!(point.team_one_active);
        assert_eq!(harness.dispatcher.tasks_for(POINT_STATS_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn lone_reporter_still_produces_a_summary() {
        let harness = harness().await;
        let point_id = play_point(&harness, TeamSide::One, &[ActionKind::TeamOneScore]).await;

        // Side two never joined; its flag was never raised.
        finalize_point(&harness.state, task(&harness, point_id, TeamSide::One))
            .await
            .unwrap();

        let summaries = harness.dispatcher.tasks_for(POINT_STATS_ENDPOINT);
        assert_eq!(summaries.len(), 1);
        assert_eq!(
            summaries[0].payload["team_two_actions"].as_array().unwrap().len(),
            0
        );
        assert_eq!(harness.dispatcher.tasks_for(FINALIZE_TASK_ENDPOINT).len(), 1);
    }
}
