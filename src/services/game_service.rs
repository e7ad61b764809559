//! Game lifecycle: finishing a side's reporting and reentering after a
//! disconnect or a mistaken finish.

use rand::{Rng, distr::Alphanumeric};
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{match_store::MatchStore as _, models::LiveAction},
    dto::{game::{GameSummary, ReentryDetail}, stats::PointRetractionPayload},
    error::ServiceError,
    gateway::DispatchMethod,
    services::{POINT_RETRACT_ENDPOINT, point_service, task_payload},
    state::{
        SharedState,
        point::{GameTeamStatus, PointTeamStatus, TeamSide},
    },
};

fn reconnection_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}

/// Close out a side's reporting of a game.
///
/// Points neither side ever started are dropped; points the other side still
/// reports stay untouched. Idempotent.
pub async fn finish_game(
    state: &SharedState,
    game_id: Uuid,
    side: TeamSide,
) -> Result<GameSummary, ServiceError> {
    let store = state.require_store().await?;
    let mut game = point_service::load_game(&store, game_id).await?;

    let removed = store.delete_future_points(game_id).await?;
    if !removed.is_empty() {
        game.point_ids.retain(|id| !removed.contains(id));
    }
    game.set_status(side, GameTeamStatus::Complete);
    store.save_game(game.clone()).await?;

    info!(%game_id, %side, removed = removed.len(), "game finished");
    Ok(game.into())
}

/// Resume a team's live reporting of a game.
///
/// Requires a valid manager credential. Returns the point the side was
/// reporting, reopening its latest completed point when the finish has to be
/// taken back, together with the side's restored live buffer and a fresh
/// reconnection token.
pub async fn reenter_game(
    state: &SharedState,
    game_id: Uuid,
    jwt: String,
    team_id: Uuid,
) -> Result<ReentryDetail, ServiceError> {
    let store = state.require_store().await?;
    state.identity().authenticate_manager(jwt, team_id).await?;

    let mut game = point_service::load_game(&store, game_id).await?;
    let side = game.side_of(team_id).ok_or_else(|| {
        ServiceError::NotFound(format!("team `{team_id}` does not play game `{game_id}`"))
    })?;

    game.set_status(side, GameTeamStatus::Active);
    let token = reconnection_token();
    game.set_token(side, token.clone());

    let resume = match store.active_point(game_id, side).await? {
        Some(point) => Some(point),
        None => store.latest_complete_point(game_id, side).await?,
    };
    let Some(mut point) = resume else {
        store.save_game(game.clone()).await?;
        return Ok(ReentryDetail {
            game: game.into(),
            point: None,
            actions: Vec::new(),
            token,
        });
    };

    let buffer = state.buffer(game_id, point.id);
    if point.status(side) == PointTeamStatus::Complete {
        // A finished point means the disconnect hit after the finish; the
        // finish is reversed so the team resumes mid-point.
        let entering = point_service::scores_before(&store, game_id, point.point_number).await?;
        point.set_scores(entering);
        point.scoring_team_id = None;
        game.set_scores(entering);

        buffer
            .record_assignment(point.pulling_team_id, point.receiving_team_id)
            .await?;
        let persisted = store.actions_for(point.id, team_id).await?;
        let restored: Vec<(u32, LiveAction)> = persisted
            .into_iter()
            .map(|action| (action.action_number, LiveAction::from(action)))
            .collect();
        buffer.restore(side, &restored).await?;
        store.delete_actions(point.id, team_id).await?;
        point.set_action_ids(side, Vec::new());
        point.set_status(side, PointTeamStatus::Active);
        point.set_active(side, true);
        store.save_point(point.clone()).await?;

        let retraction = PointRetractionPayload {
            game_id,
            point_id: point.id,
            point_number: point.point_number,
            team_id,
        };
        state
            .dispatcher()
            .enqueue(
                POINT_RETRACT_ENDPOINT.into(),
                task_payload(POINT_RETRACT_ENDPOINT, &retraction)?,
                DispatchMethod::Post,
            )
            .await?;
    }
    store.save_game(game.clone()).await?;

    let actions = buffer.read_all(side).await?;
    info!(%game_id, %side, point_number = point.point_number, "team reentered");
    Ok(ReentryDetail {
        game: game.into(),
        point: Some(point.into()),
        actions,
        token,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        cache::memory::MemoryLiveCache,
        dao::{
            match_store::{MatchStore, memory::MemoryMatchStore},
            models::{ActionKind, GameEntity, PointEntity},
        },
        dto::{
            point::{RecordActionRequest, StartPointRequest},
            stats::FinalizeTask,
        },
        gateway::memory::{FakeIdentityGateway, RecordingDispatcher},
        services::finalize_service,
        state::{AppState, SharedState, point::TeamSide},
    };

    struct Harness {
        state: SharedState,
        store: MemoryMatchStore,
        dispatcher: RecordingDispatcher,
        game: GameEntity,
    }

    async fn harness_with(identity: FakeIdentityGateway) -> Harness {
        let store = MemoryMatchStore::new();
        let dispatcher = RecordingDispatcher::new();
        let state = AppState::new(
            Arc::new(MemoryLiveCache::new()),
            Arc::new(identity),
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
            dispatcher,
            game,
        }
    }

    async fn harness() -> Harness {
        harness_with(FakeIdentityGateway::allowing()).await
    }

    async fn finish_first_point(harness: &Harness) -> Uuid {
        let opened = point_service::start_point(
            &harness.state,
            harness.game.id,
            StartPointRequest {
                team: TeamSide::One,
                point_number: 0,
                pulling_team_id: harness.game.team_one_id,
            },
        )
        .await
        .unwrap();
        for kind in [ActionKind::Pull, ActionKind::Catch, ActionKind::TeamOneScore] {
            point_service::record_action(
                &harness.state,
                harness.game.id,
                opened.point.id,
                RecordActionRequest {
                    team: TeamSide::One,
                    kind,
                    player_ids: vec![],
                    comment: None,
                    tags: vec![],
                },
            )
            .await
            .unwrap();
        }
        point_service::finish_point(&harness.state, harness.game.id, opened.point.id, TeamSide::One)
            .await
            .unwrap();
        opened.point.id
    }

    async fn play_first_point(harness: &Harness) -> Uuid {
        let point_id = finish_first_point(harness).await;
        finalize_service::finalize_point(
            &harness.state,
            FinalizeTask {
                game_id: harness.game.id,
                point_id,
                team: TeamSide::One,
            },
        )
        .await
        .unwrap();
        point_id
    }

    #[tokio::test]
    async fn finish_game_drops_untouched_points() {
        let harness = harness().await;
        let played = play_first_point(&harness).await;

        // A point nobody ever started.
        let stale = PointEntity::new(
            harness.game.id,
            2,
            (1, 0),
            harness.game.team_two_id,
            harness.game.team_one_id,
        );
        let stale_id = stale.id;
        harness.store.save_point(stale).await.unwrap();
        let mut game = harness
            .store
            .find_game(harness.game.id)
            .await
            .unwrap()
            .unwrap();
        game.point_ids.push(stale_id);
        harness.store.save_game(game).await.unwrap();

        let summary = finish_game(&harness.state, harness.game.id, TeamSide::One)
            .await
            .unwrap();

        assert_eq!(summary.team_one_status, GameTeamStatus::Complete);
        assert_eq!(summary.team_two_status, GameTeamStatus::Active);
        assert_eq!(summary.point_ids, vec![played]);
        assert!(
            harness
                .store
                .find_point(stale_id)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn reentry_resumes_an_open_point() {
        let harness = harness().await;
        let opened = point_service::start_point(
            &harness.state,
            harness.game.id,
            StartPointRequest {
                team: TeamSide::One,
                point_number: 0,
                pulling_team_id: harness.game.team_one_id,
            },
        )
        .await
        .unwrap();
        point_service::record_action(
            &harness.state,
            harness.game.id,
            opened.point.id,
            RecordActionRequest {
                team: TeamSide::One,
                kind: ActionKind::Pull,
                player_ids: vec![],
                comment: None,
                tags: vec![],
            },
        )
        .await
        .unwrap();

        let detail = reenter_game(
            &harness.state,
            harness.game.id,
            "jwt".into(),
            harness.game.team_one_id,
        )
        .await
        .unwrap();

        let point = detail.point.unwrap();
        assert_eq!(point.id, opened.point.id);
        assert_eq!(point.team_one_status, PointTeamStatus::Active);
        assert_eq!(detail.actions.len(), 1);
        assert!(!detail.token.is_empty());
        // No finish was taken back.
        assert!(harness.dispatcher.tasks_for(POINT_RETRACT_ENDPOINT).is_empty());
    }

    #[tokio::test]
    async fn reentry_reverses_a_finished_point() {
        let harness = harness().await;
        let point_id = play_first_point(&harness).await;

        let detail = reenter_game(
            &harness.state,
            harness.game.id,
            "jwt".into(),
            harness.game.team_one_id,
        )
        .await
        .unwrap();

        let point = detail.point.unwrap();
        assert_eq!(point.id, point_id);
        assert_eq!(point.team_one_status, PointTeamStatus::Active);
        assert!(point.team_one_active);
        assert_eq!((point.team_one_score, point.team_two_score), (0, 0));
        assert_eq!(point.scoring_team_id, None);
        assert_eq!(detail.actions.len(), 3);
        assert_eq!(detail.actions[2].kind, ActionKind::TeamOneScore);

        // The persisted record moved back into the buffer.
        assert!(
            harness
                .store
                .actions_for(point_id, harness.game.team_one_id)
                .await
                .unwrap()
                .is_empty()
        );
        let game = harness
            .store
            .find_game(harness.game.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(game.scores(), (0, 0));
        assert_eq!(game.team_one_token, Some(detail.token.clone()));
        assert_eq!(harness.dispatcher.tasks_for(POINT_RETRACT_ENDPOINT).len(), 1);

        // Finishing again replays the same outcome.
        let refinished =
            point_service::finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
                .await
                .unwrap();
        assert_eq!(refinished.point.team_one_score, 1);
    }

    #[tokio::test]
    async fn reentry_before_the_finalizer_runs_keeps_the_buffer() {
        let harness = harness().await;
        let point_id = finish_first_point(&harness).await;
        // The finalize task is still queued; the live buffer holds the only
        // copy of the side's log.

        let detail = reenter_game(
            &harness.state,
            harness.game.id,
            "jwt".into(),
            harness.game.team_one_id,
        )
        .await
        .unwrap();

        let point = detail.point.unwrap();
        assert_eq!(point.id, point_id);
        assert_eq!(point.team_one_status, PointTeamStatus::Active);
        assert_eq!(detail.actions.len(), 3);
        assert_eq!(detail.actions[2].kind, ActionKind::TeamOneScore);
    }

    #[tokio::test]
    async fn reentry_without_points_returns_no_point() {
        let harness = harness().await;
        let detail = reenter_game(
            &harness.state,
            harness.game.id,
            "jwt".into(),
            harness.game.team_two_id,
        )
        .await
        .unwrap();
        assert!(detail.point.is_none());
        assert!(detail.actions.is_empty());
        assert_eq!(detail.game.team_two_status, GameTeamStatus::Active);
    }

    #[tokio::test]
    async fn reentry_requires_a_valid_credential() {
        let harness = harness_with(FakeIdentityGateway::denying()).await;
        let err = reenter_game(
            &harness.state,
            harness.game.id,
            "jwt".into(),
            harness.game.team_one_id,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
