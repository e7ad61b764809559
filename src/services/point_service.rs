//! Live point lifecycle: start, record, finish, back.
//!
//! The two sides report the same physical point independently. The first side
//! to finish settles the score; the second side's finish is a cross-check that
//! either confirms the record or is rejected for a manual resync.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore,
        models::{GameEntity, LiveAction, PointEntity},
    },
    dto::{
        point::{PointDetail, RecordActionRequest, RecordedAction, StartPointRequest},
        stats::FinalizeTask,
    },
    error::ServiceError,
    gateway::DispatchMethod,
    services::{FINALIZE_TASK_ENDPOINT, task_payload},
    state::{
        SharedState,
        point::{PointTeamStatus, TeamSide, validate_back_point},
    },
};

pub(crate) async fn load_game(
    store: &Arc<dyn MatchStore>,
    game_id: Uuid,
) -> Result<GameEntity, ServiceError> {
    store
        .find_game(game_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("game `{game_id}`")))
}

async fn load_point(
    store: &Arc<dyn MatchStore>,
    game_id: Uuid,
    point_id: Uuid,
) -> Result<PointEntity, ServiceError> {
    let point = store
        .find_point(point_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("point `{point_id}`")))?;
    if point.game_id != game_id {
        return Err(ServiceError::NotFound(format!(
            "point `{point_id}` in game `{game_id}`"
        )));
    }
    Ok(point)
}

/// Cumulative scores entering a point, read from the preceding point's record.
pub(crate) async fn scores_before(
    store: &Arc<dyn MatchStore>,
    game_id: Uuid,
    point_number: u32,
) -> Result<(u32, u32), ServiceError> {
    if point_number <= 1 {
        return Ok((0, 0));
    }
    Ok(store
        .find_point_by_number(game_id, point_number - 1)
        .await?
        .map(|previous| previous.scores())
        .unwrap_or((0, 0)))
}

/// Open the point following `request.point_number` for the reporting side.
///
/// The point record is shared between the sides; whichever side calls first
/// creates it and the other side joins it. Calling again for a side that
/// already joined restarts its live log from empty.
pub async fn start_point(
    state: &SharedState,
    game_id: Uuid,
    request: StartPointRequest,
) -> Result<PointDetail, ServiceError> {
    let store = state.require_store().await?;
    let mut game = load_game(&store, game_id).await?;
    let side = request.team;

    let Some(pulling_side) = game.side_of(request.pulling_team_id) else {
        return Err(ServiceError::NotFound(format!(
            "team `{}` does not play game `{game_id}`",
            request.pulling_team_id
        )));
    };
    let receiving_team_id = game.team_id(pulling_side.opponent());

    let point_number = request.point_number + 1;
    let template = PointEntity::new(
        game_id,
        point_number,
        game.scores(),
        request.pulling_team_id,
        receiving_team_id,
    );
    let (mut point, created) = store.find_or_create_point(template).await?;
    if point.status(side) == PointTeamStatus::Complete {
        return Err(ServiceError::Conflict(format!(
            "point {point_number} is already complete for the reporting side"
        )));
    }
    point.set_status(side, PointTeamStatus::Active);
    point.set_active(side, true);
    store.save_point(point.clone()).await?;
    if created {
        game.point_ids.push(point.id);
        store.save_game(game).await?;
    }

    let buffer = state.buffer(game_id, point.id);
    if created {
        buffer
            .initialize(point.pulling_team_id, point.receiving_team_id)
            .await?;
    } else {
        // The other side may already be buffering; only this side's log is
        // reset.
        buffer.reset_team(side).await?;
        buffer
            .record_assignment(point.pulling_team_id, point.receiving_team_id)
            .await?;
    }

    debug!(%game_id, point_number, %side, created, "point opened");
    Ok(PointDetail {
        point: point.into(),
        actions: Vec::new(),
    })
}

/// Append one action to the reporting side's live buffer.
pub async fn record_action(
    state: &SharedState,
    game_id: Uuid,
    point_id: Uuid,
    request: RecordActionRequest,
) -> Result<RecordedAction, ServiceError> {
    let store = state.require_store().await?;
    let game = load_game(&store, game_id).await?;
    let point = load_point(&store, game_id, point_id).await?;
    if point.status(request.team) != PointTeamStatus::Active {
        return Err(ServiceError::Conflict(format!(
            "point `{point_id}` is not active for the reporting side"
        )));
    }

    let action = LiveAction {
        kind: request.kind,
        team_id: game.team_id(request.team),
        player_ids: request.player_ids,
        comment: request.comment,
        tags: request.tags,
    };
    let index = state
        .buffer(game_id, point_id)
        .push(request.team, &action)
        .await?;
    Ok(RecordedAction { index })
}

/// Declare a point finished for one side.
///
/// The first side to finish must have a score sentinel as its last buffered
/// action; it settles the point's scores and the scoring team. The second
/// side's record is cross-checked against the first side's live or persisted
/// outcome and rejected on disagreement. Either way a finalize task is queued
/// to migrate the side's buffer into the store.
pub async fn finish_point(
    state: &SharedState,
    game_id: Uuid,
    point_id: Uuid,
    side: TeamSide,
) -> Result<PointDetail, ServiceError> {
    let store = state.require_store().await?;
    let mut game = load_game(&store, game_id).await?;
    let mut point = load_point(&store, game_id, point_id).await?;
    if point.status(side) != PointTeamStatus::Active {
        return Err(ServiceError::Conflict(format!(
            "point `{point_id}` is not active for the reporting side"
        )));
    }

    let other = side.opponent();
    let buffer = state.buffer(game_id, point_id);
    let last = buffer.read_last(side).await?;

    if point.status(other) == PointTeamStatus::Complete {
        // Second reporter: the outcome is already settled, never re-score.
        // An empty buffer is accepted as a silent confirmation.
        if let Some(reported) = &last {
            if let Some(theirs) = buffer.read_last(other).await? {
                if theirs.kind != reported.kind {
                    return Err(ServiceError::ConflictingScore {
                        point_id,
                        reported: reported.kind,
                        recorded: theirs.kind,
                    });
                }
            }
            if let Some(saved) = store.last_action(point_id, game.team_id(other)).await? {
                if saved.kind != reported.kind {
                    return Err(ServiceError::ConflictingScore {
                        point_id,
                        reported: reported.kind,
                        recorded: saved.kind,
                    });
                }
            }
        }
    } else {
        let last = last.ok_or(ServiceError::ScoreRequired { point_id })?;
        let scoring = last
            .kind
            .scoring_side()
            .ok_or(ServiceError::ScoreRequired { point_id })?;
        let mut scores = scores_before(&store, game_id, point.point_number).await?;
        match scoring {
            TeamSide::One => scores.0 += 1,
            TeamSide::Two => scores.1 += 1,
        }
        point.set_scores(scores);
        point.scoring_team_id = Some(game.team_id(scoring));
    }

    point.set_status(side, PointTeamStatus::Complete);
    game.set_scores(point.scores());
    store.save_point(point.clone()).await?;
    store.save_game(game).await?;

    let task = FinalizeTask {
        game_id,
        point_id,
        team: side,
    };
    state
        .dispatcher()
        .enqueue(
            FINALIZE_TASK_ENDPOINT.into(),
            task_payload(FINALIZE_TASK_ENDPOINT, &task)?,
            DispatchMethod::Post,
        )
        .await?;

    let actions = buffer.read_all(side).await?;
    info!(%game_id, %point_id, %side, "point finished");
    Ok(PointDetail {
        point: point.into(),
        actions,
    })
}

/// Roll one side back from a point onto the preceding one.
///
/// The rolled-back point must be ACTIVE for the side and the preceding one
/// COMPLETE. The side's live log on the rolled-back point is discarded; its
/// persisted record on the preceding point is pulled back into the live buffer
/// so reporting resumes exactly where it left off.
pub async fn back_point(
    state: &SharedState,
    game_id: Uuid,
    point_number: u32,
    side: TeamSide,
) -> Result<PointDetail, ServiceError> {
    let store = state.require_store().await?;
    let mut game = load_game(&store, game_id).await?;
    let team_id = game.team_id(side);

    let mut point = store
        .find_point_by_number(game_id, point_number)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("point {point_number} of game `{game_id}`")))?;
    let previous_number = point_number.saturating_sub(1);
    let mut previous = store
        .find_point_by_number(game_id, previous_number)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("point {previous_number} of game `{game_id}`"))
        })?;
    validate_back_point(point_number, point.status(side), previous.status(side))?;

    point.set_status(side, PointTeamStatus::Future);
    point.set_active(side, false);
    let rolled_buffer = state.buffer(game_id, point.id);
    rolled_buffer.drain_team(side).await?;
    if point.status(side.opponent()) == PointTeamStatus::Future {
        // Nobody reports the point anymore: its record, the game mirror, and
        // the buffer all return to the pre-point state.
        point.set_scores(previous.scores());
        point.scoring_team_id = None;
        game.set_scores(previous.scores());
        rolled_buffer.drain_team(side.opponent()).await?;
        rolled_buffer.drain_shared().await?;
    }

    previous.set_status(side, PointTeamStatus::Active);
    previous.set_active(side, true);
    let buffer = state.buffer(game_id, previous.id);
    buffer
        .record_assignment(previous.pulling_team_id, previous.receiving_team_id)
        .await?;
    let persisted = store.actions_for(previous.id, team_id).await?;
    let restored: Vec<(u32, LiveAction)> = persisted
        .into_iter()
        .map(|action| (action.action_number, LiveAction::from(action)))
        .collect();
    buffer.restore(side, &restored).await?;
    store.delete_actions(previous.id, team_id).await?;
    previous.set_action_ids(side, Vec::new());

    store.save_point(point).await?;
    store.save_point(previous.clone()).await?;
    store.save_game(game).await?;

    let actions = buffer.read_all(side).await?;
    info!(%game_id, point_number, %side, "point rolled back");
    Ok(PointDetail {
        point: previous.into(),
        actions,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::{
        cache::memory::MemoryLiveCache,
        dao::{
            match_store::memory::MemoryMatchStore,
            models::{ActionKind, GameEntity},
        },
        gateway::memory::{FakeIdentityGateway, RecordingDispatcher},
        state::{AppState, point::GameTeamStatus},
    };

    struct Harness {
        state: SharedState,
        store: MemoryMatchStore,
        dispatcher: RecordingDispatcher,
        game: GameEntity,
    }

    async fn harness() -> Harness {
        let store = MemoryMatchStore::new();
        let dispatcher = RecordingDispatcher::new();
        let state = AppState::new(
            Arc::new(MemoryLiveCache::new()),
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
            dispatcher,
            game,
        }
    }

    fn record(team: TeamSide, kind: ActionKind) -> RecordActionRequest {
        RecordActionRequest {
            team,
            kind,
            player_ids: vec![],
            comment: None,
            tags: vec![],
        }
    }

    async fn open_point(harness: &Harness, team: TeamSide, settled: u32) -> PointDetail {
        start_point(
            &harness.state,
            harness.game.id,
            StartPointRequest {
                team,
                point_number: settled,
                pulling_team_id: harness.game.team_one_id,
            },
        )
        .await
        .unwrap()
    }

    async fn buffer_actions(harness: &Harness, point_id: Uuid, team: TeamSide, kinds: &[ActionKind]) {
        for kind in kinds {
            record_action(&harness.state, harness.game.id, point_id, record(team, *kind))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn first_reporter_settles_the_point() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let point_id = opened.point.id;
        buffer_actions(
            &harness,
            point_id,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::Catch, ActionKind::TeamOneScore],
        )
        .await;

        let finished = finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
            .await
            .unwrap();

        assert_eq!(finished.point.team_one_status, PointTeamStatus::Complete);
        assert_eq!(finished.point.team_two_status, PointTeamStatus::Future);
        assert_eq!(finished.point.team_one_score, 1);
        assert_eq!(finished.point.team_two_score, 0);
        assert_eq!(
            finished.point.scoring_team_id,
            Some(harness.game.team_one_id)
        );
        assert_eq!(finished.actions.len(), 3);

        let game = harness
            .store
            .find_game(harness.game.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(game.scores(), (1, 0));
        assert_eq!(harness.dispatcher.tasks_for(FINALIZE_TASK_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn finish_requires_a_score_sentinel() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let point_id = opened.point.id;

        let err = finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ScoreRequired { .. }));

        buffer_actions(&harness, point_id, TeamSide::One, &[ActionKind::Pull]).await;
        let err = finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ScoreRequired { .. }));
        assert!(harness.dispatcher.tasks().is_empty());
    }

    #[tokio::test]
    async fn both_sides_open_one_shared_point() {
        let harness = harness().await;
        let first = open_point(&harness, TeamSide::One, 0).await;
        let second = open_point(&harness, TeamSide::Two, 0).await;

        assert_eq!(first.point.id, second.point.id);
        assert_eq!(second.point.team_one_status, PointTeamStatus::Active);
        assert_eq!(second.point.team_two_status, PointTeamStatus::Active);

        let stored = harness
            .store
            .find_point_by_number(harness.game.id, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, first.point.id);
    }

    #[tokio::test]
    async fn second_reporter_confirms_without_rescoring() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let point_id = opened.point.id;
        open_point(&harness, TeamSide::Two, 0).await;

        buffer_actions(
            &harness,
            point_id,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::TeamOneScore],
        )
        .await;
        finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
            .await
            .unwrap();

        buffer_actions(&harness, point_id, TeamSide::Two, &[ActionKind::TeamOneScore]).await;
        let finished = finish_point(&harness.state, harness.game.id, point_id, TeamSide::Two)
            .await
            .unwrap();

        assert_eq!(finished.point.team_one_status, PointTeamStatus::Complete);
        assert_eq!(finished.point.team_two_status, PointTeamStatus::Complete);
        assert_eq!(finished.point.team_one_score, 1);
        assert_eq!(finished.point.team_two_score, 0);
        assert_eq!(harness.dispatcher.tasks_for(FINALIZE_TASK_ENDPOINT).len(), 2);
    }

    #[tokio::test]
    async fn second_reporter_conflict_is_rejected() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let point_id = opened.point.id;
        open_point(&harness, TeamSide::Two, 0).await;

        buffer_actions(&harness, point_id, TeamSide::One, &[ActionKind::TeamTwoScore]).await;
        finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
            .await
            .unwrap();

        buffer_actions(&harness, point_id, TeamSide::Two, &[ActionKind::TeamOneScore]).await;
        let err = finish_point(&harness.state, harness.game.id, point_id, TeamSide::Two)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::ConflictingScore {
                reported: ActionKind::TeamOneScore,
                recorded: ActionKind::TeamTwoScore,
                ..
            }
        ));

        // The rejected finish left the point unchanged and queued nothing new.
        let stored = harness.store.find_point(point_id).await.unwrap().unwrap();
        assert_eq!(stored.team_two_status, PointTeamStatus::Active);
        assert_eq!(harness.dispatcher.tasks_for(FINALIZE_TASK_ENDPOINT).len(), 1);
    }

    #[tokio::test]
    async fn second_reporter_is_checked_against_the_persisted_record() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let point_id = opened.point.id;
        open_point(&harness, TeamSide::Two, 0).await;

        buffer_actions(&harness, point_id, TeamSide::One, &[ActionKind::TeamTwoScore]).await;
        finish_point(&harness.state, harness.game.id, point_id, TeamSide::One)
            .await
            .unwrap();
        // Simulate the finalizer having already migrated side one's buffer.
        crate::services::finalize_service::finalize_point(
            &harness.state,
            FinalizeTask {
                game_id: harness.game.id,
                point_id,
                team: TeamSide::One,
            },
        )
        .await
        .unwrap();

        buffer_actions(&harness, point_id, TeamSide::Two, &[ActionKind::TeamOneScore]).await;
        let err = finish_point(&harness.state, harness.game.id, point_id, TeamSide::Two)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ConflictingScore { .. }));
    }

    #[tokio::test]
    async fn back_point_reopens_the_previous_point() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let first_point_id = opened.point.id;
        buffer_actions(
            &harness,
            first_point_id,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::Catch, ActionKind::TeamOneScore],
        )
        .await;
        finish_point(&harness.state, harness.game.id, first_point_id, TeamSide::One)
            .await
            .unwrap();
        crate::services::finalize_service::finalize_point(
            &harness.state,
            FinalizeTask {
                game_id: harness.game.id,
                point_id: first_point_id,
                team: TeamSide::One,
            },
        )
        .await
        .unwrap();

        let second = open_point(&harness, TeamSide::One, 1).await;
        buffer_actions(&harness, second.point.id, TeamSide::One, &[ActionKind::Pull]).await;

        let detail = back_point(&harness.state, harness.game.id, 2, TeamSide::One)
            .await
            .unwrap();

        // Reporting resumes on point 1 with the persisted log back in the
        // buffer.
        assert_eq!(detail.point.id, first_point_id);
        assert_eq!(detail.point.team_one_status, PointTeamStatus::Active);
        assert_eq!(detail.actions.len(), 3);
        assert_eq!(detail.actions[2].kind, ActionKind::TeamOneScore);
        assert!(
            harness
                .store
                .actions_for(first_point_id, harness.game.team_one_id)
                .await
                .unwrap()
                .is_empty()
        );

        let rolled = harness
            .store
            .find_point_by_number(harness.game.id, 2)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rolled.team_one_status, PointTeamStatus::Future);
        assert!(!rolled.team_one_active);

        // Finishing again replays the same outcome.
        let refinished = finish_point(
            &harness.state,
            harness.game.id,
            first_point_id,
            TeamSide::One,
        )
        .await
        .unwrap();
        assert_eq!(refinished.point.team_one_score, 1);
        assert_eq!(refinished.point.team_two_score, 0);
    }

    #[tokio::test]
    async fn back_point_before_the_finalizer_runs_keeps_the_buffer() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;
        let first_point_id = opened.point.id;
        buffer_actions(
            &harness,
            first_point_id,
            TeamSide::One,
            &[ActionKind::Pull, ActionKind::Catch, ActionKind::TeamOneScore],
        )
        .await;
        finish_point(&harness.state, harness.game.id, first_point_id, TeamSide::One)
            .await
            .unwrap();
        // The finalize task is still queued; the live buffer holds the only
        // copy of point 1's log.
        let second = open_point(&harness, TeamSide::One, 1).await;
        buffer_actions(&harness, second.point.id, TeamSide::One, &[ActionKind::Pull]).await;

        let detail = back_point(&harness.state, harness.game.id, 2, TeamSide::One)
            .await
            .unwrap();

        assert_eq!(detail.point.id, first_point_id);
        assert_eq!(detail.actions.len(), 3);
        assert_eq!(detail.actions[2].kind, ActionKind::TeamOneScore);
    }

    #[tokio::test]
    async fn back_point_rejects_invalid_states() {
        let harness = harness().await;
        let opened = open_point(&harness, TeamSide::One, 0).await;

        // Point 1 has no predecessor.
        let err = back_point(&harness.state, harness.game.id, 1, TeamSide::One)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));

        buffer_actions(
            &harness,
            opened.point.id,
            TeamSide::One,
            &[ActionKind::TeamOneScore],
        )
        .await;
        finish_point(&harness.state, harness.game.id, opened.point.id, TeamSide::One)
            .await
            .unwrap();
        open_point(&harness, TeamSide::One, 1).await;

        // Side two never reported either point.
        let err = back_point(&harness.state, harness.game.id, 2, TeamSide::Two)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }
}
