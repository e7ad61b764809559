//! Bulk ingest of a game that was already played offline.
//!
//! The importing side submits the whole record in one call; the opponent is
//! kept as a guest record and may claim its side later. Downstream
//! notifications go out only after everything is durably persisted.

use tracing::info;
use uuid::Uuid;

use crate::{
    dao::{
        match_store::MatchStore as _,
        models::{ActionEntity, GameEntity, PointEntity, TournamentEntity},
    },
    dto::{
        import::{ImportGameDetail, ImportGameRequest},
        stats::{GameStatsPayload, PointStatsPayload},
    },
    error::ServiceError,
    gateway::{DispatchMethod, GuestPlayerDraft},
    services::{GAME_STATS_ENDPOINT, POINT_STATS_ENDPOINT, task_payload},
    state::{
        SharedState,
        point::{GameTeamStatus, PointTeamStatus, TeamSide},
    },
};

/// Persist a complete game submitted by one side.
pub async fn import_game(
    state: &SharedState,
    jwt: String,
    request: ImportGameRequest,
) -> Result<ImportGameDetail, ServiceError> {
    let store = state.require_store().await?;
    state
        .identity()
        .authenticate_manager(jwt.clone(), request.importing_team_id)
        .await?;

    let mut game = GameEntity::new(request.team_one_id, request.team_two_id);
    let side = game.side_of(request.importing_team_id).ok_or_else(|| {
        ServiceError::NotFound(format!(
            "team `{}` does not play the imported game",
            request.importing_team_id
        ))
    })?;

    for guest in &request.guests {
        state
            .identity()
            .create_guest(
                jwt.clone(),
                request.importing_team_id,
                GuestPlayerDraft {
                    name: guest.name.clone(),
                    number: guest.number,
                },
            )
            .await?;
    }

    let tournament_id = match &request.tournament {
        Some(input) => {
            let existing = store
                .find_tournament_by_event(input.external_event_id.clone())
                .await?;
            Some(match existing {
                Some(tournament) => tournament.id,
                None => {
                    let tournament = TournamentEntity {
                        id: Uuid::new_v4(),
                        external_event_id: input.external_event_id.clone(),
                        name: input.name.clone(),
                        location: input.location.clone(),
                    };
                    let id = tournament.id;
                    store.save_tournament(tournament).await?;
                    id
                }
            })
        }
        None => None,
    };
    game.tournament_id = tournament_id;
    game.set_status(side, GameTeamStatus::Complete);
    game.set_status(side.opponent(), GameTeamStatus::Guest);

    let mut inputs = request.points;
    inputs.sort_by_key(|input| input.point_number);

    let mut points = Vec::with_capacity(inputs.len());
    for input in inputs {
        let Some(pulling_side) = game.side_of(input.pulling_team_id) else {
            return Err(ServiceError::NotFound(format!(
                "team `{}` does not play the imported game",
                input.pulling_team_id
            )));
        };
        let mut point = PointEntity::new(
            game.id,
            input.point_number,
            (input.team_one_score, input.team_two_score),
            input.pulling_team_id,
            game.team_id(pulling_side.opponent()),
        );
        point.set_status(side, PointTeamStatus::Complete);
        point.scoring_team_id = input.scoring_team_id;

        let mut action_ids = Vec::with_capacity(input.actions.len());
        for (offset, action) in input.actions.iter().enumerate() {
            let entity = ActionEntity {
                id: Uuid::new_v4(),
                point_id: point.id,
                action_number: offset as u32 + 1,
                kind: action.kind,
                team_id: request.importing_team_id,
                player_ids: action.player_ids.clone(),
                comment: action.comment.clone(),
                tags: action.tags.clone(),
            };
            action_ids.push(store.upsert_action(entity).await?);
        }
        point.set_action_ids(side, action_ids);
        store.save_point(point.clone()).await?;
        game.point_ids.push(point.id);
        points.push(point);
    }

    if let Some(last) = points.last() {
        game.set_scores(last.scores());
    }
    store.save_game(game.clone()).await?;

    state
        .dispatcher()
        .enqueue(
            GAME_STATS_ENDPOINT.into(),
            task_payload(GAME_STATS_ENDPOINT, &GameStatsPayload::from(&game))?,
            DispatchMethod::Post,
        )
        .await?;
    for point in &points {
        let actions = store
            .actions_for(point.id, request.importing_team_id)
            .await?;
        let (team_one_actions, team_two_actions) = match side {
            TeamSide::One => (actions, Vec::new()),
            TeamSide::Two => (Vec::new(), actions),
        };
        let payload = PointStatsPayload::new(point, team_one_actions, team_two_actions);
        state
            .dispatcher()
            .enqueue(
                POINT_STATS_ENDPOINT.into(),
                task_payload(POINT_STATS_ENDPOINT, &payload)?,
                DispatchMethod::Post,
            )
            .await?;
    }

    info!(game_id = %game.id, points = points.len(), "game imported");
    Ok(ImportGameDetail {
        game: game.into(),
        points: points.into_iter().map(Into::into).collect(),
        tournament_id,
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
            models::ActionKind,
        },
        dto::import::{GuestPlayerInput, ImportActionInput, ImportPointInput, TournamentInput},
        gateway::memory::{FakeIdentityGateway, RecordingDispatcher},
        state::AppState,
    };

    struct Harness {
        state: SharedState,
        store: MemoryMatchStore,
        identity: FakeIdentityGateway,
        dispatcher: RecordingDispatcher,
    }

    async fn harness_with(identity: FakeIdentityGateway) -> Harness {
        let store = MemoryMatchStore::new();
        let dispatcher = RecordingDispatcher::new();
        let state = AppState::new(
            Arc::new(MemoryLiveCache::new()),
            Arc::new(identity.clone()),
            Arc::new(dispatcher.clone()),
        );
        state.install_store(Arc::new(store.clone())).await;
        Harness {
            state,
            store,
            identity,
            dispatcher,
        }
    }

    fn score_point(number: u32, pulling: Uuid, scores: (u32, u32), scoring: Uuid) -> ImportPointInput {
        ImportPointInput {
            point_number: number,
            pulling_team_id: pulling,
            team_one_score: scores.0,
            team_two_score: scores.1,
            scoring_team_id: Some(scoring),
            actions: vec![
                ImportActionInput {
                    kind: ActionKind::Pull,
                    player_ids: vec![],
                    comment: None,
                    tags: vec![],
                },
                ImportActionInput {
                    kind: ActionKind::TeamOneScore,
                    player_ids: vec![],
                    comment: None,
                    tags: vec![],
                },
            ],
        }
    }

    fn request(team_one: Uuid, team_two: Uuid) -> ImportGameRequest {
        ImportGameRequest {
            team_one_id: team_one,
            team_two_id: team_two,
            importing_team_id: team_one,
            tournament: Some(TournamentInput {
                external_event_id: "event-42".into(),
                name: "Spring Invite".into(),
                location: Some("Riverside fields".into()),
            }),
            guests: vec![GuestPlayerInput {
                name: "Pickup Pat".into(),
                number: Some(77),
            }],
            points: vec![
                score_point(2, team_two, (2, 0), team_one),
                score_point(1, team_one, (1, 0), team_one),
            ],
        }
    }

    #[tokio::test]
    async fn imports_a_complete_game() {
        let harness = harness_with(FakeIdentityGateway::allowing()).await;
        let team_one = Uuid::new_v4();
        let team_two = Uuid::new_v4();

        let detail = import_game(&harness.state, "jwt".into(), request(team_one, team_two))
            .await
            .unwrap();

        assert_eq!(detail.game.team_one_status, GameTeamStatus::Complete);
        assert_eq!(detail.game.team_two_status, GameTeamStatus::Guest);
        assert_eq!(
            (detail.game.team_one_score, detail.game.team_two_score),
            (2, 0)
        );
        // Points land sorted regardless of submission order.
        assert_eq!(
            detail.points.iter().map(|p| p.point_number).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(detail.tournament_id.is_some());
        assert_eq!(harness.identity.created_guests().len(), 1);

        let stored = harness
            .store
            .find_game(detail.game.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.point_ids.len(), 2);
        let actions = harness
            .store
            .actions_for(detail.points[0].id, team_one)
            .await
            .unwrap();
        assert_eq!(
            actions.iter().map(|a| a.action_number).collect::<Vec<_>>(),
            vec![1, 2]
        );

        // One game summary first, then one summary per point.
        let tasks = harness.dispatcher.tasks();
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].endpoint, GAME_STATS_ENDPOINT);
        assert_eq!(tasks[1].endpoint, POINT_STATS_ENDPOINT);
        assert_eq!(tasks[2].endpoint, POINT_STATS_ENDPOINT);
    }

    #[tokio::test]
    async fn reuses_a_known_tournament() {
        let harness = harness_with(FakeIdentityGateway::allowing()).await;
        let existing = TournamentEntity {
            id: Uuid::new_v4(),
            external_event_id: "event-42".into(),
            name: "Spring Invite".into(),
            location: None,
        };
        harness.store.save_tournament(existing.clone()).await.unwrap();

        let detail = import_game(
            &harness.state,
            "jwt".into(),
            request(Uuid::new_v4(), Uuid::new_v4()),
        )
        .await
        .unwrap();

        assert_eq!(detail.tournament_id, Some(existing.id));
    }

    #[tokio::test]
    async fn rejected_credential_imports_nothing() {
        let harness = harness_with(FakeIdentityGateway::denying()).await;
        let err = import_game(
            &harness.state,
            "jwt".into(),
            request(Uuid::new_v4(), Uuid::new_v4()),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(harness.dispatcher.tasks().is_empty());
    }
}
