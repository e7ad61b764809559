use std::{sync::Arc, time::SystemTime};

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Bson, doc},
    error::{Error as MongoError, ErrorKind, WriteFailure},
    options::{IndexOptions, ReturnDocument},
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
};
use crate::dao::{
    match_store::MatchStore,
    models::{ActionEntity, GameEntity, PointEntity, TournamentEntity},
    storage::StorageResult,
};
use crate::state::point::TeamSide;

const GAME_COLLECTION_NAME: &str = "games";
const POINT_COLLECTION_NAME: &str = "points";
const ACTION_COLLECTION_NAME: &str = "actions";
const TOURNAMENT_COLLECTION_NAME: &str = "tournaments";

/// MongoDB-backed [`MatchStore`].
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
}

struct MongoState {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

fn status_field(side: TeamSide) -> &'static str {
    match side {
        TeamSide::One => "team_one_status",
        TeamSide::Two => "team_two_status",
    }
}

fn active_field(side: TeamSide) -> &'static str {
    match side {
        TeamSide::One => "team_one_active",
        TeamSide::Two => "team_two_active",
    }
}

fn action_ids_field(side: TeamSide) -> &'static str {
    match side {
        TeamSide::One => "team_one_action_ids",
        TeamSide::Two => "team_two_action_ids",
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write)) if write.code == 11000
    )
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let indexes: [(&'static str, &'static str, mongodb::bson::Document); 5] = [
            (GAME_COLLECTION_NAME, "id", doc! {"id": 1}),
            (POINT_COLLECTION_NAME, "id", doc! {"id": 1}),
            (
                POINT_COLLECTION_NAME,
                "game_id,point_number",
                doc! {"game_id": 1, "point_number": 1},
            ),
            (
                ACTION_COLLECTION_NAME,
                "point_id,team_id,action_number",
                doc! {"point_id": 1, "team_id": 1, "action_number": 1},
            ),
            (
                TOURNAMENT_COLLECTION_NAME,
                "external_event_id",
                doc! {"external_event_id": 1},
            ),
        ];

        for (collection_name, index_name, keys) in indexes {
            let collection = database.collection::<mongodb::bson::Document>(collection_name);
            let index = IndexModel::builder()
                .keys(keys)
                .options(
                    IndexOptions::builder()
                        .name(Some(format!("{collection_name}_{index_name}_idx")))
                        .unique(Some(true))
                        .build(),
                )
                .build();

            collection
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: collection_name,
                    index: index_name,
                    source,
                })?;
        }

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn games(&self) -> Collection<GameEntity> {
        self.database()
            .await
            .collection::<GameEntity>(GAME_COLLECTION_NAME)
    }

    async fn points(&self) -> Collection<PointEntity> {
        self.database()
            .await
            .collection::<PointEntity>(POINT_COLLECTION_NAME)
    }

    async fn actions(&self) -> Collection<ActionEntity> {
        self.database()
            .await
            .collection::<ActionEntity>(ACTION_COLLECTION_NAME)
    }

    async fn tournaments(&self) -> Collection<TournamentEntity> {
        self.database()
            .await
            .collection::<TournamentEntity>(TOURNAMENT_COLLECTION_NAME)
    }

    async fn ping(&self) -> MongoResult<()> {
        let database = self.database().await;
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn save_game(&self, mut game: GameEntity) -> MongoResult<()> {
        game.updated_at = SystemTime::now();
        let id = game.id;
        self.games()
            .await
            .replace_one(doc! {"id": id.to_string()}, &game)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveGame { id, source })?;
        Ok(())
    }

    async fn find_game(&self, id: Uuid) -> MongoResult<Option<GameEntity>> {
        self.games()
            .await
            .find_one(doc! {"id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadGame { id, source })
    }

    async fn find_point(&self, id: Uuid) -> MongoResult<Option<PointEntity>> {
        self.points()
            .await
            .find_one(doc! {"id": id.to_string()})
            .await
            .map_err(|source| MongoDaoError::LoadPoint {
                game_id: id,
                source,
            })
    }

    async fn find_point_by_number(
        &self,
        game_id: Uuid,
        point_number: u32,
    ) -> MongoResult<Option<PointEntity>> {
        self.points()
            .await
            .find_one(doc! {"game_id": game_id.to_string(), "point_number": point_number as i64})
            .await
            .map_err(|source| MongoDaoError::LoadPoint { game_id, source })
    }

    async fn find_or_create_point(
        &self,
        template: PointEntity,
    ) -> MongoResult<(PointEntity, bool)> {
        let game_id = template.game_id;
        let point_number = template.point_number;
        let filter = doc! {
            "game_id": game_id.to_string(),
            "point_number": point_number as i64,
        };

        let collection = self.points().await;
        if let Some(existing) = collection
            .find_one(filter.clone())
            .await
            .map_err(|source| MongoDaoError::LoadPoint { game_id, source })?
        {
            return Ok((existing, false));
        }

        match collection.insert_one(&template).await {
            Ok(_) => Ok((template, true)),
            // The other side inserted between our find and insert; the unique
            // (game_id, point_number) index turns the race into a re-read.
            Err(err) if is_duplicate_key(&err) => {
                let existing = collection
                    .find_one(filter)
                    .await
                    .map_err(|source| MongoDaoError::LoadPoint { game_id, source })?
                    .ok_or(MongoDaoError::CreatePoint {
                        game_id,
                        point_number,
                        source: err,
                    })?;
                Ok((existing, false))
            }
            Err(source) => Err(MongoDaoError::CreatePoint {
                game_id,
                point_number,
                source,
            }),
        }
    }

    async fn save_point(&self, mut point: PointEntity) -> MongoResult<()> {
        point.version += 1;
        point.updated_at = SystemTime::now();
        let id = point.id;
        self.points()
            .await
            .replace_one(doc! {"id": id.to_string()}, &point)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePoint { id, source })?;
        Ok(())
    }

    async fn record_finalized_actions(
        &self,
        point_id: Uuid,
        side: TeamSide,
        action_ids: Vec<Uuid>,
    ) -> MongoResult<Option<PointEntity>> {
        let ids: Vec<Bson> = action_ids
            .iter()
            .map(|id| Bson::String(id.to_string()))
            .collect();

        self.points()
            .await
            .find_one_and_update(
                // The status guard keeps a stale delivery from matching a
                // point that reentry or back-point has since reopened.
                doc! {
                    "id": point_id.to_string(),
                    active_field(side): true,
                    status_field(side): "complete",
                },
                doc! {
                    "$set": {
                        action_ids_field(side): ids,
                        active_field(side): false,
                    },
                    "$inc": {"version": 1},
                },
            )
            .return_document(ReturnDocument::After)
            .await
            .map_err(|source| MongoDaoError::UpdatePoint {
                id: point_id,
                source,
            })
    }

    async fn team_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
        status: &str,
        descending: bool,
    ) -> MongoResult<Option<PointEntity>> {
        let order = if descending { -1 } else { 1 };
        self.points()
            .await
            .find_one(doc! {"game_id": game_id.to_string(), status_field(side): status})
            .sort(doc! {"point_number": order})
            .await
            .map_err(|source| MongoDaoError::LoadPoint { game_id, source })
    }

    async fn delete_future_points(&self, game_id: Uuid) -> MongoResult<Vec<Uuid>> {
        let filter = doc! {
            "game_id": game_id.to_string(),
            "team_one_status": "future",
            "team_two_status": "future",
        };
        let collection = self.points().await;
        let doomed: Vec<PointEntity> = collection
            .find(filter.clone())
            .await
            .map_err(|source| MongoDaoError::LoadPoint { game_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadPoint { game_id, source })?;
        collection
            .delete_many(filter)
            .await
            .map_err(|source| MongoDaoError::DeletePoints { game_id, source })?;
        Ok(doomed.into_iter().map(|point| point.id).collect())
    }

    async fn upsert_action(&self, action: ActionEntity) -> MongoResult<Uuid> {
        let filter = doc! {
            "point_id": action.point_id.to_string(),
            "team_id": action.team_id.to_string(),
            "action_number": action.action_number as i64,
        };

        let collection = self.actions().await;
        // Re-deliveries must keep the original identity, so an existing
        // document wins over the fresh one.
        if let Some(existing) = collection
            .find_one(filter.clone())
            .await
            .map_err(|source| MongoDaoError::LoadActions {
                point_id: action.point_id,
                source,
            })?
        {
            return Ok(existing.id);
        }

        let id = action.id;
        collection
            .replace_one(filter, &action)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveAction {
                point_id: action.point_id,
                action_number: action.action_number,
                source,
            })?;
        Ok(id)
    }

    async fn actions_for(&self, point_id: Uuid, team_id: Uuid) -> MongoResult<Vec<ActionEntity>> {
        self.actions()
            .await
            .find(doc! {"point_id": point_id.to_string(), "team_id": team_id.to_string()})
            .sort(doc! {"action_number": 1})
            .await
            .map_err(|source| MongoDaoError::LoadActions { point_id, source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::LoadActions { point_id, source })
    }

    async fn last_action(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> MongoResult<Option<ActionEntity>> {
        self.actions()
            .await
            .find_one(doc! {"point_id": point_id.to_string(), "team_id": team_id.to_string()})
            .sort(doc! {"action_number": -1})
            .await
            .map_err(|source| MongoDaoError::LoadActions { point_id, source })
    }

    async fn delete_actions(&self, point_id: Uuid, team_id: Uuid) -> MongoResult<u64> {
        let result = self
            .actions()
            .await
            .delete_many(doc! {"point_id": point_id.to_string(), "team_id": team_id.to_string()})
            .await
            .map_err(|source| MongoDaoError::DeleteActions { point_id, source })?;
        Ok(result.deleted_count)
    }

    async fn find_tournament_by_event(
        &self,
        external_event_id: String,
    ) -> MongoResult<Option<TournamentEntity>> {
        self.tournaments()
            .await
            .find_one(doc! {"external_event_id": &external_event_id})
            .await
            .map_err(|source| MongoDaoError::LoadTournament {
                external_event_id,
                source,
            })
    }

    async fn save_tournament(&self, tournament: TournamentEntity) -> MongoResult<()> {
        let id = tournament.id;
        self.tournaments()
            .await
            .replace_one(doc! {"id": id.to_string()}, &tournament)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveTournament { id, source })?;
        Ok(())
    }
}

impl MatchStore for MongoMatchStore {
    fn save_game(&self, game: GameEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_game(game).await.map_err(Into::into) })
    }

    fn find_game(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<GameEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_game(id).await.map_err(Into::into) })
    }

    fn find_point(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_point(id).await.map_err(Into::into) })
    }

    fn find_point_by_number(
        &self,
        game_id: Uuid,
        point_number: u32,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_point_by_number(game_id, point_number)
                .await
                .map_err(Into::into)
        })
    }

    fn find_or_create_point(
        &self,
        template: PointEntity,
    ) -> BoxFuture<'static, StorageResult<(PointEntity, bool)>> {
        let store = self.clone();
        Box::pin(async move { store.find_or_create_point(template).await.map_err(Into::into) })
    }

    fn save_point(&self, point: PointEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_point(point).await.map_err(Into::into) })
    }

    fn record_finalized_actions(
        &self,
        point_id: Uuid,
        side: TeamSide,
        action_ids: Vec<Uuid>,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .record_finalized_actions(point_id, side, action_ids)
                .await
                .map_err(Into::into)
        })
    }

    fn active_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .team_point(game_id, side, "active", false)
                .await
                .map_err(Into::into)
        })
    }

    fn latest_complete_point(
        &self,
        game_id: Uuid,
        side: TeamSide,
    ) -> BoxFuture<'static, StorageResult<Option<PointEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .team_point(game_id, side, "complete", true)
                .await
                .map_err(Into::into)
        })
    }

    fn delete_future_points(&self, game_id: Uuid) -> BoxFuture<'static, StorageResult<Vec<Uuid>>> {
        let store = self.clone();
        Box::pin(async move { store.delete_future_points(game_id).await.map_err(Into::into) })
    }

    fn upsert_action(&self, action: ActionEntity) -> BoxFuture<'static, StorageResult<Uuid>> {
        let store = self.clone();
        Box::pin(async move { store.upsert_action(action).await.map_err(Into::into) })
    }

    fn actions_for(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ActionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.actions_for(point_id, team_id).await.map_err(Into::into) })
    }

    fn last_action(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<ActionEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.last_action(point_id, team_id).await.map_err(Into::into) })
    }

    fn delete_actions(
        &self,
        point_id: Uuid,
        team_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<u64>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .delete_actions(point_id, team_id)
                .await
                .map_err(Into::into)
        })
    }

    fn find_tournament_by_event(
        &self,
        external_event_id: String,
    ) -> BoxFuture<'static, StorageResult<Option<TournamentEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .find_tournament_by_event(external_event_id)
                .await
                .map_err(Into::into)
        })
    }

    fn save_tournament(
        &self,
        tournament: TournamentEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.save_tournament(tournament).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
