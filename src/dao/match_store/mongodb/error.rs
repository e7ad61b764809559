use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;

/// Result alias for MongoDB DAO operations.
pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB match store.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to save game `{id}`")]
    SaveGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load game `{id}`")]
    LoadGame {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save point `{id}`")]
    SavePoint {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load point for game `{game_id}`")]
    LoadPoint {
        game_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to create point {point_number} for game `{game_id}`")]
    CreatePoint {
        game_id: Uuid,
        point_number: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to update point `{id}`")]
    UpdatePoint {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete leftover points for game `{game_id}`")]
    DeletePoints {
        game_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save action {action_number} on point `{point_id}`")]
    SaveAction {
        point_id: Uuid,
        action_number: u32,
        #[source]
        source: MongoError,
    },
    #[error("failed to load actions for point `{point_id}`")]
    LoadActions {
        point_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete actions for point `{point_id}`")]
    DeleteActions {
        point_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save tournament `{id}`")]
    SaveTournament {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load tournament for event `{external_event_id}`")]
    LoadTournament {
        external_event_id: String,
        #[source]
        source: MongoError,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        StorageError {
            operation: err.to_string(),
            source: Box::new(err),
        }
    }
}
