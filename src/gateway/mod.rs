//! External collaborators: team/identity service and the async task
//! dispatcher feeding the downstream statistics system.

/// Reqwest-backed collaborator clients.
pub mod http;
/// Recording fakes used by tests.
pub mod memory;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors raised by the identity or dispatch collaborators.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The identity service rejected the credentials.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Rejection detail from the identity service.
        message: String,
    },
    /// The collaborator could not be reached.
    #[error("request to `{endpoint}` failed")]
    Request {
        /// Endpoint the request targeted.
        endpoint: String,
        /// Transport-level cause.
        #[source]
        source: reqwest::Error,
    },
    /// The collaborator answered with an unexpected status.
    #[error("`{endpoint}` answered {status}")]
    Status {
        /// Endpoint the request targeted.
        endpoint: String,
        /// HTTP status received.
        status: reqwest::StatusCode,
    },
    /// A task payload failed to serialize.
    #[error("payload for `{endpoint}` failed to serialize")]
    Encode {
        /// Endpoint the payload targeted.
        endpoint: String,
        /// Serialization failure.
        #[source]
        source: serde_json::Error,
    },
}

/// Authenticated team manager returned by the identity service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerIdentity {
    /// Identity-service user reference.
    pub user_id: Uuid,
    /// Display name of the manager.
    pub display_name: String,
}

/// Payload describing a guest player to create on a roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuestPlayerDraft {
    /// Display name of the guest.
    pub name: String,
    /// Jersey number, when known.
    pub number: Option<u8>,
}

/// One player on a roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterPlayer {
    /// Identity-service player reference.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Jersey number, when known.
    pub number: Option<u8>,
}

/// A team's roster as returned after a guest creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamRoster {
    /// Identity-service team reference.
    pub team_id: Uuid,
    /// Current players, guests included.
    pub players: Vec<RosterPlayer>,
}

/// Auth boundary to the external team/identity service.
pub trait IdentityGateway: Send + Sync {
    /// Verify a manager credential for a team.
    fn authenticate_manager(
        &self,
        jwt: String,
        team_id: Uuid,
    ) -> BoxFuture<'static, GatewayResult<ManagerIdentity>>;
    /// Create a guest player on a team, returning the updated roster.
    fn create_guest(
        &self,
        jwt: String,
        team_id: Uuid,
        draft: GuestPlayerDraft,
    ) -> BoxFuture<'static, GatewayResult<TeamRoster>>;
}

/// HTTP method a dispatched task should be delivered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatchMethod {
    /// Deliver with POST.
    Post,
    /// Deliver with PUT.
    Put,
}

/// Fire-and-forget hand-off to the at-least-once task transport.
///
/// The transport owns redelivery; the core never consumes a response and never
/// retries on its own.
pub trait StatDispatcher: Send + Sync {
    /// Queue a task for asynchronous delivery.
    fn enqueue(
        &self,
        endpoint: String,
        payload: serde_json::Value,
        method: DispatchMethod,
    ) -> BoxFuture<'static, GatewayResult<()>>;
}
