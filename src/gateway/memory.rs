//! Recording fakes for the external collaborators.

use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use uuid::Uuid;

use super::{
    DispatchMethod, GatewayError, GatewayResult, GuestPlayerDraft, IdentityGateway,
    ManagerIdentity, RosterPlayer, StatDispatcher, TeamRoster,
};

/// Identity gateway that accepts or rejects every credential.
#[derive(Clone)]
pub struct FakeIdentityGateway {
    allow: bool,
    guests: Arc<Mutex<Vec<(Uuid, GuestPlayerDraft)>>>,
}

impl FakeIdentityGateway {
    /// Gateway that authenticates everyone.
    pub fn allowing() -> Self {
        Self {
            allow: true,
            guests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Gateway that rejects everyone.
    pub fn denying() -> Self {
        Self {
            allow: false,
            guests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Guest drafts submitted so far.
    pub fn created_guests(&self) -> Vec<(Uuid, GuestPlayerDraft)> {
        self.guests
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl IdentityGateway for FakeIdentityGateway {
    fn authenticate_manager(
        &self,
        _jwt: String,
        team_id: Uuid,
    ) -> BoxFuture<'static, GatewayResult<ManagerIdentity>> {
        let allow = self.allow;
        Box::pin(async move {
            if allow {
                Ok(ManagerIdentity {
                    user_id: Uuid::new_v4(),
                    display_name: format!("manager-{team_id}"),
                })
            } else {
                Err(GatewayError::Unauthorized {
                    message: format!("manager credential rejected for team `{team_id}`"),
                })
            }
        })
    }

    fn create_guest(
        &self,
        _jwt: String,
        team_id: Uuid,
        draft: GuestPlayerDraft,
    ) -> BoxFuture<'static, GatewayResult<TeamRoster>> {
        let gateway = self.clone();
        Box::pin(async move {
            if !gateway.allow {
                return Err(GatewayError::Unauthorized {
                    message: format!("guest creation rejected for team `{team_id}`"),
                });
            }
            gateway
                .guests
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push((team_id, draft.clone()));
            Ok(TeamRoster {
                team_id,
                players: vec![RosterPlayer {
                    id: Uuid::new_v4(),
                    name: draft.name,
                    number: draft.number,
                }],
            })
        })
    }
}

/// One task handed to the recording dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchedTask {
    /// Target endpoint.
    pub endpoint: String,
    /// Task payload.
    pub payload: serde_json::Value,
    /// Delivery method.
    pub method: DispatchMethod,
}

/// Dispatcher that records every enqueue for test assertions.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    tasks: Arc<Mutex<Vec<DispatchedTask>>>,
}

impl RecordingDispatcher {
    /// Fresh dispatcher with no recorded tasks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything enqueued so far.
    pub fn tasks(&self) -> Vec<DispatchedTask> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Recorded tasks targeting one endpoint.
    pub fn tasks_for(&self, endpoint: &str) -> Vec<DispatchedTask> {
        self.tasks()
            .into_iter()
            .filter(|task| task.endpoint == endpoint)
            .collect()
    }
}

impl StatDispatcher for RecordingDispatcher {
    fn enqueue(
        &self,
        endpoint: String,
        payload: serde_json::Value,
        method: DispatchMethod,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let dispatcher = self.clone();
        Box::pin(async move {
            dispatcher
                .tasks
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .push(DispatchedTask {
                    endpoint,
                    payload,
                    method,
                });
            Ok(())
        })
    }
}
