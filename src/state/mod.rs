//! Shared application state and domain status types.

/// Point status lattice and side addressing.
pub mod point;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    cache::{LiveCache, buffer::LiveActionBuffer},
    dao::match_store::MatchStore,
    error::ServiceError,
    gateway::{IdentityGateway, StatDispatcher},
};

/// Cheaply cloneable handle on the application state.
pub type SharedState = Arc<AppState>;

/// Central application state holding the injected resource handles.
///
/// The store slot starts empty; the process runs degraded until the storage
/// supervisor installs a connection.
pub struct AppState {
    store: RwLock<Option<Arc<dyn MatchStore>>>,
    cache: Arc<dyn LiveCache>,
    identity: Arc<dyn IdentityGateway>,
    dispatcher: Arc<dyn StatDispatcher>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct the state wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        cache: Arc<dyn LiveCache>,
        identity: Arc<dyn IdentityGateway>,
        dispatcher: Arc<dyn StatDispatcher>,
    ) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            cache,
            identity,
            dispatcher,
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// The match store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        let _ = self.degraded.send(false);
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        let _ = self.degraded.send(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Handle on the live buffer of one point.
    pub fn buffer(&self, game_id: Uuid, point_id: Uuid) -> LiveActionBuffer {
        LiveActionBuffer::new(self.cache.clone(), game_id, point_id)
    }

    /// The team/identity collaborator.
    pub fn identity(&self) -> &Arc<dyn IdentityGateway> {
        &self.identity
    }

    /// The task dispatch collaborator.
    pub fn dispatcher(&self) -> &Arc<dyn StatDispatcher> {
        &self.dispatcher
    }
}
