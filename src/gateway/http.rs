use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use uuid::Uuid;

use super::{
    DispatchMethod, GatewayError, GatewayResult, GuestPlayerDraft, IdentityGateway,
    ManagerIdentity, StatDispatcher, TeamRoster,
};

/// Reqwest client for the external team/identity service.
#[derive(Clone)]
pub struct HttpIdentityGateway {
    client: Client,
    base_url: Arc<str>,
}

impl HttpIdentityGateway {
    /// Build a client against the identity service base URL.
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| GatewayError::Request {
                endpoint: base_url.to_owned(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }

    fn request(&self, method: Method, path: &str, jwt: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        self.client.request(method, url).bearer_auth(jwt)
    }

    async fn authenticate_manager(
        &self,
        jwt: String,
        team_id: Uuid,
    ) -> GatewayResult<ManagerIdentity> {
        let endpoint = format!("teams/{team_id}/manager");
        let response = self
            .request(Method::GET, &endpoint, &jwt)
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK => {
                response
                    .json::<ManagerIdentity>()
                    .await
                    .map_err(|source| GatewayError::Request { endpoint, source })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Unauthorized {
                message: format!("manager credential rejected for team `{team_id}`"),
            }),
            status => Err(GatewayError::Status { endpoint, status }),
        }
    }

    async fn create_guest(
        &self,
        jwt: String,
        team_id: Uuid,
        draft: GuestPlayerDraft,
    ) -> GatewayResult<TeamRoster> {
        let endpoint = format!("teams/{team_id}/guests");
        let response = self
            .request(Method::POST, &endpoint, &jwt)
            .json(&draft)
            .send()
            .await
            .map_err(|source| GatewayError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => {
                response
                    .json::<TeamRoster>()
                    .await
                    .map_err(|source| GatewayError::Request { endpoint, source })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Unauthorized {
                message: format!("guest creation rejected for team `{team_id}`"),
            }),
            status => Err(GatewayError::Status { endpoint, status }),
        }
    }
}

impl IdentityGateway for HttpIdentityGateway {
    fn authenticate_manager(
        &self,
        jwt: String,
        team_id: Uuid,
    ) -> BoxFuture<'static, GatewayResult<ManagerIdentity>> {
        let gateway = self.clone();
        Box::pin(async move { gateway.authenticate_manager(jwt, team_id).await })
    }

    fn create_guest(
        &self,
        jwt: String,
        team_id: Uuid,
        draft: GuestPlayerDraft,
    ) -> BoxFuture<'static, GatewayResult<TeamRoster>> {
        let gateway = self.clone();
        Box::pin(async move { gateway.create_guest(jwt, team_id, draft).await })
    }
}

/// Reqwest client handing tasks to the external queue transport.
#[derive(Clone)]
pub struct HttpStatDispatcher {
    client: Client,
    base_url: Arc<str>,
}

impl HttpStatDispatcher {
    /// Build a client against the dispatcher base URL.
    pub fn new(base_url: &str) -> GatewayResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| GatewayError::Request {
                endpoint: base_url.to_owned(),
                source,
            })?;
        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
        })
    }
}

impl StatDispatcher for HttpStatDispatcher {
    fn enqueue(
        &self,
        endpoint: String,
        payload: serde_json::Value,
        method: DispatchMethod,
    ) -> BoxFuture<'static, GatewayResult<()>> {
        let dispatcher = self.clone();
        Box::pin(async move {
            let url = format!("{}/enqueue", dispatcher.base_url);
            let task = json!({
                "endpoint": endpoint,
                "method": method,
                "payload": payload,
            });
            let response = dispatcher
                .client
                .post(&url)
                .json(&task)
                .send()
                .await
                .map_err(|source| GatewayError::Request {
                    endpoint: endpoint.clone(),
                    source,
                })?;

            if response.status().is_success() {
                Ok(())
            } else {
                Err(GatewayError::Status {
                    endpoint,
                    status: response.status(),
                })
            }
        })
    }
}
