//! Binary entrypoint wiring the REST surface, the Redis live buffer, and the
//! MongoDB match store.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ulti_live_back::{
    cache::redis::RedisLiveCache,
    config::AppConfig,
    dao::match_store::{
        MatchStore as _,
        mongodb::{MongoConfig, MongoMatchStore},
    },
    gateway::http::{HttpIdentityGateway, HttpStatDispatcher},
    routes,
    state::{AppState, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();

    let cache = RedisLiveCache::connect(&config.redis_url).context("opening redis client")?;
    let identity =
        HttpIdentityGateway::new(&config.identity_url).context("building identity client")?;
    let dispatcher =
        HttpStatDispatcher::new(&config.dispatch_url).context("building dispatch client")?;

    let state = AppState::new(Arc::new(cache), Arc::new(identity), Arc::new(dispatcher));
    tokio::spawn(run_store_supervisor(state.clone(), config.clone()));

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Supervises the MongoDB connection by retrying in the background and
/// toggling degraded mode when connectivity changes.
async fn run_store_supervisor(state: SharedState, config: AppConfig) {
    let initial_delay = Duration::from_secs(1);
    let max_delay = Duration::from_secs(10);
    let mut delay = initial_delay;

    loop {
        if let Some(store) = state.store().await {
            match store.health_check().await {
                Ok(()) => {
                    // Healthy connection: reset the retry backoff and avoid
                    // hammering the database with pings.
                    delay = initial_delay;
                    sleep(Duration::from_secs(5)).await;
                }
                Err(err) => {
                    warn!(error = %err, "store ping failed; entering degraded mode");
                    state.clear_store().await;
                    sleep(delay).await;
                    delay = (delay * 2).min(max_delay);
                }
            }
            continue;
        }

        let connected = async {
            let mongo = MongoConfig::from_uri(&config.mongo_uri, config.mongo_db.as_deref()).await?;
            MongoMatchStore::connect(mongo).await
        }
        .await;
        match connected {
            Ok(store) => {
                info!("connected to MongoDB; leaving degraded mode");
                state.install_store(Arc::new(store)).await;
                delay = initial_delay;
            }
            Err(err) => {
                warn!(error = %err, "MongoDB connection attempt failed");
                sleep(delay).await;
                delay = (delay * 2).min(max_delay);
            }
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
