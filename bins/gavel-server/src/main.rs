mod config;
mod dispatcher;
mod handlers;
mod leaderboard;
mod metrics;
mod results;
mod routes;
mod sandbox;
mod scoring;
mod store;
mod submissions;

#[cfg(test)]
mod testutil;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use redis::aio::ConnectionManager;
use tokio::net::TcpListener;
use tracing::info;

use config::{ScoreTable, ServerConfig, StoreBackend};
use dispatcher::Dispatcher;
use leaderboard::Ranker;
use results::{ContestLocks, ResultService};
use sandbox::HttpSandbox;
use store::{MemoryStore, RedisStore, Store};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub dispatcher: Dispatcher,
    pub results: ResultService,
    pub ranker: Ranker,
    pub scores: ScoreTable,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    info!("Gavel judging service booting...");

    let config = ServerConfig::from_env()?;

    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Redis => {
            let client = redis::Client::open(config.redis_url.as_str())
                .context("failed to create Redis client")?;
            let conn = ConnectionManager::new(client)
                .await
                .context("failed to connect to Redis")?;
            info!("Connected to Redis: {}", config.redis_url);
            Arc::new(RedisStore::new(conn))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let sandbox = Arc::new(HttpSandbox::new(
        config.sandbox_url.clone(),
        config.sandbox_version.clone(),
    ));
    info!("Sandbox endpoint: {}", config.sandbox_url);

    let locks = Arc::new(ContestLocks::new());
    let state = Arc::new(AppState {
        store: Arc::clone(&store),
        dispatcher: Dispatcher::new(sandbox, config.dispatch_interval, config.dispatch_timeout),
        results: ResultService::new(
            Arc::clone(&store),
            config.scores.clone(),
            Arc::clone(&locks),
        ),
        ranker: Ranker::new(Arc::clone(&store), config.scores.clone(), locks),
        scores: config.scores.clone(),
    });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("HTTP server listening on {}", config.bind_addr);
    info!("Ready to judge submissions");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
