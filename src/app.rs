/*
 * Responsibility
 * - Load Config -> build dependencies -> assemble the Router
 * - Apply middleware (HTTP layers / CORS)
 * - Start with axum::serve(); on Ctrl-C stop accepting, then drain audit appends
 */
use std::{panic, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::repos::{MemoryStore, Stores};
use crate::services::IdentityExtractor;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,family_records_api=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    init_panic_hook();

    let config = Config::from_env()?;
    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config).await?;
    let audit = state.audit.clone();
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Appends spawned by the last requests still get their bounded window.
    audit.drain().await;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Build process-level services from config and inject them into AppState.
pub async fn build_state(config: &Config) -> Result<AppState> {
    let stores = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("connect to DATABASE_URL")?;
            Stores::postgres(pool)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using the in-memory store (not persisted)");
            Stores::memory(Arc::new(MemoryStore::new()))
        }
    };

    let identity = match &config.identity_verification {
        Some(v) => IdentityExtractor::verifying(
            &v.public_key_pem,
            &v.issuer,
            &v.audience,
            v.leeway_seconds,
        )
        .context("IDENTITY_JWT_PUBLIC_KEY_PEM")?,
        None => {
            tracing::info!("bearer claims are trusted as verified upstream");
            IdentityExtractor::trusted()
        }
    };

    Ok(AppState::new(
        stores,
        identity,
        config.audit_write_timeout,
        config.device_limits,
        config.subscription_lookup,
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .nest("/api/v1", api::v1::routes())
        .with_state(state);

    let router = middleware::http::apply(router);
    middleware::cors::apply(router, config)
}
