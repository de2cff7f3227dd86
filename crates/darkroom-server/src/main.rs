//! Darkroom server - main entry point

use anyhow::{Context, Result};
use axum::{
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use darkroom_common::logging::{init_logging, LogConfig};
use serde_json::json;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{compression::CompressionLayer, services::ServeDir};
use tracing::info;

use darkroom_server::{
    config::Config,
    db,
    db::images::ImageStore,
    features,
    hub::EventHub,
    middleware,
    pipeline::{stages, PipelineLimiter, PipelineOrchestrator, ProgressReporter},
    storage::{LocalStorage, StorageConfig},
};

/// Application state for the root handlers
#[derive(Clone)]
struct AppState {
    db: sqlx::SqlitePool,
    store: ImageStore,
    storage: LocalStorage,
    hub: EventHub,
    limiter: PipelineLimiter,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment overrides apply on top of server-appropriate defaults
    let mut log_config = LogConfig::from_env()?;
    if std::env::var("LOG_FILE_PREFIX").is_err() {
        log_config = log_config.with_file_prefix("darkroom-server");
    }
    if log_config.filter_directives.is_none() {
        log_config =
            log_config.with_filter("darkroom_server=debug,tower_http=debug,sqlx=info");
    }
    let _log_guard = init_logging(&log_config)?;

    info!("starting darkroom server");

    let config = Config::load()?;
    info!(host = %config.server.host, port = config.server.port, "configuration loaded");

    let db_pool = db::create_pool(&config.database).await?;

    sqlx::migrate!("../../migrations")
        .run(&db_pool)
        .await
        .context("running database migrations")?;
    info!("database migrations applied");

    let storage_config = StorageConfig::from_env();
    let storage = LocalStorage::new(storage_config).await?;

    // Wire the pipeline: store and hub feed the reporter, the
    // orchestrator drives the default stage chain, the limiter admits
    // queued jobs into it
    let store = ImageStore::new(db_pool.clone());
    let hub = EventHub::new();
    let reporter = ProgressReporter::new(store.clone(), hub.clone());
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        store.clone(),
        storage.clone(),
        stages::default_stages(),
        reporter,
    ));

    let limiter = PipelineLimiter::start(config.pipeline.max_concurrent, {
        let orchestrator = Arc::clone(&orchestrator);
        move |image_id: String| {
            let orchestrator = Arc::clone(&orchestrator);
            async move { orchestrator.process(&image_id).await }
        }
    });
    info!(capacity = limiter.capacity(), "pipeline ready");

    let state = AppState { db: db_pool, store, storage, hub, limiter };

    let app = create_router(state, &config);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!(%addr, "listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(config.server.shutdown_timeout_secs))
        .await?;

    info!("server stopped");

    Ok(())
}

/// Assemble the route tree and wrap it in the middleware stack
fn create_router(state: AppState, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        store: state.store.clone(),
        storage: state.storage.clone(),
        hub: state.hub.clone(),
        limiter: state.limiter.clone(),
    };

    // leave headroom for multipart framing around the payload itself
    let max_body = state.storage.config().max_upload_size + 64 * 1024;
    let upload_dir = state.storage.config().upload_dir.clone();
    let processed_dir = state.storage.config().processed_dir.clone();

    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .with_state(state)
        .nest("/api/v1", features::router(feature_state.clone()))
        .nest("/ws", features::stream::stream_routes().with_state(feature_state))
        .nest_service("/uploads", ServeDir::new(upload_dir))
        .nest_service("/processed", ServeDir::new(processed_dir))
        // Apply layers from innermost to outermost
        .layer(DefaultBodyLimit::max(max_body))
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

/// Liveness plus database connectivity
async fn health_check(State(state): State<AppState>) -> Response {
    if let Err(e) = db::health_check(&state.db).await {
        tracing::error!("health probe failed: {e:?}");
        let body = Json(json!({ "status": "unhealthy", "database": "unreachable" }));
        return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
    }

    Json(json!({ "status": "healthy", "database": "connected" })).into_response()
}

/// Image counts by status plus live pipeline and observer figures
async fn get_stats(State(state): State<AppState>) -> Result<Response, StatusCode> {
    let counts = match state.store.status_counts().await {
        Ok(counts) => counts,
        Err(e) => {
            tracing::error!("stats query failed: {e:?}");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut total = 0i64;
    let mut by_status = serde_json::Map::new();
    for (status, count) in counts {
        total += count;
        by_status.insert(status.to_string(), json!(count));
    }

    Ok((
        StatusCode::OK,
        Json(json!({
            "images": {
                "total": total,
                "by_status": by_status,
            },
            "observers": state.hub.observer_count().await,
            "pipeline": {
                "max_concurrent": state.limiter.capacity(),
                "available_slots": state.limiter.available_slots(),
            }
        })),
    )
        .into_response())
}

/// Resolves once SIGINT or SIGTERM arrives, then holds the listener open
/// briefly so in-flight requests can drain
async fn shutdown_signal(timeout_secs: u64) {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            // without a handler, fall through to SIGTERM or an outright kill
            tracing::error!("cannot listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => info!("ctrl-c received, shutting down"),
        _ = terminate => info!("SIGTERM received, shutting down"),
    }

    let grace = Duration::from_secs(timeout_secs.min(5));
    info!("draining connections for up to {:?}", grace);
    tokio::time::sleep(grace).await;
}
