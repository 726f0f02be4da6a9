use std::sync::Arc;

use anyhow::Context;
use http::HeaderValue;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use glexport_api as api;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection(&cfg)
        .await
        .context("failed to establish database connection")?;

    // Build CORS layer from config; the internal dashboard is the only
    // expected consumer, so missing origins fall back to permissive.
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        if cfg.is_development() {
            info!("No CORS origins configured; using permissive CORS (development)");
        } else {
            warn!("No CORS origins configured; falling back to permissive CORS. Set APP__CORS_ALLOWED_ORIGINS to restrict.");
        }
        CorsLayer::permissive()
    };

    let state = api::AppState {
        db: Arc::new(db_pool),
        config: cfg.clone(),
    };
    let app = api::app_router(state).layer(cors_layer);

    // Bind and serve
    let addr = cfg.server_addr();
    info!("glexport-api listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("failed to bind server address")?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
