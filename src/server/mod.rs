//! HTTP surface: teardown endpoint, health check and API docs.

use anyhow::{Context, Result};
use axum::{
    http::{header, HeaderName, Method},
    middleware,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::context::AppContext;

pub mod auth;
pub mod error;
pub mod openapi;
pub mod request_id;
pub mod routes;

/// Create the router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(auth::FUNCTION_KEY_HEADER),
        ]);

    let api = routes::teardown_routes().layer(middleware::from_fn_with_state(
        ctx.clone(),
        auth::api_key_middleware,
    ));

    Router::new()
        .route("/health", get(routes::health))
        .nest("/api", api)
        .merge(openapi::openapi_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id::request_id_middleware))
        .with_state(ctx)
}

/// Serve until ctrl-c or SIGTERM. Shutdown cancels in-flight stop waits.
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port)
        .parse()
        .context("Invalid server address")?;

    if ctx.config.server.api_key.is_none() {
        tracing::warn!("server.api_key is not set; the teardown endpoint is unauthenticated");
    }

    let shutdown = ctx.shutdown.clone();
    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = token.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
    token.cancel();
}
