//! HTTP surface of the populate service.

mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, ServerError};
pub use state::AppState;

use crate::errors::{PopulateError, Result};

/// Build the application router
pub fn build_router(state: Arc<AppState>) -> Router {
    // Populate routes require the admin token when one is configured
    let protected = Router::new()
        .route(
            "/populate/:content_type/:document_id",
            get(routes::populate_one),
        )
        .route("/populate-bulk/:content_type", post(routes::populate_bulk))
        .route(
            "/references/:content_type/:document_id",
            get(routes::references),
        )
        .route("/validate-references", post(routes::validate_references))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_token,
        ));

    Router::new()
        .route("/health", get(routes::health))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Binds `addr` and serves until ctrl-c.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    tracing::info!(
        addr = %local,
        lexical_field = %state.config.lexical_field,
        auth = state.config.admin_token.is_some(),
        "populate server starting"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(PopulateError::Io)?;

    tracing::info!("populate server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
