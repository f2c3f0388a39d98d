//! HTTP API
//!
//! `GET /api/positions?address=W` returns `{"pools": [...]}`. Failures carry
//! a fixed `{"error": ...}` body; details go to the log only.

use crate::positions::{PortfolioAggregator, Position};
use crate::{Error, Result};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Body of a successful positions response
#[derive(Debug, Serialize)]
pub struct PositionsResponse {
    pub pools: Vec<Position>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error) = if self.is_client_error() {
            (StatusCode::BAD_REQUEST, "invalid address")
        } else {
            tracing::error!(error = %self, "Positions request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to fetch positions")
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    aggregator: Arc<PortfolioAggregator>,
}

#[derive(Debug, Deserialize)]
struct PositionsQuery {
    address: Option<String>,
}

async fn positions(
    State(state): State<AppState>,
    Query(query): Query<PositionsQuery>,
) -> Result<Json<PositionsResponse>> {
    let address = query.address.unwrap_or_default();
    let pools = state.aggregator.positions_for_wallet(&address).await?;
    Ok(Json(PositionsResponse { pools }))
}

async fn health() -> &'static str {
    "ok"
}

pub fn router(aggregator: PortfolioAggregator) -> Router {
    let state = AppState {
        aggregator: Arc::new(aggregator),
    };

    Router::new()
        .route("/api/positions", get(positions))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the API on `addr` until Ctrl-C
pub async fn serve(aggregator: PortfolioAggregator, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Listening");

    axum::serve(listener, router(aggregator))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down");
        })
        .await?;

    Ok(())
}
