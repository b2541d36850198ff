//! HTTP request handlers.

pub mod auth;
pub mod cart;
pub mod common;
pub mod orders;
pub mod products;

pub use auth::*;
pub use cart::*;
pub use common::*;
pub use orders::*;
pub use products::*;

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub products: usize,
    pub load_err: Option<String>,
}

/// GET /health - liveness probe with catalog load status.
/// Intentionally unauthenticated for load balancers and deploy probes.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        products: state.catalog.len().await,
        load_err: state.catalog.load_error().await,
    })
}
