//! HTTP surface over the ledger

pub mod error;
pub mod routes;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::ledger::LedgerService;

pub use error::ApiError;

// Room for multipart boundaries and the other form fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerService>,
}

pub fn router(ledger: Arc<LedgerService>) -> Router {
    let body_limit =
        usize::try_from(ledger.policy().max_bytes()).unwrap_or(usize::MAX).saturating_add(MULTIPART_OVERHEAD);

    Router::new()
        .route("/api/health", get(routes::health_check))
        .route("/api/submit", post(routes::submit_file))
        .route("/api/verify", post(routes::verify_file))
        .route("/api/submissions", get(routes::list_submissions))
        .route("/api/chain", get(routes::chain_status))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit))
                .into_inner(),
        )
        .with_state(AppState { ledger })
}
