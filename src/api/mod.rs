//! HTTP boundary - JSON endpoints for the scheduling and ledger operations.
//!
//! The core logic lives in [`crate::core`]; this layer only extracts request
//! payloads, invokes the core functions, and maps [`Error`] kinds to status
//! codes. Error bodies are JSON objects carrying the human-readable message and
//! the stable machine-readable kind:
//! `{ "error": "...", "kind": "conflict" }`.

mod lessons;
mod students;

use crate::errors::{Error, Result};
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
};
use sea_orm::DatabaseConnection;
use serde_json::json;
use tracing::info;

/// Shared handler state: the SeaORM connection pool.
#[derive(Clone)]
pub struct ApiState {
    /// Connection pool shared by all handlers
    pub db: DatabaseConnection,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match self.kind() {
            "validation" => StatusCode::UNPROCESSABLE_ENTITY,
            "conflict" | "invalid_transition" => StatusCode::CONFLICT,
            "not_found" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let payload = json!({
            "error": self.to_string(),
            "kind": self.kind(),
        });
        (status, axum::Json(payload)).into_response()
    }
}

async fn health() -> Response {
    (StatusCode::OK, axum::Json(json!({ "status": "ok" }))).into_response()
}

/// Builds the application router over the given connection.
pub fn router(db: DatabaseConnection) -> Router {
    let state = ApiState { db };
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/lessons", post(lessons::create))
        .route("/api/v1/lessons", get(lessons::list))
        .route("/api/v1/lessons/:id", get(lessons::fetch))
        .route("/api/v1/lessons/:id", patch(lessons::reschedule))
        .route("/api/v1/lessons/:id/status", post(lessons::update_status))
        .route("/api/v1/lessons/:id", delete(lessons::remove))
        .route("/api/v1/conflicts", get(lessons::check_conflicts))
        .route(
            "/api/v1/students/:id/transactions",
            post(students::record_transaction),
        )
        .route(
            "/api/v1/students/:id/transactions",
            get(students::list_transactions),
        )
        .route("/api/v1/students/:id/balance", get(students::balance))
        .route("/api/v1/students/:id/history", get(students::list_history))
        .route(
            "/api/v1/students/:id/history",
            post(students::record_manual_history),
        )
        .with_state(state)
}

/// Binds the listener and serves the API until the process is stopped.
pub async fn serve(bind_addr: &str, db: DatabaseConnection) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(%bind_addr, "drivedesk API listening");
    axum::serve(listener, router(db)).await?;
    Ok(())
}
