//! API handlers for the holden endpoints.

use crate::AppState;
use axum::{
    body::Bytes,
    extract::{Extension, Json, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use holden_store::{create_holden, get_holden, list_holdens, Holden, NewHolden, StoreError};
use std::sync::Arc;
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        tracing::error!(cause = e.kind(), error = %e, "holden store operation failed");
        ApiError::InternalServerError(e.to_string())
    }
}

/// Checks a connection out of the pool and runs `op` on the blocking thread pool.
async fn with_conn<T, F>(state: Arc<AppState>, op: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&rusqlite::Connection) -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = state.pool.get().map_err(|e| {
            tracing::error!(cause = "pool", error = %e, "failed to get db connection");
            ApiError::InternalServerError(format!("db connection failed: {}", e))
        })?;
        op(&conn).map_err(ApiError::from)
    })
    .await
    .map_err(|e| {
        tracing::error!(cause = "task_join", error = %e, "blocking database task failed");
        ApiError::InternalServerError(format!("task join error: {}", e))
    })?
}

/// Handler for `POST /holden`.
///
/// The body is decoded as JSON whatever its `Content-Type` says. Returns the
/// stored holden, including the id the database assigned.
pub async fn create_holden_handler(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Holden>, ApiError> {
    let new: NewHolden = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("invalid holden body: {}", e)))?;

    let holden = with_conn(state, move |conn| create_holden(conn, &new)).await?;
    tracing::info!(id = holden.id, "holden created");

    Ok(Json(holden))
}

/// Handler for `GET /holden/{id}`.
pub async fn get_holden_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Holden>, ApiError> {
    let id: i64 = id
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid holden id: {}", id)))?;

    with_conn(state, move |conn| get_holden(conn, id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("holden {} not found", id)))
}

/// Handler for `GET /holden`.
///
/// Always answers with a JSON array; `[]` when no holden exists.
pub async fn list_holdens_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<Holden>>, ApiError> {
    let holdens = with_conn(state, list_holdens).await?;
    Ok(Json(holdens))
}
