//! HTTP query surface.
//!
//! Degraded retrievals are still `200 OK`: the `status` and `note` fields of
//! the body carry the degradation. Only invalid input (400) and a total
//! search outage with nothing retrieved (503) are HTTP failures.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::answer::QueryResponse;
use crate::app::AppContext;
use crate::core::{QueryContext, ResultStatus};
use crate::error::{RagError, Result};

pub type SharedContext = Arc<AppContext>;

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/search", get(search))
        .route("/query", post(query))
        .with_state(ctx)
}

/// Serve on an already bound listener until Ctrl-C.
pub async fn serve(ctx: AppContext, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, "robot-rag listening");
    axum::serve(listener, router(Arc::new(ctx)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub audience_level: Option<String>,
    #[serde(default)]
    pub robot_model: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(default)]
    pub audience_level: Option<String>,
    #[serde(default)]
    pub robot_model: Option<String>,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn search(
    State(ctx): State<SharedContext>,
    Query(params): Query<SearchParams>,
) -> std::result::Result<Json<QueryResponse>, ApiError> {
    let query = QueryContext::parse(
        params.query.unwrap_or_default(),
        params.audience_level.as_deref(),
        params.robot_model.as_deref(),
    )?;
    respond(ctx.run_query(&query, false).await)
}

async fn query(
    State(ctx): State<SharedContext>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> std::result::Result<Json<QueryResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| RagError::InvalidQuery(rejection.body_text()))?;
    let query = QueryContext::parse(
        request.query,
        request.audience_level.as_deref(),
        request.robot_model.as_deref(),
    )?;
    respond(ctx.run_query(&query, true).await)
}

fn respond(response: QueryResponse) -> std::result::Result<Json<QueryResponse>, ApiError> {
    if response.status == ResultStatus::AllBranchesUnavailable.as_str()
        && response.citations.is_empty()
    {
        return Err(ApiError::with_detail(
            RagError::AllBranchesUnavailable,
            response.note.unwrap_or_default(),
        ));
    }
    Ok(Json(response))
}

/// JSON error body `{error, code, message}` with a status derived from the
/// error kind.
#[derive(Debug)]
pub struct ApiError {
    error: RagError,
    detail: Option<String>,
}

impl ApiError {
    fn with_detail(error: RagError, detail: String) -> Self {
        Self {
            error,
            detail: Some(detail).filter(|d| !d.is_empty()),
        }
    }

    fn status(&self) -> StatusCode {
        match self.error {
            RagError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
            RagError::AllBranchesUnavailable | RagError::SearchUnavailable { .. } => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RagError> for ApiError {
    fn from(error: RagError) -> Self {
        Self {
            error,
            detail: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.detail.unwrap_or_else(|| self.error.to_string());
        let body = json!({
            "error": true,
            "code": self.error.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}
