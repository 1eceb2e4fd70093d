//! HTTP 路由与共享状态

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::api::{convert, references};
use crate::error::{AppError, StorageError};
use crate::infrastructure::ReferenceStore;
use crate::orchestrator::JobRunner;
use crate::services::ValidationLimits;

/// 路由共享状态
#[derive(Clone)]
pub struct AppState {
    pub runner: Arc<JobRunner>,
    pub store: Arc<dyn ReferenceStore>,
    pub limits: ValidationLimits,
    /// 单个任务的整体时限
    pub job_timeout: Duration,
    pub max_request_bytes: usize,
}

/// 创建路由
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_request_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/api/convert", post(convert::convert))
        .route("/api/references", get(references::list_references))
        .route("/api/references/:slot", put(references::save_reference))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Storage(StorageError::Remote { .. }) => StatusCode::BAD_GATEWAY,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("❌ 请求处理失败: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
