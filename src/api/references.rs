//! 参考文档接口
//!
//! - `GET /api/references` 读取已保存的全部槽位
//! - `PUT /api/references/:slot` 保存单个槽位

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::router::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{ReferenceContext, SlotName};

#[derive(Debug, Deserialize)]
pub struct SaveReferenceRequest {
    pub content: String,
    #[serde(default)]
    pub filename: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReferenceResponse {
    pub slot: SlotName,
    pub saved_at: DateTime<Utc>,
}

pub async fn list_references(State(state): State<AppState>) -> AppResult<Json<ReferenceContext>> {
    Ok(Json(state.store.load().await?))
}

pub async fn save_reference(
    State(state): State<AppState>,
    Path(slot): Path<String>,
    payload: Result<Json<SaveReferenceRequest>, JsonRejection>,
) -> AppResult<Json<SaveReferenceResponse>> {
    let slot: SlotName = slot.parse().map_err(AppError::not_found)?;
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    if request.content.trim().is_empty() {
        return Err(AppError::bad_request("参考文档内容不能为空"));
    }

    let filename = if request.filename.trim().is_empty() {
        format!("{}.md", slot)
    } else {
        request.filename
    };

    let saved_at = state.store.save_slot(slot, request.content, filename.clone()).await?;
    info!("✓ 参考文档已保存: {} ({})", slot, filename);

    Ok(Json(SaveReferenceResponse { slot, saved_at }))
}
