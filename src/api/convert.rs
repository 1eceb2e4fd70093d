//! 批量转换接口 `POST /api/convert`
//!
//! 校验失败时返回只有一个 error 事件的流；通过后启动任务并把事件实时转成 SSE 帧。

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use futures::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::router::AppState;
use crate::api::sse::sse_response;
use crate::error::{AppError, AppResult};
use crate::models::{Document, Job, ReferenceContext};
use crate::orchestrator::OrchestratorEvent;
use crate::services::admit;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertRequest {
    pub documents: Vec<Document>,
    /// 省略时使用已保存的参考文档
    #[serde(default)]
    pub reference_context: Option<ReferenceContext>,
}

pub async fn convert(
    State(state): State<AppState>,
    payload: Result<Json<ConvertRequest>, JsonRejection>,
) -> AppResult<Response> {
    let Json(request) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;

    let reference = match request.reference_context {
        Some(context) => context,
        None => match state.store.load().await {
            Ok(context) => context,
            Err(e) => {
                error!("❌ 读取参考文档失败: {}", e);
                return Ok(single_error(e.to_string()));
            }
        },
    };

    let batch = match admit(&request.documents, &reference, &state.limits) {
        Ok(batch) => batch,
        Err(e) => {
            warn!("⚠️ 批次被拒绝: {}", e);
            return Ok(single_error(e.to_string()));
        }
    };

    let job = Job::new(batch.documents, reference);
    info!("{} 📥 收到 {} 个文档 ({} 字节)", job, job.total(), batch.total_bytes);

    let cancel = CancellationToken::new();
    let finished = CancellationToken::new();
    spawn_deadline(&state, &job, cancel.clone(), finished.clone());

    // 响应体被丢弃（正常结束或断开）时结束计时
    let guard = finished.drop_guard();
    let events = state.runner.spawn(job, cancel).map(move |event| {
        let _ = &guard;
        event
    });

    Ok(sse_response(events))
}

/// 任务启动前的失败：只含一个 error 事件的流
fn single_error(message: String) -> Response {
    sse_response(futures::stream::once(async move { OrchestratorEvent::error(message) }))
}

/// 超过整体时限后取消任务
fn spawn_deadline(state: &AppState, job: &Job, cancel: CancellationToken, finished: CancellationToken) {
    let timeout = state.job_timeout;
    let label = job.to_string();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => {
                warn!("{} ⏰ 超过 {} 秒仍未完成，终止任务", label, timeout.as_secs());
                cancel.cancel();
            }
            _ = finished.cancelled() => {}
        }
    });
}
