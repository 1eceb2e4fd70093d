//! 批量改写任务编排 - 编排层
//!
//! ## 职责
//!
//! 按输入顺序逐个改写文档，每个文档前发一条 progress 事件；
//! 全部成功后打包并发 complete，任一文档失败则发 error 并停止。
//!
//! ## 状态机
//!
//! ```text
//! Idle ──start──> Running ──全部成功──> Completed
//!                    │
//!                    └──任一失败 / 取消──> Failed
//! ```
//!
//! ## 设计特点
//!
//! - **严格串行**：同一时刻只有一个远程调用
//! - **不落盘**：中途被终止不会留下任何外部状态
//! - **断开即停**：调用方断开后不再发起新的调用

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RewriteFailure;
use crate::models::{Job, JobStatus, RewriteOutcome};
use crate::orchestrator::events::{EventSink, OrchestratorEvent};
use crate::services::prompt;
use crate::services::{ArchiveAssembler, RewriteClient};
use crate::utils::logging;

/// 事件通道容量
const EVENT_BUFFER: usize = 8;

/// 有序事件流（接收端）
pub type EventStream = ReceiverStream<OrchestratorEvent>;

/// 任务编排器
pub struct JobRunner {
    client: RewriteClient,
    assembler: ArchiveAssembler,
}

impl JobRunner {
    pub fn new(client: RewriteClient, assembler: ArchiveAssembler) -> Self {
        Self { client, assembler }
    }

    /// 在后台启动任务并返回事件流
    ///
    /// `cancel` 由宿主层持有（例如整体超时）；调用方丢弃事件流时也会触发它。
    pub fn spawn(self: &Arc<Self>, job: Job, cancel: CancellationToken) -> EventStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let sink = EventSink::new(tx);
        let done = CancellationToken::new();

        // 监听调用方断开
        {
            let sink = sink.clone();
            let cancel = cancel.clone();
            let done = done.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = sink.closed() => {
                        debug!("事件流接收端已关闭，取消任务");
                        cancel.cancel();
                    }
                    _ = done.cancelled() => {}
                }
            });
        }

        let runner = Arc::clone(self);
        tokio::spawn(async move {
            let label = job.to_string();
            let result = AssertUnwindSafe(runner.run(job, &sink, &cancel))
                .catch_unwind()
                .await;

            if result.is_err() {
                error!("{} ❌ 任务执行过程中发生内部错误", label);
                let _ = sink
                    .send(OrchestratorEvent::error("服务器内部错误，任务已终止"))
                    .await;
            }
            done.cancel();
        });

        ReceiverStream::new(rx)
    }

    /// 执行任务，返回最终状态
    pub async fn run(&self, mut job: Job, sink: &EventSink, cancel: &CancellationToken) -> JobStatus {
        let total = job.total();
        logging::log_job_start(&job, self.client.model());

        if let Err(e) = self.client.ensure_configured() {
            error!("{} ❌ 配置错误: {}", job, e);
            job.fail();
            let _ = sink.send(OrchestratorEvent::error(e.to_string())).await;
            return job.status();
        }

        job.start();
        let instructions = prompt::build_system_prompt(job.reference());
        let mut rewritten = Vec::with_capacity(total);

        for index in 0..total {
            let document = job.documents()[index].clone();
            let current = index + 1;

            if cancel.is_cancelled() {
                return self.stop_cancelled(&mut job, sink).await;
            }

            logging::log_document_start(&job, current, total, &document.name);
            let progress = OrchestratorEvent::Progress {
                current,
                total,
                filename: document.name.clone(),
            };
            if sink.send(progress).await.is_err() {
                return self.stop_cancelled(&mut job, sink).await;
            }

            match self
                .client
                .rewrite(&instructions, &document.content, cancel)
                .await
            {
                RewriteOutcome::Success { rewritten_content } => {
                    debug!(
                        "{} ✓ {} 改写完成 ({} -> {} 字符)",
                        job,
                        document.name,
                        document.content.chars().count(),
                        rewritten_content.chars().count()
                    );
                    rewritten.push(document.rewritten(rewritten_content));
                    job.advance();
                }
                RewriteOutcome::Failure {
                    reason: RewriteFailure::Cancelled,
                } => {
                    return self.stop_cancelled(&mut job, sink).await;
                }
                RewriteOutcome::Failure { reason } => {
                    error!("{} ❌ 第 {} 个文档 {} 处理失败: {}", job, current, document.name, reason);
                    job.fail();
                    let _ = sink
                        .send(OrchestratorEvent::Error {
                            message: format!("{} 处理失败: {}", document.name, reason),
                            failed_at: Some(current),
                            filename: Some(document.name),
                        })
                        .await;
                    return job.status();
                }
            }
        }

        let archive_base64 = match self.assembler.assemble_base64(&rewritten) {
            Ok(encoded) => encoded,
            Err(e) => {
                error!("{} ❌ 打包失败: {}", job, e);
                job.fail();
                let _ = sink.send(OrchestratorEvent::error(e.to_string())).await;
                return job.status();
            }
        };

        job.complete();
        let _ = sink
            .send(OrchestratorEvent::Complete {
                archive_base64,
                total_processed: total,
            })
            .await;
        logging::log_job_complete(&job);
        job.status()
    }

    /// 任务被取消：调用方还在就告知原因，已断开则不再发送
    async fn stop_cancelled(&self, job: &mut Job, sink: &EventSink) -> JobStatus {
        job.fail();
        if sink.is_closed() {
            warn!("{} ⚠️ 调用方已断开，停止处理 ({}/{})", job, job.current(), job.total());
        } else {
            warn!("{} ⚠️ 任务超时被终止 ({}/{})", job, job.current(), job.total());
            let _ = sink
                .send(OrchestratorEvent::error(format!(
                    "任务超时已终止，已完成 {}/{} 个文档",
                    job.current(),
                    job.total()
                )))
                .await;
        }
        info!("{} 任务结束: {:?}", job, job.status());
        job.status()
    }
}
