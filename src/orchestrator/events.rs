//! 任务事件
//!
//! 编排层只产生带类型的事件，序列化为 SSE 帧由接口层负责。

use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// 编排器事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// 即将处理第 `current` 个文档（从 1 开始）
    Progress {
        current: usize,
        total: usize,
        filename: String,
    },
    /// 全部成功，附带 base64 编码的压缩包
    Complete {
        archive_base64: String,
        total_processed: usize,
    },
    /// 任务终止
    Error {
        message: String,
        failed_at: Option<usize>,
        filename: Option<String>,
    },
}

impl OrchestratorEvent {
    /// 不带位置信息的错误事件（校验、配置、内部错误）
    pub fn error(message: impl Into<String>) -> Self {
        OrchestratorEvent::Error {
            message: message.into(),
            failed_at: None,
            filename: None,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::Progress { .. } => "progress",
            OrchestratorEvent::Complete { .. } => "complete",
            OrchestratorEvent::Error { .. } => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrchestratorEvent::Progress { .. })
    }

    /// 事件负载（字段名使用 camelCase）
    pub fn payload(&self) -> JsonValue {
        match self {
            OrchestratorEvent::Progress {
                current,
                total,
                filename,
            } => json!({
                "current": current,
                "total": total,
                "filename": filename,
            }),
            OrchestratorEvent::Complete {
                archive_base64,
                total_processed,
            } => json!({
                "archiveBase64": archive_base64,
                "totalProcessed": total_processed,
            }),
            OrchestratorEvent::Error {
                message,
                failed_at,
                filename,
            } => {
                let mut payload = json!({ "message": message });
                if let Some(failed_at) = failed_at {
                    payload["failedAt"] = json!(failed_at);
                }
                if let Some(filename) = filename {
                    payload["filename"] = json!(filename);
                }
                payload
            }
        }
    }
}

/// 调用方已断开
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Disconnected;

/// 事件发送端
///
/// 单生产者单消费者；记录终止事件是否已发出，保证每个任务最多一个。
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::Sender<OrchestratorEvent>,
    terminal_sent: Arc<AtomicBool>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<OrchestratorEvent>) -> Self {
        Self {
            tx,
            terminal_sent: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 发送事件；终止事件之后的任何事件都会被丢弃
    pub async fn send(&self, event: OrchestratorEvent) -> Result<(), Disconnected> {
        if self.terminal_sent() {
            return Ok(());
        }
        let terminal = event.is_terminal();
        self.tx.send(event).await.map_err(|_| Disconnected)?;
        if terminal {
            self.terminal_sent.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    pub fn terminal_sent(&self) -> bool {
        self.terminal_sent.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// 等待接收端被丢弃
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_error_payload_omits_missing_position() {
        let payload = OrchestratorEvent::error("缺少格式规范").payload();
        assert_eq!(payload, json!({ "message": "缺少格式规范" }));
    }

    #[test]
    fn test_payload_field_names() {
        let complete = OrchestratorEvent::Complete {
            archive_base64: "UEsDBA==".to_string(),
            total_processed: 3,
        };
        assert_eq!(
            complete.payload(),
            json!({ "archiveBase64": "UEsDBA==", "totalProcessed": 3 })
        );

        let failed = OrchestratorEvent::Error {
            message: "boom".to_string(),
            failed_at: Some(2),
            filename: Some("b.md".to_string()),
        };
        assert_eq!(
            failed.payload(),
            json!({ "message": "boom", "failedAt": 2, "filename": "b.md" })
        );
    }

    #[tokio::test]
    async fn test_sink_drops_events_after_terminal() {
        let (tx, mut rx) = mpsc::channel(8);
        let sink = EventSink::new(tx);

        assert_ok!(sink.send(OrchestratorEvent::error("first")).await);
        assert_ok!(sink.send(OrchestratorEvent::error("second")).await);
        drop(sink);

        assert_eq!(rx.recv().await, Some(OrchestratorEvent::error("first")));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_sink_reports_disconnect() {
        let (tx, rx) = mpsc::channel(8);
        let sink = EventSink::new(tx);
        drop(rx);

        assert!(sink.is_closed());
        let result = sink
            .send(OrchestratorEvent::Progress {
                current: 1,
                total: 1,
                filename: "a.md".to_string(),
            })
            .await;
        assert_eq!(assert_err!(result), Disconnected);
    }
}
