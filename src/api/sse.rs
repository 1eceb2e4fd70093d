//! SSE 帧序列化
//!
//! 帧格式固定为 `event:<type>\ndata:<JSON>\n\n`，不带 id / retry 字段。

use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::HeaderValue;
use axum::response::Response;
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use crate::orchestrator::OrchestratorEvent;

/// 单个事件对应的 SSE 帧
pub fn to_frame(event: &OrchestratorEvent) -> String {
    format!("event:{}\ndata:{}\n\n", event.event_type(), event.payload())
}

/// 把事件流包装成 `text/event-stream` 响应
pub fn sse_response<S>(events: S) -> Response
where
    S: Stream<Item = OrchestratorEvent> + Send + 'static,
{
    let frames = events.map(|event| Ok::<_, Infallible>(to_frame(&event)));
    let mut response = Response::new(Body::from_stream(frames));

    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_frame_is_exact() {
        let frame = to_frame(&OrchestratorEvent::Progress {
            current: 1,
            total: 3,
            filename: "a.md".to_string(),
        });
        assert_eq!(
            frame,
            "event:progress\ndata:{\"current\":1,\"filename\":\"a.md\",\"total\":3}\n\n"
        );
    }

    #[test]
    fn test_error_frame_without_position() {
        let frame = to_frame(&OrchestratorEvent::error("boom"));
        assert_eq!(frame, "event:error\ndata:{\"message\":\"boom\"}\n\n");
    }

    #[tokio::test]
    async fn test_response_headers() {
        let response = sse_response(futures::stream::iter(vec![OrchestratorEvent::error("x")]));
        assert_eq!(response.headers()[CONTENT_TYPE], "text/event-stream");
        assert_eq!(response.headers()[CACHE_CONTROL], "no-cache");
    }
}
