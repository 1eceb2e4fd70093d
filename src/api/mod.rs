//! API 模块
//!
//! 负责所有与外部调用方的交互（HTTP + SSE）

pub mod convert;
pub mod references;
pub mod router;
pub mod sse;

// 重新导出常用类型
pub use router::{build_router, AppState};
pub use sse::{sse_response, to_frame};
