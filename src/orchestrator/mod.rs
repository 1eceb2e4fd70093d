//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一批文档的顺序调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `job_runner` - 批量任务执行器
//! - 逐个调用改写客户端（严格串行）
//! - 每个文档开始前发出 progress 事件
//! - 全部成功后调用打包能力，发出 complete 事件
//! - 失败、超时或调用方断开时停止
//!
//! ### `events` - 任务事件
//! - 类型化的 progress / complete / error 事件
//! - 保证每个任务最多一个终止事件
//!
//! ## 层次关系
//!
//! ```text
//! api::convert (HTTP / SSE)
//!     ↓
//! job_runner (处理 Vec<Document>)
//!     ↓
//! services (能力层：rewrite / prompt / archive)
//!     ↓
//! infrastructure (基础设施：ReferenceStore)
//! ```

pub mod events;
pub mod job_runner;

// 重新导出主要类型
pub use events::{Disconnected, EventSink, OrchestratorEvent};
pub use job_runner::{EventStream, JobRunner};
