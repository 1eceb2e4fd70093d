//! # Batch Reformat
//!
//! 按参考文档批量改写 Markdown 文档的 HTTP 服务
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有外部状态，只暴露能力
//! - `ReferenceStore` - 参考文档的读取与保存（文件 / KV / 内存）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个文档或单个批次
//! - `validation` - 批次准入校验
//! - `RewriteClient` - 带重试的远程改写能力（`LlmService` 为默认实现）
//! - `prompt` - 系统提示词拼装
//! - `ArchiveAssembler` - ZIP 打包能力
//!
//! ### ③ 编排层（Orchestration）
//! - `orchestrator/job_runner` - 逐个处理文档，产生有序事件
//! - `orchestrator/events` - progress / complete / error 事件
//!
//! ### ④ 接口层（API）
//! - `api/` - axum 路由、SSE 帧序列化、参考文档接口
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod logger;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Document, Job, JobStatus, ReferenceContext};
pub use orchestrator::{JobRunner, OrchestratorEvent};
