//! 应用入口 - 组装各层并启动 HTTP 服务
//!
//! ## 职责
//!
//! 1. **应用初始化**：按配置选择参考文档存储、创建改写客户端与任务执行器
//! 2. **服务运行**：绑定监听地址，收到 Ctrl+C 后优雅退出

use anyhow::Result;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::api::{build_router, AppState};
use crate::config::{Config, StoreBackend};
use crate::infrastructure::reference_store;
use crate::orchestrator::JobRunner;
use crate::services::{ArchiveAssembler, LlmService, RetryPolicy, RewriteClient, ValidationLimits};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Config,
    state: AppState,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        let store = reference_store::from_config(&config)?;
        logging::log_startup(&config, &describe_store(&config));

        let service = Arc::new(LlmService::new(&config));
        let client = RewriteClient::new(
            service,
            config.llm_model_name.clone(),
            RetryPolicy::from_config(&config),
        );
        let runner = Arc::new(JobRunner::new(client, ArchiveAssembler::new()));

        let state = AppState {
            runner,
            store,
            limits: ValidationLimits::from_config(&config),
            job_timeout: config.job_timeout(),
            max_request_bytes: config.max_request_bytes,
        };

        Ok(Self { config, state })
    }

    /// 运行 HTTP 服务，直到收到退出信号
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("✓ 服务已就绪: http://{}", listener.local_addr()?);

        axum::serve(listener, build_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("👋 服务已停止");
        Ok(())
    }
}

fn describe_store(config: &Config) -> String {
    match config.reference_store {
        StoreBackend::File => format!("本地文件 {}", config.reference_file),
        StoreBackend::Kv => format!("KV 存储 (前缀 {})", config.kv_key_prefix),
        StoreBackend::Memory => "进程内存".to_string(),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("收到退出信号，正在关闭...");
    }
}
