//! 远程改写客户端 - 业务能力层
//!
//! 在 [`RewriteService`] 外面包一层重试：瞬时故障按指数退避重试，
//! 其余错误立即返回失败结果。

use async_trait::async_trait;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ConfigError, RewriteFailure, ServiceError};
use crate::models::RewriteOutcome;

/// 远程改写服务
///
/// 实现方负责把原始故障翻译成带类别的 `ServiceError`。
#[async_trait]
pub trait RewriteService: Send + Sync {
    /// 凭证检查，不发起网络请求
    fn ensure_configured(&self) -> Result<(), ConfigError>;

    async fn invoke(
        &self,
        system_instructions: &str,
        user_content: &str,
        model: &str,
    ) -> Result<String, ServiceError>;
}

/// 重试策略
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(60),
            max_jitter: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.retry_max_attempts.max(1),
            initial_delay: Duration::from_millis(config.retry_initial_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
            max_jitter: Duration::from_millis(config.retry_max_jitter_ms),
        }
    }

    /// 第 `retry` 次重试（从 1 开始）前的基础等待：`min(initial * 2^(retry-1), max)`
    pub fn base_delay(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }

    /// 基础等待加上 `[0, max_jitter]` 内的随机抖动
    pub fn delay_with_jitter(&self, retry: u32) -> Duration {
        let jitter_ms = self.max_jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
        };
        self.base_delay(retry) + jitter
    }
}

/// 远程改写客户端
pub struct RewriteClient {
    service: Arc<dyn RewriteService>,
    model: String,
    policy: RetryPolicy,
}

impl RewriteClient {
    pub fn new(service: Arc<dyn RewriteService>, model: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            service,
            model: model.into(),
            policy,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn ensure_configured(&self) -> Result<(), ConfigError> {
        self.service.ensure_configured()
    }

    /// 改写单个文档
    ///
    /// 调用发出后不会被打断；取消只在退避等待期间生效。
    pub async fn rewrite(
        &self,
        instructions: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> RewriteOutcome {
        if let Err(e) = self.service.ensure_configured() {
            return RewriteOutcome::Failure {
                reason: RewriteFailure::Configuration(e),
            };
        }

        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!("第 {}/{} 次调用改写服务", attempt, max_attempts);

            let err = match self.service.invoke(instructions, content, &self.model).await {
                Ok(text) if text.trim().is_empty() => {
                    return RewriteOutcome::Failure {
                        reason: RewriteFailure::EmptyResponse,
                    };
                }
                Ok(text) => {
                    return RewriteOutcome::Success {
                        rewritten_content: text,
                    };
                }
                Err(err) => err,
            };

            if !err.category.is_retryable() {
                return RewriteOutcome::Failure {
                    reason: RewriteFailure::NonRetryable(err),
                };
            }

            if attempt >= max_attempts {
                return RewriteOutcome::Failure {
                    reason: RewriteFailure::RetriesExhausted {
                        attempts: attempt,
                        last: err,
                    },
                };
            }

            let delay = self.policy.delay_with_jitter(attempt);
            warn!(
                "⏳ 改写服务暂时不可用 ({}), {}ms 后进行第 {} 次尝试",
                err.category,
                delay.as_millis(),
                attempt + 1
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => {
                    return RewriteOutcome::Failure {
                        reason: RewriteFailure::Cancelled,
                    };
                }
            }
        }
    }
}
