//! LLM 服务 - 业务能力层
//!
//! 只负责"调用一次改写模型"能力，不关心重试和流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Azure, Gemini, Doubao 等）
//!
//! 原始错误在这里被归类为 [`ErrorCategory`]，上层只看类别。

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{ConfigError, ErrorCategory, ServiceError};
use crate::services::rewrite_client::RewriteService;

static OVERLOADED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)overloaded|\b529\b|\b503\b|\b502\b|service unavailable|server_error|temporarily unavailable")
        .expect("valid regex")
});
static RATE_LIMITED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)rate[ _-]?limit|too many requests|\b429\b|quota exceeded")
        .expect("valid regex")
});
static TIMEOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)timed? ?out|timeout|deadline exceeded|ETIMEDOUT|\b504\b")
        .expect("valid regex")
});
static CONNECTION_RESET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)ECONNRESET|connection (reset|closed|refused)|broken pipe|socket hang up|error sending request")
        .expect("valid regex")
});

/// 根据原始错误描述归类
///
/// 先判限流：429 报文里也可能出现 503、overloaded 等字样。
pub fn classify_error_message(message: &str) -> ErrorCategory {
    if RATE_LIMITED.is_match(message) {
        ErrorCategory::RateLimited
    } else if OVERLOADED.is_match(message) {
        ErrorCategory::Overloaded
    } else if TIMEOUT.is_match(message) {
        ErrorCategory::Timeout
    } else if CONNECTION_RESET.is_match(message) {
        ErrorCategory::ConnectionReset
    } else {
        ErrorCategory::Other
    }
}

/// LLM 服务
///
/// 职责：
/// - 调用 LLM API 改写单个文档
/// - 把原始错误翻译成结构化的 `ServiceError`
/// - 不处理重试
/// - 不出现 Vec<Document>
pub struct LlmService {
    client: Client<OpenAIConfig>,
    has_credential: bool,
    temperature: f32,
    max_tokens: u32,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        let api_key = config.llm_api_key.clone().unwrap_or_default();

        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            has_credential: !api_key.trim().is_empty(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
        }
    }

    fn request_error(err: impl std::fmt::Display) -> ServiceError {
        ServiceError::new(ErrorCategory::Other, format!("构建请求失败: {}", err))
    }
}

#[async_trait]
impl RewriteService for LlmService {
    fn ensure_configured(&self) -> Result<(), ConfigError> {
        if self.has_credential {
            Ok(())
        } else {
            Err(ConfigError::MissingCredential)
        }
    }

    async fn invoke(
        &self,
        system_instructions: &str,
        user_content: &str,
        model: &str,
    ) -> Result<String, ServiceError> {
        debug!("调用 LLM API，模型: {}", model);
        debug!("用户消息长度: {} 字符", user_content.len());

        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_instructions)
            .build()
            .map_err(Self::request_error)?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_content)
            .build()
            .map_err(Self::request_error)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestMessage::System(system_msg),
                ChatCompletionRequestMessage::User(user_msg),
            ])
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(Self::request_error)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            let message = e.to_string();
            let category = classify_error_message(&message);
            warn!("LLM API 调用失败 ({}): {}", category, message);
            ServiceError::new(category, message)
        })?;

        debug!("LLM API 调用成功");

        // 没有文本内容时返回空串，由上层判定为失败
        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}
