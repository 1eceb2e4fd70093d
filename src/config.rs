//! 程序配置
//!
//! 先读取可选的 TOML 配置文件，再用环境变量覆盖。

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;

/// 参考文档存储后端
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 本地 JSON 文件
    File,
    /// REST 风格的托管 KV 存储
    Kv,
    /// 进程内存（重启即丢失）
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(StoreBackend::File),
            "kv" => Ok(StoreBackend::Kv),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(ConfigError::EnvVarParseFailed {
                var_name: "REFERENCE_STORE".to_string(),
                value: other.to_string(),
                expected_type: "file | kv | memory".to_string(),
            }),
        }
    }
}

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 监听地址
    pub bind_addr: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: Option<String>,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    // --- 参考文档存储 ---
    pub reference_store: StoreBackend,
    pub reference_file: String,
    pub kv_rest_api_url: Option<String>,
    pub kv_rest_api_token: Option<String>,
    pub kv_key_prefix: String,
    // --- 批次限制 ---
    pub max_documents: usize,
    pub max_batch_bytes: usize,
    pub accepted_extension: String,
    pub max_request_bytes: usize,
    // --- 重试与超时 ---
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub retry_max_jitter_ms: u64,
    pub job_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            verbose_logging: false,
            llm_api_key: None,
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4o-mini".to_string(),
            llm_temperature: 0.3,
            llm_max_tokens: 16384,
            reference_store: StoreBackend::File,
            reference_file: "data/references.json".to_string(),
            kv_rest_api_url: None,
            kv_rest_api_token: None,
            kv_key_prefix: "reference".to_string(),
            max_documents: 200,
            max_batch_bytes: 10 * 1024 * 1024,
            accepted_extension: ".md".to_string(),
            max_request_bytes: 32 * 1024 * 1024,
            retry_max_attempts: 5,
            retry_initial_delay_ms: 2_000,
            retry_max_delay_ms: 60_000,
            retry_max_jitter_ms: 1_000,
            job_timeout_secs: 900,
        }
    }
}

impl Config {
    /// 加载配置：`APP_CONFIG` 指定的 TOML 文件（默认 `config.toml`，不存在则跳过），再叠加环境变量
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("APP_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let base = if Path::new(&path).exists() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };
        base.with_env_overrides()
    }

    /// 只使用环境变量与默认值
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// 解析 TOML 配置文本
    pub fn from_toml_str(content: &str, path: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::FileParseFailed {
            path: path.to_string(),
            message: e.to_string(),
        })
    }

    fn from_toml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileParseFailed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content, path)
    }

    fn with_env_overrides(self) -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: env_string("BIND_ADDR").unwrap_or(self.bind_addr),
            verbose_logging: env_parse("VERBOSE_LOGGING", "bool")?.unwrap_or(self.verbose_logging),
            llm_api_key: env_string("LLM_API_KEY")
                .or(self.llm_api_key)
                .filter(|key| !key.trim().is_empty()),
            llm_api_base_url: env_string("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE", "f32")?.unwrap_or(self.llm_temperature),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", "u32")?.unwrap_or(self.llm_max_tokens),
            reference_store: match env_string("REFERENCE_STORE") {
                Some(v) => v.parse()?,
                None => self.reference_store,
            },
            reference_file: env_string("REFERENCE_FILE").unwrap_or(self.reference_file),
            kv_rest_api_url: env_string("KV_REST_API_URL").or(self.kv_rest_api_url),
            kv_rest_api_token: env_string("KV_REST_API_TOKEN").or(self.kv_rest_api_token),
            kv_key_prefix: env_string("KV_KEY_PREFIX").unwrap_or(self.kv_key_prefix),
            max_documents: env_parse("MAX_DOCUMENTS", "usize")?.unwrap_or(self.max_documents),
            max_batch_bytes: env_parse("MAX_BATCH_BYTES", "usize")?.unwrap_or(self.max_batch_bytes),
            accepted_extension: env_string("ACCEPTED_EXTENSION").unwrap_or(self.accepted_extension),
            max_request_bytes: env_parse("MAX_REQUEST_BYTES", "usize")?
                .unwrap_or(self.max_request_bytes),
            retry_max_attempts: env_parse("RETRY_MAX_ATTEMPTS", "u32")?
                .unwrap_or(self.retry_max_attempts),
            retry_initial_delay_ms: env_parse("RETRY_INITIAL_DELAY_MS", "u64")?
                .unwrap_or(self.retry_initial_delay_ms),
            retry_max_delay_ms: env_parse("RETRY_MAX_DELAY_MS", "u64")?
                .unwrap_or(self.retry_max_delay_ms),
            retry_max_jitter_ms: env_parse("RETRY_MAX_JITTER_MS", "u64")?
                .unwrap_or(self.retry_max_jitter_ms),
            job_timeout_secs: env_parse("JOB_TIMEOUT_SECS", "u64")?
                .unwrap_or(self.job_timeout_secs),
        })
    }

    /// 任务整体时限
    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok()
}

fn env_parse<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> Result<Option<T>, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_batch_limits() {
        let config = Config::default();
        assert_eq!(config.max_documents, 200);
        assert_eq!(config.max_batch_bytes, 10 * 1024 * 1024);
        assert_eq!(config.retry_max_attempts, 5);
        assert_eq!(config.retry_initial_delay_ms, 2_000);
        assert_eq!(config.retry_max_delay_ms, 60_000);
        assert!(config.llm_api_key.is_none());
    }

    #[test]
    fn test_toml_partial_override() {
        let config = Config::from_toml_str(
            r#"
            bind_addr = "127.0.0.1:8080"
            reference_store = "memory"
            max_documents = 10
            "#,
            "inline",
        )
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.reference_store, StoreBackend::Memory);
        assert_eq!(config.max_documents, 10);
        // 未设置的字段保持默认
        assert_eq!(config.accepted_extension, ".md");
    }

    #[test]
    fn test_toml_parse_error_reports_path() {
        let err = Config::from_toml_str("max_documents = \"many\"", "broken.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileParseFailed { ref path, .. } if path == "broken.toml"));
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("KV".parse::<StoreBackend>().unwrap(), StoreBackend::Kv);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
