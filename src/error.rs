use std::fmt;

/// 应用程序错误类型
#[derive(Debug)]
pub enum AppError {
    /// 参考文档存储错误
    Storage(StorageError),
    /// 请求参数错误
    BadRequest(String),
    /// 资源不存在
    NotFound(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Storage(e) => write!(f, "存储错误: {}", e),
            AppError::BadRequest(msg) => write!(f, "请求无效: {}", msg),
            AppError::NotFound(msg) => write!(f, "未找到: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Storage(e) => Some(e),
            AppError::BadRequest(_) | AppError::NotFound(_) => None,
        }
    }
}

/// 批次准入校验错误
///
/// 任何一项不满足都会拒绝整个批次，任务不会启动。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// 缺少必需的格式规范文档（primary）
    #[error("缺少必需的参考文档: 请先上传格式规范 (primary)")]
    MissingRequiredReference,
    /// 文档数量超出范围
    #[error("文档数量 {count} 超出范围 [1, {max}]")]
    DocumentCountOutOfRange { count: usize, max: usize },
    /// 存在不支持的文件类型
    #[error("不支持的文件类型 (仅接受 {extension}): {}", .names.join(", "))]
    UnsupportedFileType {
        extension: String,
        names: Vec<String>,
    },
    /// 存在空文档
    #[error("以下文档内容为空: {}", .names.join(", "))]
    EmptyDocument { names: Vec<String> },
    /// 批次总大小超限
    #[error("批次总大小 {total} 字节超过上限 {max} 字节")]
    BatchTooLarge { total: usize, max: usize },
}

/// 配置错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// 缺少远程服务凭证
    #[error("未配置 LLM API 密钥 (LLM_API_KEY)")]
    MissingCredential,
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {message}")]
    FileParseFailed { path: String, message: String },
    /// 存储后端配置不完整
    #[error("存储后端 {backend} 缺少配置项 {key}")]
    IncompleteStore { backend: String, key: String },
}

/// 远程服务故障类别
///
/// 由适配层根据原始错误归类，核心逻辑只依赖类别决定是否重试。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Overloaded,
    RateLimited,
    Timeout,
    ConnectionReset,
    Other,
}

impl ErrorCategory {
    /// 是否属于可重试的瞬时故障
    pub fn is_retryable(self) -> bool {
        !matches!(self, ErrorCategory::Other)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Overloaded => "overloaded",
            ErrorCategory::RateLimited => "rate_limited",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::ConnectionReset => "connection_reset",
            ErrorCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// 远程改写服务返回的结构化错误
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[{category}] {message}")]
pub struct ServiceError {
    pub category: ErrorCategory,
    pub message: String,
}

impl ServiceError {
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// 单个文档改写的终止原因
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RewriteFailure {
    /// 调用前即发现凭证缺失
    #[error("{0}")]
    Configuration(ConfigError),
    /// 不可重试的错误
    #[error("改写服务调用失败: {0}")]
    NonRetryable(ServiceError),
    /// 重试次数耗尽
    #[error("改写服务调用失败 (已尝试 {attempts} 次): {last}")]
    RetriesExhausted { attempts: u32, last: ServiceError },
    /// 服务返回内容为空
    #[error("改写服务返回内容为空")]
    EmptyResponse,
    /// 任务被取消（调用方断开或超时）
    #[error("任务已取消")]
    Cancelled,
}

/// 参考文档存储错误
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("读取 {path} 失败: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("写入 {path} 失败: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("存储数据格式错误: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("KV 存储请求失败 ({key}): {message}")]
    Remote { key: String, message: String },
}

/// 压缩包生成错误
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("写入压缩条目 {name} 失败: {message}")]
    Entry { name: String, message: String },
    #[error("生成压缩包失败: {0}")]
    Finish(String),
}

// ========== 从常见错误类型转换 ==========

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::Storage(err)
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建请求参数错误
    pub fn bad_request(message: impl Into<String>) -> Self {
        AppError::BadRequest(message.into())
    }

    /// 创建资源不存在错误
    pub fn not_found(message: impl Into<String>) -> Self {
        AppError::NotFound(message.into())
    }

    /// 创建远程存储错误
    pub fn remote_storage(key: impl Into<String>, message: impl fmt::Display) -> Self {
        AppError::Storage(StorageError::Remote {
            key: key.into(),
            message: message.to_string(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_categories_are_retryable() {
        assert!(ErrorCategory::Overloaded.is_retryable());
        assert!(ErrorCategory::RateLimited.is_retryable());
        assert!(ErrorCategory::Timeout.is_retryable());
        assert!(ErrorCategory::ConnectionReset.is_retryable());
        assert!(!ErrorCategory::Other.is_retryable());
    }

    #[test]
    fn test_validation_error_lists_names() {
        let err = ValidationError::EmptyDocument {
            names: vec!["a.md".to_string(), "b/c.md".to_string()],
        };
        assert_eq!(err.to_string(), "以下文档内容为空: a.md, b/c.md");
    }

    #[test]
    fn test_retries_exhausted_reason_mentions_attempts() {
        let failure = RewriteFailure::RetriesExhausted {
            attempts: 5,
            last: ServiceError::new(ErrorCategory::Overloaded, "529 overloaded"),
        };
        let reason = failure.to_string();
        assert!(reason.contains("5"));
        assert!(reason.contains("overloaded"));
    }

    #[test]
    fn test_app_error_wraps_source() {
        let err: AppError = StorageError::Remote {
            key: "reference:primary".to_string(),
            message: "HTTP 503".to_string(),
        }
        .into();
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().starts_with("存储错误"));
    }
}
