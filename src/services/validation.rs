//! 批次准入校验 - 业务能力层
//!
//! 纯函数，不读写任何外部状态。检查顺序固定，遇到第一个问题即返回。

use crate::config::Config;
use crate::error::ValidationError;
use crate::models::{Document, ReferenceContext};

/// 批次限制
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationLimits {
    pub max_documents: usize,
    pub max_batch_bytes: usize,
    /// 接受的扩展名（含点，例如 `.md`），不区分大小写
    pub accepted_extension: String,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_documents: 200,
            max_batch_bytes: 10 * 1024 * 1024,
            accepted_extension: ".md".to_string(),
        }
    }
}

impl ValidationLimits {
    pub fn from_config(config: &Config) -> Self {
        let ext = config.accepted_extension.trim();
        let accepted_extension = if ext.starts_with('.') {
            ext.to_string()
        } else {
            format!(".{}", ext)
        };
        Self {
            max_documents: config.max_documents,
            max_batch_bytes: config.max_batch_bytes,
            accepted_extension,
        }
    }
}

/// 通过校验的批次
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmittedBatch {
    pub documents: Vec<Document>,
    pub total_bytes: usize,
}

/// 校验整个批次
///
/// 1. 必须存在格式规范（primary）
/// 2. 文档数量在 `[1, max_documents]`
/// 3. 文件名以接受的扩展名结尾
/// 4. 去除空白后内容非空
/// 5. 内容总字节数不超过上限
pub fn admit(
    documents: &[Document],
    reference: &ReferenceContext,
    limits: &ValidationLimits,
) -> Result<AdmittedBatch, ValidationError> {
    if !reference.has_primary() {
        return Err(ValidationError::MissingRequiredReference);
    }

    let count = documents.len();
    if count == 0 || count > limits.max_documents {
        return Err(ValidationError::DocumentCountOutOfRange {
            count,
            max: limits.max_documents,
        });
    }

    let extension = limits.accepted_extension.to_lowercase();
    let unsupported: Vec<String> = documents
        .iter()
        .filter(|doc| doc.name.trim().is_empty() || !doc.name.to_lowercase().ends_with(&extension))
        .map(|doc| doc.name.clone())
        .collect();
    if !unsupported.is_empty() {
        return Err(ValidationError::UnsupportedFileType {
            extension: limits.accepted_extension.clone(),
            names: unsupported,
        });
    }

    let empty: Vec<String> = documents
        .iter()
        .filter(|doc| doc.content.trim().is_empty())
        .map(|doc| doc.name.clone())
        .collect();
    if !empty.is_empty() {
        return Err(ValidationError::EmptyDocument { names: empty });
    }

    let total_bytes: usize = documents.iter().map(|doc| doc.content.len()).sum();
    if total_bytes > limits.max_batch_bytes {
        return Err(ValidationError::BatchTooLarge {
            total: total_bytes,
            max: limits.max_batch_bytes,
        });
    }

    Ok(AdmittedBatch {
        documents: documents.to_vec(),
        total_bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceSlot;
    use chrono::Utc;

    fn with_primary() -> ReferenceContext {
        ReferenceContext {
            primary: Some(ReferenceSlot {
                content: "# 规则".to_string(),
                filename: "rules.md".to_string(),
                saved_at: Utc::now(),
            }),
            ..Default::default()
        }
    }

    fn docs(count: usize) -> Vec<Document> {
        (0..count)
            .map(|i| Document::new(format!("doc{}.md", i), "正文"))
            .collect()
    }

    #[test]
    fn test_missing_primary_checked_first() {
        // 同时违反多项时，先报缺少 primary
        let err = admit(&[], &ReferenceContext::default(), &ValidationLimits::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequiredReference);
    }

    #[test]
    fn test_blank_primary_is_missing() {
        let mut reference = with_primary();
        if let Some(primary) = reference.primary.as_mut() {
            primary.content = "  \n\t ".to_string();
        }

        let err = admit(&docs(1), &reference, &ValidationLimits::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequiredReference);
    }

    #[test]
    fn test_document_count_bounds() {
        let limits = ValidationLimits::default();
        let reference = with_primary();

        assert_eq!(
            admit(&[], &reference, &limits).unwrap_err(),
            ValidationError::DocumentCountOutOfRange { count: 0, max: 200 }
        );
        assert_eq!(
            admit(&docs(201), &reference, &limits).unwrap_err(),
            ValidationError::DocumentCountOutOfRange { count: 201, max: 200 }
        );
        assert!(admit(&docs(200), &reference, &limits).is_ok());
    }

    #[test]
    fn test_unsupported_extension_lists_names() {
        let documents = vec![
            Document::new("a.md", "x"),
            Document::new("b.txt", "x"),
            Document::new("dir/C.MD", "x"),
            Document::new("", "x"),
        ];
        let err = admit(&documents, &with_primary(), &ValidationLimits::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedFileType {
                extension: ".md".to_string(),
                names: vec!["b.txt".to_string(), String::new()],
            }
        );
    }

    #[test]
    fn test_whitespace_only_document_is_empty() {
        let documents = vec![Document::new("a.md", "ok"), Document::new("b.md", " \n\t ")];
        let err = admit(&documents, &with_primary(), &ValidationLimits::default()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::EmptyDocument {
                names: vec!["b.md".to_string()]
            }
        );
    }

    #[test]
    fn test_batch_size_counts_utf8_bytes() {
        let limits = ValidationLimits {
            max_batch_bytes: 5,
            ..Default::default()
        };
        // "正文" 是 6 个字节
        let err = admit(&docs(1), &with_primary(), &limits).unwrap_err();
        assert_eq!(err, ValidationError::BatchTooLarge { total: 6, max: 5 });
    }

    #[test]
    fn test_admit_is_pure() {
        let documents = vec![Document::new("a.md", "x"), Document::new("b.txt", "")];
        let reference = with_primary();
        let limits = ValidationLimits::default();

        let first = admit(&documents, &reference, &limits);
        let second = admit(&documents, &reference, &limits);
        assert_eq!(first, second);
        assert_eq!(documents[1].name, "b.txt");
    }

    #[test]
    fn test_limits_normalize_extension() {
        let config = Config {
            accepted_extension: "txt".to_string(),
            ..Config::default()
        };
        assert_eq!(ValidationLimits::from_config(&config).accepted_extension, ".txt");
    }
}
