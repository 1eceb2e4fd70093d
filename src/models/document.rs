use serde::{Deserialize, Serialize};

use crate::error::RewriteFailure;

/// 待改写的文档
///
/// 名称可以带相对路径（例如 `chapter1/intro.md`），打包时保留目录结构。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    pub content: String,
}

impl Document {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// 用改写后的内容生成新文档，原文档保持不变
    pub fn rewritten(&self, content: String) -> Self {
        Self {
            name: self.name.clone(),
            content,
        }
    }
}

/// 单个文档的改写结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewriteOutcome {
    Success { rewritten_content: String },
    Failure { reason: RewriteFailure },
}
