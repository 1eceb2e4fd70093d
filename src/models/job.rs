//! 批量改写任务
//!
//! 封装"这一批文档处理到第几个"这一信息

use std::fmt::Display;
use uuid::Uuid;

use crate::models::{Document, ReferenceContext};

/// 任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Idle,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// 批量改写任务
///
/// 文档顺序即处理顺序；游标只会前进，失败时停在出错的位置。
#[derive(Debug, Clone)]
pub struct Job {
    id: Uuid,
    documents: Vec<Document>,
    reference: ReferenceContext,
    cursor: usize,
    status: JobStatus,
}

impl Job {
    /// 创建新任务（参考文档在此刻快照）
    pub fn new(documents: Vec<Document>, reference: ReferenceContext) -> Self {
        Self {
            id: Uuid::new_v4(),
            documents,
            reference,
            cursor: 0,
            status: JobStatus::Idle,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn reference(&self) -> &ReferenceContext {
        &self.reference
    }

    pub fn total(&self) -> usize {
        self.documents.len()
    }

    /// 已成功处理的文档数
    pub fn current(&self) -> usize {
        self.cursor
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub(crate) fn start(&mut self) {
        if self.status == JobStatus::Idle {
            self.status = JobStatus::Running;
        }
    }

    pub(crate) fn advance(&mut self) {
        if self.status == JobStatus::Running && self.cursor < self.documents.len() {
            self.cursor += 1;
        }
    }

    pub(crate) fn fail(&mut self) {
        if !self.status.is_terminal() {
            self.status = JobStatus::Failed;
        }
    }

    pub(crate) fn complete(&mut self) {
        if self.status == JobStatus::Running && self.cursor == self.documents.len() {
            self.status = JobStatus::Completed;
        }
    }
}

impl Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let id = self.id.simple().to_string();
        write!(f, "[任务 {}]", &id[..8])
    }
}
