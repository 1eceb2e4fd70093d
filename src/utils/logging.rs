/// 日志工具模块
///
/// 提供日志格式化和输出的辅助函数
use tracing::info;

use crate::config::Config;
use crate::models::Job;

/// 记录服务启动信息
///
/// # 参数
/// - `config`: 已加载的配置
/// - `store_desc`: 参考文档存储的描述
pub fn log_startup(config: &Config, store_desc: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 服务启动 - 批量文档改写");
    info!("🌐 监听地址: {}", config.bind_addr);
    info!("🤖 模型: {}", config.llm_model_name);
    info!("📚 参考文档存储: {}", store_desc);
    info!(
        "📦 单批上限: {} 个文档 / {} 字节",
        config.max_documents, config.max_batch_bytes
    );
    if config.llm_api_key.is_none() {
        info!("⚠️ 未配置 LLM_API_KEY，转换请求将直接返回错误");
    }
    info!("{}", "=".repeat(60));
}

/// 记录任务开始信息
pub fn log_job_start(job: &Job, model: &str) {
    info!("\n{}", "=".repeat(60));
    info!("{} 📋 开始处理 {} 个文档 (模型: {})", job, job.total(), model);
    info!("{}", "=".repeat(60));
}

/// 记录单个文档开始处理
///
/// # 参数
/// - `current`: 当前序号（从 1 开始）
/// - `total`: 文档总数
/// - `name`: 文档名
pub fn log_document_start(job: &Job, current: usize, total: usize, name: &str) {
    info!("{} 📄 [{}/{}] {}", job, current, total, truncate_text(name, 80));
}

/// 记录任务完成信息
pub fn log_job_complete(job: &Job) {
    info!("\n{}", "─".repeat(60));
    info!("{} ✅ 全部完成: {}/{}", job, job.current(), job.total());
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
