//! 系统提示词拼装
//!
//! 把参考文档按固定顺序拼进系统消息，缺失的槽位直接跳过。

use crate::models::{ReferenceContext, SlotName};

const PREAMBLE: &str = "你是一个专业的文档格式转换助手。\
你需要严格按照下面给出的格式规范，把用户提供的文档改写为目标格式。\
只改变格式与结构，不要增删原文的事实内容。";

const OUTPUT_RULES: &str = "【输出要求】
- 只输出改写后的完整文档
- 不要添加任何解释、前言或总结
- 不要用代码块包裹整个输出";

fn section_title(slot: SlotName) -> &'static str {
    match slot {
        SlotName::Primary => "格式规范",
        SlotName::Guide => "转换指南",
        SlotName::Supplementary => "补充说明",
    }
}

/// 根据参考文档生成系统提示词
pub fn build_system_prompt(reference: &ReferenceContext) -> String {
    let mut prompt = String::from(PREAMBLE);

    for slot in SlotName::ALL {
        if let Some(doc) = reference.slot(slot) {
            if doc.content.trim().is_empty() {
                continue;
            }
            prompt.push_str(&format!(
                "\n\n【{}】（来源: {}）\n{}",
                section_title(slot),
                doc.filename,
                doc.content.trim()
            ));
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(OUTPUT_RULES);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReferenceSlot;
    use chrono::Utc;

    fn slot(content: &str, filename: &str) -> Option<ReferenceSlot> {
        Some(ReferenceSlot {
            content: content.to_string(),
            filename: filename.to_string(),
            saved_at: Utc::now(),
        })
    }

    #[test]
    fn test_sections_follow_slot_order() {
        let reference = ReferenceContext {
            primary: slot("标题用 #", "rules.md"),
            guide: None,
            supplementary: slot("表格保持原样", "notes.md"),
        };
        let prompt = build_system_prompt(&reference);

        let rules = prompt.find("【格式规范】").unwrap();
        let notes = prompt.find("【补充说明】").unwrap();
        assert!(rules < notes);
        assert!(!prompt.contains("【转换指南】"));
        assert!(prompt.contains("rules.md"));
        assert!(prompt.ends_with(OUTPUT_RULES));
    }

    #[test]
    fn test_blank_slot_is_skipped() {
        let reference = ReferenceContext {
            primary: slot("规则", "rules.md"),
            guide: slot("   ", "guide.md"),
            supplementary: None,
        };
        assert!(!build_system_prompt(&reference).contains("guide.md"));
    }
}
