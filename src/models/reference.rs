//! 参考文档上下文
//!
//! 最多三个槽位：格式规范（必需）、转换指南、补充说明

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 参考文档槽位名称
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotName {
    /// 格式规范
    Primary,
    /// 转换指南
    Guide,
    /// 补充说明
    Supplementary,
}

impl SlotName {
    pub const ALL: [SlotName; 3] = [SlotName::Primary, SlotName::Guide, SlotName::Supplementary];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotName::Primary => "primary",
            SlotName::Guide => "guide",
            SlotName::Supplementary => "supplementary",
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(SlotName::Primary),
            "guide" => Ok(SlotName::Guide),
            "supplementary" => Ok(SlotName::Supplementary),
            other => Err(format!("未知的参考文档槽位: {}", other)),
        }
    }
}

/// 单个槽位中保存的参考文档
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSlot {
    pub content: String,
    pub filename: String,
    #[serde(default = "Utc::now")]
    pub saved_at: DateTime<Utc>,
}

/// 参考文档上下文（任务提交时的快照）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<ReferenceSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guide: Option<ReferenceSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplementary: Option<ReferenceSlot>,
}

impl ReferenceContext {
    pub fn slot(&self, name: SlotName) -> Option<&ReferenceSlot> {
        match name {
            SlotName::Primary => self.primary.as_ref(),
            SlotName::Guide => self.guide.as_ref(),
            SlotName::Supplementary => self.supplementary.as_ref(),
        }
    }

    pub fn set_slot(&mut self, name: SlotName, slot: ReferenceSlot) {
        match name {
            SlotName::Primary => self.primary = Some(slot),
            SlotName::Guide => self.guide = Some(slot),
            SlotName::Supplementary => self.supplementary = Some(slot),
        }
    }

    /// 格式规范是否存在且非空（准入的必要条件）
    pub fn has_primary(&self) -> bool {
        self.primary
            .as_ref()
            .is_some_and(|slot| !slot.content.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_name_round_trip_through_str() {
        for slot in SlotName::ALL {
            assert_eq!(slot.as_str().parse::<SlotName>().unwrap(), slot);
        }
        assert!("extra".parse::<SlotName>().is_err());
    }

    #[test]
    fn test_context_json_uses_saved_at_camel_case() {
        let mut context = ReferenceContext::default();
        context.set_slot(
            SlotName::Guide,
            ReferenceSlot {
                content: "guide".to_string(),
                filename: "guide.md".to_string(),
                saved_at: DateTime::<Utc>::from_timestamp(0, 0).unwrap(),
            },
        );

        let json = serde_json::to_value(&context).unwrap();
        assert!(json.get("primary").is_none());
        assert_eq!(json["guide"]["filename"], "guide.md");
        assert!(json["guide"].get("savedAt").is_some());
        assert!(!context.has_primary());
    }
}
