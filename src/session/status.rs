//! 状态分类模块
//!
//! 把 VLM 回复的自由文本按子串匹配归类为状态图标。
//! 匹配顺序固定：正常 → Flashover → 断裂，先中先得；
//! 这个顺序是对外承诺的行为，作为平手裁决不可调整。

use serde::{Deserialize, Serialize};

/// “正常”状态字面量
pub const MARKER_NORMAL: &str = "ปกติ";
/// “Flashover”状态字面量
pub const MARKER_FLASHOVER: &str = "เกิด Flashover";
/// “断裂/破损”状态字面量
pub const MARKER_CRACKED: &str = "แตกหัก";

/// 天线状态图标类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusIcon {
    /// 正常
    Normal,
    /// 绝缘子闪络
    Flashover,
    /// 断裂/破损
    Cracked,
}

impl StatusIcon {
    /// 终端显示符号
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Normal => "✔",
            Self::Flashover => "⚠",
            Self::Cracked => "✖",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Flashover => "flashover",
            Self::Cracked => "cracked",
        }
    }
}

/// 对回复文本做顺序子串匹配，无命中返回 None
pub fn classify(text: &str) -> Option<StatusIcon> {
    if text.contains(MARKER_NORMAL) {
        return Some(StatusIcon::Normal);
    }
    if text.contains(MARKER_FLASHOVER) {
        return Some(StatusIcon::Flashover);
    }
    if text.contains(MARKER_CRACKED) {
        return Some(StatusIcon::Cracked);
    }
    None
}
