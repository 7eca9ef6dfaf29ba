//! 实时翻译与文本操作结果

use serde::{Deserialize, Serialize};
use std::fmt;

/// 实时翻译结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeTranslation {
    pub translated_text: String,
    /// 供应商识别出的源语言
    pub source_language_detected: Option<String>,
}

/// 模型生成结果
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedOutput {
    Text(String),
    Structured(serde_json::Value),
}

/// 文本操作
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextOperation {
    /// 改写为易读版本
    Simplify,
    /// 摘要
    Summarize,
    /// 切分为若干段
    Chunk,
    /// 短文本翻译
    Translate {
        target_language: String,
        source_language: Option<String>,
    },
}

impl TextOperation {
    pub fn name(&self) -> &'static str {
        match self {
            TextOperation::Simplify => "simplify",
            TextOperation::Summarize => "summarize",
            TextOperation::Chunk => "chunk",
            TextOperation::Translate { .. } => "translate",
        }
    }

    /// 面向用户的操作名（用于 "xxx unavailable"）
    pub fn display_name(&self) -> &'static str {
        match self {
            TextOperation::Simplify => "Simplification",
            TextOperation::Summarize => "Summary",
            TextOperation::Chunk => "Chunking",
            TextOperation::Translate { .. } => "Translation",
        }
    }
}

impl fmt::Display for TextOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 文本操作输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutput {
    Text(String),
    Chunks(Vec<String>),
    Translation(RealtimeTranslation),
}

/// 标记了实际供应商的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderTagged<T> {
    pub value: T,
    /// 实际产出结果的供应商
    pub provider: String,
    /// 是否由备用供应商产出
    pub fell_back: bool,
}
