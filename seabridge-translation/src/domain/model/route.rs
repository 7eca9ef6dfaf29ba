//! 路由领域模型
//!
//! 描述待翻译内容的特征，以及路由决策的结果（实时 / 批处理）。

use serde::{Deserialize, Serialize};
use std::fmt;

use seabridge_core::utils::{byte_len, file_extension, line_count};

/// 待翻译内容的特征
///
/// 所有字段都可能缺失：纯文本消息没有扩展名，附件在下载前没有文本内容。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCharacteristics {
    /// 字节数
    pub byte_size: Option<u64>,
    /// 小写扩展名（不含点）
    pub extension: Option<String>,
    /// MIME 类型
    pub mime_type: Option<String>,
    /// 原始文本内容
    pub content: Option<String>,
    /// 行数
    pub line_count: Option<u64>,
}

impl ContentCharacteristics {
    /// 纯文本消息
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            byte_size: Some(byte_len(&text)),
            line_count: Some(line_count(&text)),
            content: Some(text),
            ..Default::default()
        }
    }

    /// 附件文件（文本类附件会解码出内容参与判断）
    pub fn from_file(file_name: &str, mime_type: Option<&str>, bytes: &[u8]) -> Self {
        let extension = file_extension(file_name);
        let mut characteristics = Self {
            byte_size: Some(bytes.len() as u64),
            extension,
            mime_type: mime_type.map(|m| m.trim().to_ascii_lowercase()),
            ..Default::default()
        };

        if !characteristics.is_structured_document() {
            if let Ok(text) = std::str::from_utf8(bytes) {
                characteristics.line_count = Some(line_count(text));
                characteristics.content = Some(text.to_string());
            }
        }

        characteristics
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        self.extension = Some(
            extension
                .trim()
                .trim_start_matches('.')
                .to_ascii_lowercase(),
        );
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into().trim().to_ascii_lowercase());
        self
    }

    pub fn with_byte_size(mut self, byte_size: u64) -> Self {
        self.byte_size = Some(byte_size);
        self
    }

    pub fn with_line_count(mut self, line_count: u64) -> Self {
        self.line_count = Some(line_count);
        self
    }

    /// 是否为结构化文档（文字处理、表格、演示文稿、PDF 或 OpenDocument）
    pub fn is_structured_document(&self) -> bool {
        let by_extension = self
            .extension
            .as_deref()
            .is_some_and(|ext| STRUCTURED_EXTENSIONS.contains(&ext));
        let by_mime = self.mime_type.as_deref().is_some_and(is_structured_mime);
        by_extension || by_mime
    }

    /// 最佳的大小估计：显式字节数优先，其次是文本内容长度
    pub fn best_size_estimate(&self) -> Option<u64> {
        self.byte_size
            .or_else(|| self.content.as_deref().map(byte_len))
    }

    /// 基本结构校验
    ///
    /// 正常调用方不会构造出非法特征，失败属于编程错误。
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ext) = &self.extension {
            if ext.is_empty() || ext.contains(['.', '/', '\\']) {
                return Err(format!("malformed extension '{}'", ext));
            }
        }
        if let Some(mime) = &self.mime_type {
            if !mime.contains('/') {
                return Err(format!("malformed mime type '{}'", mime));
            }
        }
        Ok(())
    }
}

const STRUCTURED_EXTENSIONS: &[&str] = &[
    "doc", "docx", "rtf", "xls", "xlsx", "ppt", "pptx", "pdf", "odt", "ods", "odp",
];

fn is_structured_mime(mime: &str) -> bool {
    mime == "application/pdf"
        || mime == "application/msword"
        || mime == "application/rtf"
        || mime == "application/vnd.ms-excel"
        || mime == "application/vnd.ms-powerpoint"
        || mime.starts_with("application/vnd.openxmlformats-officedocument.")
        || mime.starts_with("application/vnd.oasis.opendocument.")
}

/// 翻译方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranslationMethod {
    /// 实时（同步 LLM 调用）
    Realtime,
    /// 批处理（对象存储 + 异步作业）
    Batch,
}

impl TranslationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranslationMethod::Realtime => "realtime",
            TranslationMethod::Batch => "batch",
        }
    }
}

impl fmt::Display for TranslationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 路由决策结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRoute {
    pub method: TranslationMethod,
    /// 人类可读的决策原因
    pub reason: String,
    /// 预计耗时（如 "5-15 seconds"、"10-20 minutes"）
    pub estimated_time: String,
    /// 是否保留原始排版（仅批处理保留）
    pub format_preserved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_detection() {
        let docx = ContentCharacteristics::default().with_extension(".DOCX");
        assert!(docx.is_structured_document());

        let sheet = ContentCharacteristics::default()
            .with_mime_type("application/vnd.oasis.opendocument.spreadsheet");
        assert!(sheet.is_structured_document());

        let text = ContentCharacteristics::from_text("hello");
        assert!(!text.is_structured_document());
    }

    #[test]
    fn test_from_file_decodes_plain_text_only() {
        let txt = ContentCharacteristics::from_file("notes.txt", Some("text/plain"), b"a\nb");
        assert_eq!(txt.content.as_deref(), Some("a\nb"));
        assert_eq!(txt.line_count, Some(2));

        let pdf = ContentCharacteristics::from_file("notes.pdf", None, b"%PDF-1.4");
        assert!(pdf.content.is_none());
        assert_eq!(pdf.byte_size, Some(8));
    }

    #[test]
    fn test_validate() {
        assert!(ContentCharacteristics::default().validate().is_ok());
        let bad = ContentCharacteristics {
            mime_type: Some("pdf".to_string()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
