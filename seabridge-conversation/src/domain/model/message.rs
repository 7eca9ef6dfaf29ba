//! 消息领域模型
//!
//! 消息核心字段（ID、会话、发送者、内容、类型、发送时间）创建后不变，
//! 派生状态（译文、转写、摘要、进行中标记）统一存放在 `variants` 中。

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use seabridge_core::{Result, SeaBridgeError};

/// 派生状态（key -> value）
pub type Variants = BTreeMap<String, Value>;

/// variant key 约定
pub mod variant_keys {
    pub const TRANSCRIPTION: &str = "transcription";
    pub const SIMPLIFIED: &str = "simplified_content";
    pub const SUMMARY: &str = "summary";
    pub const IS_TRANSLATING: &str = "is_translating";
    pub const IS_SUMMARIZING: &str = "is_summarizing";

    const TRANSLATED_CONTENT_PREFIX: &str = "translated_content_";

    pub fn translated_content(language: &str) -> String {
        format!("{}{}", TRANSLATED_CONTENT_PREFIX, language)
    }

    pub fn translated_language(language: &str) -> String {
        format!("translated_language_{}", language)
    }

    pub fn translation_model(language: &str) -> String {
        format!("translation_model_{}", language)
    }

    pub fn translated_at(language: &str) -> String {
        format!("translated_at_{}", language)
    }

    /// 译文所属语言（非译文 key 返回 None）
    pub fn translation_language_of(key: &str) -> Option<&str> {
        ["translated_content_", "translated_language_", "translation_model_", "translated_at_"]
            .iter()
            .find_map(|prefix| key.strip_prefix(prefix))
            .filter(|language| !language.is_empty())
    }
}

/// 消息类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Voice,
    Image,
    Document,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Voice => "voice",
            MessageType::Image => "image",
            MessageType::Document => "document",
        }
    }

    pub fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "text" => Ok(MessageType::Text),
            "voice" => Ok(MessageType::Voice),
            "image" => Ok(MessageType::Image),
            "document" => Ok(MessageType::Document),
            _ => Err(format!("Invalid message type: {}", s)),
        }
    }

    /// 文本与语音（转写后）可以翻译
    pub fn is_translatable(&self) -> bool {
        matches!(self, MessageType::Text | MessageType::Voice)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 某一语言的译文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationVariant {
    pub language: String,
    pub content: String,
    /// 产出译文的模型/供应商
    pub model: String,
    pub translated_at: DateTime<Utc>,
}

impl TranslationVariant {
    /// 该语言对应的全部 variant key
    pub fn to_variants(&self) -> Variants {
        let language = self.language.as_str();
        Variants::from([
            (
                variant_keys::translated_content(language),
                Value::String(self.content.clone()),
            ),
            (
                variant_keys::translated_language(language),
                Value::String(language.to_string()),
            ),
            (
                variant_keys::translation_model(language),
                Value::String(self.model.clone()),
            ),
            (
                variant_keys::translated_at(language),
                Value::String(self.translated_at.to_rfc3339()),
            ),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: MessageType,
    pub sent_at: DateTime<Utc>,
    #[serde(default)]
    pub variants: Variants,
}

impl Message {
    /// 结构校验（广播接收、存储读取时调用）
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(SeaBridgeError::validation("message id must be non-empty"));
        }
        if self.conversation_id.trim().is_empty() {
            return Err(SeaBridgeError::validation(format!(
                "message {} has no conversation id",
                self.id
            )));
        }
        if self.sender_id.trim().is_empty() {
            return Err(SeaBridgeError::validation(format!(
                "message {} has no sender id",
                self.id
            )));
        }
        if self.message_type == MessageType::Text && self.content.trim().is_empty() {
            return Err(SeaBridgeError::validation(format!(
                "text message {} has empty content",
                self.id
            )));
        }
        Ok(())
    }

    pub fn translation(&self, language: &str) -> Option<TranslationVariant> {
        let content = self
            .variants
            .get(&variant_keys::translated_content(language))?
            .as_str()
            .filter(|content| !content.is_empty())?
            .to_string();
        let model = self
            .variants
            .get(&variant_keys::translation_model(language))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let translated_at = self
            .variants
            .get(&variant_keys::translated_at(language))
            .and_then(|value| serde_json::from_value::<DateTime<Utc>>(value.clone()).ok())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        Some(TranslationVariant {
            language: language.to_string(),
            content,
            model,
            translated_at,
        })
    }

    pub fn has_translation(&self, language: &str) -> bool {
        self.translation(language).is_some()
    }

    /// 写入译文（覆盖该语言的全部 key，不触碰其他 variant）
    pub fn set_translation(&mut self, translation: &TranslationVariant) {
        self.variants.extend(translation.to_variants());
    }

    /// 用于翻译的原文：文本消息取内容，语音消息取转写
    pub fn translatable_text(&self) -> Option<&str> {
        let text = match self.message_type {
            MessageType::Text => Some(self.content.as_str()),
            MessageType::Voice => self
                .variants
                .get(variant_keys::TRANSCRIPTION)
                .and_then(Value::as_str),
            MessageType::Image | MessageType::Document => None,
        }?;
        if text.trim().is_empty() { None } else { Some(text) }
    }

    pub fn flag(&self, key: &str) -> bool {
        self.variants
            .get(key)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn set_flag(&mut self, key: &str, value: bool) {
        if value {
            self.variants.insert(key.to_string(), Value::Bool(true));
        } else {
            self.variants.remove(key);
        }
    }
}

/// 待发送消息（ID 与时间戳由通道分配）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDraft {
    pub content: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub variants: Variants,
}

impl MessageDraft {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            message_type: MessageType::Text,
            variants: Variants::new(),
        }
    }

    pub fn with_type(mut self, message_type: MessageType) -> Self {
        self.message_type = message_type;
        self
    }

    pub fn with_variant(mut self, key: impl Into<String>, value: Value) -> Self {
        self.variants.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn message() -> Message {
        Message {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "parent-1".to_string(),
            content: "Cảm ơn cô".to_string(),
            message_type: MessageType::Text,
            sent_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap(),
            variants: Variants::new(),
        }
    }

    #[test]
    fn test_translation_variant_round_trip() {
        let mut msg = message();
        assert!(!msg.has_translation("en"));

        let variant = TranslationVariant {
            language: "en".to_string(),
            content: "Thank you teacher".to_string(),
            model: "claude".to_string(),
            translated_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 5).unwrap(),
        };
        msg.set_translation(&variant);

        assert_eq!(msg.translation("en"), Some(variant));
        assert_eq!(
            msg.variants.get("translated_language_en"),
            Some(&Value::String("en".to_string()))
        );
    }

    #[test]
    fn test_translation_language_of() {
        assert_eq!(variant_keys::translation_language_of("translated_content_vi"), Some("vi"));
        assert_eq!(variant_keys::translation_language_of("translated_at_zh-hans"), Some("zh-hans"));
        assert_eq!(variant_keys::translation_language_of("summary"), None);
        assert_eq!(variant_keys::translation_language_of("translated_content_"), None);
    }

    #[test]
    fn test_translatable_text() {
        let text = message();
        assert_eq!(text.translatable_text(), Some("Cảm ơn cô"));

        let mut voice = message();
        voice.message_type = MessageType::Voice;
        voice.content = "https://cdn/voice.m4a".to_string();
        assert_eq!(voice.translatable_text(), None);
        voice
            .variants
            .insert(variant_keys::TRANSCRIPTION.to_string(), Value::from("Xin chào"));
        assert_eq!(voice.translatable_text(), Some("Xin chào"));

        let mut image = message();
        image.message_type = MessageType::Image;
        assert_eq!(image.translatable_text(), None);
    }

    #[test]
    fn test_validate() {
        assert!(message().validate().is_ok());

        let mut blank = message();
        blank.content = "  ".to_string();
        assert!(matches!(blank.validate(), Err(SeaBridgeError::Validation(_))));

        let mut no_sender = message();
        no_sender.sender_id.clear();
        assert!(no_sender.validate().is_err());
    }

    #[test]
    fn test_flags() {
        let mut msg = message();
        msg.set_flag(variant_keys::IS_TRANSLATING, true);
        assert!(msg.flag(variant_keys::IS_TRANSLATING));
        msg.set_flag(variant_keys::IS_TRANSLATING, false);
        assert!(!msg.variants.contains_key(variant_keys::IS_TRANSLATING));
    }
}
