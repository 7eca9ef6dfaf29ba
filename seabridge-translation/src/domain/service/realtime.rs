//! 实时翻译适配器
//!
//! 对短文本做一次同步的大模型调用，要求返回 `{translatedText, sourceLanguageDetected}`。

use serde_json::json;

use seabridge_core::{Result, SeaBridgeError};

use crate::domain::model::{GeneratedOutput, RealtimeTranslation};
use crate::domain::repository::TextGeneratorRef;
use crate::domain::service::routing::RoutingPolicy;

pub struct RealtimeTranslator {
    generator: TextGeneratorRef,
    policy: RoutingPolicy,
}

impl RealtimeTranslator {
    pub fn new(generator: TextGeneratorRef, policy: RoutingPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn provider_name(&self) -> &str {
        self.generator.provider_name()
    }

    pub fn is_suitable(&self, text: &str, structured: bool) -> bool {
        self.policy.is_realtime_suitable(text, structured)
    }

    /// 翻译短文本
    ///
    /// 纯空白文本直接返回空译文，不调用供应商。
    pub async fn translate(
        &self,
        text: &str,
        target_language: &str,
        source_language: Option<&str>,
    ) -> Result<RealtimeTranslation> {
        if text.trim().is_empty() {
            return Ok(RealtimeTranslation {
                translated_text: String::new(),
                source_language_detected: source_language.map(str::to_string),
            });
        }

        let prompt = translation_prompt(text, target_language, source_language);
        let schema = translation_schema();

        tracing::debug!(
            provider = self.generator.provider_name(),
            target_language,
            bytes = text.len(),
            "Dispatching realtime translation"
        );

        let output = self.generator.generate(&prompt, Some(&schema)).await?;
        parse_translation(self.generator.provider_name(), output, source_language)
    }
}

pub(crate) fn translation_prompt(
    text: &str,
    target_language: &str,
    source_language: Option<&str>,
) -> String {
    let source = source_language.unwrap_or("the detected source language");
    format!(
        "Translate the following text from {} to {}. Preserve meaning and tone. \
         Respond with translatedText and sourceLanguageDetected.\n\n{}",
        source, target_language, text
    )
}

pub(crate) fn translation_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "translatedText": { "type": "string" },
            "sourceLanguageDetected": { "type": "string" }
        },
        "required": ["translatedText"]
    })
}

pub(crate) fn parse_translation(
    provider: &str,
    output: GeneratedOutput,
    source_language: Option<&str>,
) -> Result<RealtimeTranslation> {
    match output {
        GeneratedOutput::Structured(value) => {
            let translated_text = value
                .get("translatedText")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    SeaBridgeError::provider(provider, "response missing translatedText")
                })?
                .to_string();
            let source_language_detected = value
                .get("sourceLanguageDetected")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| source_language.map(str::to_string));
            Ok(RealtimeTranslation {
                translated_text,
                source_language_detected,
            })
        }
        GeneratedOutput::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return Err(SeaBridgeError::provider(provider, "empty translation"));
            }
            Ok(RealtimeTranslation {
                translated_text: trimmed.to_string(),
                source_language_detected: source_language.map(str::to_string),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::provider::ScriptedTextGenerator;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_translate_structured_response() {
        let generator = Arc::new(ScriptedTextGenerator::new("primary"));
        generator.push_structured(json!({
            "translatedText": "Xin vui lòng mang bữa trưa vào thứ Sáu",
            "sourceLanguageDetected": "en"
        }));
        let translator = RealtimeTranslator::new(generator.clone(), RoutingPolicy::default());

        let result = translator
            .translate("Please bring your lunch Friday", "vi", None)
            .await
            .unwrap();
        assert_eq!(result.translated_text, "Xin vui lòng mang bữa trưa vào thứ Sáu");
        assert_eq!(result.source_language_detected.as_deref(), Some("en"));
        assert_eq!(generator.call_count(), 1);
    }

    #[tokio::test]
    async fn test_whitespace_skips_provider() {
        let generator = Arc::new(ScriptedTextGenerator::new("primary"));
        let translator = RealtimeTranslator::new(generator.clone(), RoutingPolicy::default());

        let result = translator.translate("  \n ", "vi", Some("en")).await.unwrap();
        assert!(result.translated_text.is_empty());
        assert_eq!(generator.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_field_is_provider_error() {
        let generator = Arc::new(ScriptedTextGenerator::new("primary"));
        generator.push_structured(json!({ "text": "hi" }));
        let translator = RealtimeTranslator::new(generator, RoutingPolicy::default());

        let err = translator.translate("hello", "vi", None).await.unwrap_err();
        assert!(matches!(err, SeaBridgeError::Provider { .. }));
    }

    #[test]
    fn test_is_suitable() {
        let generator = Arc::new(ScriptedTextGenerator::new("primary"));
        let translator = RealtimeTranslator::new(generator, RoutingPolicy::default());
        assert!(translator.is_suitable("hello", false));
        assert!(!translator.is_suitable("hello", true));
        assert!(!translator.is_suitable(&"x".repeat(9_000), false));
    }
}
