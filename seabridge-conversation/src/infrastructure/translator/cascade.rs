//! 基于文本操作级联的消息翻译

use std::sync::Arc;

use seabridge_core::{Result, SeaBridgeError};
use seabridge_translation::domain::service::TextOperationCascade;

use crate::domain::repository::{MessageTranslator, TranslatedText};

pub struct CascadeMessageTranslator {
    cascade: Arc<TextOperationCascade>,
}

impl CascadeMessageTranslator {
    pub fn new(cascade: Arc<TextOperationCascade>) -> Self {
        Self { cascade }
    }
}

#[async_trait::async_trait]
impl MessageTranslator for CascadeMessageTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<TranslatedText> {
        let tagged = self.cascade.translate(text, target_language, None).await?;
        if tagged.value.translated_text.trim().is_empty() {
            return Err(SeaBridgeError::provider(
                tagged.provider,
                "empty translation returned",
            ));
        }
        Ok(TranslatedText {
            text: tagged.value.translated_text,
            model: tagged.provider,
        })
    }
}
