use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use seabridge_core::{Result, SeaBridgeError};
use seabridge_translation::MessageMetadataReader;

use crate::domain::model::{Message, TranslationVariant};
use crate::domain::repository::MessageStore;
use crate::domain::service::merge;

/// 内存消息存储
#[derive(Clone, Default)]
pub struct InMemoryMessageStore {
    messages: Arc<RwLock<HashMap<String, Message>>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: &Message) -> Result<()> {
        message.validate()?;
        self.messages
            .write()
            .await
            .insert(message.id.clone(), message.clone());
        Ok(())
    }

    async fn update_content(&self, message_id: &str, content: &str) -> Result<()> {
        let mut guard = self.messages.write().await;
        let existing = guard.get_mut(message_id).ok_or_else(|| {
            SeaBridgeError::validation(format!("message {} does not exist", message_id))
        })?;
        let edited = merge::apply_edit(existing, content);
        edited.validate()?;
        *existing = edited;
        Ok(())
    }

    async fn merge_translation(
        &self,
        message_id: &str,
        translation: &TranslationVariant,
    ) -> Result<bool> {
        if translation.content.trim().is_empty() {
            return Err(SeaBridgeError::validation(format!(
                "empty {} translation for message {}",
                translation.language, message_id
            )));
        }
        let mut guard = self.messages.write().await;
        let Some(existing) = guard.get_mut(message_id) else {
            return Ok(false);
        };
        match merge::merge_translation(existing, translation) {
            Some(merged) => {
                *existing = merged;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        self.messages.write().await.remove(message_id);
        Ok(())
    }

    async fn get(&self, message_id: &str) -> Result<Option<Message>> {
        Ok(self.messages.read().await.get(message_id).cloned())
    }

    async fn list(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let mut messages: Vec<Message> = self
            .messages
            .read()
            .await
            .values()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| (a.sent_at, &a.id).cmp(&(b.sent_at, &b.id)));
        Ok(messages)
    }
}

#[async_trait::async_trait]
impl MessageMetadataReader for InMemoryMessageStore {
    async fn sender_of(&self, message_id: &str) -> Result<Option<String>> {
        Ok(self
            .messages
            .read()
            .await
            .get(message_id)
            .map(|m| m.sender_id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MessageType, Variants};
    use chrono::{TimeZone, Utc};

    fn translation(language: &str, content: &str, second: u32) -> TranslationVariant {
        TranslationVariant {
            language: language.to_string(),
            content: content.to_string(),
            model: "claude".to_string(),
            translated_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 1, second).unwrap(),
        }
    }

    fn message(id: &str, conversation: &str, second: u32) -> Message {
        Message {
            id: id.to_string(),
            conversation_id: conversation.to_string(),
            sender_id: "teacher-1".to_string(),
            content: "hello".to_string(),
            message_type: MessageType::Text,
            sent_at: Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, second).unwrap(),
            variants: Variants::new(),
        }
    }

    #[tokio::test]
    async fn test_list_is_scoped_and_ordered() {
        let store = InMemoryMessageStore::new();
        store.save(&message("m2", "c1", 2)).await.unwrap();
        store.save(&message("m1", "c1", 1)).await.unwrap();
        store.save(&message("x1", "c2", 0)).await.unwrap();

        let ids: Vec<String> = store
            .list("c1")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2"]);
        assert_eq!(
            store.sender_of("m1").await.unwrap().as_deref(),
            Some("teacher-1")
        );
        assert_eq!(store.sender_of("nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_content_requires_existing_row() {
        let store = InMemoryMessageStore::new();
        assert!(store.update_content("m1", "edited").await.is_err());

        let mut original = message("m1", "c1", 0);
        original.set_translation(&translation("vi", "xin chào", 5));
        store.save(&original).await.unwrap();

        store.update_content("m1", "edited").await.unwrap();
        let stored = store.get("m1").await.unwrap().unwrap();
        assert_eq!(stored.content, "edited");
        assert_eq!(stored.variants, original.variants);
        assert!(store.update_content("m1", "  ").await.is_err());

        store.delete("m1").await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_merge_translation_is_language_scoped() {
        let store = InMemoryMessageStore::new();
        store.save(&message("m1", "c1", 0)).await.unwrap();

        assert!(store.merge_translation("m1", &translation("en", "hello", 5)).await.unwrap());
        assert!(store.merge_translation("m1", &translation("th", "สวัสดี", 6)).await.unwrap());
        // 旧译文不覆盖新译文
        assert!(!store.merge_translation("m1", &translation("en", "hi", 1)).await.unwrap());
        assert!(!store.merge_translation("gone", &translation("en", "hi", 9)).await.unwrap());
        assert!(store.merge_translation("m1", &translation("en", "", 9)).await.is_err());

        let stored = store.get("m1").await.unwrap().unwrap();
        assert_eq!(stored.translation("en").unwrap().content, "hello");
        assert_eq!(stored.translation("th").unwrap().content, "สวัสดี");
        assert_eq!(stored.content, "hello");
    }

    #[tokio::test]
    async fn test_rejects_malformed_message() {
        let store = InMemoryMessageStore::new();
        let mut bad = message("m1", "c1", 0);
        bad.sender_id.clear();
        assert!(matches!(
            store.save(&bad).await,
            Err(SeaBridgeError::Validation(_))
        ));
    }
}
