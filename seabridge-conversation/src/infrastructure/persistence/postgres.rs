use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

use seabridge_core::config::PostgresInstanceConfig;
use seabridge_core::{Result, SeaBridgeError};
use seabridge_translation::MessageMetadataReader;

use crate::domain::model::{Message, MessageType, TranslationVariant, Variants, variant_keys};
use crate::domain::repository::MessageStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, FromRow)]
struct MessageRow {
    id: String,
    conversation_id: String,
    sender_id: String,
    content: String,
    message_type: String,
    sent_at: DateTime<Utc>,
    variants: Json<Variants>,
}

impl TryFrom<MessageRow> for Message {
    type Error = anyhow::Error;

    fn try_from(row: MessageRow) -> std::result::Result<Self, Self::Error> {
        let message_type = MessageType::from_str(&row.message_type).map_err(|e| anyhow!(e))?;
        Ok(Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender_id: row.sender_id,
            content: row.content,
            message_type,
            sent_at: row.sent_at,
            variants: row.variants.0,
        })
    }
}

/// PostgreSQL 消息存储（表 `conversation_messages`，variants 为 JSONB）
#[derive(Clone)]
pub struct PostgresMessageStore {
    pool: Arc<PgPool>,
}

impl PostgresMessageStore {
    pub async fn new(config: &PostgresInstanceConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .min_connections(config.min_connections.unwrap_or(0))
            .connect(&config.url)
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!("failed to connect to postgres: {}", err))
            })?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// 读取后校验，脏数据不进入会话
fn into_message(row: MessageRow) -> Result<Message> {
    let message = Message::try_from(row)?;
    message.validate()?;
    Ok(message)
}

#[async_trait::async_trait]
impl MessageStore for PostgresMessageStore {
    async fn save(&self, message: &Message) -> Result<()> {
        message.validate()?;
        sqlx::query(
            r#"
            INSERT INTO conversation_messages (
                id, conversation_id, sender_id, content, message_type, sent_at, variants
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(message.message_type.as_str())
        .bind(message.sent_at)
        .bind(Json(&message.variants))
        .execute(self.pool())
        .await
        .map_err(|err| SeaBridgeError::storage(format!("failed to save message: {}", err)))?;

        Ok(())
    }

    async fn update_content(&self, message_id: &str, content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(SeaBridgeError::validation("edited content must be non-empty"));
        }
        let result = sqlx::query("UPDATE conversation_messages SET content = $2 WHERE id = $1")
            .bind(message_id)
            .bind(content)
            .execute(self.pool())
            .await
            .map_err(|err| SeaBridgeError::storage(format!("failed to update message: {}", err)))?;

        if result.rows_affected() == 0 {
            return Err(SeaBridgeError::validation(format!(
                "message {} does not exist",
                message_id
            )));
        }
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
        // 只合并该语言的 key；已存译文更新时不写
        let result = sqlx::query(
            r#"
            UPDATE conversation_messages
            SET variants = variants || $2
            WHERE id = $1
              AND (variants ->> $3 IS NULL OR (variants ->> $3)::timestamptz < $4)
            "#,
        )
        .bind(message_id)
        .bind(Json(translation.to_variants()))
        .bind(variant_keys::translated_at(&translation.language))
        .bind(translation.translated_at)
        .execute(self.pool())
        .await
        .map_err(|err| {
            SeaBridgeError::storage(format!("failed to merge message translation: {}", err))
        })?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, message_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM conversation_messages WHERE id = $1")
            .bind(message_id)
            .execute(self.pool())
            .await
            .map_err(|err| SeaBridgeError::storage(format!("failed to delete message: {}", err)))?;
        Ok(())
    }

    async fn get(&self, message_id: &str) -> Result<Option<Message>> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, message_type, sent_at, variants
            FROM conversation_messages
            WHERE id = $1
            "#,
        )
        .bind(message_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|err| SeaBridgeError::storage(format!("failed to load message: {}", err)))?;

        row.map(into_message).transpose()
    }

    async fn list(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, conversation_id, sender_id, content, message_type, sent_at, variants
            FROM conversation_messages
            WHERE conversation_id = $1
            ORDER BY sent_at ASC, id ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(self.pool())
        .await
        .map_err(|err| SeaBridgeError::storage(format!("failed to list messages: {}", err)))?;

        rows.into_iter().map(into_message).collect()
    }
}

#[async_trait::async_trait]
impl MessageMetadataReader for PostgresMessageStore {
    async fn sender_of(&self, message_id: &str) -> Result<Option<String>> {
        let sender: Option<(String,)> =
            sqlx::query_as("SELECT sender_id FROM conversation_messages WHERE id = $1")
                .bind(message_id)
                .fetch_optional(self.pool())
                .await
                .map_err(|err| {
                    SeaBridgeError::storage(format!("failed to load message sender: {}", err))
                })?;
        Ok(sender.map(|(sender_id,)| sender_id))
    }
}
