//! Wire 风格的依赖注入模块
//!
//! 按配置构建消息存储并组装会话服务。广播传输与消息翻译由调用方注入。

use std::sync::Arc;

use seabridge_core::utils::system_clock;
use seabridge_core::{Result, SeaBridgeConfig, SeaBridgeError, TranslationMetrics};
use seabridge_translation::domain::repository::MessageMetadataReaderRef;
use seabridge_translation::domain::service::TextOperationCascade;

use crate::application::{ChannelContext, ChannelSettings, ConversationService, stagger_from_config};
use crate::domain::repository::{
    BroadcastTransportRef, MessageStoreRef, MessageTranslatorRef, NotificationSinkRef,
};
use crate::infrastructure::TracingNotifier;
use crate::infrastructure::persistence::{InMemoryMessageStore, PostgresMessageStore};
use crate::infrastructure::translator::CascadeMessageTranslator;

/// 消息存储的两个视图（同一实例）
pub struct MessageStores {
    pub messages: MessageStoreRef,
    /// 供附件翻译降级时恢复发送者
    pub metadata: MessageMetadataReaderRef,
}

/// 按配置构建消息存储，未配置时使用内存实现
pub async fn build_message_store(config: &SeaBridgeConfig) -> Result<MessageStores> {
    let conversation = config.conversation_service();

    match conversation.message_store.as_deref() {
        Some(profile) => {
            let pg = config.postgres_profile(profile).ok_or_else(|| {
                SeaBridgeError::validation(format!("postgres profile '{}' not found", profile))
            })?;
            let store = Arc::new(PostgresMessageStore::new(pg).await?);
            Ok(MessageStores {
                messages: store.clone(),
                metadata: store,
            })
        }
        None => {
            tracing::warn!("No message store configured for conversations, using in-memory store");
            let store = Arc::new(InMemoryMessageStore::new());
            Ok(MessageStores {
                messages: store.clone(),
                metadata: store,
            })
        }
    }
}

/// 以文本操作级联作为消息翻译
pub fn cascade_translator(cascade: Arc<TextOperationCascade>) -> MessageTranslatorRef {
    Arc::new(CascadeMessageTranslator::new(cascade))
}

/// 组装会话服务（不做任何 IO）
pub fn assemble(
    config: &SeaBridgeConfig,
    transport: BroadcastTransportRef,
    store: MessageStoreRef,
    translator: Option<MessageTranslatorRef>,
    notifier: Option<NotificationSinkRef>,
    metrics: Option<Arc<TranslationMetrics>>,
) -> ConversationService {
    let conversation = config.conversation_service();
    let context = ChannelContext {
        transport,
        store,
        notifier: notifier.or_else(|| Some(Arc::new(TracingNotifier))),
        clock: system_clock(),
    };

    ConversationService::new(
        context,
        ChannelSettings::from(&conversation),
        translator,
        stagger_from_config(&conversation),
        metrics,
    )
}

/// 构建会话服务
pub async fn initialize(
    config: &SeaBridgeConfig,
    transport: BroadcastTransportRef,
    translator: Option<MessageTranslatorRef>,
    metrics: Option<Arc<TranslationMetrics>>,
) -> Result<Arc<ConversationService>> {
    config.validate_references()?;
    let stores = build_message_store(config).await?;
    Ok(Arc::new(assemble(
        config,
        transport,
        stores.messages,
        translator,
        None,
        metrics,
    )))
}
