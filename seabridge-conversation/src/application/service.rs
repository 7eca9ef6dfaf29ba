//! 会话应用服务
//!
//! 打开会话视图：通道（消息、发送、连接状态）加可选的译文补齐。

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use seabridge_core::{Result, TranslationMetrics};

use crate::application::channel::{
    ChannelContext, ChannelSettings, ChannelSnapshot, ConnectionState, ConversationChannel,
};
use crate::application::reconciler::TranslationReconciler;
use crate::domain::model::{Message, MessageDraft};
use crate::domain::repository::MessageTranslatorRef;

pub struct ConversationService {
    context: ChannelContext,
    settings: ChannelSettings,
    translator: Option<MessageTranslatorRef>,
    stagger: Duration,
    metrics: Option<Arc<TranslationMetrics>>,
}

/// 已打开的会话视图
pub struct ConversationSession {
    channel: ConversationChannel,
    reconciler: Option<TranslationReconciler>,
}

impl ConversationService {
    pub fn new(
        context: ChannelContext,
        settings: ChannelSettings,
        translator: Option<MessageTranslatorRef>,
        stagger: Duration,
        metrics: Option<Arc<TranslationMetrics>>,
    ) -> Self {
        Self {
            context,
            settings,
            translator,
            stagger,
            metrics,
        }
    }

    pub fn context(&self) -> &ChannelContext {
        &self.context
    }

    /// 打开会话；给出 `display_language` 且配置了翻译时启动译文补齐
    #[instrument(skip(self))]
    pub async fn subscribe(
        &self,
        conversation_id: &str,
        local_user_id: &str,
        display_language: Option<&str>,
    ) -> Result<ConversationSession> {
        let channel = ConversationChannel::open(
            self.context.clone(),
            self.settings.clone(),
            conversation_id,
            local_user_id,
        )
        .await?;

        let reconciler = match (display_language, &self.translator) {
            (Some(language), Some(translator)) => {
                let reconciler = TranslationReconciler::new(
                    &channel,
                    translator.clone(),
                    language,
                    self.stagger,
                    self.context.clock.clone(),
                    self.metrics.clone(),
                )?;
                reconciler.start();
                Some(reconciler)
            }
            (Some(language), None) => {
                tracing::warn!(
                    conversation_id = %conversation_id,
                    language = %language,
                    "No message translator configured, translations disabled"
                );
                None
            }
            (None, _) => None,
        };

        Ok(ConversationSession {
            channel,
            reconciler,
        })
    }
}

impl ConversationSession {
    pub fn channel(&self) -> &ConversationChannel {
        &self.channel
    }

    pub fn reconciler(&self) -> Option<&TranslationReconciler> {
        self.reconciler.as_ref()
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        self.channel.snapshot()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.channel.messages()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.connection_state()
    }

    #[instrument(skip(self, draft), fields(conversation_id = %self.channel.conversation_id()))]
    pub async fn send(&self, draft: MessageDraft) -> Result<Message> {
        self.channel.send(draft).await
    }

    pub async fn reconnect(&self) -> Result<()> {
        self.channel.reconnect().await
    }

    pub fn set_display_language(&self, language: &str) -> Result<usize> {
        match &self.reconciler {
            Some(reconciler) => reconciler.set_target_language(language),
            None => Ok(0),
        }
    }

    /// 离开会话
    pub fn close(&self) {
        if let Some(reconciler) = &self.reconciler {
            reconciler.stop();
        }
        self.channel.close();
    }
}
