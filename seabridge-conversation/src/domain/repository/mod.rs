use std::sync::Arc;

use seabridge_core::Result;
use serde_json::Value;

use crate::domain::model::{Message, RawEvent, TranslationVariant};

/// 会话广播传输（按频道名发布/订阅）
///
/// 每个订阅者至多收到一次；不同事件类型之间不保证顺序。
#[async_trait::async_trait]
pub trait BroadcastTransport: Send + Sync {
    /// 发布事件，`origin` 为发布者标识
    async fn publish(&self, channel: &str, origin: &str, kind: &str, payload: Value)
    -> Result<()>;

    /// 订阅频道；`receive_own = false` 时不投递本订阅者自己发布的事件
    async fn subscribe(
        &self,
        channel: &str,
        subscriber_id: &str,
        receive_own: bool,
    ) -> Result<Box<dyn EventSubscription>>;
}

/// 频道订阅；返回 None 表示连接已断开
#[async_trait::async_trait]
pub trait EventSubscription: Send {
    async fn next(&mut self) -> Option<RawEvent>;
}

/// 消息持久化
#[async_trait::async_trait]
pub trait MessageStore: Send + Sync {
    async fn save(&self, message: &Message) -> Result<()>;
    /// 只改内容，variants 不动
    async fn update_content(&self, message_id: &str, content: &str) -> Result<()>;
    /// 只写入该语言的译文 key，且仅当比已存译文更新；返回是否写入
    ///
    /// 多个读者各自补齐不同语言时互不覆盖。
    async fn merge_translation(
        &self,
        message_id: &str,
        translation: &TranslationVariant,
    ) -> Result<bool>;
    async fn delete(&self, message_id: &str) -> Result<()>;
    async fn get(&self, message_id: &str) -> Result<Option<Message>>;
    /// 会话内全部消息，按发送时间升序
    async fn list(&self, conversation_id: &str) -> Result<Vec<Message>>;
}

/// 新消息提醒（提示音等）
pub trait NotificationSink: Send + Sync {
    fn notify_new_message(&self, message: &Message);
}

/// 译文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatedText {
    pub text: String,
    /// 产出译文的模型
    pub model: String,
}

/// 消息翻译
#[async_trait::async_trait]
pub trait MessageTranslator: Send + Sync {
    async fn translate(&self, text: &str, target_language: &str) -> Result<TranslatedText>;
}

pub type BroadcastTransportRef = Arc<dyn BroadcastTransport>;
pub type MessageStoreRef = Arc<dyn MessageStore>;
pub type NotificationSinkRef = Arc<dyn NotificationSink>;
pub type MessageTranslatorRef = Arc<dyn MessageTranslator>;
