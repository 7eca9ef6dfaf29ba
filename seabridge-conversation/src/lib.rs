//! SeaBridge 会话实时同步
//!
//! - 消息广播通道：乐观发送、回声抑制、按 ID 去重、断线排队补发
//! - 消息合并规则：编辑不触碰 variants，译文只升级不降级
//! - 译文补齐：按目标语言为他人消息派发翻译并写回

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use application::{
    ChannelContext, ChannelSettings, ChannelSnapshot, ConnectionState, ConversationChannel,
    ConversationService, ConversationSession, TranslationReconciler,
};
pub use domain::model::{
    ChannelEvent, Message, MessageDraft, MessageType, TranslationVariant, Variants,
};
pub use domain::repository::{
    BroadcastTransport, MessageStore, MessageTranslator, NotificationSink, TranslatedText,
};
pub use domain::service::{Timeline, merge_message, select_candidates};
pub use infrastructure::broadcast::InProcessBroadcastHub;
