pub mod channel;
mod pending;
pub mod reconciler;
pub mod service;

pub use channel::{
    ChannelContext, ChannelSettings, ChannelSnapshot, ConnectionState, ConversationChannel,
    WeakChannel, channel_name,
};
pub use reconciler::{TranslationReconciler, stagger_from_config};
pub use service::{ConversationService, ConversationSession};
