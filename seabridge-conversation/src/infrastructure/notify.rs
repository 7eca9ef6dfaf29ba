use tracing::info;

use crate::domain::model::Message;
use crate::domain::repository::NotificationSink;

/// 以日志代替提示音
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify_new_message(&self, message: &Message) {
        info!(
            message_id = %message.id,
            conversation_id = %message.conversation_id,
            sender_id = %message.sender_id,
            "New message received"
        );
    }
}
