// 集成测试公共组件：进程内广播 + 内存消息存储 + 脚本化翻译 + 手动时钟
#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use tokio::time::Instant;

use seabridge_conversation::application::{
    ChannelContext, ChannelSettings, ChannelSnapshot, ConversationChannel,
};
use seabridge_conversation::domain::model::{Message, MessageType, Variants};
use seabridge_conversation::domain::repository::{
    MessageStore, MessageTranslator, NotificationSink, TranslatedText,
};
use seabridge_conversation::infrastructure::broadcast::InProcessBroadcastHub;
use seabridge_conversation::infrastructure::persistence::InMemoryMessageStore;
use seabridge_core::utils::ManualClock;
use seabridge_core::{Result, SeaBridgeError};

pub const CONVERSATION: &str = "class-3b-parents";
pub const TEACHER: &str = "teacher-1";
pub const PARENT: &str = "parent-1";

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

/// 记录提醒
#[derive(Default)]
pub struct RecordingNotifier {
    notified: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn notified(&self) -> Vec<String> {
        self.notified.lock().unwrap().clone()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify_new_message(&self, message: &Message) {
        self.notified.lock().unwrap().push(message.id.clone());
    }
}

pub struct Harness {
    pub hub: Arc<InProcessBroadcastHub>,
    pub store: Arc<InMemoryMessageStore>,
    pub clock: Arc<ManualClock>,
    pub notifier: Arc<RecordingNotifier>,
}

impl Harness {
    pub fn new() -> Self {
        seabridge_core::init_tracing_from_config(None);
        Self {
            hub: Arc::new(InProcessBroadcastHub::new()),
            store: Arc::new(InMemoryMessageStore::new()),
            clock: Arc::new(ManualClock::new(start_time())),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    pub fn context(&self) -> ChannelContext {
        ChannelContext {
            transport: self.hub.clone(),
            store: self.store.clone(),
            notifier: Some(self.notifier.clone()),
            clock: self.clock.clone(),
        }
    }

    pub async fn open(&self, user: &str) -> ConversationChannel {
        self.open_with(user, ChannelSettings::default()).await
    }

    pub async fn open_with(&self, user: &str, settings: ChannelSettings) -> ConversationChannel {
        ConversationChannel::open(self.context(), settings, CONVERSATION, user)
            .await
            .unwrap()
    }

    /// 预置一条历史消息
    pub async fn seed(&self, id: &str, sender: &str, second: u32, content: &str) -> Message {
        let message = Message {
            id: id.to_string(),
            conversation_id: CONVERSATION.to_string(),
            sender_id: sender.to_string(),
            content: content.to_string(),
            message_type: MessageType::Text,
            sent_at: start_time() + chrono::Duration::seconds(second as i64),
            variants: Variants::new(),
        };
        self.store.save(&message).await.unwrap();
        message
    }
}

/// 等待快照满足条件（暂停时钟下超时即失败）
pub async fn wait_for(
    channel: &ConversationChannel,
    predicate: impl FnMut(&ChannelSnapshot) -> bool,
) -> ChannelSnapshot {
    let mut updates = channel.watch();
    let snapshot = tokio::time::timeout(Duration::from_secs(30), updates.wait_for(predicate))
        .await
        .expect("timed out waiting for channel state")
        .expect("channel dropped")
        .clone();
    snapshot
}

/// 让已就绪的任务跑完
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id.clone()).collect()
}

#[derive(Debug, Clone)]
pub struct TranslateCall {
    pub text: String,
    pub language: String,
    pub at: Instant,
}

/// 脚本化消息翻译：记录调用时刻，可配置延迟、失败文本与空译文
pub struct ScriptedTranslator {
    delay: Duration,
    failing: Mutex<HashSet<String>>,
    blank: Mutex<HashSet<String>>,
    calls: Mutex<Vec<TranslateCall>>,
}

impl ScriptedTranslator {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            failing: Mutex::new(HashSet::new()),
            blank: Mutex::new(HashSet::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn fail_on(&self, text: &str) {
        self.failing.lock().unwrap().insert(text.to_string());
    }

    /// 对该文本返回成功但为空的译文
    pub fn blank_on(&self, text: &str) {
        self.blank.lock().unwrap().insert(text.to_string());
    }

    pub fn calls(&self) -> Vec<TranslateCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MessageTranslator for ScriptedTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<TranslatedText> {
        self.calls.lock().unwrap().push(TranslateCall {
            text: text.to_string(),
            language: target_language.to_string(),
            at: Instant::now(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.lock().unwrap().contains(text) {
            return Err(SeaBridgeError::provider("scripted", "service unavailable"));
        }
        if self.blank.lock().unwrap().contains(text) {
            return Ok(TranslatedText {
                text: String::new(),
                model: "scripted".to_string(),
            });
        }
        Ok(TranslatedText {
            text: format!("[{}] {}", target_language, text),
            model: "scripted".to_string(),
        })
    }
}
