//! 会话广播通道
//!
//! 每个会话视图一个通道：
//! - 本地发送先乐观写入时间线，再异步持久化，最后广播
//! - 收到的事件经校验后按 ID 去重合并，时间线始终按发送时间升序
//! - 断线期间的发送进入本地队列，重连后按序补发；队列满则显式标记失败
//! - 通道关闭或释放后，迟到的结果（广播、译文、定时器）不再修改状态

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use seabridge_core::config::ConversationServiceConfig;
use seabridge_core::utils::ClockRef;
use seabridge_core::{Result, SeaBridgeError};

use crate::application::pending::{ExpiringMap, ORPHAN_EVENT_CAPACITY, ORPHAN_EVENT_TTL};
use crate::domain::model::event::{
    MESSAGE_CREATE, MESSAGE_DELETE, MESSAGE_EDIT, UPLOAD_COMPLETE, UPLOAD_START,
};
use crate::domain::model::{
    ChannelEvent, Message, MessageDelete, MessageDraft, MessageEdit, RawEvent, TranslationVariant,
    UploadAnnouncement,
};
use crate::domain::repository::{
    BroadcastTransportRef, EventSubscription, MessageStoreRef, NotificationSinkRef,
};
use crate::domain::service::{Timeline, UpsertOutcome, merge};

/// 连接状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
}

/// 通道参数
#[derive(Debug, Clone)]
pub struct ChannelSettings {
    /// 新消息高亮时长
    pub new_message_highlight: Duration,
    /// 断线期间待发送队列容量
    pub outbox_capacity: usize,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self::from(&ConversationServiceConfig::default())
    }
}

impl From<&ConversationServiceConfig> for ChannelSettings {
    fn from(config: &ConversationServiceConfig) -> Self {
        Self {
            new_message_highlight: Duration::from_millis(config.new_message_highlight_ms),
            outbox_capacity: config.outbox_capacity,
        }
    }
}

/// 通道依赖
#[derive(Clone)]
pub struct ChannelContext {
    pub transport: BroadcastTransportRef,
    pub store: MessageStoreRef,
    pub notifier: Option<NotificationSinkRef>,
    pub clock: ClockRef,
}

/// 对外可见的通道状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub conversation_id: String,
    /// 按发送时间升序
    pub messages: Vec<Message>,
    /// 短暂高亮的新消息
    pub new_message_ids: BTreeSet<String>,
    /// 进行中的上传
    pub uploads: Vec<UploadAnnouncement>,
    pub connection: ConnectionState,
    /// 断线期间未能排队的发送
    pub failed_message_ids: BTreeSet<String>,
    /// 待补发的事件数
    pub pending_outbound: usize,
}

#[derive(Debug, Clone)]
struct OutboundEvent {
    kind: &'static str,
    payload: Value,
    /// 关联的消息（队列满时标记失败）
    message_id: Option<String>,
}

struct ChannelState {
    timeline: Timeline,
    new_ids: BTreeSet<String>,
    uploads: BTreeMap<String, UploadAnnouncement>,
    connection: ConnectionState,
    outbox: VecDeque<OutboundEvent>,
    failed: BTreeSet<String>,
    /// 已删除的 ID，迟到的创建事件不再复活
    deleted: ExpiringMap<()>,
    /// 先于创建到达的编辑
    pending_edits: ExpiringMap<MessageEdit>,
    closed: bool,
}

impl ChannelState {
    /// 写入时间线；已删除的消息返回 None，先到的编辑在插入时补上
    fn admit(&mut self, message: Message) -> Option<UpsertOutcome> {
        if self.deleted.contains(&message.id) {
            return None;
        }
        let id = message.id.clone();
        let outcome = self.timeline.upsert(message);
        if let Some(edit) = self.pending_edits.take(&id) {
            self.timeline.apply_edit(&id, &edit.content);
        }
        Some(outcome)
    }

    fn forget(&mut self, message_id: &str) -> bool {
        self.deleted.insert(message_id.to_string(), ());
        self.pending_edits.take(message_id);
        self.new_ids.remove(message_id);
        self.failed.remove(message_id);
        self.timeline.remove(message_id).is_some()
    }
}

struct ChannelInner {
    conversation_id: String,
    channel_name: String,
    local_user_id: String,
    /// 本实例在传输层的订阅者 ID（回声抑制）
    subscriber_id: String,
    context: ChannelContext,
    settings: ChannelSettings,
    state: Mutex<ChannelState>,
    snapshot: watch::Sender<ChannelSnapshot>,
    listener: Mutex<Option<JoinHandle<()>>>,
    /// 订阅代数，旧监听任务结束时不覆盖新连接的状态
    epoch: AtomicU64,
    reconnect_lock: tokio::sync::Mutex<()>,
}

/// 会话广播通道（可克隆，共享同一状态）
#[derive(Clone)]
pub struct ConversationChannel {
    inner: Arc<ChannelInner>,
}

/// 不延长通道生命周期的引用
#[derive(Clone)]
pub struct WeakChannel {
    inner: Weak<ChannelInner>,
}

impl WeakChannel {
    pub fn upgrade(&self) -> Option<ConversationChannel> {
        self.inner
            .upgrade()
            .map(|inner| ConversationChannel { inner })
    }
}

pub fn channel_name(conversation_id: &str) -> String {
    format!("conversation:{}", conversation_id)
}

impl ConversationChannel {
    /// 加载历史消息并订阅广播
    ///
    /// 订阅失败不会报错，通道以 `Disconnected` 状态打开，可稍后 `reconnect`。
    pub async fn open(
        context: ChannelContext,
        settings: ChannelSettings,
        conversation_id: &str,
        local_user_id: &str,
    ) -> Result<Self> {
        if conversation_id.trim().is_empty() || local_user_id.trim().is_empty() {
            return Err(SeaBridgeError::validation(
                "conversation id and local user id must be non-empty",
            ));
        }

        let history = context.store.list(conversation_id).await?;
        let timeline = Timeline::from_messages(history);
        let state = ChannelState {
            timeline,
            new_ids: BTreeSet::new(),
            uploads: BTreeMap::new(),
            connection: ConnectionState::Connecting,
            outbox: VecDeque::new(),
            failed: BTreeSet::new(),
            deleted: ExpiringMap::new(ORPHAN_EVENT_TTL, ORPHAN_EVENT_CAPACITY),
            pending_edits: ExpiringMap::new(ORPHAN_EVENT_TTL, ORPHAN_EVENT_CAPACITY),
            closed: false,
        };

        let (snapshot, _) = watch::channel(build_snapshot(conversation_id, &state));
        let channel = Self {
            inner: Arc::new(ChannelInner {
                conversation_id: conversation_id.to_string(),
                channel_name: channel_name(conversation_id),
                local_user_id: local_user_id.to_string(),
                subscriber_id: format!("{}:{}", local_user_id, uuid::Uuid::new_v4().simple()),
                context,
                settings,
                state: Mutex::new(state),
                snapshot,
                listener: Mutex::new(None),
                epoch: AtomicU64::new(0),
                reconnect_lock: tokio::sync::Mutex::new(()),
            }),
        };

        match channel.inner.connect().await {
            Ok(()) => info!(
                conversation_id = %conversation_id,
                user_id = %local_user_id,
                "Conversation channel opened"
            ),
            Err(err) => warn!(
                conversation_id = %conversation_id,
                error = %err,
                "Conversation channel opened without broadcast connection"
            ),
        }
        Ok(channel)
    }

    pub fn conversation_id(&self) -> &str {
        &self.inner.conversation_id
    }

    pub fn local_user_id(&self) -> &str {
        &self.inner.local_user_id
    }

    pub fn downgrade(&self) -> WeakChannel {
        WeakChannel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn snapshot(&self) -> ChannelSnapshot {
        self.inner.snapshot.borrow().clone()
    }

    /// 订阅状态变化
    pub fn watch(&self) -> watch::Receiver<ChannelSnapshot> {
        self.inner.snapshot.subscribe()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.inner.lock_state().timeline.messages()
    }

    pub fn message(&self, message_id: &str) -> Option<Message> {
        self.inner.lock_state().timeline.get(message_id).cloned()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.lock_state().connection
    }

    /// 发送消息
    ///
    /// 乐观写入本地后持久化（不等待）并广播。断线时进入待发送队列并返回 Ok；
    /// 队列已满时消息被标记为失败并返回 `NotConnected`。
    pub async fn send(&self, draft: MessageDraft) -> Result<Message> {
        self.inner.ensure_open()?;

        let message = Message {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: self.inner.conversation_id.clone(),
            sender_id: self.inner.local_user_id.clone(),
            content: draft.content,
            message_type: draft.message_type,
            sent_at: self.inner.context.clock.now(),
            variants: draft.variants,
        };
        message.validate()?;

        self.inner.update_state(|state| {
            state.timeline.upsert(message.clone());
        });
        self.inner.persist_new(message.clone());

        let payload = ChannelEvent::MessageCreated(message.clone()).payload()?;
        self.inner
            .deliver(OutboundEvent {
                kind: MESSAGE_CREATE,
                payload,
                message_id: Some(message.id.clone()),
            })
            .await?;
        Ok(message)
    }

    /// 编辑消息内容（variants 保持不变）
    pub async fn edit(&self, message_id: &str, content: &str) -> Result<Message> {
        self.inner.ensure_open()?;
        if content.trim().is_empty() {
            return Err(SeaBridgeError::validation("edited content must be non-empty"));
        }

        let edited = {
            let mut state = self.inner.lock_state();
            let existing = state.timeline.get(message_id).cloned().ok_or_else(|| {
                SeaBridgeError::validation(format!("message {} not found", message_id))
            })?;
            let edited = merge::apply_edit(&existing, content);
            state.timeline.replace(edited.clone());
            self.inner.publish_snapshot(&state);
            edited
        };
        self.inner
            .persist_edit(message_id.to_string(), content.to_string());

        let payload = ChannelEvent::MessageEdited(MessageEdit {
            id: message_id.to_string(),
            content: content.to_string(),
            edited_at: self.inner.context.clock.now(),
        })
        .payload()?;
        self.inner
            .deliver(OutboundEvent {
                kind: MESSAGE_EDIT,
                payload,
                message_id: Some(message_id.to_string()),
            })
            .await?;
        Ok(edited)
    }

    pub async fn delete(&self, message_id: &str) -> Result<()> {
        self.inner.ensure_open()?;
        let removed = self.inner.update_state(|state| {
            if !state.timeline.contains(message_id) {
                return false;
            }
            state.forget(message_id)
        });
        if !removed {
            return Err(SeaBridgeError::validation(format!(
                "message {} not found",
                message_id
            )));
        }
        self.inner.persist_delete(message_id.to_string());

        let payload = ChannelEvent::MessageDeleted(MessageDelete {
            id: message_id.to_string(),
        })
        .payload()?;
        self.inner
            .deliver(OutboundEvent {
                kind: MESSAGE_DELETE,
                payload,
                message_id: None,
            })
            .await
    }

    /// 公告上传开始
    pub async fn announce_upload_started(
        &self,
        upload_id: &str,
        file_name: &str,
    ) -> Result<UploadAnnouncement> {
        self.inner.ensure_open()?;
        let upload = UploadAnnouncement {
            upload_id: upload_id.to_string(),
            file_name: file_name.to_string(),
            sender_id: self.inner.local_user_id.clone(),
            message_id: None,
        };
        let event = ChannelEvent::UploadStarted(upload.clone());
        event.validate()?;

        self.inner.update_state(|state| {
            state.uploads.insert(upload.upload_id.clone(), upload.clone());
        });
        self.inner
            .deliver(OutboundEvent {
                kind: UPLOAD_START,
                payload: event.payload()?,
                message_id: None,
            })
            .await?;
        Ok(upload)
    }

    /// 公告上传完成
    pub async fn announce_upload_completed(
        &self,
        upload_id: &str,
        message_id: Option<&str>,
    ) -> Result<()> {
        self.inner.ensure_open()?;
        let upload = self
            .inner
            .update_state(|state| state.uploads.remove(upload_id))
            .unwrap_or_else(|| UploadAnnouncement {
                upload_id: upload_id.to_string(),
                file_name: String::new(),
                sender_id: self.inner.local_user_id.clone(),
                message_id: None,
            });
        let event = ChannelEvent::UploadCompleted(UploadAnnouncement {
            message_id: message_id.map(str::to_string),
            ..upload
        });
        event.validate()?;

        self.inner
            .deliver(OutboundEvent {
                kind: UPLOAD_COMPLETE,
                payload: event.payload()?,
                message_id: None,
            })
            .await
    }

    /// 重新订阅并按序补发待发送队列
    pub async fn reconnect(&self) -> Result<()> {
        self.inner.ensure_open()?;
        let _guard = self.inner.reconnect_lock.lock().await;

        self.inner.connect().await?;
        self.inner.resync().await;
        self.inner.flush_outbox().await
    }

    /// 合并译文（只升级不降级）并持久化该语言的译文，返回是否生效
    pub fn apply_translation(&self, message_id: &str, translation: &TranslationVariant) -> bool {
        {
            let mut state = self.inner.lock_state();
            if state.closed {
                return false;
            }
            let Some(existing) = state.timeline.get(message_id) else {
                return false;
            };
            match merge::merge_translation(existing, translation) {
                Some(merged) => {
                    state.timeline.replace(merged);
                    self.inner.publish_snapshot(&state);
                }
                None => return false,
            }
        }
        self.inner
            .persist_translation(message_id.to_string(), translation.clone());
        true
    }

    /// 设置本地标记（如 is_translating），不持久化也不广播
    pub fn set_flag(&self, message_id: &str, key: &str, value: bool) {
        let mut state = self.inner.lock_state();
        if state.closed {
            return;
        }
        let Some(existing) = state.timeline.get(message_id) else {
            return;
        };
        if existing.flag(key) == value {
            return;
        }
        let mut updated = existing.clone();
        updated.set_flag(key, value);
        state.timeline.replace(updated);
        self.inner.publish_snapshot(&state);
    }

    /// 关闭通道；之后不再响应任何事件
    pub fn close(&self) {
        self.inner.update_state(|state| {
            state.closed = true;
            state.connection = ConnectionState::Disconnected;
        });
        self.inner.stop_listener();
        info!(conversation_id = %self.inner.conversation_id, "Conversation channel closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock_state().closed
    }
}

impl ChannelInner {
    fn lock_state(&self) -> MutexGuard<'_, ChannelState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn update_state<R>(&self, apply: impl FnOnce(&mut ChannelState) -> R) -> R {
        let mut state = self.lock_state();
        let result = apply(&mut state);
        self.publish_snapshot(&state);
        result
    }

    fn publish_snapshot(&self, state: &ChannelState) {
        self.snapshot
            .send_replace(build_snapshot(&self.conversation_id, state));
    }

    fn ensure_open(&self) -> Result<()> {
        if self.lock_state().closed {
            return Err(SeaBridgeError::NotConnected(format!(
                "conversation channel {} is closed",
                self.conversation_id
            )));
        }
        Ok(())
    }

    fn set_connection(&self, connection: ConnectionState) {
        self.update_state(|state| {
            if !state.closed {
                state.connection = connection;
            }
        });
    }

    fn stop_listener(&self) {
        let handle = self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }

    async fn connect(self: &Arc<Self>) -> Result<()> {
        self.stop_listener();
        self.set_connection(ConnectionState::Connecting);

        let subscription = match self
            .context
            .transport
            .subscribe(&self.channel_name, &self.subscriber_id, false)
            .await
        {
            Ok(subscription) => subscription,
            Err(err) => {
                self.set_connection(ConnectionState::Disconnected);
                return Err(SeaBridgeError::NotConnected(format!(
                    "failed to subscribe to {}: {}",
                    self.channel_name, err
                )));
            }
        };

        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let handle = tokio::spawn(listen(Arc::downgrade(self), subscription, epoch));
        *self
            .listener
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(handle);
        self.set_connection(ConnectionState::Connected);
        Ok(())
    }

    /// 重连后从存储补齐断线期间错过的消息
    async fn resync(&self) {
        match self.context.store.list(&self.conversation_id).await {
            Ok(messages) => self.update_state(|state| {
                for message in messages {
                    state.admit(message);
                }
            }),
            Err(err) => warn!(
                conversation_id = %self.conversation_id,
                error = %err,
                "Failed to resync conversation after reconnect"
            ),
        }
    }

    async fn deliver(&self, event: OutboundEvent) -> Result<()> {
        let publish_now = {
            let state = self.lock_state();
            state.connection == ConnectionState::Connected && state.outbox.is_empty()
        };

        if publish_now {
            match self.publish(&event).await {
                Ok(()) => return Ok(()),
                Err(err) => {
                    warn!(
                        conversation_id = %self.conversation_id,
                        kind = event.kind,
                        error = %err,
                        "Broadcast publish failed, queueing event"
                    );
                    self.set_connection(ConnectionState::Disconnected);
                }
            }
        }
        self.enqueue(event)
    }

    fn enqueue(&self, event: OutboundEvent) -> Result<()> {
        let capacity = self.settings.outbox_capacity;
        self.update_state(|state| {
            if state.outbox.len() >= capacity {
                if let Some(message_id) = &event.message_id {
                    state.failed.insert(message_id.clone());
                }
                warn!(
                    conversation_id = %self.conversation_id,
                    kind = event.kind,
                    capacity,
                    "Outbox full, event marked failed"
                );
                return Err(SeaBridgeError::NotConnected(format!(
                    "outbox full ({} pending) for conversation {}",
                    capacity, self.conversation_id
                )));
            }
            debug!(conversation_id = %self.conversation_id, kind = event.kind, "Event queued");
            state.outbox.push_back(event);
            Ok(())
        })
    }

    async fn flush_outbox(&self) -> Result<()> {
        loop {
            let next = self.lock_state().outbox.front().cloned();
            let Some(event) = next else {
                return Ok(());
            };

            if let Err(err) = self.publish(&event).await {
                self.set_connection(ConnectionState::Disconnected);
                return Err(SeaBridgeError::NotConnected(format!(
                    "flush interrupted: {}",
                    err
                )));
            }
            self.update_state(|state| {
                state.outbox.pop_front();
                if let Some(message_id) = &event.message_id {
                    state.failed.remove(message_id);
                }
            });
        }
    }

    async fn publish(&self, event: &OutboundEvent) -> Result<()> {
        self.context
            .transport
            .publish(
                &self.channel_name,
                &self.subscriber_id,
                event.kind,
                event.payload.clone(),
            )
            .await
    }

    fn persist_new(&self, message: Message) {
        let store = self.context.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.save(&message).await {
                warn!(message_id = %message.id, error = %err, "Failed to persist message");
            }
        });
    }

    fn persist_edit(&self, message_id: String, content: String) {
        let store = self.context.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.update_content(&message_id, &content).await {
                warn!(message_id = %message_id, error = %err, "Failed to persist message edit");
            }
        });
    }

    fn persist_translation(&self, message_id: String, translation: TranslationVariant) {
        let store = self.context.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.merge_translation(&message_id, &translation).await {
                warn!(
                    message_id = %message_id,
                    language = %translation.language,
                    error = %err,
                    "Failed to persist message translation"
                );
            }
        });
    }

    fn persist_delete(&self, message_id: String) {
        let store = self.context.store.clone();
        tokio::spawn(async move {
            if let Err(err) = store.delete(&message_id).await {
                warn!(message_id = %message_id, error = %err, "Failed to persist message delete");
            }
        });
    }

    fn handle_raw(self: &Arc<Self>, raw: RawEvent) {
        let event = match ChannelEvent::decode(&raw.kind, raw.payload) {
            Ok(event) => event,
            Err(err) => {
                warn!(
                    conversation_id = %self.conversation_id,
                    kind = %raw.kind,
                    origin = %raw.origin,
                    error = %err,
                    "Dropping malformed broadcast event"
                );
                return;
            }
        };

        match event {
            ChannelEvent::MessageCreated(message) => self.on_message_created(message),
            ChannelEvent::MessageEdited(edit) => {
                self.update_state(|state| {
                    if state.closed
                        || state.deleted.contains(&edit.id)
                        || state.timeline.apply_edit(&edit.id, &edit.content)
                    {
                        return;
                    }
                    debug!(message_id = %edit.id, "Edit arrived before its message, holding");
                    let newer = state
                        .pending_edits
                        .get(&edit.id)
                        .is_none_or(|held| held.edited_at <= edit.edited_at);
                    if newer {
                        state.pending_edits.insert(edit.id.clone(), edit);
                    }
                });
            }
            ChannelEvent::MessageDeleted(delete) => {
                self.update_state(|state| {
                    if !state.closed {
                        state.forget(&delete.id);
                    }
                });
            }
            ChannelEvent::UploadStarted(upload) => {
                self.update_state(|state| {
                    if !state.closed {
                        state.uploads.insert(upload.upload_id.clone(), upload);
                    }
                });
            }
            ChannelEvent::UploadCompleted(upload) => {
                self.update_state(|state| {
                    if !state.closed {
                        state.uploads.remove(&upload.upload_id);
                    }
                });
            }
        }
    }

    fn on_message_created(self: &Arc<Self>, message: Message) {
        if message.conversation_id != self.conversation_id {
            warn!(
                conversation_id = %self.conversation_id,
                message_id = %message.id,
                other = %message.conversation_id,
                "Message for another conversation ignored"
            );
            return;
        }

        let from_peer = message.sender_id != self.local_user_id;
        let inserted = self.update_state(|state| {
            if state.closed {
                return false;
            }
            let Some(outcome) = state.admit(message.clone()) else {
                debug!(message_id = %message.id, "Create for deleted message ignored");
                return false;
            };
            if outcome == UpsertOutcome::Inserted && from_peer {
                state.new_ids.insert(message.id.clone());
            }
            outcome == UpsertOutcome::Inserted
        });

        if inserted && from_peer {
            if let Some(notifier) = &self.context.notifier {
                notifier.notify_new_message(&message);
            }
            self.schedule_highlight_clear(message.id);
        }
    }

    fn schedule_highlight_clear(self: &Arc<Self>, message_id: String) {
        let weak = Arc::downgrade(self);
        let highlight = self.settings.new_message_highlight;
        tokio::spawn(async move {
            tokio::time::sleep(highlight).await;
            if let Some(inner) = weak.upgrade() {
                inner.update_state(|state| {
                    state.new_ids.remove(&message_id);
                });
            }
        });
    }
}

impl Drop for ChannelInner {
    fn drop(&mut self) {
        self.stop_listener();
    }
}

/// 监听任务只持有弱引用，通道释放后自动退出
async fn listen(
    inner: Weak<ChannelInner>,
    mut subscription: Box<dyn EventSubscription>,
    epoch: u64,
) {
    while let Some(raw) = subscription.next().await {
        let Some(channel) = inner.upgrade() else {
            return;
        };
        channel.handle_raw(raw);
    }

    if let Some(channel) = inner.upgrade() {
        if channel.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }
        warn!(conversation_id = %channel.conversation_id, "Broadcast subscription dropped");
        channel.set_connection(ConnectionState::Disconnected);
    }
}

fn build_snapshot(conversation_id: &str, state: &ChannelState) -> ChannelSnapshot {
    ChannelSnapshot {
        conversation_id: conversation_id.to_string(),
        messages: state.timeline.messages(),
        new_message_ids: state.new_ids.clone(),
        uploads: state.uploads.values().cloned().collect(),
        connection: state.connection,
        failed_message_ids: state.failed.clone(),
        pending_outbound: state.outbox.len(),
    }
}
