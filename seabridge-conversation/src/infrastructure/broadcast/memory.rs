//! 进程内广播中心
//!
//! 每个频道一个 `tokio::sync::broadcast`；`drop_connections` 使现有订阅全部断开，
//! `set_online(false)` 模拟网络不可用（发布、订阅均失败）。

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use seabridge_core::{Result, SeaBridgeError};

use crate::domain::model::RawEvent;
use crate::domain::repository::{BroadcastTransport, EventSubscription};

const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

pub struct InProcessBroadcastHub {
    channels: Mutex<HashMap<String, broadcast::Sender<RawEvent>>>,
    capacity: usize,
    online: AtomicBool,
    /// 连接代数，递增即断开旧订阅
    generation: watch::Sender<u64>,
}

impl Default for InProcessBroadcastHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl InProcessBroadcastHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (generation, _) = watch::channel(0);
        Self {
            channels: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
            online: AtomicBool::new(true),
            generation,
        }
    }

    /// 断开所有现有订阅
    pub fn drop_connections(&self) {
        self.generation.send_modify(|generation| *generation += 1);
        debug!("Dropped all broadcast subscriptions");
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
        if !online {
            self.drop_connections();
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<RawEvent> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    fn ensure_online(&self, operation: &str) -> Result<()> {
        if self.is_online() {
            Ok(())
        } else {
            Err(SeaBridgeError::NotConnected(format!(
                "broadcast transport offline during {}",
                operation
            )))
        }
    }
}

#[async_trait::async_trait]
impl BroadcastTransport for InProcessBroadcastHub {
    async fn publish(
        &self,
        channel: &str,
        origin: &str,
        kind: &str,
        payload: Value,
    ) -> Result<()> {
        self.ensure_online("publish")?;
        let event = RawEvent {
            kind: kind.to_string(),
            payload,
            origin: origin.to_string(),
        };
        // 没有订阅者时 send 返回错误，事件直接丢弃
        if self.sender(channel).send(event).is_err() {
            debug!(channel = %channel, kind = %kind, "No subscribers for broadcast event");
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        channel: &str,
        subscriber_id: &str,
        receive_own: bool,
    ) -> Result<Box<dyn EventSubscription>> {
        self.ensure_online("subscribe")?;
        let disconnect = self.generation.subscribe();
        let generation = *disconnect.borrow();
        Ok(Box::new(HubSubscription {
            channel: channel.to_string(),
            subscriber_id: subscriber_id.to_string(),
            receive_own,
            receiver: self.sender(channel).subscribe(),
            disconnect,
            generation,
        }))
    }
}

struct HubSubscription {
    channel: String,
    subscriber_id: String,
    receive_own: bool,
    receiver: broadcast::Receiver<RawEvent>,
    disconnect: watch::Receiver<u64>,
    generation: u64,
}

impl HubSubscription {
    fn dropped(&self) -> bool {
        *self.disconnect.borrow() != self.generation
    }
}

#[async_trait::async_trait]
impl EventSubscription for HubSubscription {
    async fn next(&mut self) -> Option<RawEvent> {
        loop {
            if self.dropped() {
                return None;
            }
            let received = tokio::select! {
                changed = self.disconnect.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                    continue;
                }
                received = self.receiver.recv() => received,
            };

            match received {
                Ok(event) => {
                    if !self.receive_own && event.origin == self.subscriber_id {
                        continue;
                    }
                    if self.dropped() {
                        return None;
                    }
                    return Some(event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(
                        channel = %self.channel,
                        subscriber = %self.subscriber_id,
                        skipped,
                        "Broadcast subscriber lagged"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
