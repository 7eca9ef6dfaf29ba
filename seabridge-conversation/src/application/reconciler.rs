//! 译文缓存与补齐
//!
//! 监听通道快照，为缺少目标语言译文的消息派发翻译请求：
//! 最近的消息优先，同一 (消息, 语言) 不重复在途，派发间隔固定错开。
//! 结果经合并规则写回通道，通道释放后的迟到结果直接丢弃。

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use seabridge_core::config::ConversationServiceConfig;
use seabridge_core::utils::{ClockRef, validate_language_code};
use seabridge_core::{Result, SeaBridgeError, TranslationMetrics};

use crate::application::channel::{ConversationChannel, WeakChannel};
use crate::domain::model::{TranslationVariant, variant_keys};
use crate::domain::repository::MessageTranslatorRef;
use crate::domain::service::{TranslationCandidate, select_candidates};

type RequestKey = (String, String);

struct ReconcilerState {
    target_language: String,
    in_flight: HashSet<RequestKey>,
    failed: HashSet<RequestKey>,
    /// 下一次可派发的时刻
    next_slot: Instant,
    stopped: bool,
}

struct ReconcilerInner {
    channel: WeakChannel,
    local_user_id: String,
    translator: MessageTranslatorRef,
    stagger: Duration,
    clock: ClockRef,
    metrics: Option<Arc<TranslationMetrics>>,
    state: Mutex<ReconcilerState>,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

pub struct TranslationReconciler {
    inner: Arc<ReconcilerInner>,
}

pub fn stagger_from_config(config: &ConversationServiceConfig) -> Duration {
    Duration::from_millis(config.translation_stagger_ms)
}

impl TranslationReconciler {
    pub fn new(
        channel: &ConversationChannel,
        translator: MessageTranslatorRef,
        target_language: &str,
        stagger: Duration,
        clock: ClockRef,
        metrics: Option<Arc<TranslationMetrics>>,
    ) -> Result<Self> {
        let target_language = validate_language_code(target_language, &[])?;
        Ok(Self {
            inner: Arc::new(ReconcilerInner {
                channel: channel.downgrade(),
                local_user_id: channel.local_user_id().to_string(),
                translator,
                stagger,
                clock,
                metrics,
                state: Mutex::new(ReconcilerState {
                    target_language,
                    in_flight: HashSet::new(),
                    failed: HashSet::new(),
                    next_slot: Instant::now(),
                    stopped: false,
                }),
                watcher: Mutex::new(None),
            }),
        })
    }

    /// 立即对当前消息做一次补齐，并在每次通道更新时重复
    pub fn start(&self) {
        self.inner.reconcile();

        let Some(channel) = self.inner.channel.upgrade() else {
            return;
        };
        let mut updates = channel.watch();
        drop(channel);

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                inner.reconcile();
            }
        });

        let previous = self.inner.lock_watcher().replace(handle);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// 补齐一次，返回本次派发的请求数
    pub fn reconcile(&self) -> usize {
        self.inner.reconcile()
    }

    pub fn target_language(&self) -> String {
        self.inner.lock_state().target_language.clone()
    }

    /// 切换目标语言；其他语言已缓存的译文保留
    pub fn set_target_language(&self, language: &str) -> Result<usize> {
        let language = validate_language_code(language, &[])?;
        {
            let mut state = self.inner.lock_state();
            if state.target_language == language {
                return Ok(0);
            }
            info!(from = %state.target_language, to = %language, "Translation target language changed");
            state.target_language = language;
            state.failed.clear();
        }
        Ok(self.inner.reconcile())
    }

    pub fn in_flight(&self) -> usize {
        self.inner.lock_state().in_flight.len()
    }

    /// 停止响应：不再派发，迟到的结果不写回
    pub fn stop(&self) {
        self.inner.lock_state().stopped = true;
        if let Some(handle) = self.inner.lock_watcher().take() {
            handle.abort();
        }
    }
}

impl Drop for TranslationReconciler {
    fn drop(&mut self) {
        self.stop();
    }
}

impl ReconcilerInner {
    fn lock_state(&self) -> MutexGuard<'_, ReconcilerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_watcher(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.watcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn reconcile(self: &Arc<Self>) -> usize {
        let Some(channel) = self.channel.upgrade() else {
            return 0;
        };
        if channel.is_closed() {
            return 0;
        }
        let messages = channel.messages();

        let dispatches: Vec<(TranslationCandidate, String, Instant)> = {
            let mut state = self.lock_state();
            if state.stopped {
                return 0;
            }
            let language = state.target_language.clone();
            let skip: HashSet<String> = state
                .in_flight
                .iter()
                .chain(state.failed.iter())
                .filter(|(_, lang)| *lang == language)
                .map(|(id, _)| id.clone())
                .collect();

            let candidates =
                select_candidates(&messages, &self.local_user_id, &language, &skip);
            let now = Instant::now();
            candidates
                .into_iter()
                .map(|candidate| {
                    state
                        .in_flight
                        .insert((candidate.message_id.clone(), language.clone()));
                    let slot = state.next_slot.max(now);
                    state.next_slot = slot + self.stagger;
                    (candidate, language.clone(), slot)
                })
                .collect()
        };

        for (candidate, _, _) in &dispatches {
            channel.set_flag(&candidate.message_id, variant_keys::IS_TRANSLATING, true);
        }
        drop(channel);

        let count = dispatches.len();
        for (candidate, language, slot) in dispatches {
            debug!(message_id = %candidate.message_id, language = %language, "Dispatching translation");
            if let Some(metrics) = &self.metrics {
                metrics.reconciler_dispatches.inc();
            }
            tokio::spawn(translate_one(
                Arc::downgrade(self),
                self.translator.clone(),
                candidate,
                language,
                slot,
            ));
        }
        count
    }

    fn finish(&self, message_id: &str, language: &str, translated: Result<TranslationVariant>) {
        let key = (message_id.to_string(), language.to_string());
        let stopped = {
            let mut state = self.lock_state();
            state.in_flight.remove(&key);
            if translated.is_err() {
                state.failed.insert(key);
            }
            state.stopped
        };
        if stopped {
            return;
        }
        let Some(channel) = self.channel.upgrade() else {
            return;
        };

        match translated {
            Ok(variant) => {
                if !channel.apply_translation(message_id, &variant) {
                    debug!(message_id = %message_id, language = %language, "Translation already up to date");
                    channel.set_flag(message_id, variant_keys::IS_TRANSLATING, false);
                }
            }
            Err(err) => {
                warn!(
                    message_id = %message_id,
                    language = %language,
                    error = %err,
                    "Message translation failed"
                );
                channel.set_flag(message_id, variant_keys::IS_TRANSLATING, false);
            }
        }
    }
}

async fn translate_one(
    inner: Weak<ReconcilerInner>,
    translator: MessageTranslatorRef,
    candidate: TranslationCandidate,
    language: String,
    slot: Instant,
) {
    tokio::time::sleep_until(slot).await;

    // 等待期间已停止或释放则不再发起请求
    let Some(alive) = inner.upgrade() else {
        return;
    };
    if alive.lock_state().stopped {
        return;
    }
    let clock = alive.clock.clone();
    drop(alive);

    // 空译文按失败处理，避免同一消息被反复派发
    let translated = translator
        .translate(&candidate.text, &language)
        .await
        .and_then(|translated| {
            if translated.text.trim().is_empty() {
                return Err(SeaBridgeError::provider(
                    translated.model,
                    "translation returned empty text",
                ));
            }
            Ok(TranslationVariant {
                language: language.clone(),
                content: translated.text,
                model: translated.model,
                translated_at: clock.now(),
            })
        });

    if let Some(inner) = inner.upgrade() {
        inner.finish(&candidate.message_id, &language, translated);
    }
}
