// 集成测试公共组件：内存存储 + 脚本化供应商 + 手动时钟
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use seabridge_core::TranslationServiceConfig;
use seabridge_core::utils::ManualClock;
use seabridge_translation::domain::service::{BatchJobManager, BatchJobSettings};
use seabridge_translation::infrastructure::object_store::InMemoryObjectStorage;
use seabridge_translation::infrastructure::persistence::InMemoryJobStore;
use seabridge_translation::infrastructure::provider::ScriptedBatchProvider;
use seabridge_translation::{MessageMetadataReader, TranslationJobStore};

pub const INPUT_BUCKET: &str = "seabridge-input";
pub const OUTPUT_BUCKET: &str = "seabridge-output";
pub const ACCOUNT_ID: &str = "123456789012";

pub fn service_config() -> TranslationServiceConfig {
    TranslationServiceConfig {
        input_bucket: INPUT_BUCKET.to_string(),
        output_bucket: OUTPUT_BUCKET.to_string(),
        account_id: ACCOUNT_ID.to_string(),
        ..Default::default()
    }
}

pub struct Harness {
    pub manager: Arc<BatchJobManager>,
    pub storage: Arc<InMemoryObjectStorage>,
    pub provider: Arc<ScriptedBatchProvider>,
    pub store: Arc<InMemoryJobStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(service_config())
    }

    pub fn with_config(config: TranslationServiceConfig) -> Self {
        let storage = Arc::new(InMemoryObjectStorage::new());
        let provider = Arc::new(ScriptedBatchProvider::new());
        let store = Arc::new(InMemoryJobStore::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let manager = Arc::new(BatchJobManager::new(
            storage.clone(),
            provider.clone(),
            store.clone(),
            BatchJobSettings::from(&config),
            clock.clone(),
            None,
        ));
        Self {
            manager,
            storage,
            provider,
            store,
            clock,
        }
    }

    pub async fn stored_job(&self, job_id: &str) -> seabridge_translation::TranslationJob {
        self.store.get(job_id).await.unwrap().unwrap()
    }
}

/// 固定的消息元数据
#[derive(Default)]
pub struct StaticMessageReader {
    senders: HashMap<String, String>,
}

impl StaticMessageReader {
    pub fn with_sender(mut self, message_id: &str, sender_id: &str) -> Self {
        self.senders
            .insert(message_id.to_string(), sender_id.to_string());
        self
    }
}

#[async_trait::async_trait]
impl MessageMetadataReader for StaticMessageReader {
    async fn sender_of(&self, message_id: &str) -> seabridge_core::Result<Option<String>> {
        Ok(self.senders.get(message_id).cloned())
    }
}
