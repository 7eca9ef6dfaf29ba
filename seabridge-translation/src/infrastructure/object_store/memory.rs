//! 内存对象存储（本地开发与测试）

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::RwLock;

use seabridge_core::{Result, SeaBridgeError};

use crate::domain::repository::ObjectStorage;

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

#[derive(Clone, Default)]
pub struct InMemoryObjectStorage {
    objects: Arc<RwLock<HashMap<(String, String), StoredObject>>>,
    signatures: Arc<AtomicU64>,
}

impl InMemoryObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .await
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    pub async fn remove(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .write()
            .await
            .remove(&(bucket.to_string(), key.to_string()))
            .is_some()
    }

    /// 已签发的链接数量
    pub fn signature_count(&self) -> u64 {
        self.signatures.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ObjectStorage for InMemoryObjectStorage {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        self.objects.write().await.insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                body,
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes> {
        self.object(bucket, key)
            .await
            .map(|object| object.body)
            .ok_or_else(|| SeaBridgeError::storage(format!("object {}/{} not found", bucket, key)))
    }

    async fn head_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .await
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    async fn signed_url(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String> {
        let signature = self.signatures.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!(
            "memory://{}/{}?expires_in={}&signature={}",
            bucket,
            key,
            ttl.as_secs(),
            signature
        ))
    }
}
