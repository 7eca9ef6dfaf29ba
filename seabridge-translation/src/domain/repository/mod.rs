use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use seabridge_core::Result;

use crate::domain::model::{
    BatchJobSubmission, GeneratedOutput, JobStatus, ProviderJobDescription, TranslationJob,
};

/// 大模型文本生成
#[async_trait::async_trait]
pub trait TextGenerator: Send + Sync {
    /// 供应商名称（用于结果标记与日志）
    fn provider_name(&self) -> &str;

    /// 生成文本；给出 `output_schema` 时期望返回结构化 JSON
    async fn generate(
        &self,
        prompt: &str,
        output_schema: Option<&serde_json::Value>,
    ) -> Result<GeneratedOutput>;
}

#[async_trait::async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()>;
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes>;
    async fn head_exists(&self, bucket: &str, key: &str) -> Result<bool>;
    async fn signed_url(&self, bucket: &str, key: &str, ttl: Duration) -> Result<String>;
}

/// 异步批量文档翻译供应商
#[async_trait::async_trait]
pub trait BatchTranslationProvider: Send + Sync {
    fn provider_name(&self) -> &str;
    /// 提交作业，返回供应商作业ID
    async fn start_job(&self, submission: &BatchJobSubmission) -> Result<String>;
    async fn describe_job(&self, job_id: &str) -> Result<ProviderJobDescription>;
}

#[async_trait::async_trait]
pub trait TranslationJobStore: Send + Sync {
    async fn insert(&self, job: &TranslationJob) -> Result<()>;
    /// 最后写入者胜出
    async fn update(&self, job: &TranslationJob) -> Result<()>;
    async fn get(&self, job_id: &str) -> Result<Option<TranslationJob>>;
    /// 同一消息、同一目标语言最近创建的作业
    async fn find_latest(
        &self,
        message_id: &str,
        target_language: &str,
    ) -> Result<Option<TranslationJob>>;
    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<TranslationJob>>;
    async fn list_by_message(&self, message_id: &str) -> Result<Vec<TranslationJob>>;
}

/// 读取已持久化消息的元数据
#[async_trait::async_trait]
pub trait MessageMetadataReader: Send + Sync {
    async fn sender_of(&self, message_id: &str) -> Result<Option<String>>;
}

pub type TextGeneratorRef = Arc<dyn TextGenerator>;
pub type ObjectStorageRef = Arc<dyn ObjectStorage>;
pub type BatchTranslationProviderRef = Arc<dyn BatchTranslationProvider>;
pub type TranslationJobStoreRef = Arc<dyn TranslationJobStore>;
pub type MessageMetadataReaderRef = Arc<dyn MessageMetadataReader>;
