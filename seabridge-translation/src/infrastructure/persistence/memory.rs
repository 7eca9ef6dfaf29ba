use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use seabridge_core::Result;

use crate::domain::model::{JobStatus, TranslationJob};
use crate::domain::repository::TranslationJobStore;

/// 内存作业存储
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    jobs: Arc<RwLock<HashMap<String, TranslationJob>>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

fn newest_first(jobs: &mut [TranslationJob]) {
    jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[async_trait::async_trait]
impl TranslationJobStore for InMemoryJobStore {
    async fn insert(&self, job: &TranslationJob) -> Result<()> {
        self.jobs
            .write()
            .await
            .insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn update(&self, job: &TranslationJob) -> Result<()> {
        self.jobs
            .write()
            .await
            .insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, job_id: &str) -> Result<Option<TranslationJob>> {
        Ok(self.jobs.read().await.get(job_id).cloned())
    }

    async fn find_latest(
        &self,
        message_id: &str,
        target_language: &str,
    ) -> Result<Option<TranslationJob>> {
        let guard = self.jobs.read().await;
        Ok(guard
            .values()
            .filter(|job| job.message_id == message_id && job.target_language == target_language)
            .max_by_key(|job| job.created_at)
            .cloned())
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<TranslationJob>> {
        let mut jobs: Vec<TranslationJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.status == status)
            .cloned()
            .collect();
        newest_first(&mut jobs);
        Ok(jobs)
    }

    async fn list_by_message(&self, message_id: &str) -> Result<Vec<TranslationJob>> {
        let mut jobs: Vec<TranslationJob> = self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.message_id == message_id)
            .cloned()
            .collect();
        newest_first(&mut jobs);
        Ok(jobs)
    }
}
