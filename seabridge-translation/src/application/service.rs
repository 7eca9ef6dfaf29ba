//! 翻译应用服务
//!
//! 对外暴露路由决策、文本操作、附件翻译与批处理作业管理。

use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;

use seabridge_core::{Result, SeaBridgeError, TranslationMetrics};

use crate::application::commands::{
    StartTranslationJobCommand, TranslateDocumentCommand, TranslateTextCommand,
};
use crate::application::poller::{JobPoller, JobWatch};
use crate::domain::model::{
    ContentCharacteristics, JobStatus, ProviderTagged, RealtimeTranslation, StartJobResponse,
    TranslationJob, TranslationRoute,
};
use crate::domain::service::{
    BatchJobManager, DocumentTranslationCascade, DocumentTranslationOutcome, RoutingPolicy,
    TextOperationCascade,
};

pub struct TranslationApplicationService {
    policy: RoutingPolicy,
    text_operations: Arc<TextOperationCascade>,
    documents: Arc<DocumentTranslationCascade>,
    batch: Arc<BatchJobManager>,
    poller: JobPoller,
    metrics: Option<Arc<TranslationMetrics>>,
}

impl TranslationApplicationService {
    pub fn new(
        policy: RoutingPolicy,
        text_operations: Arc<TextOperationCascade>,
        documents: Arc<DocumentTranslationCascade>,
        batch: Arc<BatchJobManager>,
        poll_interval: Duration,
        poll_ceiling: Duration,
        metrics: Option<Arc<TranslationMetrics>>,
    ) -> Self {
        let poller = JobPoller::new(batch.clone(), poll_interval, poll_ceiling);
        Self {
            policy,
            text_operations,
            documents,
            batch,
            poller,
            metrics,
        }
    }

    /// 路由决策
    pub fn decide_route(
        &self,
        characteristics: &ContentCharacteristics,
    ) -> Result<TranslationRoute> {
        characteristics.validate().map_err(SeaBridgeError::Routing)?;
        let route = self.policy.decide(characteristics);
        if let Some(metrics) = &self.metrics {
            metrics
                .routes_decided
                .with_label_values(&[route.method.as_str()])
                .inc();
        }
        tracing::debug!(method = %route.method, reason = %route.reason, "Route decided");
        Ok(route)
    }

    pub fn text_operations(&self) -> Arc<TextOperationCascade> {
        self.text_operations.clone()
    }

    pub async fn translate_text(
        &self,
        cmd: TranslateTextCommand,
    ) -> Result<ProviderTagged<RealtimeTranslation>> {
        self.text_operations
            .translate(&cmd.text, &cmd.target_language, cmd.source_language.as_deref())
            .await
    }

    pub async fn simplify(&self, text: &str) -> Result<ProviderTagged<String>> {
        self.text_operations.simplify(text).await
    }

    pub async fn summarize(&self, text: &str) -> Result<ProviderTagged<String>> {
        self.text_operations.summarize(text).await
    }

    pub async fn chunk(&self, text: &str) -> Result<ProviderTagged<Vec<String>>> {
        self.text_operations.chunk(text).await
    }

    #[instrument(skip(self, cmd), fields(message_id = %cmd.message_id, target_language = %cmd.target_language))]
    pub async fn translate_document(
        &self,
        cmd: TranslateDocumentCommand,
    ) -> Result<DocumentTranslationOutcome> {
        let outcome = self.documents.translate(cmd.into()).await?;
        if let Some(metrics) = &self.metrics {
            let method = match &outcome {
                DocumentTranslationOutcome::Realtime { route, .. }
                | DocumentTranslationOutcome::Batch { route, .. } => route.method,
            };
            metrics
                .routes_decided
                .with_label_values(&[method.as_str()])
                .inc();
        }
        Ok(outcome)
    }

    #[instrument(skip(self, cmd), fields(message_id = %cmd.message_id, target_language = %cmd.target_language))]
    pub async fn start_translation_job(
        &self,
        cmd: StartTranslationJobCommand,
    ) -> Result<StartJobResponse> {
        self.batch.start_job(cmd.into()).await
    }

    #[instrument(skip(self))]
    pub async fn poll_job(&self, job_id: &str) -> Result<TranslationJob> {
        self.batch.poll_status(job_id).await
    }

    #[instrument(skip(self))]
    pub async fn download_url(&self, job_id: &str) -> Result<String> {
        self.batch.download_url(job_id).await
    }

    /// 周期轮询作业直到终态或超过轮询上限
    pub fn watch_job(&self, job_id: &str) -> JobWatch {
        self.poller.watch(job_id)
    }

    pub async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<TranslationJob>> {
        self.batch.list_jobs_by_status(status).await
    }

    pub async fn list_jobs_for_message(&self, message_id: &str) -> Result<Vec<TranslationJob>> {
        self.batch.list_jobs_for_message(message_id).await
    }
}
