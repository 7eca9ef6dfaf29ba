//! 批量翻译作业管理
//!
//! 负责附件暂存、作业提交、状态轮询、签名下载链接的生成与刷新。
//! 同一 (消息, 目标语言) 在作业进行中或已完成时不会重复提交。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use seabridge_core::utils::{
    ClockRef, file_extension, sanitize_segment, validate_language_code, validate_source_language,
};
use seabridge_core::{Result, SeaBridgeError, TranslationMetrics, TranslationServiceConfig};

use crate::domain::model::{BatchJobSubmission, JobStatus, StartJobResponse, TranslationJob};
use crate::domain::repository::{
    BatchTranslationProviderRef, ObjectStorageRef, TranslationJobStoreRef,
};
use crate::domain::service::routing::{batch_estimate_upper_bound, estimate_batch_time};

/// 签名链接在过期前多久视为需要刷新
const URL_REFRESH_MARGIN_SECONDS: i64 = 60;

/// 默认允许的附件扩展名
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "docx", "doc", "txt", "md", "rtf", "html", "htm", "xlsx", "pptx", "odt", "ods", "odp",
];

/// 批处理作业参数
#[derive(Debug, Clone)]
pub struct BatchJobSettings {
    pub input_bucket: String,
    pub output_bucket: String,
    pub input_prefix: String,
    pub output_prefix: String,
    pub account_id: String,
    pub job_kind: String,
    pub signed_url_ttl: Duration,
    pub max_file_bytes: u64,
    pub supported_languages: Vec<String>,
    pub allowed_extensions: Vec<String>,
}

impl From<&TranslationServiceConfig> for BatchJobSettings {
    fn from(config: &TranslationServiceConfig) -> Self {
        Self {
            input_bucket: config.input_bucket.clone(),
            output_bucket: config.output_bucket.clone(),
            input_prefix: config.input_prefix.trim_matches('/').to_string(),
            output_prefix: config.output_prefix.trim_matches('/').to_string(),
            account_id: config.account_id.clone(),
            job_kind: config.job_kind.clone(),
            signed_url_ttl: Duration::from_secs(config.signed_url_ttl_seconds),
            max_file_bytes: config.max_file_bytes,
            supported_languages: config.supported_languages.clone(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// 启动批处理作业的请求
#[derive(Debug, Clone)]
pub struct StartJobRequest {
    pub message_id: String,
    pub conversation_id: String,
    pub requested_by: Option<String>,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub content: Bytes,
    pub target_language: String,
    pub source_language: Option<String>,
    /// 调用方提供的 SHA-256（十六进制），用于完整性校验
    pub expected_sha256: Option<String>,
}

pub struct BatchJobManager {
    storage: ObjectStorageRef,
    provider: BatchTranslationProviderRef,
    store: TranslationJobStoreRef,
    settings: BatchJobSettings,
    clock: ClockRef,
    metrics: Option<Arc<TranslationMetrics>>,
    start_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl BatchJobManager {
    pub fn new(
        storage: ObjectStorageRef,
        provider: BatchTranslationProviderRef,
        store: TranslationJobStoreRef,
        settings: BatchJobSettings,
        clock: ClockRef,
        metrics: Option<Arc<TranslationMetrics>>,
    ) -> Self {
        Self {
            storage,
            provider,
            store,
            settings,
            clock,
            metrics,
            start_locks: DashMap::new(),
        }
    }

    pub fn settings(&self) -> &BatchJobSettings {
        &self.settings
    }

    /// 启动（或复用）批处理作业
    pub async fn start_job(&self, request: StartJobRequest) -> Result<StartJobResponse> {
        let target_language =
            validate_language_code(&request.target_language, &self.settings.supported_languages)?;
        let source_language = validate_source_language(request.source_language.as_deref())?;
        let extension = self.validate_payload(&request)?;

        let lock_key = format!("{}|{}", request.message_id, target_language);
        let lock = self
            .start_locks
            .entry(lock_key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.start_job_locked(&request, &target_language, source_language, &extension)
                .await
        };

        drop(lock);
        self.start_locks
            .remove_if(&lock_key, |_, lock| Arc::strong_count(lock) == 1);

        result
    }

    async fn start_job_locked(
        &self,
        request: &StartJobRequest,
        target_language: &str,
        source_language: Option<String>,
        extension: &str,
    ) -> Result<StartJobResponse> {
        if let Some(mut existing) = self
            .store
            .find_latest(&request.message_id, target_language)
            .await?
        {
            if existing.status.is_active() {
                tracing::info!(
                    job_id = %existing.job_id,
                    message_id = %request.message_id,
                    target_language,
                    "Reusing active translation job"
                );
                self.record_deduplicated();
                return Ok(StartJobResponse::from_job(&existing, true));
            }

            if existing.status == JobStatus::Completed {
                self.ensure_download_url(&mut existing).await?;
                tracing::info!(
                    job_id = %existing.job_id,
                    message_id = %request.message_id,
                    target_language,
                    "Reusing completed translation job"
                );
                self.record_deduplicated();
                return Ok(StartJobResponse::from_job(&existing, true));
            }
        }

        let now = self.clock.now();
        let object_name = object_name_for(&request.file_name, extension);
        let job_folder = format!(
            "{}-{}",
            non_empty_or(sanitize_segment(&request.message_id), "message"),
            Uuid::new_v4().simple()
        );
        let input_folder = join_key(&[&job_folder, &self.settings.input_prefix]);
        let input_key = join_key(&[&input_folder, &object_name]);
        let output_folder = join_key(&[&job_folder, &self.settings.output_prefix]);
        let content_type = request
            .mime_type
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| content_type_for_extension(extension).to_string());

        let mut metadata = HashMap::new();
        metadata.insert("message-id".to_string(), request.message_id.clone());
        metadata.insert("conversation-id".to_string(), request.conversation_id.clone());
        metadata.insert("target-language".to_string(), target_language.to_string());
        if let Some(sender) = &request.requested_by {
            metadata.insert("requested-by".to_string(), sender.clone());
        }

        self.storage
            .put(
                &self.settings.input_bucket,
                &input_key,
                request.content.clone(),
                &content_type,
                &metadata,
            )
            .await?;

        let submission = BatchJobSubmission {
            job_name: format!("seabridge-{}", job_folder),
            input_uri: format!("s3://{}/{}/", self.settings.input_bucket, input_folder),
            output_uri: format!("s3://{}/{}/", self.settings.output_bucket, output_folder),
            source_language: source_language.clone(),
            target_language: target_language.to_string(),
            content_type: content_type.clone(),
        };
        let job_id = self.provider.start_job(&submission).await?;

        let byte_size = request.content.len() as u64;
        let job = TranslationJob {
            job_id: job_id.clone(),
            message_id: request.message_id.clone(),
            conversation_id: request.conversation_id.clone(),
            requested_by: request.requested_by.clone(),
            source_language,
            target_language: target_language.to_string(),
            original_filename: request.file_name.clone(),
            content_type,
            byte_size,
            job_folder,
            input_key,
            output_key: None,
            status: JobStatus::Submitted,
            progress_percent: 0,
            download_url: None,
            download_url_expires_at: None,
            error_message: None,
            estimated_time: estimate_batch_time(byte_size).to_string(),
            estimated_completion_at: now + batch_estimate_upper_bound(byte_size),
            created_at: now,
            updated_at: now,
            completed_at: None,
        };
        self.store.insert(&job).await?;

        if let Some(metrics) = &self.metrics {
            metrics.jobs_started.inc();
            metrics
                .job_transitions
                .with_label_values(&[JobStatus::Submitted.as_str()])
                .inc();
        }
        tracing::info!(
            job_id = %job.job_id,
            message_id = %job.message_id,
            target_language = %job.target_language,
            byte_size,
            "Submitted batch translation job"
        );

        Ok(StartJobResponse::from_job(&job, false))
    }

    /// 轮询作业状态并持久化
    pub async fn poll_status(&self, job_id: &str) -> Result<TranslationJob> {
        let mut job = self.load(job_id).await?;

        if job.status.is_terminal() {
            if job.status == JobStatus::Completed {
                self.ensure_download_url(&mut job).await?;
            }
            return Ok(job);
        }

        let description = self.provider.describe_job(job_id).await?;
        let previous = job.status;
        let next = previous.advance(description.status);
        let now = self.clock.now();

        match next {
            JobStatus::Completed => {
                let output_key = self.output_key(&job);
                self.sign_into(&mut job, &output_key, now).await?;
                job.output_key = Some(output_key);
                job.progress_percent = 100;
                job.completed_at = Some(now);
                job.error_message = description.message.clone();
            }
            JobStatus::Failed => {
                job.error_message = Some(
                    description
                        .message
                        .clone()
                        .unwrap_or_else(|| "translation job failed".to_string()),
                );
                job.completed_at = Some(now);
            }
            JobStatus::Stopped => {
                job.error_message = description.message.clone();
                job.completed_at = Some(now);
            }
            JobStatus::InProgress => {
                job.progress_percent = estimate_progress(&job, now);
            }
            JobStatus::Submitted => {}
        }

        job.status = next;
        job.updated_at = now;
        self.store.update(&job).await?;

        if next != previous {
            if let Some(metrics) = &self.metrics {
                metrics
                    .job_transitions
                    .with_label_values(&[next.as_str()])
                    .inc();
            }
            tracing::info!(
                job_id,
                from = %previous,
                to = %next,
                "Translation job status changed"
            );
        }

        Ok(job)
    }

    /// 获取可用的下载链接（必要时重新签名）
    pub async fn download_url(&self, job_id: &str) -> Result<String> {
        let mut job = self.load(job_id).await?;
        if job.status != JobStatus::Completed {
            return Err(SeaBridgeError::validation(format!(
                "translation job {} is {}, not COMPLETED",
                job_id, job.status
            )));
        }
        self.ensure_download_url(&mut job).await?;
        job.download_url
            .ok_or_else(|| SeaBridgeError::storage("download url missing after signing"))
    }

    pub async fn list_jobs_by_status(&self, status: JobStatus) -> Result<Vec<TranslationJob>> {
        self.store.list_by_status(status).await
    }

    pub async fn list_jobs_for_message(&self, message_id: &str) -> Result<Vec<TranslationJob>> {
        self.store.list_by_message(message_id).await
    }

    async fn load(&self, job_id: &str) -> Result<TranslationJob> {
        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| SeaBridgeError::JobNotFound(job_id.to_string()))
    }

    /// 签名链接有效期内且输出对象存在时直接返回，否则重新签名并持久化。
    /// 返回是否发生了刷新。
    async fn ensure_download_url(&self, job: &mut TranslationJob) -> Result<bool> {
        let now = self.clock.now();
        let output_key = job
            .output_key
            .clone()
            .unwrap_or_else(|| self.output_key(job));

        let fresh =
            job.download_url_fresh_at(now + chrono::Duration::seconds(URL_REFRESH_MARGIN_SECONDS));
        if fresh
            && self
                .storage
                .head_exists(&self.settings.output_bucket, &output_key)
                .await?
        {
            return Ok(false);
        }

        self.sign_into(job, &output_key, now).await?;
        job.output_key = Some(output_key);
        job.updated_at = now;
        self.store.update(job).await?;

        if let Some(metrics) = &self.metrics {
            metrics.signed_url_refreshes.inc();
        }
        tracing::debug!(job_id = %job.job_id, "Refreshed translated document download url");
        Ok(true)
    }

    async fn sign_into(
        &self,
        job: &mut TranslationJob,
        output_key: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let expires_at = chrono::Duration::from_std(self.settings.signed_url_ttl)
            .ok()
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                SeaBridgeError::validation(format!(
                    "signed url ttl {:?} is out of range",
                    self.settings.signed_url_ttl
                ))
            })?;
        let url = self
            .storage
            .signed_url(
                &self.settings.output_bucket,
                output_key,
                self.settings.signed_url_ttl,
            )
            .await?;
        job.download_url = Some(url);
        job.download_url_expires_at = Some(expires_at);
        Ok(())
    }

    /// 输出对象 key：`{job_folder}/{output_prefix}/{account}-{kind}-{job_id}/{lang}/{file}`
    pub fn output_key(&self, job: &TranslationJob) -> String {
        let object_name = job
            .input_key
            .rsplit('/')
            .next()
            .unwrap_or(&job.original_filename)
            .to_string();
        join_key(&[
            &job.job_folder,
            &self.settings.output_prefix,
            &format!(
                "{}-{}-{}",
                self.settings.account_id, self.settings.job_kind, job.job_id
            ),
            &job.target_language,
            &object_name,
        ])
    }

    fn validate_payload(&self, request: &StartJobRequest) -> Result<String> {
        if request.message_id.trim().is_empty() {
            return Err(SeaBridgeError::validation("message id must be non-empty"));
        }
        if request.content.is_empty() {
            return Err(SeaBridgeError::validation("document is empty"));
        }
        let size = request.content.len() as u64;
        if size > self.settings.max_file_bytes {
            return Err(SeaBridgeError::validation(format!(
                "document of {} bytes exceeds the {} byte limit",
                size, self.settings.max_file_bytes
            )));
        }

        let extension = file_extension(&request.file_name).ok_or_else(|| {
            SeaBridgeError::validation(format!(
                "file '{}' has no extension",
                request.file_name
            ))
        })?;
        if !self
            .settings
            .allowed_extensions
            .iter()
            .any(|allowed| allowed == &extension)
        {
            return Err(SeaBridgeError::validation(format!(
                "unsupported file type '.{}'",
                extension
            )));
        }

        if let Some(expected) = &request.expected_sha256 {
            let actual = hex::encode(Sha256::digest(&request.content));
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(SeaBridgeError::validation(
                    "document integrity check failed (sha256 mismatch)",
                ));
            }
        }

        Ok(extension)
    }

    fn record_deduplicated(&self) {
        if let Some(metrics) = &self.metrics {
            metrics.jobs_deduplicated.inc();
        }
    }
}

/// 处理中进度：按已用时间占预计时长的比例估算，限定在 5-95
fn estimate_progress(job: &TranslationJob, now: DateTime<Utc>) -> u8 {
    let total = (job.estimated_completion_at - job.created_at).num_seconds().max(1);
    let elapsed = (now - job.created_at).num_seconds().max(0);
    let percent = elapsed.saturating_mul(100) / total;
    percent.clamp(5, 95) as u8
}

fn object_name_for(file_name: &str, extension: &str) -> String {
    let stem = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name)
        .trim_end_matches(&format!(".{}", extension))
        .to_string();
    let stem = match stem.rfind('.') {
        // 扩展名大小写不同（如 .DOCX）
        Some(idx) if stem[idx + 1..].eq_ignore_ascii_case(extension) => stem[..idx].to_string(),
        _ => stem,
    };
    format!(
        "{}.{}",
        non_empty_or(sanitize_segment(&stem), "document"),
        extension
    )
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

fn join_key(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| segment.trim_matches('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// 扩展名对应的 MIME 类型
pub fn content_type_for_extension(extension: &str) -> &'static str {
    match extension {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odt" => "application/vnd.oasis.opendocument.text",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "rtf" => "application/rtf",
        "html" | "htm" => "text/html",
        "md" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}
