use std::sync::Arc;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{FromRow, PgPool};

use seabridge_core::config::PostgresInstanceConfig;
use seabridge_core::{Result, SeaBridgeError};

use crate::domain::model::{JobStatus, TranslationJob};
use crate::domain::repository::TranslationJobStore;

const DEFAULT_MAX_CONNECTIONS: u32 = 10;

const SELECT_COLUMNS: &str = r#"
    job_id,
    message_id,
    conversation_id,
    requested_by,
    source_language,
    target_language,
    original_filename,
    content_type,
    byte_size,
    job_folder,
    input_key,
    output_key,
    status,
    progress_percent,
    download_url,
    download_url_expires_at,
    error_message,
    estimated_time,
    estimated_completion_at,
    created_at,
    updated_at,
    completed_at
"#;

#[derive(Debug, FromRow)]
struct TranslationJobRow {
    job_id: String,
    message_id: String,
    conversation_id: String,
    requested_by: Option<String>,
    source_language: Option<String>,
    target_language: String,
    original_filename: String,
    content_type: String,
    byte_size: i64,
    job_folder: String,
    input_key: String,
    output_key: Option<String>,
    status: String,
    progress_percent: i16,
    download_url: Option<String>,
    download_url_expires_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
    estimated_time: String,
    estimated_completion_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<TranslationJobRow> for TranslationJob {
    type Error = anyhow::Error;

    fn try_from(row: TranslationJobRow) -> std::result::Result<Self, Self::Error> {
        let status = JobStatus::from_str(&row.status).map_err(|e| anyhow!(e))?;

        Ok(TranslationJob {
            job_id: row.job_id,
            message_id: row.message_id,
            conversation_id: row.conversation_id,
            requested_by: row.requested_by,
            source_language: row.source_language,
            target_language: row.target_language,
            original_filename: row.original_filename,
            content_type: row.content_type,
            byte_size: row.byte_size.max(0) as u64,
            job_folder: row.job_folder,
            input_key: row.input_key,
            output_key: row.output_key,
            status,
            progress_percent: row.progress_percent.clamp(0, 100) as u8,
            download_url: row.download_url,
            download_url_expires_at: row.download_url_expires_at,
            error_message: row.error_message,
            estimated_time: row.estimated_time,
            estimated_completion_at: row.estimated_completion_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
        })
    }
}

/// PostgreSQL 作业存储（表 `translation_jobs`）
#[derive(Clone)]
pub struct PostgresJobStore {
    pool: Arc<PgPool>,
}

impl PostgresJobStore {
    pub async fn new(config: &PostgresInstanceConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS))
            .min_connections(config.min_connections.unwrap_or(0))
            .connect(&config.url)
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!("failed to connect to postgres: {}", err))
            })?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn upsert(&self, job: &TranslationJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO translation_jobs (
                job_id,
                message_id,
                conversation_id,
                requested_by,
                source_language,
                target_language,
                original_filename,
                content_type,
                byte_size,
                job_folder,
                input_key,
                output_key,
                status,
                progress_percent,
                download_url,
                download_url_expires_at,
                error_message,
                estimated_time,
                estimated_completion_at,
                created_at,
                updated_at,
                completed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                    $12, $13, $14, $15, $16, $17, $18, $19, $20, $21, $22)
            ON CONFLICT (job_id) DO UPDATE SET
                output_key = EXCLUDED.output_key,
                status = EXCLUDED.status,
                progress_percent = EXCLUDED.progress_percent,
                download_url = EXCLUDED.download_url,
                download_url_expires_at = EXCLUDED.download_url_expires_at,
                error_message = EXCLUDED.error_message,
                updated_at = EXCLUDED.updated_at,
                completed_at = EXCLUDED.completed_at
            "#,
        )
        .bind(&job.job_id)
        .bind(&job.message_id)
        .bind(&job.conversation_id)
        .bind(&job.requested_by)
        .bind(&job.source_language)
        .bind(&job.target_language)
        .bind(&job.original_filename)
        .bind(&job.content_type)
        .bind(job.byte_size as i64)
        .bind(&job.job_folder)
        .bind(&job.input_key)
        .bind(&job.output_key)
        .bind(job.status.as_str())
        .bind(job.progress_percent as i16)
        .bind(&job.download_url)
        .bind(job.download_url_expires_at)
        .bind(&job.error_message)
        .bind(&job.estimated_time)
        .bind(job.estimated_completion_at)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .execute(self.pool())
        .await
        .map_err(|err| {
            SeaBridgeError::storage(format!("failed to persist translation job: {}", err))
        })?;

        Ok(())
    }

    async fn fetch_many(&self, filter: &str, value: &str) -> Result<Vec<TranslationJob>> {
        let sql = format!(
            "SELECT {} FROM translation_jobs WHERE {} = $1 ORDER BY created_at DESC",
            SELECT_COLUMNS, filter
        );
        let rows = sqlx::query_as::<_, TranslationJobRow>(&sql)
            .bind(value)
            .fetch_all(self.pool())
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!("failed to list translation jobs: {}", err))
            })?;

        rows.into_iter()
            .map(|row| TranslationJob::try_from(row).map_err(SeaBridgeError::from))
            .collect()
    }
}

#[async_trait::async_trait]
impl TranslationJobStore for PostgresJobStore {
    async fn insert(&self, job: &TranslationJob) -> Result<()> {
        self.upsert(job).await
    }

    async fn update(&self, job: &TranslationJob) -> Result<()> {
        self.upsert(job).await
    }

    async fn get(&self, job_id: &str) -> Result<Option<TranslationJob>> {
        let sql = format!("SELECT {} FROM translation_jobs WHERE job_id = $1", SELECT_COLUMNS);
        let row = sqlx::query_as::<_, TranslationJobRow>(&sql)
            .bind(job_id)
            .fetch_optional(self.pool())
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!("failed to load translation job: {}", err))
            })?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    async fn find_latest(
        &self,
        message_id: &str,
        target_language: &str,
    ) -> Result<Option<TranslationJob>> {
        let sql = format!(
            "SELECT {} FROM translation_jobs \
             WHERE message_id = $1 AND target_language = $2 \
             ORDER BY created_at DESC LIMIT 1",
            SELECT_COLUMNS
        );
        let row = sqlx::query_as::<_, TranslationJobRow>(&sql)
            .bind(message_id)
            .bind(target_language)
            .fetch_optional(self.pool())
            .await
            .map_err(|err| {
                SeaBridgeError::storage(format!("failed to find translation job: {}", err))
            })?;

        match row {
            Some(row) => Ok(Some(row.try_into()?)),
            None => Ok(None),
        }
    }

    async fn list_by_status(&self, status: JobStatus) -> Result<Vec<TranslationJob>> {
        self.fetch_many("status", status.as_str()).await
    }

    async fn list_by_message(&self, message_id: &str) -> Result<Vec<TranslationJob>> {
        self.fetch_many("message_id", message_id).await
    }
}
