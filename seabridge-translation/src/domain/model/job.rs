//! 批量翻译作业领域模型
//!
//! 作业状态机：
//! - SUBMITTED: 已提交给供应商
//! - IN_PROGRESS: 供应商处理中
//! - COMPLETED: 已完成（终态，附带签名下载链接）
//! - FAILED: 失败（终态，附带供应商错误信息）
//! - STOPPED: 已停止（终态，任意状态均可进入）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Submitted,
    InProgress,
    Completed,
    Failed,
    Stopped,
}

impl JobStatus {
    /// 转换为数据库存储的字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Submitted => "SUBMITTED",
            JobStatus::InProgress => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Stopped => "STOPPED",
        }
    }

    /// 从数据库字符串解析
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "SUBMITTED" => Ok(JobStatus::Submitted),
            "IN_PROGRESS" => Ok(JobStatus::InProgress),
            "COMPLETED" => Ok(JobStatus::Completed),
            "FAILED" => Ok(JobStatus::Failed),
            "STOPPED" => Ok(JobStatus::Stopped),
            _ => Err(format!("Invalid translation job status: {}", s)),
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Stopped
        )
    }

    /// 是否仍在进行中
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// 根据供应商状态计算下一状态
    ///
    /// 终态不再变化；供应商状态回退（如 IN_PROGRESS 后又报 SUBMITTED）被忽略。
    pub fn advance(self, provider: ProviderJobStatus) -> JobStatus {
        if self.is_terminal() {
            return self;
        }

        match (self, provider) {
            (_, ProviderJobStatus::Stopped) => JobStatus::Stopped,
            (_, ProviderJobStatus::Completed | ProviderJobStatus::CompletedWithError) => {
                JobStatus::Completed
            }
            (_, ProviderJobStatus::Failed) => JobStatus::Failed,
            (JobStatus::Submitted, ProviderJobStatus::InProgress) => JobStatus::InProgress,
            (current, _) => current,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 供应商报告的作业状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderJobStatus {
    Submitted,
    InProgress,
    Completed,
    CompletedWithError,
    Failed,
    StopRequested,
    Stopped,
}

impl ProviderJobStatus {
    pub fn from_str(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUBMITTED" => Ok(ProviderJobStatus::Submitted),
            "IN_PROGRESS" => Ok(ProviderJobStatus::InProgress),
            "COMPLETED" => Ok(ProviderJobStatus::Completed),
            "COMPLETED_WITH_ERROR" => Ok(ProviderJobStatus::CompletedWithError),
            "FAILED" => Ok(ProviderJobStatus::Failed),
            "STOP_REQUESTED" => Ok(ProviderJobStatus::StopRequested),
            "STOPPED" => Ok(ProviderJobStatus::Stopped),
            other => Err(format!("Invalid provider job status: {}", other)),
        }
    }
}

/// 供应商作业描述
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderJobDescription {
    pub status: ProviderJobStatus,
    pub message: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// 提交给批处理供应商的作业参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJobSubmission {
    pub job_name: String,
    /// 输入目录（`s3://bucket/folder/`）
    pub input_uri: String,
    /// 输出目录（`s3://bucket/folder/output/`）
    pub output_uri: String,
    /// 源语言，None 表示自动检测
    pub source_language: Option<String>,
    pub target_language: String,
    pub content_type: String,
}

/// 批量翻译作业（持久化行）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationJob {
    /// 供应商作业ID
    pub job_id: String,
    /// 附件所属消息ID
    pub message_id: String,
    /// 会话ID
    pub conversation_id: String,
    /// 发起翻译的消息发送者
    pub requested_by: Option<String>,
    pub source_language: Option<String>,
    pub target_language: String,
    pub original_filename: String,
    pub content_type: String,
    pub byte_size: u64,
    /// 作业目录（输入输出共用的唯一目录）
    pub job_folder: String,
    /// 输入对象 key
    pub input_key: String,
    /// 输出对象 key（完成后解析）
    pub output_key: Option<String>,
    pub status: JobStatus,
    pub progress_percent: u8,
    /// 签名下载链接（仅 COMPLETED）
    pub download_url: Option<String>,
    pub download_url_expires_at: Option<DateTime<Utc>>,
    /// 供应商错误信息（仅 FAILED）
    pub error_message: Option<String>,
    /// 预计耗时描述
    pub estimated_time: String,
    pub estimated_completion_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TranslationJob {
    /// 当前签名链接是否在 `now` 时刻仍未过期
    pub fn download_url_fresh_at(&self, now: DateTime<Utc>) -> bool {
        match (&self.download_url, self.download_url_expires_at) {
            (Some(_), Some(expires_at)) => expires_at > now,
            _ => false,
        }
    }
}

/// 启动作业的返回结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartJobResponse {
    pub job_id: String,
    pub status: JobStatus,
    pub estimated_time: String,
    /// 已完成作业复用时携带的下载链接
    pub download_url: Option<String>,
    /// 是否复用了已有作业
    pub deduplicated: bool,
}

impl StartJobResponse {
    pub fn from_job(job: &TranslationJob, deduplicated: bool) -> Self {
        Self {
            job_id: job.job_id.clone(),
            status: job.status,
            estimated_time: job.estimated_time.clone(),
            download_url: job.download_url.clone(),
            deduplicated,
        }
    }
}
