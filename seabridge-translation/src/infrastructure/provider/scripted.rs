//! 脚本化供应商
//!
//! 无需网络与密钥的确定性供应商，用于本地开发和测试：
//! - `ScriptedTextGenerator`：按队列依次返回预设结果，队列为空时使用兜底应答
//! - `ScriptedBatchProvider`：记录提交的作业，状态由调用方逐步推进

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use uuid::Uuid;

use seabridge_core::{Result, SeaBridgeError};

use crate::domain::model::{
    BatchJobSubmission, GeneratedOutput, ProviderJobDescription, ProviderJobStatus,
};
use crate::domain::repository::{BatchTranslationProvider, TextGenerator};

type Responder = Box<dyn Fn(&str) -> Result<GeneratedOutput> + Send + Sync>;

enum Scripted {
    Output(GeneratedOutput),
    Error(String),
}

pub struct ScriptedTextGenerator {
    name: String,
    queue: Mutex<VecDeque<Scripted>>,
    responder: Option<Responder>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedTextGenerator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// 队列为空时使用的兜底应答（入参为完整 prompt）
    pub fn with_responder(
        mut self,
        responder: impl Fn(&str) -> Result<GeneratedOutput> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    pub fn push_text(&self, text: impl Into<String>) {
        self.push(Scripted::Output(GeneratedOutput::Text(text.into())));
    }

    pub fn push_structured(&self, value: serde_json::Value) {
        self.push(Scripted::Output(GeneratedOutput::Structured(value)));
    }

    pub fn push_error(&self, message: impl Into<String>) {
        self.push(Scripted::Error(message.into()));
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|prompts| prompts.clone())
            .unwrap_or_default()
    }

    fn push(&self, item: Scripted) {
        if let Ok(mut queue) = self.queue.lock() {
            queue.push_back(item);
        }
    }
}

#[async_trait::async_trait]
impl TextGenerator for ScriptedTextGenerator {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn generate(
        &self,
        prompt: &str,
        _output_schema: Option<&serde_json::Value>,
    ) -> Result<GeneratedOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.queue.lock().ok().and_then(|mut queue| queue.pop_front());
        match next {
            Some(Scripted::Output(output)) => Ok(output),
            Some(Scripted::Error(message)) => Err(SeaBridgeError::provider(&self.name, message)),
            None => match &self.responder {
                Some(responder) => responder(prompt),
                None => Err(SeaBridgeError::provider(
                    &self.name,
                    "no scripted response available",
                )),
            },
        }
    }
}

/// 脚本化批处理供应商
#[derive(Default)]
pub struct ScriptedBatchProvider {
    jobs: Mutex<HashMap<String, ProviderJobDescription>>,
    submissions: Mutex<Vec<BatchJobSubmission>>,
    fail_next_start: Mutex<Option<String>>,
}

impl ScriptedBatchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_status(&self, job_id: &str, status: ProviderJobStatus, message: Option<&str>) {
        if let Ok(mut jobs) = self.jobs.lock() {
            if let Some(job) = jobs.get_mut(job_id) {
                job.status = status;
                job.message = message.map(str::to_string);
            }
        }
    }

    /// 下一次 start_job 返回指定错误
    pub fn fail_next_start(&self, message: impl Into<String>) {
        if let Ok(mut slot) = self.fail_next_start.lock() {
            *slot = Some(message.into());
        }
    }

    pub fn submissions(&self) -> Vec<BatchJobSubmission> {
        self.submissions
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl BatchTranslationProvider for ScriptedBatchProvider {
    fn provider_name(&self) -> &str {
        "scripted-batch"
    }

    async fn start_job(&self, submission: &BatchJobSubmission) -> Result<String> {
        if let Some(message) = self.fail_next_start.lock().ok().and_then(|mut s| s.take()) {
            return Err(SeaBridgeError::provider(self.provider_name(), message));
        }

        let job_id = Uuid::new_v4().simple().to_string();
        if let Ok(mut jobs) = self.jobs.lock() {
            jobs.insert(
                job_id.clone(),
                ProviderJobDescription {
                    status: ProviderJobStatus::Submitted,
                    message: None,
                    submitted_at: Some(Utc::now()),
                },
            );
        }
        if let Ok(mut submissions) = self.submissions.lock() {
            submissions.push(submission.clone());
        }
        Ok(job_id)
    }

    async fn describe_job(&self, job_id: &str) -> Result<ProviderJobDescription> {
        self.jobs
            .lock()
            .ok()
            .and_then(|jobs| jobs.get(job_id).cloned())
            .ok_or_else(|| {
                SeaBridgeError::provider(
                    self.provider_name(),
                    format!("ResourceNotFoundException: job {} not found", job_id),
                )
            })
    }
}
