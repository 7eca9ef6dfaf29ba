//! 作业状态轮询
//!
//! 按固定间隔轮询作业，直到进入终态或超过客户端轮询上限。
//! 超过上限只结束本次观察，持久化的作业行保持不变，之后仍可继续轮询。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, oneshot, watch};
use tokio::time::Instant;

use seabridge_core::{ScheduledTask, SeaBridgeError, TickControl};

use crate::domain::model::{JobStatus, TranslationJob};
use crate::domain::service::BatchJobManager;

/// 轮询结束原因
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Completed(TranslationJob),
    Failed(TranslationJob),
    Stopped(TranslationJob),
    /// 超过客户端轮询上限
    TimedOut { job_id: String },
    /// 作业不存在
    Missing { job_id: String },
    /// 观察被取消
    Cancelled { job_id: String },
}

struct PollState {
    manager: Arc<BatchJobManager>,
    job_id: String,
    deadline: Instant,
    updates: watch::Sender<Option<TranslationJob>>,
    outcome: Mutex<Option<oneshot::Sender<PollOutcome>>>,
}

impl PollState {
    async fn tick(&self) -> TickControl {
        match self.manager.poll_status(&self.job_id).await {
            Ok(job) => {
                let status = job.status;
                let _ = self.updates.send(Some(job.clone()));
                match status {
                    JobStatus::Completed => return self.finish(PollOutcome::Completed(job)).await,
                    JobStatus::Failed => return self.finish(PollOutcome::Failed(job)).await,
                    JobStatus::Stopped => return self.finish(PollOutcome::Stopped(job)).await,
                    JobStatus::Submitted | JobStatus::InProgress => {}
                }
            }
            Err(SeaBridgeError::JobNotFound(_)) => {
                return self
                    .finish(PollOutcome::Missing {
                        job_id: self.job_id.clone(),
                    })
                    .await;
            }
            Err(err) => {
                tracing::warn!(job_id = %self.job_id, error = %err, "Job status poll failed");
            }
        }

        if Instant::now() >= self.deadline {
            tracing::info!(job_id = %self.job_id, "Job poll ceiling reached");
            return self
                .finish(PollOutcome::TimedOut {
                    job_id: self.job_id.clone(),
                })
                .await;
        }

        TickControl::Continue
    }

    async fn finish(&self, outcome: PollOutcome) -> TickControl {
        if let Some(sender) = self.outcome.lock().await.take() {
            let _ = sender.send(outcome);
        }
        TickControl::Stop
    }
}

/// 单个作业的观察句柄
pub struct JobWatch {
    job_id: String,
    task: ScheduledTask,
    updates: watch::Receiver<Option<TranslationJob>>,
    outcome: oneshot::Receiver<PollOutcome>,
}

impl JobWatch {
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// 最近一次轮询得到的作业快照
    pub fn latest(&self) -> Option<TranslationJob> {
        self.updates.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TranslationJob>> {
        self.updates.clone()
    }

    pub fn cancel(&self) {
        self.task.cancel();
    }

    /// 等待轮询结束
    pub async fn outcome(self) -> PollOutcome {
        match self.outcome.await {
            Ok(outcome) => outcome,
            Err(_) => PollOutcome::Cancelled {
                job_id: self.job_id,
            },
        }
    }
}

#[derive(Clone)]
pub struct JobPoller {
    manager: Arc<BatchJobManager>,
    interval: Duration,
    ceiling: Duration,
}

impl JobPoller {
    pub fn new(manager: Arc<BatchJobManager>, interval: Duration, ceiling: Duration) -> Self {
        Self {
            manager,
            interval,
            ceiling,
        }
    }

    pub fn watch(&self, job_id: impl Into<String>) -> JobWatch {
        let job_id = job_id.into();
        let (updates_tx, updates_rx) = watch::channel(None);
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let state = Arc::new(PollState {
            manager: self.manager.clone(),
            job_id: job_id.clone(),
            deadline: Instant::now() + self.ceiling,
            updates: updates_tx,
            outcome: Mutex::new(Some(outcome_tx)),
        });

        tracing::debug!(
            job_id = %job_id,
            interval_secs = self.interval.as_secs(),
            ceiling_secs = self.ceiling.as_secs(),
            "Started job poller"
        );

        let task = ScheduledTask::every(self.interval, move || {
            let state = state.clone();
            async move { state.tick().await }
        });

        JobWatch {
            job_id,
            task,
            updates: updates_rx,
            outcome: outcome_rx,
        }
    }
}
