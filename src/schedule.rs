//! 周期任务调度
//!
//! 将“定时器 + 回调”形式的轮询抽象为可取消、可暂停的任务句柄。
//! 测试中配合 `tokio::time::pause()` 推进虚拟时钟，无需真实等待。

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

/// 单次执行后的调度指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickControl {
    /// 继续下一次调度
    Continue,
    /// 结束任务
    Stop,
}

/// 周期任务句柄
///
/// 丢弃句柄不会停止任务，需要显式调用 [`ScheduledTask::cancel`]。
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    paused: watch::Sender<bool>,
}

impl ScheduledTask {
    /// 按固定间隔执行 `tick`，首次执行在一个间隔之后
    pub fn every<F, Fut>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = TickControl> + Send + 'static,
    {
        let (paused_tx, mut paused_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval 的第一次 tick 立即完成
            ticker.tick().await;

            loop {
                ticker.tick().await;

                // 暂停期间等待恢复信号
                while *paused_rx.borrow() {
                    if paused_rx.changed().await.is_err() {
                        return;
                    }
                }

                if tick().await == TickControl::Stop {
                    break;
                }
            }
        });

        Self {
            handle,
            paused: paused_tx,
        }
    }

    /// 暂停任务（当前正在执行的一次不会被打断）
    pub fn pause(&self) {
        let _ = self.paused.send(true);
    }

    /// 恢复任务
    pub fn resume(&self) {
        let _ = self.paused.send(false);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// 任务是否已结束（主动停止或被取消）
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// 取消任务
    pub fn cancel(&self) {
        self.handle.abort();
    }

    /// 等待任务自然结束
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}
