//! 翻译引擎监控指标
//!
//! 指标注册在调用方注入的 `Registry` 上，不使用进程级全局注册表。

use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// 翻译路由与作业监控指标
#[derive(Clone)]
pub struct TranslationMetrics {
    /// 按方式统计的路由决策数
    pub routes_decided: IntCounterVec,
    /// 新建的批处理作业数
    pub jobs_started: IntCounter,
    /// 幂等命中（复用已有作业）的次数
    pub jobs_deduplicated: IntCounter,
    /// 按状态统计的作业状态迁移
    pub job_transitions: IntCounterVec,
    /// 按操作统计的级联降级次数
    pub cascade_fallbacks: IntCounterVec,
    /// 实时翻译降级为批处理的次数
    pub realtime_demotions: IntCounter,
    /// 下载链接重新签名次数
    pub signed_url_refreshes: IntCounter,
    /// 翻译缓存协调器派发的请求数
    pub reconciler_dispatches: IntCounter,
}

impl TranslationMetrics {
    /// 创建并注册翻译指标
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let routes_decided = IntCounterVec::new(
            Opts::new(
                "seabridge_routes_decided_total",
                "Number of translation routes decided by method",
            ),
            &["method"],
        )?;

        let jobs_started = IntCounter::new(
            "seabridge_jobs_started_total",
            "Number of batch translation jobs submitted",
        )?;

        let jobs_deduplicated = IntCounter::new(
            "seabridge_jobs_deduplicated_total",
            "Number of start requests answered by an existing job",
        )?;

        let job_transitions = IntCounterVec::new(
            Opts::new(
                "seabridge_job_transitions_total",
                "Number of batch job status transitions by target status",
            ),
            &["status"],
        )?;

        let cascade_fallbacks = IntCounterVec::new(
            Opts::new(
                "seabridge_cascade_fallbacks_total",
                "Number of fallback provider invocations by operation",
            ),
            &["operation"],
        )?;

        let realtime_demotions = IntCounter::new(
            "seabridge_realtime_demotions_total",
            "Number of realtime translations re-routed to batch",
        )?;

        let signed_url_refreshes = IntCounter::new(
            "seabridge_signed_url_refreshes_total",
            "Number of download URLs re-signed",
        )?;

        let reconciler_dispatches = IntCounter::new(
            "seabridge_reconciler_dispatches_total",
            "Number of message translations dispatched by the reconciler",
        )?;

        registry.register(Box::new(routes_decided.clone()))?;
        registry.register(Box::new(jobs_started.clone()))?;
        registry.register(Box::new(jobs_deduplicated.clone()))?;
        registry.register(Box::new(job_transitions.clone()))?;
        registry.register(Box::new(cascade_fallbacks.clone()))?;
        registry.register(Box::new(realtime_demotions.clone()))?;
        registry.register(Box::new(signed_url_refreshes.clone()))?;
        registry.register(Box::new(reconciler_dispatches.clone()))?;

        Ok(Self {
            routes_decided,
            jobs_started,
            jobs_deduplicated,
            job_transitions,
            cascade_fallbacks,
            realtime_demotions,
            signed_url_refreshes,
            reconciler_dispatches,
        })
    }
}

/// 以 Prometheus 文本格式导出注册表
pub fn gather_text(registry: &Registry) -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
