//! 翻译路由决策
//!
//! 纯函数：相同的内容特征总是得到相同的路由。判断顺序：
//! 1. 结构化文档 -> 批处理（保留排版）
//! 2. 已知字节数超过实时上限 -> 批处理
//! 3. 有文本内容时按实际字节数/行数判断，满足实时条件 -> 实时
//! 4. 已知行数超过上限 -> 批处理
//! 5. 其余按最佳大小估计判断，未知大小 -> 实时

use seabridge_core::TranslationServiceConfig;
use seabridge_core::utils::{byte_len, line_count};

use crate::domain::model::{ContentCharacteristics, TranslationMethod, TranslationRoute};

pub const DEFAULT_REALTIME_MAX_BYTES: u64 = 8_000;
pub const DEFAULT_REALTIME_MAX_LINES: u64 = 100;

pub const REALTIME_ESTIMATE: &str = "5-15 seconds";

const KIB: u64 = 1024;

/// 路由阈值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    pub realtime_max_bytes: u64,
    pub realtime_max_lines: u64,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            realtime_max_bytes: DEFAULT_REALTIME_MAX_BYTES,
            realtime_max_lines: DEFAULT_REALTIME_MAX_LINES,
        }
    }
}

impl From<&TranslationServiceConfig> for RoutingPolicy {
    fn from(config: &TranslationServiceConfig) -> Self {
        Self {
            realtime_max_bytes: config.realtime_max_bytes,
            realtime_max_lines: config.realtime_max_lines,
        }
    }
}

impl RoutingPolicy {
    pub fn decide(&self, characteristics: &ContentCharacteristics) -> TranslationRoute {
        if characteristics.is_structured_document() {
            let size = characteristics.best_size_estimate().unwrap_or(0);
            return batch_route("structured document; preserving formatting", size);
        }

        if let Some(size) = characteristics.byte_size {
            if size > self.realtime_max_bytes {
                return batch_route(
                    &format!(
                        "content size {} bytes exceeds realtime limit of {} bytes",
                        size, self.realtime_max_bytes
                    ),
                    size,
                );
            }
        }

        if let Some(content) = characteristics.content.as_deref() {
            let bytes = byte_len(content);
            let lines = line_count(content);
            if bytes > self.realtime_max_bytes || lines > self.realtime_max_lines {
                return batch_route(
                    &format!(
                        "content ({} bytes, {} lines) exceeds realtime limits",
                        bytes, lines
                    ),
                    bytes,
                );
            }
            if self.is_realtime_suitable(content, false) {
                return realtime_route("short text suitable for realtime translation");
            }
        }

        if let Some(lines) = characteristics.line_count {
            if lines > self.realtime_max_lines {
                let size = characteristics.best_size_estimate().unwrap_or(0);
                return batch_route(
                    &format!(
                        "{} lines exceeds realtime limit of {} lines",
                        lines, self.realtime_max_lines
                    ),
                    size,
                );
            }
        }

        match characteristics.best_size_estimate() {
            None => realtime_route("unknown size; defaulting to realtime"),
            Some(size) if size <= self.realtime_max_bytes => {
                realtime_route("content within realtime limits")
            }
            Some(size) => batch_route(
                &format!(
                    "content size {} bytes exceeds realtime limit of {} bytes",
                    size, self.realtime_max_bytes
                ),
                size,
            ),
        }
    }

    /// 实时翻译适用性：非空、不超过上限、非结构化文档
    pub fn is_realtime_suitable(&self, text: &str, structured: bool) -> bool {
        !structured
            && !text.trim().is_empty()
            && byte_len(text) <= self.realtime_max_bytes
            && line_count(text) <= self.realtime_max_lines
    }
}

/// 使用默认阈值的路由决策
pub fn decide_route(characteristics: &ContentCharacteristics) -> TranslationRoute {
    RoutingPolicy::default().decide(characteristics)
}

/// 按大小估计批处理耗时
pub fn estimate_batch_time(byte_size: u64) -> &'static str {
    if byte_size <= 50 * KIB {
        "2-5 minutes"
    } else if byte_size <= 200 * KIB {
        "5-10 minutes"
    } else if byte_size <= 500 * KIB {
        "10-20 minutes"
    } else {
        "20-30 minutes"
    }
}

/// 批处理耗时估计的上限（用于计算预计完成时间）
pub fn batch_estimate_upper_bound(byte_size: u64) -> chrono::Duration {
    let minutes = if byte_size <= 50 * KIB {
        5
    } else if byte_size <= 200 * KIB {
        10
    } else if byte_size <= 500 * KIB {
        20
    } else {
        30
    };
    chrono::Duration::minutes(minutes)
}

fn realtime_route(reason: &str) -> TranslationRoute {
    TranslationRoute {
        method: TranslationMethod::Realtime,
        reason: reason.to_string(),
        estimated_time: REALTIME_ESTIMATE.to_string(),
        format_preserved: false,
    }
}

fn batch_route(reason: &str, size: u64) -> TranslationRoute {
    TranslationRoute {
        method: TranslationMethod::Batch,
        reason: reason.to_string(),
        estimated_time: estimate_batch_time(size).to_string(),
        format_preserved: true,
    }
}
