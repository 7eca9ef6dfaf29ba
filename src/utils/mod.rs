//! 工具函数模块
//!
//! 提供时间戳、语言代码、文件名与存储路径片段等通用工具函数

pub mod clock;
pub mod helpers;
pub mod language;

pub use clock::{Clock, ClockRef, ManualClock, SystemClock, system_clock};
pub use helpers::{byte_len, file_extension, line_count, sanitize_segment};
pub use language::{normalize_language, validate_language_code, validate_source_language};

use chrono::{DateTime, TimeZone, Utc};

/// 获取当前时间戳（毫秒）
pub fn current_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// 毫秒数转换为 DateTime
pub fn millis_to_datetime(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
