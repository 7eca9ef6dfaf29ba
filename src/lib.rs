//! SeaBridge Core 公共库
//!
//! 提供统一的配置加载、错误分类、日志初始化、监控指标和周期任务调度

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod schedule;
pub mod utils;

pub use config::{
    ConfigManager, ConversationServiceConfig, LoggingConfig, ObjectStoreConfig,
    PostgresInstanceConfig, SeaBridgeConfig, TranslationServiceConfig, load_config,
    load_config_strict,
};
pub use error::{Result, SeaBridgeError};
pub use logging::init_tracing_from_config;
pub use metrics::TranslationMetrics;
pub use schedule::{ScheduledTask, TickControl};
