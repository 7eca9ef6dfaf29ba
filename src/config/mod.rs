//! SeaBridge 配置模块
//!
//! 该模块提供了完整的应用程序配置管理功能，包括：
//! - 配置文件加载和解析（单文件或目录分片合并）
//! - 环境特定配置覆盖
//! - 翻译服务、会话服务配置定义
//! - 对象存储、数据库等基础设施配置

use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use toml::Value;
use tracing::warn;

mod manager;
pub use manager::ConfigManager;

/// 默认支持的目标语言（东南亚语言 + 英文 + 中文）
pub const DEFAULT_SUPPORTED_LANGUAGES: &[&str] =
    &["en", "vi", "th", "id", "ms", "tl", "my", "km", "lo", "zh"];

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（RUST_LOG 未设置时生效）
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub with_target: bool,
    #[serde(default)]
    pub with_thread_ids: bool,
    #[serde(default)]
    pub with_file: bool,
    #[serde(default)]
    pub with_line_number: bool,
    /// 是否输出 JSON 格式
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            with_target: true,
            with_thread_ids: false,
            with_file: false,
            with_line_number: false,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// PostgreSQL 数据库实例配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct PostgresInstanceConfig {
    /// 数据库连接 URL
    pub url: String,
    /// 最大连接数
    #[serde(default)]
    pub max_connections: Option<u32>,
    /// 最小连接数
    #[serde(default)]
    pub min_connections: Option<u32>,
}

/// 对象存储配置
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ObjectStoreConfig {
    /// 存储类型（如 minio, s3 等）
    pub profile_type: String,
    /// 存储服务端点
    #[serde(default)]
    pub endpoint: Option<String>,
    /// 访问密钥
    #[serde(default)]
    pub access_key: Option<String>,
    /// 秘密密钥
    #[serde(default)]
    pub secret_key: Option<String>,
    /// 区域
    #[serde(default)]
    pub region: Option<String>,
    /// 是否强制 path-style（MinIO 等兼容存储）
    #[serde(default)]
    pub force_path_style: Option<bool>,
    /// 预签名 URL 最大有效期（秒）
    #[serde(default)]
    pub presign_url_ttl_seconds: Option<u64>,
}

/// 翻译服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationServiceConfig {
    /// 实时翻译字节上限
    #[serde(default = "default_realtime_max_bytes")]
    pub realtime_max_bytes: u64,
    /// 实时翻译行数上限
    #[serde(default = "default_realtime_max_lines")]
    pub realtime_max_lines: u64,
    /// 批处理输入存储桶
    #[serde(default)]
    pub input_bucket: String,
    /// 批处理输出存储桶
    #[serde(default)]
    pub output_bucket: String,
    /// 输入目录前缀
    #[serde(default = "default_input_prefix")]
    pub input_prefix: String,
    /// 输出目录前缀
    #[serde(default = "default_output_prefix")]
    pub output_prefix: String,
    /// 供应商账号 ID（用于推导输出路径）
    #[serde(default)]
    pub account_id: String,
    /// 批处理作业类型（用于推导输出路径）
    #[serde(default = "default_job_kind")]
    pub job_kind: String,
    /// 下载链接有效期（秒）
    #[serde(default = "default_signed_url_ttl")]
    pub signed_url_ttl_seconds: u64,
    /// UI 轮询间隔（秒）
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// 单个作业客户端轮询上限（秒）
    #[serde(default = "default_poll_ceiling")]
    pub poll_ceiling_seconds: u64,
    /// 单个上传文件最大字节数
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,
    /// 支持的目标语言，为空表示不限制
    #[serde(default = "default_supported_languages")]
    pub supported_languages: Vec<String>,
    /// 作业存储（postgres profile 名称，缺省使用内存存储）
    #[serde(default)]
    pub job_store: Option<String>,
    /// 对象存储 profile 名称
    #[serde(default)]
    pub object_store: Option<String>,
}

impl Default for TranslationServiceConfig {
    fn default() -> Self {
        Self {
            realtime_max_bytes: default_realtime_max_bytes(),
            realtime_max_lines: default_realtime_max_lines(),
            input_bucket: String::new(),
            output_bucket: String::new(),
            input_prefix: default_input_prefix(),
            output_prefix: default_output_prefix(),
            account_id: String::new(),
            job_kind: default_job_kind(),
            signed_url_ttl_seconds: default_signed_url_ttl(),
            poll_interval_seconds: default_poll_interval(),
            poll_ceiling_seconds: default_poll_ceiling(),
            max_file_bytes: default_max_file_bytes(),
            supported_languages: default_supported_languages(),
            job_store: None,
            object_store: None,
        }
    }
}

fn default_realtime_max_bytes() -> u64 {
    8_000
}

fn default_realtime_max_lines() -> u64 {
    100
}

fn default_input_prefix() -> String {
    "input".to_string()
}

fn default_output_prefix() -> String {
    "output".to_string()
}

fn default_job_kind() -> String {
    "TranslateText".to_string()
}

fn default_signed_url_ttl() -> u64 {
    3_600
}

fn default_poll_interval() -> u64 {
    10
}

fn default_poll_ceiling() -> u64 {
    30 * 60
}

fn default_max_file_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_supported_languages() -> Vec<String> {
    DEFAULT_SUPPORTED_LANGUAGES
        .iter()
        .map(|lang| lang.to_string())
        .collect()
}

/// 会话服务配置
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationServiceConfig {
    /// 新消息高亮时长（毫秒）
    #[serde(default = "default_new_message_highlight_ms")]
    pub new_message_highlight_ms: u64,
    /// 翻译请求派发间隔（毫秒）
    #[serde(default = "default_translation_stagger_ms")]
    pub translation_stagger_ms: u64,
    /// 断线期间本地待发送队列容量
    #[serde(default = "default_outbox_capacity")]
    pub outbox_capacity: usize,
    /// 消息存储（postgres profile 名称，缺省使用内存存储）
    #[serde(default)]
    pub message_store: Option<String>,
}

impl Default for ConversationServiceConfig {
    fn default() -> Self {
        Self {
            new_message_highlight_ms: default_new_message_highlight_ms(),
            translation_stagger_ms: default_translation_stagger_ms(),
            outbox_capacity: default_outbox_capacity(),
            message_store: None,
        }
    }
}

fn default_new_message_highlight_ms() -> u64 {
    1_500
}

fn default_translation_stagger_ms() -> u64 {
    100
}

fn default_outbox_capacity() -> usize {
    256
}

/// 服务配置集合
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ServicesConfig {
    /// 翻译服务配置
    #[serde(default)]
    pub translation: Option<TranslationServiceConfig>,
    /// 会话服务配置
    #[serde(default)]
    pub conversation: Option<ConversationServiceConfig>,
}

/// SeaBridge 应用配置主结构体
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SeaBridgeConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
    /// PostgreSQL 配置映射
    #[serde(default)]
    pub postgres: HashMap<String, PostgresInstanceConfig>,
    /// 对象存储配置映射
    #[serde(default)]
    pub object_storage: HashMap<String, ObjectStoreConfig>,
    /// 服务配置
    #[serde(default)]
    pub services: ServicesConfig,
}

impl SeaBridgeConfig {
    /// 获取 PostgreSQL 配置
    pub fn postgres_profile(&self, name: &str) -> Option<&PostgresInstanceConfig> {
        self.postgres.get(name)
    }

    /// 获取对象存储配置
    pub fn object_store_profile(&self, name: &str) -> Option<&ObjectStoreConfig> {
        self.object_storage.get(name)
    }

    /// 获取翻译服务配置
    pub fn translation_service(&self) -> TranslationServiceConfig {
        self.services.translation.clone().unwrap_or_default()
    }

    /// 获取会话服务配置
    pub fn conversation_service(&self) -> ConversationServiceConfig {
        self.services.conversation.clone().unwrap_or_default()
    }

    /// 校验 profile 引用是否存在
    pub fn validate_references(&self) -> Result<()> {
        let translation = self.translation_service();
        if let Some(profile) = translation.job_store.as_deref() {
            if !self.postgres.contains_key(profile) {
                return Err(anyhow!("translation job_store references unknown postgres profile '{}'", profile));
            }
        }
        if let Some(profile) = translation.object_store.as_deref() {
            if !self.object_storage.contains_key(profile) {
                return Err(anyhow!("translation object_store references unknown profile '{}'", profile));
            }
        }
        if let Some(profile) = self.conversation_service().message_store.as_deref() {
            if !self.postgres.contains_key(profile) {
                return Err(anyhow!("conversation message_store references unknown postgres profile '{}'", profile));
            }
        }
        Ok(())
    }
}

/// 加载配置
///
/// 未指定路径时依次尝试 `config/` 目录与 `config.toml`，全部失败时退回默认配置。
/// 加载完成后叠加 `config/environments/{SEABRIDGE_ENV}.toml`。
pub fn load_config(path: Option<&str>) -> SeaBridgeConfig {
    let candidates: Vec<PathBuf> = match path {
        Some(p) => vec![PathBuf::from(p)],
        None => vec![PathBuf::from("config"), PathBuf::from("config.toml")],
    };

    let mut merged = load_with_fallback(&candidates);
    if let Err(e) = ConfigManager::apply_environment_overlay(&mut merged) {
        warn!("failed to load environment config: {}", e);
    }

    match merged.try_into::<SeaBridgeConfig>() {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!("invalid configuration, falling back to defaults: {err}");
            SeaBridgeConfig::default()
        }
    }
}

/// 从指定源严格加载配置（失败直接返回错误）
pub fn load_config_strict(path: &Path) -> Result<SeaBridgeConfig> {
    let value = load_config_from_source(path)?;
    let cfg: SeaBridgeConfig = value
        .try_into()
        .with_context(|| format!("invalid configuration in {}", path.display()))?;
    cfg.validate_references()?;
    Ok(cfg)
}

/// 使用备选方案加载配置
fn load_with_fallback(candidates: &[PathBuf]) -> Value {
    for path in candidates {
        match load_config_from_source(path) {
            Ok(value) => return value,
            Err(err) => {
                warn!("failed to load config from {}: {err}", path.display());
            }
        }
    }

    warn!("no configuration source succeeded, falling back to defaults");
    Value::Table(toml::map::Map::new())
}

/// 从源加载配置
fn load_config_from_source(path: &Path) -> Result<Value> {
    if !path.exists() {
        return Err(anyhow!(
            "configuration path {} does not exist",
            path.display()
        ));
    }

    let metadata = path
        .metadata()
        .with_context(|| format!("unable to read metadata for {}", path.display()))?;

    if metadata.is_dir() {
        load_config_from_directory(path)
    } else {
        load_toml_value(path)
    }
}

/// 从目录加载配置
fn load_config_from_directory(path: &Path) -> Result<Value> {
    let base_file = path.join("base.toml");
    if !base_file.exists() {
        return Err(anyhow!(
            "missing base configuration: {}",
            base_file.display()
        ));
    }

    let mut merged = load_toml_value(&base_file)?;

    if !merged.is_table() {
        return Err(anyhow!(
            "base configuration must be a table: {}",
            base_file.display()
        ));
    }

    merge_directory(&mut merged, &path.join("shared"))?;
    merge_directory(&mut merged, &path.join("services"))?;
    merge_directory(&mut merged, &path.join("overrides"))?;

    Ok(merged)
}

/// 合并目录中的配置
fn merge_directory(root: &mut Value, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }

    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("unable to read config directory {}", dir.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(OsStr::to_str)
                .map(|ext| ext.eq_ignore_ascii_case("toml"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    entries.sort_by_key(|entry| entry.path());

    for entry in entries {
        let value = load_toml_value(&entry.path())?;
        merge_value(root, value);
    }

    Ok(())
}

/// 加载 TOML 值
fn load_toml_value(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read config fragment {}", path.display()))?;
    let value: Value = toml::from_str(&content)
        .with_context(|| format!("invalid TOML content in fragment {}", path.display()))?;
    Ok(value)
}

/// 合并值
pub(crate) fn merge_value(base: &mut Value, overlay: Value) {
    match overlay {
        Value::Table(overlay_table) => {
            if let Value::Table(base_table) = base {
                for (key, overlay_value) in overlay_table.into_iter() {
                    match base_table.get_mut(&key) {
                        Some(base_value) => merge_value(base_value, overlay_value),
                        None => {
                            base_table.insert(key, overlay_value);
                        }
                    }
                }
            } else {
                *base = Value::Table(overlay_table);
            }
        }
        other => {
            *base = other;
        }
    }
}
