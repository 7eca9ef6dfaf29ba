//! 配置管理器 - 负责处理不同环境下的配置选择和覆盖
//!
//! 该模块提供了配置管理功能，包括：
//! - 根据环境变量选择对象存储配置
//! - 加载环境特定配置
//! - 合并配置值

use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use toml::Value;

use super::{ObjectStoreConfig, SeaBridgeConfig, merge_value};

/// 配置管理器
pub struct ConfigManager;

impl ConfigManager {
    /// 根据环境变量或配置选择对象存储配置
    ///
    /// 优先级：
    /// 1. 环境变量 SEABRIDGE_OBJECT_STORE_PROFILE 指定的配置
    /// 2. 配置文件中指定的配置
    pub fn select_object_store_config(
        config: &SeaBridgeConfig,
        profile_name: &str,
    ) -> Option<ObjectStoreConfig> {
        if let Ok(env_profile) = env::var("SEABRIDGE_OBJECT_STORE_PROFILE") {
            if let Some(store_config) = config.object_store_profile(&env_profile) {
                return Some(store_config.clone());
            }
        }

        config.object_store_profile(profile_name).cloned()
    }

    /// 获取当前环境名称
    ///
    /// 从环境变量 SEABRIDGE_ENV 获取，未设置时默认为 "development"
    pub fn get_environment() -> String {
        env::var("SEABRIDGE_ENV").unwrap_or_else(|_| "development".to_string())
    }

    /// 叠加 config/environments/{environment}.toml 到已加载的配置上
    pub fn apply_environment_overlay(base: &mut Value) -> Result<()> {
        let env = Self::get_environment();
        let env_config_path = format!("config/environments/{}.toml", env);
        Self::apply_overlay_file(base, Path::new(&env_config_path))
    }

    /// 叠加单个覆盖文件（文件不存在时忽略）
    pub fn apply_overlay_file(base: &mut Value, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取环境配置文件: {}", path.display()))?;
        let overlay: Value = toml::from_str(&content)
            .with_context(|| format!("无效的环境配置格式: {}", path.display()))?;

        merge_value(base, overlay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlay_file_overrides_nested_keys() {
        let dir = tempfile::tempdir().unwrap();
        let overlay = dir.path().join("production.toml");
        fs::write(
            &overlay,
            r#"
            [object_storage.default]
            profile_type = "s3"
            region = "ap-southeast-1"
            "#,
        )
        .unwrap();

        let mut base: Value = toml::from_str(
            r#"
            [object_storage.default]
            profile_type = "minio"
            endpoint = "http://localhost:9000"
            "#,
        )
        .unwrap();

        ConfigManager::apply_overlay_file(&mut base, &overlay).unwrap();
        let cfg: SeaBridgeConfig = base.try_into().unwrap();
        let store = cfg.object_store_profile("default").unwrap();
        assert_eq!(store.profile_type, "s3");
        assert_eq!(store.region.as_deref(), Some("ap-southeast-1"));
        assert_eq!(store.endpoint.as_deref(), Some("http://localhost:9000"));
    }

    #[test]
    fn test_missing_overlay_is_ignored() {
        let mut base = Value::Table(toml::map::Map::new());
        assert!(ConfigManager::apply_overlay_file(&mut base, Path::new("/nonexistent/x.toml")).is_ok());
    }
}
