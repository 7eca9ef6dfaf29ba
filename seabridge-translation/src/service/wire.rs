//! Wire 风格的依赖注入模块
//!
//! 按配置构建对象存储、作业存储与各级联组件。供应商实现由调用方注入。

use std::sync::Arc;
use std::time::Duration;

use seabridge_core::config::ConfigManager;
use seabridge_core::utils::{ClockRef, system_clock};
use seabridge_core::{Result, SeaBridgeConfig, SeaBridgeError, TranslationMetrics};

use crate::application::TranslationApplicationService;
use crate::domain::repository::{
    BatchTranslationProviderRef, MessageMetadataReaderRef, ObjectStorageRef, TextGeneratorRef,
    TranslationJobStoreRef,
};
use crate::domain::service::{
    BatchJobManager, BatchJobSettings, DocumentTranslationCascade, RealtimeTranslator,
    RoutingPolicy, TextOperationCascade,
};
use crate::infrastructure::object_store::{InMemoryObjectStorage, S3ObjectStorage};
use crate::infrastructure::persistence::{InMemoryJobStore, PostgresJobStore};

/// 外部供应商
pub struct TranslationProviders {
    /// 主文本模型
    pub primary: TextGeneratorRef,
    /// 备用文本模型
    pub fallback: TextGeneratorRef,
    pub batch: BatchTranslationProviderRef,
    /// 已持久化消息的元数据（降级时恢复发送者）
    pub messages: MessageMetadataReaderRef,
}

/// 已构建的存储组件
pub struct TranslationStores {
    pub objects: ObjectStorageRef,
    pub jobs: TranslationJobStoreRef,
}

/// 构建翻译应用服务
pub async fn initialize(
    config: &SeaBridgeConfig,
    providers: TranslationProviders,
    metrics: Option<Arc<TranslationMetrics>>,
) -> Result<Arc<TranslationApplicationService>> {
    config.validate_references()?;

    // 1. 存储
    let stores = build_stores(config).await?;

    // 2. 领域服务
    let service = assemble(config, providers, stores, system_clock(), metrics);
    Ok(Arc::new(service))
}

/// 按配置构建对象存储与作业存储，未配置时使用内存实现
pub async fn build_stores(config: &SeaBridgeConfig) -> Result<TranslationStores> {
    let translation = config.translation_service();

    let objects: ObjectStorageRef = match translation.object_store.as_deref() {
        Some(profile) => {
            let store_config = ConfigManager::select_object_store_config(config, profile)
                .ok_or_else(|| {
                    SeaBridgeError::validation(format!(
                        "object storage profile '{}' not found",
                        profile
                    ))
                })?;
            match store_config.profile_type.as_str() {
                "memory" => Arc::new(InMemoryObjectStorage::new()),
                _ => Arc::new(S3ObjectStorage::from_config(&store_config).await?),
            }
        }
        None => {
            tracing::warn!("No object storage configured for translation, using in-memory store");
            Arc::new(InMemoryObjectStorage::new())
        }
    };

    let jobs: TranslationJobStoreRef = match translation.job_store.as_deref() {
        Some(profile) => {
            let pg = config.postgres_profile(profile).ok_or_else(|| {
                SeaBridgeError::validation(format!("postgres profile '{}' not found", profile))
            })?;
            Arc::new(PostgresJobStore::new(pg).await?)
        }
        None => {
            tracing::warn!("No job store configured for translation, using in-memory store");
            Arc::new(InMemoryJobStore::new())
        }
    };

    Ok(TranslationStores { objects, jobs })
}

/// 组装应用服务（不做任何 IO）
pub fn assemble(
    config: &SeaBridgeConfig,
    providers: TranslationProviders,
    stores: TranslationStores,
    clock: ClockRef,
    metrics: Option<Arc<TranslationMetrics>>,
) -> TranslationApplicationService {
    let translation = config.translation_service();
    let policy = RoutingPolicy::from(&translation);

    let batch = Arc::new(BatchJobManager::new(
        stores.objects,
        providers.batch,
        stores.jobs,
        BatchJobSettings::from(&translation),
        clock,
        metrics.clone(),
    ));
    let realtime = Arc::new(RealtimeTranslator::new(providers.primary.clone(), policy));
    let text_operations = Arc::new(
        TextOperationCascade::new(providers.primary, providers.fallback)
            .with_metrics(metrics.clone()),
    );
    let documents = Arc::new(DocumentTranslationCascade::new(
        policy,
        realtime,
        batch.clone(),
        providers.messages,
        metrics.clone(),
    ));

    TranslationApplicationService::new(
        policy,
        text_operations,
        documents,
        batch,
        Duration::from_secs(translation.poll_interval_seconds),
        Duration::from_secs(translation.poll_ceiling_seconds),
        metrics,
    )
}
