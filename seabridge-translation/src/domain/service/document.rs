//! 附件翻译级联：实时优先，文本过大时降级为批处理
//!
//! 降级复用已下载的文件内容，发起人从已持久化的消息元数据中恢复。

use std::sync::Arc;

use bytes::Bytes;

use seabridge_core::{Result, SeaBridgeError, TranslationMetrics};

use crate::domain::model::{
    ContentCharacteristics, RealtimeTranslation, StartJobResponse, TranslationMethod,
    TranslationRoute,
};
use crate::domain::repository::MessageMetadataReaderRef;
use crate::domain::service::batch::{BatchJobManager, StartJobRequest};
use crate::domain::service::realtime::RealtimeTranslator;
use crate::domain::service::routing::RoutingPolicy;

/// 附件翻译请求
#[derive(Debug, Clone)]
pub struct DocumentTranslationRequest {
    pub message_id: String,
    pub conversation_id: String,
    pub requested_by: Option<String>,
    pub file_name: String,
    pub mime_type: Option<String>,
    pub content: Bytes,
    pub target_language: String,
    pub source_language: Option<String>,
    pub expected_sha256: Option<String>,
}

/// 附件翻译结果
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentTranslationOutcome {
    /// 实时翻译完成
    Realtime {
        route: TranslationRoute,
        translation: RealtimeTranslation,
    },
    /// 已提交（或复用）批处理作业
    Batch {
        route: TranslationRoute,
        job: StartJobResponse,
        /// 是否由实时降级而来
        demoted: bool,
    },
}

pub struct DocumentTranslationCascade {
    policy: RoutingPolicy,
    realtime: Arc<RealtimeTranslator>,
    batch: Arc<BatchJobManager>,
    messages: MessageMetadataReaderRef,
    metrics: Option<Arc<TranslationMetrics>>,
}

impl DocumentTranslationCascade {
    pub fn new(
        policy: RoutingPolicy,
        realtime: Arc<RealtimeTranslator>,
        batch: Arc<BatchJobManager>,
        messages: MessageMetadataReaderRef,
        metrics: Option<Arc<TranslationMetrics>>,
    ) -> Self {
        Self {
            policy,
            realtime,
            batch,
            messages,
            metrics,
        }
    }

    pub async fn translate(
        &self,
        request: DocumentTranslationRequest,
    ) -> Result<DocumentTranslationOutcome> {
        let characteristics = ContentCharacteristics::from_file(
            &request.file_name,
            request.mime_type.as_deref(),
            &request.content,
        );
        let route = self.policy.decide(&characteristics);

        let text = match (route.method, characteristics.content.as_deref()) {
            (TranslationMethod::Realtime, Some(text)) => text.to_string(),
            _ => {
                let job = self
                    .batch
                    .start_job(batch_request(&request, request.requested_by.clone()))
                    .await?;
                return Ok(DocumentTranslationOutcome::Batch {
                    route,
                    job,
                    demoted: false,
                });
            }
        };

        match self
            .realtime
            .translate(
                &text,
                &request.target_language,
                request.source_language.as_deref(),
            )
            .await
        {
            Ok(translation) => Ok(DocumentTranslationOutcome::Realtime { route, translation }),
            Err(err) if err.is_text_too_large() => {
                tracing::info!(
                    message_id = %request.message_id,
                    provider = self.realtime.provider_name(),
                    error = %err,
                    "Realtime translation rejected as too large, demoting to batch"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.realtime_demotions.inc();
                }

                let sender = self.recover_sender(&request).await?;
                let job = self.batch.start_job(batch_request(&request, sender)).await?;
                let route = TranslationRoute {
                    method: TranslationMethod::Batch,
                    reason: "realtime provider rejected text as too large".to_string(),
                    estimated_time: job.estimated_time.clone(),
                    format_preserved: true,
                };
                Ok(DocumentTranslationOutcome::Batch {
                    route,
                    job,
                    demoted: true,
                })
            }
            Err(err) => Err(err),
        }
    }

    async fn recover_sender(&self, request: &DocumentTranslationRequest) -> Result<Option<String>> {
        match self.messages.sender_of(&request.message_id).await? {
            Some(sender) => Ok(Some(sender)),
            None => {
                tracing::warn!(
                    message_id = %request.message_id,
                    "Message metadata not found, keeping caller supplied sender"
                );
                if request.requested_by.is_none() {
                    return Err(SeaBridgeError::validation(format!(
                        "sender of message {} is unknown",
                        request.message_id
                    )));
                }
                Ok(request.requested_by.clone())
            }
        }
    }
}

fn batch_request(
    request: &DocumentTranslationRequest,
    requested_by: Option<String>,
) -> StartJobRequest {
    StartJobRequest {
        message_id: request.message_id.clone(),
        conversation_id: request.conversation_id.clone(),
        requested_by,
        file_name: request.file_name.clone(),
        mime_type: request.mime_type.clone(),
        content: request.content.clone(),
        target_language: request.target_language.clone(),
        source_language: request.source_language.clone(),
        expected_sha256: request.expected_sha256.clone(),
    }
}
