use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::domain::service::{DocumentTranslationRequest, StartJobRequest};

/// 翻译短文本
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateTextCommand {
    pub text: String,
    pub target_language: String,
    pub source_language: Option<String>,
}

/// 翻译附件（自动路由，实时失败时降级）
#[derive(Debug, Clone)]
pub struct TranslateDocumentCommand {
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

impl From<TranslateDocumentCommand> for DocumentTranslationRequest {
    fn from(cmd: TranslateDocumentCommand) -> Self {
        DocumentTranslationRequest {
            message_id: cmd.message_id,
            conversation_id: cmd.conversation_id,
            requested_by: cmd.requested_by,
            file_name: cmd.file_name,
            mime_type: cmd.mime_type,
            content: cmd.content,
            target_language: cmd.target_language,
            source_language: cmd.source_language,
            expected_sha256: cmd.expected_sha256,
        }
    }
}

/// 直接启动批处理作业
#[derive(Debug, Clone)]
pub struct StartTranslationJobCommand {
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

impl From<StartTranslationJobCommand> for StartJobRequest {
    fn from(cmd: StartTranslationJobCommand) -> Self {
        StartJobRequest {
            message_id: cmd.message_id,
            conversation_id: cmd.conversation_id,
            requested_by: cmd.requested_by,
            file_name: cmd.file_name,
            mime_type: cmd.mime_type,
            content: cmd.content,
            target_language: cmd.target_language,
            source_language: cmd.source_language,
            expected_sha256: cmd.expected_sha256,
        }
    }
}
