//! 会话广播事件
//!
//! 传输层只认识 `(kind, payload)`；进入通道前在这里完成解码与结构校验。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use seabridge_core::{Result, SeaBridgeError};

use crate::domain::model::message::Message;

pub const MESSAGE_CREATE: &str = "message-create";
pub const MESSAGE_EDIT: &str = "message-edit";
pub const MESSAGE_DELETE: &str = "message-delete";
pub const UPLOAD_START: &str = "upload-start";
pub const UPLOAD_COMPLETE: &str = "upload-complete";

/// 传输层原始事件
#[derive(Debug, Clone, PartialEq)]
pub struct RawEvent {
    pub kind: String,
    pub payload: Value,
    /// 发布者的订阅 ID（用于回声抑制）
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEdit {
    pub id: String,
    pub content: String,
    pub edited_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDelete {
    pub id: String,
}

/// 上传进度公告
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAnnouncement {
    pub upload_id: String,
    pub file_name: String,
    pub sender_id: String,
    /// 上传完成后生成的消息
    #[serde(default)]
    pub message_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    MessageCreated(Message),
    MessageEdited(MessageEdit),
    MessageDeleted(MessageDelete),
    UploadStarted(UploadAnnouncement),
    UploadCompleted(UploadAnnouncement),
}

impl ChannelEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelEvent::MessageCreated(_) => MESSAGE_CREATE,
            ChannelEvent::MessageEdited(_) => MESSAGE_EDIT,
            ChannelEvent::MessageDeleted(_) => MESSAGE_DELETE,
            ChannelEvent::UploadStarted(_) => UPLOAD_START,
            ChannelEvent::UploadCompleted(_) => UPLOAD_COMPLETE,
        }
    }

    pub fn payload(&self) -> Result<Value> {
        let value = match self {
            ChannelEvent::MessageCreated(message) => serde_json::to_value(message),
            ChannelEvent::MessageEdited(edit) => serde_json::to_value(edit),
            ChannelEvent::MessageDeleted(delete) => serde_json::to_value(delete),
            ChannelEvent::UploadStarted(upload) | ChannelEvent::UploadCompleted(upload) => {
                serde_json::to_value(upload)
            }
        };
        value.map_err(|err| SeaBridgeError::Other(err.into()))
    }

    /// 解码并校验原始事件
    pub fn decode(kind: &str, payload: Value) -> Result<Self> {
        let event = match kind {
            MESSAGE_CREATE => ChannelEvent::MessageCreated(parse(kind, payload)?),
            MESSAGE_EDIT => ChannelEvent::MessageEdited(parse(kind, payload)?),
            MESSAGE_DELETE => ChannelEvent::MessageDeleted(parse(kind, payload)?),
            UPLOAD_START => ChannelEvent::UploadStarted(parse(kind, payload)?),
            UPLOAD_COMPLETE => ChannelEvent::UploadCompleted(parse(kind, payload)?),
            other => {
                return Err(SeaBridgeError::validation(format!(
                    "unknown event kind '{}'",
                    other
                )));
            }
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            ChannelEvent::MessageCreated(message) => message.validate(),
            ChannelEvent::MessageEdited(edit) => {
                require_id(MESSAGE_EDIT, &edit.id)?;
                if edit.content.trim().is_empty() {
                    return Err(SeaBridgeError::validation(format!(
                        "edit of message {} has empty content",
                        edit.id
                    )));
                }
                Ok(())
            }
            ChannelEvent::MessageDeleted(delete) => require_id(MESSAGE_DELETE, &delete.id),
            ChannelEvent::UploadStarted(upload) | ChannelEvent::UploadCompleted(upload) => {
                require_id(self.kind(), &upload.upload_id)?;
                require_id(self.kind(), &upload.sender_id)
            }
        }
    }
}

fn parse<T: serde::de::DeserializeOwned>(kind: &str, payload: Value) -> Result<T> {
    serde_json::from_value(payload)
        .map_err(|err| SeaBridgeError::validation(format!("malformed {} payload: {}", kind, err)))
}

fn require_id(kind: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(SeaBridgeError::validation(format!(
            "{} payload is missing an id",
            kind
        )));
    }
    Ok(())
}
