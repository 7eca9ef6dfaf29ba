//! SeaBridge 错误类型定义
//!
//! - 统一的翻译/同步引擎错误分类（路由、供应商、存储、作业、校验）
//! - 为级联控制器提供错误特征识别（如 "text too large"）

use thiserror::Error;

/// 供应商返回“文本过大”时可能出现的错误特征
const TEXT_TOO_LARGE_SIGNATURES: &[&str] = &[
    "textsizelimitexceededexception",
    "text size limit",
    "too large",
];

/// SeaBridge 错误类型
#[derive(Debug, Error)]
pub enum SeaBridgeError {
    /// 路由特征不合法（正常输入不应出现，视为编程错误）
    #[error("Routing error: {0}")]
    Routing(String),

    /// AI / 翻译供应商失败
    #[error("Provider error ({provider}): {message}")]
    Provider { provider: String, message: String },

    /// 对象存储失败（始终向上暴露）
    #[error("Storage error: {0}")]
    Storage(String),

    /// 作业不存在
    #[error("Translation job not found: {0}")]
    JobNotFound(String),

    /// 载荷结构校验失败
    #[error("Validation error: {0}")]
    Validation(String),

    /// 级联链路全部失败
    #[error("{operation} unavailable: {message}")]
    Unavailable { operation: String, message: String },

    /// 广播通道未连接
    #[error("Not connected: {0}")]
    NotConnected(String),

    /// 其他错误
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// SeaBridge 结果类型
pub type Result<T> = std::result::Result<T, SeaBridgeError>;

impl SeaBridgeError {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        SeaBridgeError::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        SeaBridgeError::Storage(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        SeaBridgeError::Validation(message.into())
    }

    pub fn unavailable(operation: impl Into<String>, message: impl Into<String>) -> Self {
        SeaBridgeError::Unavailable {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// 供应商错误是否命中“文本过大”特征（触发实时 -> 批处理降级）
    pub fn is_text_too_large(&self) -> bool {
        match self {
            SeaBridgeError::Provider { message, .. } => message_signals_too_large(message),
            _ => false,
        }
    }

    /// 是否可以直接展示给终端用户
    pub fn is_user_displayable(&self) -> bool {
        !matches!(self, SeaBridgeError::Routing(_) | SeaBridgeError::Other(_))
    }

    /// 面向用户的错误文案
    pub fn user_message(&self) -> String {
        match self {
            SeaBridgeError::Provider { message, .. } => message.clone(),
            SeaBridgeError::Storage(_) => "File storage is unavailable, please retry".to_string(),
            SeaBridgeError::JobNotFound(_) => "Translation job no longer exists".to_string(),
            SeaBridgeError::Validation(msg) => msg.clone(),
            SeaBridgeError::Unavailable { operation, .. } => format!("{} unavailable", operation),
            SeaBridgeError::NotConnected(_) => "Not connected".to_string(),
            SeaBridgeError::Routing(_) | SeaBridgeError::Other(_) => {
                "Something went wrong".to_string()
            }
        }
    }
}

/// 判断供应商错误消息是否为“文本过大”
pub fn message_signals_too_large(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    TEXT_TOO_LARGE_SIGNATURES
        .iter()
        .any(|signature| lower.contains(signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_too_large_signature() {
        let err = SeaBridgeError::provider(
            "aws-translate",
            "TextSizeLimitExceededException: Input text size exceeds limit",
        );
        assert!(err.is_text_too_large());

        let err = SeaBridgeError::provider("edge", "payload too large for model");
        assert!(err.is_text_too_large());

        let err = SeaBridgeError::provider("edge", "rate limited");
        assert!(!err.is_text_too_large());

        // 非供应商错误不参与特征匹配
        let err = SeaBridgeError::storage("too large");
        assert!(!err.is_text_too_large());
    }

    #[test]
    fn test_user_message() {
        let err = SeaBridgeError::unavailable("summarize", "both providers failed");
        assert_eq!(err.user_message(), "summarize unavailable");
        assert!(err.is_user_displayable());

        let err = SeaBridgeError::Routing("negative size".to_string());
        assert!(!err.is_user_displayable());
    }
}
