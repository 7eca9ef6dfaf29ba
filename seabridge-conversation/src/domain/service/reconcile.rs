//! 译文候选选择
//!
//! 纯函数：给定当前消息列表与目标语言，挑出需要翻译的消息，
//! 按发送时间倒序（最近的对话先翻译）。

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::domain::model::Message;

/// 待翻译消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationCandidate {
    pub message_id: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

/// 选择候选
///
/// `skip` 为已在途或已失败的消息ID（当前语言）。
pub fn select_candidates<'a>(
    messages: impl IntoIterator<Item = &'a Message>,
    local_user_id: &str,
    target_language: &str,
    skip: &HashSet<String>,
) -> Vec<TranslationCandidate> {
    let mut candidates: Vec<TranslationCandidate> = messages
        .into_iter()
        .filter(|m| m.sender_id != local_user_id)
        .filter(|m| m.message_type.is_translatable())
        .filter(|m| !m.has_translation(target_language))
        .filter(|m| !skip.contains(&m.id))
        .filter_map(|m| {
            m.translatable_text().map(|text| TranslationCandidate {
                message_id: m.id.clone(),
                text: text.to_string(),
                sent_at: m.sent_at,
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.sent_at
            .cmp(&a.sent_at)
            .then_with(|| b.message_id.cmp(&a.message_id))
    });
    candidates
}
