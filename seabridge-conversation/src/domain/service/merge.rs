//! 消息合并规则
//!
//! 纯函数，按字段区分优先级：
//! - 核心字段创建后不变，重复到达的同一消息只合并 variants
//! - 编辑只改内容，不触碰 variants
//! - 译文只升级不降级：缺失 -> 存在，或同语言更新的译文
//! - 其他 variant 以新值为准，但空值不会覆盖已有内容

use serde_json::Value;

use crate::domain::model::message::{Message, TranslationVariant, Variants, variant_keys};

/// 同一消息再次到达（广播回声、初始拉取、本地乐观写入）
pub fn merge_message(existing: &Message, incoming: &Message) -> Message {
    let mut merged = existing.clone();
    merged.variants = merge_variants(existing, incoming);
    merged
}

/// 编辑事件：内容以编辑为准，variants 原样保留
pub fn apply_edit(existing: &Message, content: &str) -> Message {
    let mut edited = existing.clone();
    edited.content = content.to_string();
    edited
}

/// 合并译文结果，返回 None 表示保留现有译文
pub fn merge_translation(existing: &Message, translation: &TranslationVariant) -> Option<Message> {
    if translation.content.trim().is_empty() {
        return None;
    }
    if let Some(current) = existing.translation(&translation.language) {
        if current.translated_at >= translation.translated_at {
            return None;
        }
    }

    let mut merged = existing.clone();
    merged.set_translation(translation);
    merged.set_flag(variant_keys::IS_TRANSLATING, false);
    Some(merged)
}

fn merge_variants(existing: &Message, incoming: &Message) -> Variants {
    let mut merged = existing.variants.clone();

    let mut incoming_languages: Vec<&str> = incoming
        .variants
        .keys()
        .filter_map(|key| variant_keys::translation_language_of(key))
        .collect();
    incoming_languages.sort_unstable();
    incoming_languages.dedup();

    for (key, value) in &incoming.variants {
        if variant_keys::translation_language_of(key).is_some() {
            continue;
        }
        if is_empty_value(value) && merged.get(key).is_some_and(|v| !is_empty_value(v)) {
            continue;
        }
        merged.insert(key.clone(), value.clone());
    }

    let mut target = Message {
        variants: merged,
        ..existing.clone()
    };
    for language in incoming_languages {
        if let Some(translation) = incoming.translation(language) {
            if let Some(upgraded) = merge_translation_keeping_flags(&target, &translation) {
                target = upgraded;
            }
        }
    }
    target.variants
}

fn merge_translation_keeping_flags(
    existing: &Message,
    translation: &TranslationVariant,
) -> Option<Message> {
    let translating = existing.flag(variant_keys::IS_TRANSLATING);
    merge_translation(existing, translation).map(|mut merged| {
        merged.set_flag(variant_keys::IS_TRANSLATING, translating);
        merged
    })
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::MessageType;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, second).unwrap()
    }

    fn message() -> Message {
        Message {
            id: "m1".to_string(),
            conversation_id: "c1".to_string(),
            sender_id: "teacher-1".to_string(),
            content: "Field trip Monday".to_string(),
            message_type: MessageType::Text,
            sent_at: at(0),
            variants: Variants::new(),
        }
    }

    fn vi(content: &str, second: u32) -> TranslationVariant {
        TranslationVariant {
            language: "vi".to_string(),
            content: content.to_string(),
            model: "claude".to_string(),
            translated_at: at(second),
        }
    }

    #[test]
    fn test_edit_keeps_all_variants() {
        let mut original = message();
        original.set_translation(&vi("Dã ngoại thứ Hai", 5));
        original
            .variants
            .insert(variant_keys::SUMMARY.to_string(), Value::from("Trip"));
        original
            .variants
            .insert(variant_keys::TRANSCRIPTION.to_string(), Value::from("..."));

        let edited = apply_edit(&original, "Field trip moved to Tuesday");
        assert_eq!(edited.content, "Field trip moved to Tuesday");
        assert_eq!(edited.variants, original.variants);
    }

    #[test]
    fn test_translation_only_upgrades() {
        let mut current = message();
        current.set_translation(&vi("newer", 10));

        assert!(merge_translation(&current, &vi("older", 5)).is_none());
        assert!(merge_translation(&current, &vi("same", 10)).is_none());
        assert!(merge_translation(&current, &vi("", 20)).is_none());

        let upgraded = merge_translation(&current, &vi("newest", 20)).unwrap();
        assert_eq!(upgraded.translation("vi").unwrap().content, "newest");
    }

    #[test]
    fn test_translation_clears_in_flight_flag() {
        let mut current = message();
        current.set_flag(variant_keys::IS_TRANSLATING, true);
        let merged = merge_translation(&current, &vi("Dã ngoại", 1)).unwrap();
        assert!(!merged.flag(variant_keys::IS_TRANSLATING));
    }

    #[test]
    fn test_duplicate_without_variants_does_not_wipe() {
        let mut local = message();
        local.set_translation(&vi("Dã ngoại thứ Hai", 5));
        local
            .variants
            .insert(variant_keys::SUMMARY.to_string(), Value::from("Trip"));

        let echo = message();
        let merged = merge_message(&local, &echo);
        assert_eq!(merged.variants, local.variants);
    }

    #[test]
    fn test_duplicate_brings_new_variants() {
        let mut local = message();
        local.set_translation(&vi("cũ", 5));
        local.set_flag(variant_keys::IS_TRANSLATING, true);

        let mut remote = message();
        remote.set_translation(&vi("mới", 9));
        remote.variants.insert(
            variant_keys::translated_content("th"),
            Value::from("ทัศนศึกษา"),
        );
        remote
            .variants
            .insert(variant_keys::SUMMARY.to_string(), Value::from("Trip"));
        remote
            .variants
            .insert(variant_keys::TRANSCRIPTION.to_string(), Value::Null);

        let merged = merge_message(&local, &remote);
        assert_eq!(merged.translation("vi").unwrap().content, "mới");
        assert_eq!(merged.translation("th").unwrap().content, "ทัศนศึกษา");
        assert_eq!(merged.variants.get(variant_keys::SUMMARY), Some(&Value::from("Trip")));
        // 进行中标记由本地维护
        assert!(merged.flag(variant_keys::IS_TRANSLATING));
    }

    #[test]
    fn test_core_fields_are_immutable() {
        let local = message();
        let mut remote = message();
        remote.content = "tampered".to_string();
        remote.sent_at = at(30);

        let merged = merge_message(&local, &remote);
        assert_eq!(merged.content, local.content);
        assert_eq!(merged.sent_at, local.sent_at);
    }
}
