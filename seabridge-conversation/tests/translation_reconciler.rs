mod common;

use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;

use common::{Harness, PARENT, ScriptedTranslator, TEACHER, settle, wait_for};
use seabridge_conversation::application::{ChannelSettings, ConversationService, TranslationReconciler};
use seabridge_conversation::domain::model::{MessageDraft, variant_keys};
use seabridge_conversation::domain::repository::MessageStore;
use seabridge_core::TranslationMetrics;
use seabridge_core::utils::Clock;

const STAGGER: Duration = Duration::from_millis(100);

fn reconciler(
    harness: &Harness,
    channel: &seabridge_conversation::ConversationChannel,
    translator: &Arc<ScriptedTranslator>,
    language: &str,
) -> TranslationReconciler {
    TranslationReconciler::new(
        channel,
        translator.clone(),
        language,
        STAGGER,
        harness.clock.clone(),
        None,
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn test_newest_messages_first_with_stagger() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;
    harness.seed("m2", PARENT, 2, "Con bị ốm hôm nay").await;
    harness.seed("m3", PARENT, 3, "Cảm ơn cô").await;
    harness.seed("own", TEACHER, 4, "Get well soon").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::new());
    let reconciler = reconciler(&harness, &teacher, &translator, "en");
    reconciler.start();

    let snapshot = wait_for(&teacher, |s| {
        s.messages
            .iter()
            .filter(|m| m.sender_id == PARENT)
            .all(|m| m.has_translation("en"))
    })
    .await;

    let calls = translator.calls();
    let texts: Vec<&str> = calls.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["Cảm ơn cô", "Con bị ốm hôm nay", "Xin chào cô"]);
    for pair in calls.windows(2) {
        assert!(pair[1].at - pair[0].at >= STAGGER);
    }

    let own = snapshot.messages.iter().find(|m| m.id == "own").unwrap();
    assert!(!own.has_translation("en"));
    let m3 = snapshot.messages.iter().find(|m| m.id == "m3").unwrap();
    let translation = m3.translation("en").unwrap();
    assert_eq!(translation.content, "[en] Cảm ơn cô");
    assert_eq!(translation.model, "scripted");
    assert_eq!(translation.translated_at, harness.clock.now());
    assert!(!m3.flag(variant_keys::IS_TRANSLATING));

    // 译文写回存储
    settle().await;
    let stored = harness.store.get("m3").await.unwrap().unwrap();
    assert!(stored.has_translation("en"));
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_requests_are_not_repeated() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::with_delay(Duration::from_secs(2)));
    let reconciler = reconciler(&harness, &teacher, &translator, "en");

    assert_eq!(reconciler.reconcile(), 1);
    assert_eq!(reconciler.reconcile(), 0);
    assert_eq!(reconciler.in_flight(), 1);
    assert!(teacher.message("m1").unwrap().flag(variant_keys::IS_TRANSLATING));

    wait_for(&teacher, |s| s.messages[0].has_translation("en")).await;
    settle().await;
    assert_eq!(reconciler.in_flight(), 0);
    assert_eq!(reconciler.reconcile(), 0);
    assert_eq!(translator.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_new_peer_message_is_translated() {
    let harness = Harness::new();
    let teacher = harness.open(TEACHER).await;
    let parent = harness.open(PARENT).await;

    let translator = Arc::new(ScriptedTranslator::new());
    let reconciler = reconciler(&harness, &teacher, &translator, "en");
    reconciler.start();

    let message = parent.send(MessageDraft::text("Hẹn gặp lại")).await.unwrap();
    wait_for(&teacher, |s| {
        s.messages
            .iter()
            .any(|m| m.id == message.id && m.has_translation("en"))
    })
    .await;

    // 自己的消息不翻译
    teacher.send(MessageDraft::text("See you")).await.unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(translator.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_language_switch_retains_cached_translations() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::new());
    let reconciler = reconciler(&harness, &teacher, &translator, "en");
    reconciler.start();
    wait_for(&teacher, |s| s.messages[0].has_translation("en")).await;

    assert_eq!(reconciler.set_target_language("TH").unwrap(), 1);
    assert_eq!(reconciler.target_language(), "th");
    let snapshot = wait_for(&teacher, |s| s.messages[0].has_translation("th")).await;
    assert_eq!(
        snapshot.messages[0].translation("en").unwrap().content,
        "[en] Xin chào cô"
    );

    // 切回已缓存的语言不会再次请求
    assert_eq!(reconciler.set_target_language("en").unwrap(), 0);
    settle().await;
    assert_eq!(translator.calls().len(), 2);

    assert!(reconciler.set_target_language("not a language").is_err());
}

#[tokio::test(start_paused = true)]
async fn test_failed_translation_is_not_retried_until_language_changes() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::new());
    translator.fail_on("Xin chào cô");
    let reconciler = reconciler(&harness, &teacher, &translator, "en");

    assert_eq!(reconciler.reconcile(), 1);
    tokio::time::sleep(Duration::from_millis(500)).await;
    settle().await;
    assert!(!teacher.message("m1").unwrap().flag(variant_keys::IS_TRANSLATING));
    assert_eq!(reconciler.reconcile(), 0);

    assert_eq!(reconciler.set_target_language("vi").unwrap(), 1);
    assert_eq!(reconciler.set_target_language("en").unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_empty_translation_is_not_retried() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::new());
    translator.blank_on("Xin chào cô");
    let reconciler = reconciler(&harness, &teacher, &translator, "en");
    reconciler.start();

    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(translator.calls().len(), 1);
    assert_eq!(reconciler.in_flight(), 0);
    let message = teacher.message("m1").unwrap();
    assert!(!message.has_translation("en"));
    assert!(!message.flag(variant_keys::IS_TRANSLATING));
    assert_eq!(reconciler.reconcile(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_readers_in_different_languages_keep_each_others_translations() {
    const PRINCIPAL: &str = "principal-1";

    let harness = Harness::new();
    let parent = harness.open(PARENT).await;
    let teacher = harness.open(TEACHER).await;
    let principal = harness.open(PRINCIPAL).await;

    let translator = Arc::new(ScriptedTranslator::with_delay(Duration::from_secs(1)));
    let teacher_reconciler = reconciler(&harness, &teacher, &translator, "en");
    let principal_reconciler = reconciler(&harness, &principal, &translator, "th");
    teacher_reconciler.start();
    principal_reconciler.start();

    let message = parent.send(MessageDraft::text("Con bị ốm hôm nay")).await.unwrap();
    // 翻译进行中原文被编辑，读者手中的旧内容不能写回
    parent.edit(&message.id, "Con bị sốt hôm nay").await.unwrap();

    wait_for(&teacher, |s| s.messages.iter().any(|m| m.has_translation("en"))).await;
    wait_for(&principal, |s| s.messages.iter().any(|m| m.has_translation("th"))).await;
    settle().await;

    let stored = harness.store.get(&message.id).await.unwrap().unwrap();
    assert_eq!(stored.content, "Con bị sốt hôm nay");
    assert!(stored.has_translation("en"));
    assert!(stored.has_translation("th"));
    assert!(!stored.flag(variant_keys::IS_TRANSLATING));

    // 重新打开的会话看到两种译文
    let reopened = harness.open(PRINCIPAL).await;
    let loaded = reopened.message(&message.id).unwrap();
    assert!(loaded.translation("th").unwrap().content.starts_with("[th] "));
    assert!(loaded.has_translation("en"));
}

#[tokio::test(start_paused = true)]
async fn test_results_after_teardown_are_ignored() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::with_delay(Duration::from_secs(2)));
    let reconciler = reconciler(&harness, &teacher, &translator, "en");
    reconciler.start();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(translator.calls().len(), 1);

    teacher.close();
    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    assert!(!teacher.message("m1").unwrap().has_translation("en"));
    assert!(!harness.store.get("m1").await.unwrap().unwrap().has_translation("en"));
    assert_eq!(reconciler.reconcile(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_channel_ends_reconciliation() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;

    let teacher = harness.open(TEACHER).await;
    let translator = Arc::new(ScriptedTranslator::with_delay(Duration::from_secs(2)));
    let reconciler = reconciler(&harness, &teacher, &translator, "en");
    reconciler.start();
    tokio::time::sleep(Duration::from_millis(10)).await;

    drop(teacher);
    tokio::time::sleep(Duration::from_secs(5)).await;
    settle().await;

    assert_eq!(reconciler.reconcile(), 0);
    assert!(!harness.store.get("m1").await.unwrap().unwrap().has_translation("en"));
}

#[tokio::test(start_paused = true)]
async fn test_service_session_counts_dispatches() {
    let harness = Harness::new();
    harness.seed("m1", PARENT, 1, "Xin chào cô").await;
    harness.seed("m2", PARENT, 2, "Cảm ơn cô").await;

    let registry = Registry::new();
    let metrics = Arc::new(TranslationMetrics::new(&registry).unwrap());
    let translator = Arc::new(ScriptedTranslator::new());
    let service = ConversationService::new(
        harness.context(),
        ChannelSettings::default(),
        Some(translator.clone()),
        STAGGER,
        Some(metrics.clone()),
    );

    let session = service
        .subscribe(common::CONVERSATION, TEACHER, Some("en"))
        .await
        .unwrap();
    wait_for(session.channel(), |s| {
        s.messages.iter().all(|m| m.has_translation("en"))
    })
    .await;
    assert_eq!(metrics.reconciler_dispatches.get(), 2);

    session.close();
    assert!(session.channel().is_closed());

    let plain = service
        .subscribe(common::CONVERSATION, PARENT, None)
        .await
        .unwrap();
    assert!(plain.reconciler().is_none());
    assert_eq!(plain.messages().len(), 2);
}
