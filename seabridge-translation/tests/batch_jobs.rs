// 批处理作业集成测试：暂存、幂等、状态推进、签名链接刷新
mod common;

use anyhow::Result;
use bytes::Bytes;
use chrono::Duration;
use sha2::{Digest, Sha256};

use common::{ACCOUNT_ID, Harness, INPUT_BUCKET, OUTPUT_BUCKET, service_config};
use seabridge_core::SeaBridgeError;
use seabridge_core::utils::Clock;
use seabridge_translation::domain::model::ProviderJobStatus;
use seabridge_translation::domain::service::StartJobRequest;
use seabridge_translation::{JobStatus, ObjectStorage};

fn docx_request(message_id: &str, target: &str) -> StartJobRequest {
    StartJobRequest {
        message_id: message_id.to_string(),
        conversation_id: "conv-1".to_string(),
        requested_by: Some("teacher-7".to_string()),
        file_name: "Term Report.docx".to_string(),
        mime_type: None,
        content: Bytes::from(vec![7u8; 500 * 1024]),
        target_language: target.to_string(),
        source_language: Some("en".to_string()),
        expected_sha256: None,
    }
}

#[tokio::test]
async fn test_start_job_stages_input_and_submits() -> Result<()> {
    let _ = tracing_subscriber::fmt::try_init();
    let harness = Harness::new();

    let response = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    assert_eq!(response.status, JobStatus::Submitted);
    assert_eq!(response.estimated_time, "10-20 minutes");
    assert!(!response.deduplicated);

    let keys = harness.storage.keys(INPUT_BUCKET).await;
    assert_eq!(keys.len(), 1);
    assert!(keys[0].starts_with("msg-1-"));
    assert!(keys[0].ends_with("/input/term-report.docx"));

    let object = harness.storage.object(INPUT_BUCKET, &keys[0]).await.unwrap();
    assert_eq!(object.body.len(), 500 * 1024);
    assert_eq!(
        object.content_type,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    );
    assert_eq!(object.metadata.get("requested-by").map(String::as_str), Some("teacher-7"));

    let submissions = harness.provider.submissions();
    assert_eq!(submissions.len(), 1);
    assert!(submissions[0].input_uri.starts_with("s3://seabridge-input/msg-1-"));
    assert!(submissions[0].output_uri.ends_with("/output/"));
    assert_eq!(submissions[0].target_language, "vi");

    let job = harness.stored_job(&response.job_id).await;
    assert_eq!(job.status, JobStatus::Submitted);
    assert_eq!(job.progress_percent, 0);
    assert_eq!(job.requested_by.as_deref(), Some("teacher-7"));
    Ok(())
}

#[tokio::test]
async fn test_start_job_reuses_active_job() -> Result<()> {
    let harness = Harness::new();

    let first = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    let second = harness.manager.start_job(docx_request("msg-1", "vi")).await?;

    assert_eq!(first.job_id, second.job_id);
    assert!(second.deduplicated);
    assert_eq!(harness.provider.submissions().len(), 1);

    // 不同目标语言是独立作业
    let thai = harness.manager.start_job(docx_request("msg-1", "th")).await?;
    assert_ne!(thai.job_id, first.job_id);
    assert_eq!(harness.provider.submissions().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_create_single_job() -> Result<()> {
    let harness = Harness::new();
    let manager = harness.manager.clone();

    let (a, b) = tokio::join!(
        manager.start_job(docx_request("msg-9", "vi")),
        manager.start_job(docx_request("msg-9", "vi")),
    );
    assert_eq!(a?.job_id, b?.job_id);
    assert_eq!(harness.provider.submissions().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_completed_job_reused_with_download_url() -> Result<()> {
    let harness = Harness::new();
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    harness
        .provider
        .set_status(&started.job_id, ProviderJobStatus::Completed, None);
    harness.manager.poll_status(&started.job_id).await?;

    let again = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    assert_eq!(again.job_id, started.job_id);
    assert_eq!(again.status, JobStatus::Completed);
    assert!(again.deduplicated);
    assert!(again.download_url.is_some());
    assert_eq!(harness.provider.submissions().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_job_allows_resubmission() -> Result<()> {
    let harness = Harness::new();
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    harness.provider.set_status(
        &started.job_id,
        ProviderJobStatus::Failed,
        Some("Unsupported document encoding"),
    );

    let failed = harness.manager.poll_status(&started.job_id).await?;
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("Unsupported document encoding"));
    assert!(failed.download_url.is_none());

    let retry = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    assert_ne!(retry.job_id, started.job_id);
    assert!(!retry.deduplicated);
    Ok(())
}

#[tokio::test]
async fn test_poll_resolves_output_location_and_signs() -> Result<()> {
    let harness = Harness::new();
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;

    harness
        .provider
        .set_status(&started.job_id, ProviderJobStatus::InProgress, None);
    harness.clock.advance(Duration::minutes(10));
    let running = harness.manager.poll_status(&started.job_id).await?;
    assert_eq!(running.status, JobStatus::InProgress);
    assert!((5..=95).contains(&running.progress_percent));

    harness
        .provider
        .set_status(&started.job_id, ProviderJobStatus::Completed, None);
    let done = harness.manager.poll_status(&started.job_id).await?;
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.progress_percent, 100);
    assert!(done.completed_at.is_some());

    let expected_segment = format!(
        "/output/{}-TranslateText-{}/vi/term-report.docx",
        ACCOUNT_ID, started.job_id
    );
    let output_key = done.output_key.clone().unwrap();
    assert!(output_key.starts_with(&done.job_folder));
    assert!(output_key.ends_with(&expected_segment));

    let url = done.download_url.clone().unwrap();
    assert!(url.contains(OUTPUT_BUCKET));
    assert!(url.contains("expires_in=3600"));
    assert_eq!(
        done.download_url_expires_at.unwrap(),
        harness.clock.now() + Duration::seconds(3600)
    );
    Ok(())
}

#[tokio::test]
async fn test_download_url_refreshed_after_ttl() -> Result<()> {
    let harness = Harness::new();
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    harness
        .provider
        .set_status(&started.job_id, ProviderJobStatus::Completed, None);
    let done = harness.manager.poll_status(&started.job_id).await?;
    let first_url = done.download_url.clone().unwrap();

    // 供应商写入的译文
    harness
        .storage
        .put(
            OUTPUT_BUCKET,
            done.output_key.as_deref().unwrap(),
            Bytes::from_static(b"translated"),
            "application/octet-stream",
            &Default::default(),
        )
        .await?;

    // 有效期内且对象存在：不刷新
    let same = harness.manager.poll_status(&started.job_id).await?;
    assert_eq!(same.download_url.as_deref(), Some(first_url.as_str()));

    harness.clock.advance(Duration::seconds(3601));
    let refreshed = harness.manager.poll_status(&started.job_id).await?;
    let second_url = refreshed.download_url.clone().unwrap();
    assert_ne!(first_url, second_url);
    assert!(refreshed.download_url_fresh_at(harness.clock.now()));

    // 刷新结果已持久化
    let stored = harness.stored_job(&started.job_id).await;
    assert_eq!(stored.download_url.as_deref(), Some(second_url.as_str()));

    assert_eq!(harness.manager.download_url(&started.job_id).await?, second_url);
    Ok(())
}

#[tokio::test]
async fn test_download_url_resigned_when_object_missing() -> Result<()> {
    let harness = Harness::new();
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    harness
        .provider
        .set_status(&started.job_id, ProviderJobStatus::Completed, None);
    let done = harness.manager.poll_status(&started.job_id).await?;

    let url = harness.manager.download_url(&started.job_id).await?;
    assert_ne!(Some(url), done.download_url);
    Ok(())
}

#[tokio::test]
async fn test_download_url_requires_completed_job() -> Result<()> {
    let harness = Harness::new();
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;

    let err = harness.manager.download_url(&started.job_id).await.unwrap_err();
    assert!(matches!(err, SeaBridgeError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_out_of_range_url_ttl_is_rejected() -> Result<()> {
    let mut config = service_config();
    config.signed_url_ttl_seconds = u64::MAX;
    let harness = Harness::with_config(config);
    let started = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    harness
        .provider
        .set_status(&started.job_id, ProviderJobStatus::Completed, None);

    let err = harness.manager.poll_status(&started.job_id).await.unwrap_err();
    assert!(matches!(err, SeaBridgeError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_unknown_job_is_not_found() {
    let harness = Harness::new();
    let err = harness.manager.poll_status("missing").await.unwrap_err();
    assert!(matches!(err, SeaBridgeError::JobNotFound(id) if id == "missing"));
}

#[tokio::test]
async fn test_payload_validation() {
    let harness = Harness::new();

    let mut empty = docx_request("msg-1", "vi");
    empty.content = Bytes::new();
    assert!(matches!(
        harness.manager.start_job(empty).await,
        Err(SeaBridgeError::Validation(_))
    ));

    let mut too_large = docx_request("msg-1", "vi");
    too_large.content = Bytes::from(vec![0u8; 10 * 1024 * 1024 + 1]);
    assert!(matches!(
        harness.manager.start_job(too_large).await,
        Err(SeaBridgeError::Validation(msg)) if msg.contains("exceeds")
    ));

    let mut executable = docx_request("msg-1", "vi");
    executable.file_name = "setup.exe".to_string();
    assert!(matches!(
        harness.manager.start_job(executable).await,
        Err(SeaBridgeError::Validation(msg)) if msg.contains(".exe")
    ));

    assert!(matches!(
        harness.manager.start_job(docx_request("msg-1", "xx")).await,
        Err(SeaBridgeError::Validation(msg)) if msg.contains("unsupported")
    ));

    assert!(harness.storage.keys(INPUT_BUCKET).await.is_empty());
    assert!(harness.provider.submissions().is_empty());
}

#[tokio::test]
async fn test_integrity_check() -> Result<()> {
    let harness = Harness::new();

    let mut mismatched = docx_request("msg-1", "vi");
    mismatched.expected_sha256 = Some("00".repeat(32));
    assert!(matches!(
        harness.manager.start_job(mismatched).await,
        Err(SeaBridgeError::Validation(msg)) if msg.contains("integrity")
    ));

    let mut matching = docx_request("msg-1", "vi");
    matching.expected_sha256 = Some(hex::encode(Sha256::digest(&matching.content)).to_uppercase());
    harness.manager.start_job(matching).await?;
    Ok(())
}

#[tokio::test]
async fn test_provider_start_failure_surfaces() {
    let harness = Harness::new();
    harness.provider.fail_next_start("LimitExceededException: too many jobs");

    let err = harness
        .manager
        .start_job(docx_request("msg-1", "vi"))
        .await
        .unwrap_err();
    assert!(matches!(err, SeaBridgeError::Provider { .. }));
    assert!(harness.store.is_empty().await);
}

#[tokio::test]
async fn test_list_jobs() -> Result<()> {
    let harness = Harness::with_config(service_config());
    let vi = harness.manager.start_job(docx_request("msg-1", "vi")).await?;
    harness.clock.advance(Duration::seconds(1));
    let th = harness.manager.start_job(docx_request("msg-1", "th")).await?;
    harness.manager.start_job(docx_request("msg-2", "vi")).await?;

    let for_message = harness.manager.list_jobs_for_message("msg-1").await?;
    let ids: Vec<_> = for_message.iter().map(|job| job.job_id.clone()).collect();
    assert_eq!(ids, vec![th.job_id.clone(), vi.job_id.clone()]);

    harness
        .provider
        .set_status(&vi.job_id, ProviderJobStatus::Completed, None);
    harness.manager.poll_status(&vi.job_id).await?;

    let completed = harness.manager.list_jobs_by_status(JobStatus::Completed).await?;
    assert_eq!(completed.len(), 1);
    let submitted = harness.manager.list_jobs_by_status(JobStatus::Submitted).await?;
    assert_eq!(submitted.len(), 2);

    Ok(())
}
