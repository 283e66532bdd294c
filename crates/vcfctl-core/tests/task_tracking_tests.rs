//! End-to-end task tracking against a mock SDDC Manager

mod common;

use common::{MockSddcServer, TaskFixture, service_error};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use vcfctl_core::{CoreError, TaskTracker, TrackerState, get_resource_id, wait_for_task};
use wiremock::ResponseTemplate;

const TICK: Duration = Duration::from_millis(5);

#[tokio::test]
async fn test_wait_completes_after_three_fetches() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-42",
        vec![
            TaskFixture::new("t-42", "IN_PROGRESS").response(),
            TaskFixture::new("t-42", "IN_PROGRESS").response(),
            TaskFixture::new("t-42", "COMPLETED_WITH_SUCCESS")
                .completed_at("2024-01-01T00:00:00Z")
                .response(),
        ],
    )
    .await;
    let client = sddc.client().await;

    let task = wait_for_task(&client, "t-42", TICK, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(task.status, "COMPLETED_WITH_SUCCESS");
    assert_eq!(
        task.completion_timestamp.as_deref(),
        Some("2024-01-01T00:00:00Z")
    );
    assert_eq!(sddc.task_fetches("t-42").await, 3);
    assert_eq!(sddc.token_requests().await, 1);
}

#[tokio::test]
async fn test_failed_task_reports_failed_step() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-7",
        vec![
            TaskFixture::new("t-7", "In Progress")
                .sub_task("Successful", "Validate hosts")
                .response(),
            TaskFixture::new("t-7", "Failed")
                .sub_task("Successful", "Validate hosts")
                .sub_task("Failed", "Configure vSAN datastore")
                .response(),
        ],
    )
    .await;
    let client = sddc.client().await;

    let mut tracker = TaskTracker::new(&client, "t-7").with_interval(TICK);
    let err = tracker.wait(&CancellationToken::new()).await.unwrap_err();

    let text = err.to_string();
    assert!(err.is_task_failure());
    assert!(text.contains("t-7"), "{text}");
    assert!(text.contains("Add cluster sfo-m01-cl02"), "{text}");
    assert!(text.contains("CLUSTER_CREATE"), "{text}");
    assert!(text.contains("Failed"), "{text}");
    assert!(text.contains("Configure vSAN datastore"), "{text}");
    assert!(tracker.has_logged("Validate hosts"));
    assert!(matches!(tracker.state(), TrackerState::Failed(_)));
}

#[tokio::test]
async fn test_task_errors_take_precedence_in_failure_detail() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-8",
        vec![TaskFixture::new("t-8", "Cancelled")
            .error("Operation cancelled by administrator")
            .response()],
    )
    .await;
    let client = sddc.client().await;

    let err = wait_for_task(&client, "t-8", TICK, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        CoreError::TaskFailed { status, detail, .. } => {
            assert_eq!(status, "Cancelled");
            assert_eq!(
                detail.as_deref(),
                Some("Operation cancelled by administrator")
            );
        }
        other => panic!("expected TaskFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unparseable_snapshot_does_not_end_wait() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-9",
        vec![
            TaskFixture::new("t-9", "IN_PROGRESS").response(),
            ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"),
            TaskFixture::new("t-9", "SUCCESSFUL").response(),
        ],
    )
    .await;
    let client = sddc.client().await;

    wait_for_task(&client, "t-9", TICK, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(sddc.task_fetches("t-9").await, 3);
}

#[tokio::test]
async fn test_success_without_task_body_does_not_end_wait() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-10",
        vec![
            ResponseTemplate::new(200).set_body_json(json!({})),
            TaskFixture::new("t-10", "IN_PROGRESS").response(),
            TaskFixture::new("t-10", "SUCCESSFUL").response(),
        ],
    )
    .await;
    let client = sddc.client().await;

    let done = wait_for_task(&client, "t-10", TICK, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(done.status, "SUCCESSFUL");
    assert_eq!(sddc.task_fetches("t-10").await, 3);
}

#[tokio::test]
async fn test_service_error_ends_wait() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-404",
        vec![service_error(404, "TASK_NOT_FOUND", "Task t-404 not found")],
    )
    .await;
    let client = sddc.client().await;

    let err = wait_for_task(&client, "t-404", TICK, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        err.service_error().and_then(|e| e.reference_token.as_deref()),
        Some("REF123")
    );
    assert_eq!(sddc.task_fetches("t-404").await, 1);
}

#[tokio::test]
async fn test_cancel_stops_watching_running_task() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-long",
        vec![TaskFixture::new("t-long", "IN_PROGRESS").response()],
    )
    .await;
    let client = sddc.client().await;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let err = wait_for_task(&client, "t-long", Duration::from_millis(20), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(sddc.task_fetches("t-long").await >= 1);
}

#[tokio::test]
async fn test_token_refreshed_during_long_wait() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-slow",
        vec![
            TaskFixture::new("t-slow", "IN_PROGRESS").response(),
            TaskFixture::new("t-slow", "IN_PROGRESS").response(),
            TaskFixture::new("t-slow", "SUCCESSFUL").response(),
        ],
    )
    .await;
    let session = sddc
        .session_builder()
        .refresh_after(Duration::from_millis(10))
        .connect()
        .await
        .unwrap();
    let client = vcfctl_core::SddcClient::new(session);

    wait_for_task(
        &client,
        "t-slow",
        Duration::from_millis(30),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    // One at connect, then one before each fetch once the token aged out
    assert!(sddc.token_requests().await >= 3);
    assert_eq!(sddc.task_fetches("t-slow").await, 3);
}

#[tokio::test]
async fn test_resource_lookup_by_type() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-res",
        vec![TaskFixture::new("t-res", "SUCCESSFUL")
            .resource("Cluster", "c-1")
            .resource("Domain", "d-1")
            .response()],
    )
    .await;
    let client = sddc.client().await;

    assert_eq!(
        get_resource_id(&client, "t-res", "Cluster").await.unwrap(),
        "c-1"
    );
    assert_eq!(
        get_resource_id(&client, "t-res", "Domain").await.unwrap(),
        "d-1"
    );

    let err = get_resource_id(&client, "t-res", "Host").await.unwrap_err();
    assert!(matches!(err, CoreError::ResourceTypeNotFound { .. }));
    assert_eq!(sddc.task_fetches("t-res").await, 3);
}

#[tokio::test]
async fn test_resource_lookup_without_resources() {
    let sddc = MockSddcServer::start().await;
    sddc.mount_task_sequence(
        "t-empty",
        vec![TaskFixture::new("t-empty", "SUCCESSFUL").response()],
    )
    .await;
    let client = sddc.client().await;

    let err = get_resource_id(&client, "t-empty", "Cluster")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NoResources { .. }));
}
