//! End-to-end reply export: work-list processing, resume, and marker reset

use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use slack_thread_downloader::downloader::{
    ExportError, ExportExecutor, ExportJob, JobStatus, StatePaths,
};
use slack_thread_downloader::fetcher::{PageCollector, SlackHttpClient};
use slack_thread_downloader::resume::{ResumeMarker, SnapshotStore};
use slack_thread_downloader::{ReplyRecord, ThreadRecord};

fn test_executor(server: &MockServer, state_dir: &std::path::Path) -> ExportExecutor {
    let client = SlackHttpClient::new(
        Arc::new(reqwest::Client::new()),
        server.uri(),
        "xoxb-test",
        None,
    );
    ExportExecutor::new(client, StatePaths::new(state_dir))
        .with_collector(PageCollector::new().with_page_delay(Duration::ZERO))
        .with_concurrency(2)
}

fn thread(ts: &str) -> ThreadRecord {
    ThreadRecord {
        ts: ts.to_string(),
        user: "U01".to_string(),
        text: "root".to_string(),
        thread_ts: ts.to_string(),
        reply_count: 1,
        subtype: None,
        permalink: Some(format!("https://x/{ts}")),
    }
}

fn reply(ts: &str, thread_ts: &str) -> ReplyRecord {
    ReplyRecord {
        ts: ts.to_string(),
        user: "U02".to_string(),
        text: "reply".to_string(),
        thread_ts: thread_ts.to_string(),
        subtype: None,
    }
}

/// Replies listing body: the thread root itself plus its replies, as the
/// API returns them
fn replies_body(root: &str, reply_ids: &[&str]) -> String {
    let mut messages = vec![format!(
        r#"{{"ts": "{root}", "user": "U01", "text": "root", "thread_ts": "{root}", "reply_count": {}}}"#,
        reply_ids.len()
    )];
    for id in reply_ids {
        messages.push(format!(
            r#"{{"ts": "{id}", "user": "U02", "text": "reply", "thread_ts": "{root}"}}"#
        ));
    }
    format!(r#"{{"ok": true, "messages": [{}]}}"#, messages.join(","))
}

async fn mount_replies(server: &MockServer, root: &str, reply_ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path("/conversations.replies"))
        .and(query_param("ts", root))
        .respond_with(ResponseTemplate::new(200).set_body_string(replies_body(root, reply_ids)))
        .mount(server)
        .await;
}

fn seed_work_list(state_dir: &std::path::Path, roots: &[&str]) -> StatePaths {
    let paths = StatePaths::new(state_dir);
    let store = SnapshotStore::new();
    let records: Vec<ThreadRecord> = roots.iter().map(|ts| thread(ts)).collect();
    store.save_threads(&paths.threads_snapshot(), &records).unwrap();
    paths
}

#[tokio::test]
async fn test_replies_exported_in_work_list_order() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    seed_work_list(dir.path(), &["1.000100", "2.000200"]);

    mount_replies(&server, "1.000100", &["1.000101", "1.000102"]).await;
    mount_replies(&server, "2.000200", &["2.000201"]).await;

    let executor = test_executor(&server, dir.path());
    let mut job = ExportJob::replies("C012345".to_string());
    let progress = executor.export_replies(&mut job).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(progress.units_completed, 2);
    assert_eq!(progress.records_collected, 3);

    // Thread roots are filtered out; results follow work-list order
    let snapshot = SnapshotStore::new().load_replies(&executor.paths().replies_snapshot());
    let ids: Vec<&str> = snapshot.iter().map(|r| r.ts.as_str()).collect();
    assert_eq!(ids, vec!["1.000101", "1.000102", "2.000201"]);

    // Completion resets the work-list marker to zero
    let marker = SnapshotStore::new()
        .load_marker(&executor.paths().replies_marker())
        .unwrap();
    assert_eq!(marker.as_work_index(), Some(0));
}

#[tokio::test]
async fn test_resume_processes_only_remaining_units() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let paths = seed_work_list(dir.path(), &["1.000100", "2.000200", "3.000300"]);

    // Unit 1 was already processed and persisted before the interruption
    let store = SnapshotStore::new();
    store
        .save_replies(
            &paths.replies_snapshot(),
            &[reply("1.000101", "1.000100")],
        )
        .unwrap();
    store
        .save_marker(&paths.replies_marker(), &ResumeMarker::work_index(1))
        .unwrap();

    // A request for the completed unit would be a double-count; expect none
    Mock::given(method("GET"))
        .and(path("/conversations.replies"))
        .and(query_param("ts", "1.000100"))
        .respond_with(ResponseTemplate::new(200).set_body_string(replies_body("1.000100", &[])))
        .expect(0)
        .mount(&server)
        .await;
    mount_replies(&server, "2.000200", &["2.000201"]).await;
    mount_replies(&server, "3.000300", &["3.000301", "3.000302"]).await;

    let executor = test_executor(&server, dir.path());
    let mut job = ExportJob::replies("C012345".to_string());
    let progress = executor.export_replies(&mut job).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    // All three units are accounted for, but only two ran in this process
    assert_eq!(progress.units_completed, 3);
    assert_eq!(progress.records_collected, 2 + 1);

    let snapshot = SnapshotStore::new().load_replies(&paths.replies_snapshot());
    let ids: Vec<&str> = snapshot.iter().map(|r| r.ts.as_str()).collect();
    assert_eq!(
        ids,
        vec!["1.000101", "2.000201", "3.000301", "3.000302"]
    );

    let marker = SnapshotStore::new().load_marker(&paths.replies_marker()).unwrap();
    assert_eq!(marker.as_work_index(), Some(0));
}

#[tokio::test]
async fn test_unit_failure_preserves_prior_units() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let paths = seed_work_list(dir.path(), &["1.000100", "2.000200"]);

    mount_replies(&server, "1.000100", &["1.000101"]).await;
    // Unit 2 fails at the transport level: wiremock has no matching mock
    // for it, so the request comes back as an unmatched 404

    let executor = test_executor(&server, dir.path()).with_concurrency(1);
    let mut job = ExportJob::replies("C012345".to_string());
    let progress = executor.export_replies(&mut job).await.unwrap();

    // Unit 1's replies survived unit 2's failure; the job ran to the end
    assert_eq!(job.status, JobStatus::Completed);
    assert!(progress.error.is_some());
    let snapshot = SnapshotStore::new().load_replies(&paths.replies_snapshot());
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].ts, "1.000101");
}

#[tokio::test]
async fn test_soft_error_abandons_unit_and_continues() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let paths = seed_work_list(dir.path(), &["1.000100", "2.000200", "3.000300"]);

    mount_replies(&server, "1.000100", &["1.000101"]).await;
    Mock::given(method("GET"))
        .and(path("/conversations.replies"))
        .and(query_param("ts", "2.000200"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"ok": false, "error": "thread_not_found"}"#),
        )
        .mount(&server)
        .await;
    mount_replies(&server, "3.000300", &["3.000301"]).await;

    let executor = test_executor(&server, dir.path());
    let mut job = ExportJob::replies("C012345".to_string());
    let progress = executor.export_replies(&mut job).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(progress.error.as_deref(), Some("thread_not_found"));

    let snapshot = SnapshotStore::new().load_replies(&paths.replies_snapshot());
    let ids: Vec<&str> = snapshot.iter().map(|r| r.ts.as_str()).collect();
    assert_eq!(ids, vec!["1.000101", "3.000301"]);
}

#[tokio::test]
async fn test_empty_work_list_completes_immediately() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let paths = seed_work_list(dir.path(), &[]);

    let executor = test_executor(&server, dir.path());
    let mut job = ExportJob::replies("C012345".to_string());
    let progress = executor.export_replies(&mut job).await.unwrap();

    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(progress.units_total, Some(0));
    assert_eq!(progress.units_completed, 0);

    // An empty result set is written and the marker sits at its reset value
    assert!(paths.replies_snapshot().exists());
    assert!(SnapshotStore::new().load_replies(&paths.replies_snapshot()).is_empty());
    let marker = SnapshotStore::new().load_marker(&paths.replies_marker()).unwrap();
    assert_eq!(marker.as_work_index(), Some(0));
}

#[tokio::test]
async fn test_missing_work_list_is_an_error() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();

    let executor = test_executor(&server, dir.path());
    let mut job = ExportJob::replies("C012345".to_string());
    match executor.export_replies(&mut job).await {
        Err(ExportError::WorkListMissing(message)) => {
            assert!(message.contains("threads.json"));
        }
        other => panic!("Expected WorkListMissing, got {other:?}"),
    }
}

#[tokio::test]
async fn test_corrupt_marker_starts_from_zero_without_duplicates() {
    let server = MockServer::start().await;
    let dir = tempfile::TempDir::new().unwrap();
    let paths = seed_work_list(dir.path(), &["1.000100"]);

    // Prior run persisted replies, but the marker was corrupted on disk
    let store = SnapshotStore::new();
    store
        .save_replies(&paths.replies_snapshot(), &[reply("1.000101", "1.000100")])
        .unwrap();
    std::fs::write(paths.replies_marker(), "{truncated").unwrap();

    mount_replies(&server, "1.000100", &["1.000101"]).await;

    let executor = test_executor(&server, dir.path());
    let mut job = ExportJob::replies("C012345".to_string());
    let progress = executor.export_replies(&mut job).await.unwrap();

    // The unit is reprocessed from zero, but already-persisted replies are
    // not appended twice
    assert_eq!(job.status, JobStatus::Completed);
    assert_eq!(progress.records_collected, 0);
    let snapshot = SnapshotStore::new().load_replies(&paths.replies_snapshot());
    assert_eq!(snapshot.len(), 1);
}
