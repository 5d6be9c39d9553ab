//! Integration tests for the deferred queue wired to real adapters
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the controller
//! - `HttpTransmitter` on the default route
//! - `FileWatchdog` writing into a tempdir

use std::sync::{Arc, Mutex};
use std::time::Duration;

use deferq_core::{DeferredItem, DeferredQueue, Regime};
use deferq_domain::{Config, SenderStatus, TracedRequest};
use deferq_infra::queue_builder;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Reports = Arc<Mutex<Vec<(String, SenderStatus)>>>;

struct Fixture {
    queue: DeferredQueue<&'static str>,
    reports: Reports,
    watchdog_dir: TempDir,
}

fn fixture() -> Fixture {
    let watchdog_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.watchdog.directory = watchdog_dir.path().display().to_string();
    config.transport.request_timeout_seconds = 5;

    let reports: Reports = Arc::default();
    let sink = Arc::clone(&reports);
    let queue = queue_builder::<&'static str>(&config, "zedagent", "info")
        .unwrap()
        .sent_handler(
            move |_class: &&'static str,
                  payload: &[u8],
                  status: SenderStatus,
                  _traces: &[TracedRequest]| {
                sink.lock()
                    .unwrap()
                    .push((String::from_utf8_lossy(payload).into_owned(), status));
            },
        )
        .spawn()
        .unwrap();

    Fixture { queue, reports, watchdog_dir }
}

async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("condition not met in time");
}

/// Validates the queue's delivery path for the controller-accepts scenario.
///
/// Assertions:
/// - The kick delivers the item without waiting for the backoff
/// - The handler sees exactly one success report
/// - The store drains and the timer goes dormant
/// - The watchdog touch file is written
#[tokio::test]
async fn accepted_item_is_delivered_and_removed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/edgeDevice/info"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture();
    let url = format!("{}/api/v2/edgeDevice/info", server.uri());
    fx.queue.set_deferred(DeferredItem::new("app-1", b"hello".to_vec(), url, "info"));

    // Deactivation happens after the round merged back
    eventually(|| fx.queue.timer_regime() == Regime::Dormant).await;

    assert_eq!(fx.queue.pending_count(), 0);
    assert_eq!(*fx.reports.lock().unwrap(), vec![("hello".to_string(), SenderStatus::None)]);
    assert!(fx.watchdog_dir.path().join("zedagentinfo.touch").exists());

    fx.queue.shutdown().await.unwrap();
}

#[tokio::test]
async fn not_found_with_bail_is_terminal() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let fx = fixture();
    fx.queue.set_deferred(
        DeferredItem::new("app-gone", b"bye".to_vec(), server.uri(), "info").bail_on_http_error(true),
    );

    eventually(|| fx.queue.timer_regime() == Regime::Dormant).await;

    assert_eq!(fx.queue.pending_count(), 0);
    assert_eq!(*fx.reports.lock().unwrap(), vec![("bye".to_string(), SenderStatus::NotFound)]);
    fx.queue.shutdown().await.unwrap();
}

/// Validates the queue's delivery path for the controller-unavailable scenario.
///
/// Assertions:
/// - A 503 keeps the item queued
/// - The handler sees the attempt's status, then a debug report
/// - The timer stays in the active regime
#[tokio::test]
async fn unavailable_controller_keeps_item_queued() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fx = fixture();
    fx.queue.set_deferred(DeferredItem::new("app-1", b"retry me".to_vec(), server.uri(), "info"));

    eventually(|| fx.reports.lock().unwrap().len() >= 2 && fx.queue.pending_count() == 1).await;

    let reports = fx.reports.lock().unwrap().clone();
    assert_eq!(reports[0], ("retry me".to_string(), SenderStatus::Upgrade));
    assert_eq!(reports[1], ("retry me".to_string(), SenderStatus::Debug));
    assert_eq!(fx.queue.pending_keys(), vec!["app-1".to_string()]);
    assert_eq!(fx.queue.timer_regime(), Regime::Active);
    assert!(fx.queue.metrics().failed >= 1);

    fx.queue.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_config_is_rejected_before_spawn() {
    let mut config = Config::default();
    config.deferred.backoff_min_seconds = 1_000;
    config.deferred.backoff_max_seconds = 10;

    assert!(queue_builder::<&'static str>(&config, "zedagent", "info").is_err());
}
