// End-to-end console tests: wiremock for REST, a local tungstenite server
// for the status channel.
#![allow(clippy::unwrap_used)]

use std::time::Duration;

use futures_util::SinkExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use url::Url;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use relay_core::{
    Command, CommandResult, ConnectionPhase, Console, ConsoleConfig, CoreError, CreateFeedRequest,
    CreateJobRequest, FeedEndpoint, FeedId, JobId, Liveness, UpdateBrokerRequest,
    UpdateFeedRequest,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn job_json(id: i64, name: &str, running: bool) -> serde_json::Value {
    json!({
        "id": id, "type_id": "adsb", "name": name, "enabled": true,
        "cot_stale": 120, "alt_upper": 0, "alt_lower": 0, "uid_key": "hex",
        "running": running,
        "created_at": "2026-01-05T10:00:00", "updated_at": "2026-01-05T10:00:00",
        "sources": []
    })
}

fn status_frame(jobs: &serde_json::Value) -> String {
    json!({
        "tak_connected": true,
        "tak_url": "tls://tak.example:8089",
        "tx_queue_size": 0,
        "connect_error": null,
        "server_time": "2026-03-01T12:00:00Z",
        "enablements": jobs
    })
    .to_string()
}

async fn rest_backend(jobs: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/enablements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jobs))
        .mount(&server)
        .await;
    server
}

/// Serve one status connection: send `frames`, then hold the socket open
/// until `hang_up` fires. The listener is dropped after the first accept,
/// so reconnect attempts are refused.
async fn status_server(frames: Vec<String>) -> (Url, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (hang_up, hung_up) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        drop(listener);
        let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
        for frame in frames {
            ws.send(Message::text(frame)).await.unwrap();
        }
        let _ = hung_up.await;
        let _ = ws.close(None).await;
    });

    (
        Url::parse(&format!("ws://{addr}/api/v1/ws/status")).unwrap(),
        hang_up,
    )
}

fn config(rest: &MockServer, status_url: Option<Url>) -> ConsoleConfig {
    let mut config = ConsoleConfig::new(Url::parse(&rest.uri()).unwrap());
    config.status_url = status_url;
    config.refresh_interval_secs = 0;
    config.timeout = Duration::from_secs(5);
    config
}

// ── Live status ─────────────────────────────────────────────────────

#[tokio::test]
async fn live_then_stale_after_channel_drop() {
    let rest = rest_backend(json!([job_json(1, "feed-A", false)])).await;
    let frame = status_frame(&json!([{
        "id": 1, "name": "feed-A", "type_id": "adsb", "running": true,
        "events_sent": 42, "active_items": 3, "source_stats": {}
    }]));
    let (status_url, hang_up) = status_server(vec![frame]).await;

    let console = Console::new(config(&rest, Some(status_url))).unwrap();
    console.start().await.unwrap();

    let snapshot = console
        .wait_for_snapshot(Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(snapshot.jobs.len(), 1);

    let mut state = console.connection_state();
    state.wait_for(|s| s.is_open()).await.unwrap();

    let view = console.view();
    assert!(view.live);
    assert!(view.last_frame_at.is_some());
    assert!(view.catalog_refreshed_at.is_some());
    let job = &view.jobs[0];
    assert_eq!(
        (job.name.as_str(), job.running, job.events_emitted),
        ("feed-A", true, 42)
    );
    assert_eq!(job.liveness, Liveness::Live);

    // Server hangs up; the last values stay on screen.
    hang_up.send(()).unwrap();
    state.wait_for(|s| !s.is_open()).await.unwrap();

    let view = console.view();
    assert!(!view.live);
    assert_ne!(view.connection.phase, ConnectionPhase::Open);
    let job = &view.jobs[0];
    assert_eq!((job.running, job.events_emitted), (true, 42));
    assert_eq!(job.liveness, Liveness::Stale);

    console.shutdown().await;
    console.shutdown().await;
    assert_eq!(
        console.status_store().connection_state().phase,
        ConnectionPhase::Closed
    );
    assert!(console.status_store().is_closed());
}

#[tokio::test]
async fn without_snapshot_views_fall_back_to_persisted_flag() {
    let rest = rest_backend(json!([job_json(1, "feed-A", true)])).await;
    let console = Console::new(config(&rest, None)).unwrap();
    let jobs = console.subscribe_jobs();
    assert!(console.view().catalog_refreshed_at.is_none());
    console.refresh_jobs().await.unwrap();
    assert!(jobs.has_changed().unwrap());
    assert_eq!(jobs.borrow().len(), 1);
    assert!(console.view().catalog_refreshed_at.is_some());

    let view = console.job_view(JobId(1)).unwrap();
    assert_eq!(view.liveness, Liveness::Persisted);
    assert!(view.running);
    assert!(console.job_view(JobId(2)).is_none());

    let err = console
        .wait_for_snapshot(Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NoSnapshot { .. }));
}

#[tokio::test]
async fn start_after_shutdown_is_rejected() {
    let rest = rest_backend(json!([])).await;
    let console = Console::new(config(&rest, None)).unwrap();
    console.shutdown().await;
    assert!(matches!(
        console.start().await.unwrap_err(),
        CoreError::ShutDown
    ));
}

// ── Commands ────────────────────────────────────────────────────────

#[tokio::test]
async fn start_job_refreshes_catalog() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/enablements/1/start"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&rest)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/enablements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([job_json(1, "feed-A", true)])))
        .expect(1)
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    let result = console
        .execute(Command::StartJob { id: JobId(1) })
        .await
        .unwrap();

    assert_eq!(result, CommandResult::Ok);
    assert!(console.catalog().get(JobId(1)).unwrap().running);
}

#[tokio::test]
async fn unknown_job_maps_to_job_not_found() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/enablements/9/stop"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Enablement not found" })),
        )
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    let err = console
        .execute(Command::StopJob { id: JobId(9) })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::JobNotFound { id: JobId(9) }));
}

#[tokio::test]
async fn broker_commands_skip_catalog_refresh() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tak/connect"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "connecting" })))
        .expect(1)
        .mount(&rest)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/enablements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    console.execute(Command::ConnectBroker).await.unwrap();
}

#[tokio::test]
async fn create_job_returns_record_and_lands_in_catalog() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/enablements"))
        .and(body_json(json!({
            "type_id": "adsb", "name": "feed-C", "cot_stale": 60
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(job_json(3, "feed-C", false)))
        .expect(1)
        .mount(&rest)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/enablements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([job_json(3, "feed-C", false)])))
        .expect(1)
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    let result = console
        .execute(Command::CreateJob(CreateJobRequest {
            kind: "adsb".into(),
            name: "feed-C".into(),
            stale_after_secs: Some(60),
            ..Default::default()
        }))
        .await
        .unwrap();

    let CommandResult::Job(job) = result else {
        panic!("expected a job, got {result:?}");
    };
    assert_eq!(job.id, JobId(3));
    assert_eq!(console.catalog().get(JobId(3)).unwrap().name, "feed-C");
}

#[tokio::test]
async fn update_feed_sends_domain_fields_as_wire_names() {
    let rest = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/enablements/1/sources/10"))
        .and(body_json(json!({ "sleep_interval": 45, "endpoint": "mil" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10, "enablement_id": 1, "name": "adsb.lol",
            "base_url": "https://api.adsb.lol", "endpoint": "mil",
            "sleep_interval": 45, "lat": null, "lon": null, "distance": null,
            "enabled": true, "created_at": "2026-01-05T10:00:00"
        })))
        .expect(1)
        .mount(&rest)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/enablements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    let result = console
        .execute(Command::UpdateFeed {
            job_id: JobId(1),
            feed_id: FeedId(10),
            update: UpdateFeedRequest {
                poll_interval_secs: Some(45),
                endpoint: Some(FeedEndpoint::Mil),
                ..Default::default()
            },
        })
        .await
        .unwrap();

    let CommandResult::Feed(feed) = result else {
        panic!("expected a feed, got {result:?}");
    };
    assert_eq!((feed.poll_interval_secs, feed.endpoint), (45, FeedEndpoint::Mil));
}

#[tokio::test]
async fn broker_settings_update_returns_saved_settings() {
    let rest = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/tak/config"))
        .and(body_json(json!({ "cot_url": "tls://tak2.example:8089", "dont_verify": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "cot_url": "tls://tak2.example:8089", "cert_path": null,
            "cot_host_id": "relay-01", "dont_check_hostname": false, "dont_verify": true,
            "max_out_queue": 1000, "max_in_queue": 500, "updated_at": null
        })))
        .expect(1)
        .mount(&rest)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/enablements"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    let result = console
        .execute(Command::UpdateBrokerSettings(UpdateBrokerRequest {
            endpoint: Some("tls://tak2.example:8089".into()),
            skip_verify: Some(true),
            ..Default::default()
        }))
        .await
        .unwrap();

    let CommandResult::Broker(settings) = result else {
        panic!("expected broker settings, got {result:?}");
    };
    assert_eq!(settings.endpoint, "tls://tak2.example:8089");
    assert!(settings.skip_verify);
}

#[tokio::test]
async fn adding_feed_to_unknown_job_maps_to_job_not_found() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/enablements/9/sources"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "Enablement not found" })),
        )
        .mount(&rest)
        .await;

    let console = Console::new(config(&rest, None)).unwrap();
    let err = console
        .execute(Command::CreateFeed {
            job_id: JobId(9),
            feed: CreateFeedRequest {
                name: "adsb.fi".into(),
                base_url: "https://opendata.adsb.fi/api".into(),
                ..Default::default()
            },
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::JobNotFound { id: JobId(9) }));
}
