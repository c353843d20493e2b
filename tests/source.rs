use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::Router;
use metrics_dashboard::error::SourceError;
use metrics_dashboard::metrics::DashboardEvent;
use metrics_dashboard::source::{run_replay_source, stream_once};
use std::convert::Infallible;
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn collector() -> (Arc<Mutex<Vec<DashboardEvent>>>, impl Fn(DashboardEvent)) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |evt| sink.lock().unwrap().push(evt))
}

#[tokio::test]
async fn replay_publishes_in_file_order() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# recorded session").unwrap();
    writeln!(file, r#"{{"event":"system_data","data":{{"cpu":{{"percent":50}}}}}}"#).unwrap();
    writeln!(file).unwrap();
    writeln!(file, "this is not json").unwrap();
    writeln!(file, r#"{{"event":"time_update","data":{{"duration":"0:00:01","remaining":"04:59"}}}}"#).unwrap();
    writeln!(file, r#"{{"event":"monitoring_complete","data":{{"message":"done"}}}}"#).unwrap();
    file.flush().unwrap();

    let (seen, on_event) = collector();
    let n = run_replay_source(file.path(), Duration::ZERO, CancellationToken::new(), on_event)
        .await
        .unwrap();
    assert_eq!(n, 3);

    let names: Vec<&str> = seen.lock().unwrap().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["system_data", "time_update", "monitoring_complete"]);
}

#[tokio::test]
async fn replay_missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.jsonl");
    let (_seen, on_event) = collector();
    let err = run_replay_source(&path, Duration::ZERO, CancellationToken::new(), on_event)
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::ReplayMissing(p) if p == path));
}

#[tokio::test]
async fn replay_stops_when_cancelled() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for _ in 0..5 {
        writeln!(file, r#"{{"event":"system_data","data":{{}}}}"#).unwrap();
    }
    file.flush().unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let (seen, on_event) = collector();
    let n = run_replay_source(file.path(), Duration::from_millis(10), cancel, on_event)
        .await
        .unwrap();
    assert_eq!(n, 0);
    assert!(seen.lock().unwrap().is_empty());
}

async fn events() -> Sse<futures::stream::Iter<std::vec::IntoIter<Result<Event, Infallible>>>> {
    let frames = vec![
        Ok(Event::default().data(r#"{"cpu": {"percent": 12.5}}"#)),
        Ok(Event::default()
            .event("time_update")
            .data(r#"{"duration": "0:00:01", "remaining": "04:59"}"#)),
        Ok(Event::default().event("firmware_update").data("{}")),
        Ok(Event::default().event("time_update").data("not json")),
        Ok(Event::default()
            .event("monitoring_complete")
            .data(r#"{"message": "done", "pdf_path": "/tmp/report.pdf"}"#)),
    ];
    Sse::new(futures::stream::iter(frames))
}

#[tokio::test]
async fn sse_stream_decodes_named_and_unnamed_frames() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let app = Router::new().route("/events", get(events));
        let _ = axum::serve(listener, app).await;
    });

    let (seen, on_event) = collector();
    let client = reqwest::Client::new();
    let delivered = stream_once(
        &client,
        &format!("http://{addr}/events"),
        &CancellationToken::new(),
        &on_event,
    )
    .await
    .unwrap();
    assert_eq!(delivered, 3);

    let seen = seen.lock().unwrap();
    match &seen[0] {
        DashboardEvent::SystemData(snap) => {
            assert_eq!(snap.cpu.as_ref().unwrap().percent, Some(12.5));
        }
        other => panic!("unexpected first event {:?}", other),
    }
    assert_eq!(seen[1].name(), "time_update");
    match &seen[2] {
        DashboardEvent::MonitoringComplete(done) => {
            assert_eq!(done.pdf_path.as_deref(), Some("/tmp/report.pdf"));
        }
        other => panic!("unexpected last event {:?}", other),
    }
}

#[tokio::test]
async fn sse_connect_gives_up_when_cancelled() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept and hold the connection without ever answering.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let (seen, on_event) = collector();
    let client = reqwest::Client::new();
    let delivered = tokio::time::timeout(
        Duration::from_secs(3),
        stream_once(&client, &format!("http://{addr}/events"), &cancel, &on_event),
    )
    .await
    .expect("stream_once ignored cancellation")
    .unwrap();
    assert_eq!(delivered, 0);
    assert!(seen.lock().unwrap().is_empty());
}
