//! Inbound adapters: turn a metrics source into a sequence of [`DashboardEvent`]s.

use crate::error::{Result, SourceError};
use crate::metrics::DashboardEvent;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Follows a Server-Sent-Events endpoint until cancelled, reconnecting after
/// `reconnect` whenever the stream fails or ends.
pub async fn run_sse_source(
    url: String,
    reconnect: Duration,
    cancel: CancellationToken,
    on_event: impl Fn(DashboardEvent) + Send + Sync + 'static,
) {
    let client = match reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .build()
    {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to build HTTP client: {}", e);
            return;
        }
    };

    loop {
        if cancel.is_cancelled() {
            break;
        }

        match stream_once(&client, &url, &cancel, &on_event).await {
            Ok(count) => info!("Event stream from {} ended after {} events", url, count),
            Err(e) => error!("Event stream error from {}: {}", url, e),
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(reconnect) => {}
        }
    }
}

/// One connection's worth of events. Returns how many events were delivered;
/// cancellation ends it early at any point, including while awaiting headers.
pub async fn stream_once(
    client: &reqwest::Client,
    url: &str,
    cancel: &CancellationToken,
    on_event: &impl Fn(DashboardEvent),
) -> Result<usize> {
    let request = client
        .get(url)
        .header(reqwest::header::ACCEPT, "text/event-stream")
        .send();
    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(0),
        response = request => response?.error_for_status()?,
    };
    info!("Connected to metrics source {}", url);

    let mut frames = response.bytes_stream().eventsource();
    let mut delivered = 0;
    loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break,
            frame = frames.next() => frame,
        };
        let Some(frame) = frame else { break };
        let frame = frame.map_err(|e| SourceError::Stream(e.to_string()))?;

        match DashboardEvent::from_parts(&frame.event, &frame.data) {
            Ok(event) => {
                on_event(event);
                delivered += 1;
            }
            Err(SourceError::UnknownEvent(name)) => {
                warn!("Ignoring unknown event `{}`", name);
            }
            Err(e) => {
                warn!("Skipping undecodable `{}` frame: {}", frame.event, e);
            }
        }
    }
    Ok(delivered)
}

/// Decodes one JSON-lines record. Blank lines and `#` comments yield `None`.
pub fn decode_line(line: &str) -> Option<Result<DashboardEvent>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    Some(serde_json::from_str(line).map_err(SourceError::from))
}

/// Replays a JSON-lines recording, one event per `interval`
/// (`Duration::ZERO` publishes back to back). Returns the number of events published.
pub async fn run_replay_source(
    path: &Path,
    interval: Duration,
    cancel: CancellationToken,
    on_event: impl Fn(DashboardEvent),
) -> Result<usize> {
    let file = match tokio::fs::File::open(path).await {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SourceError::ReplayMissing(path.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    info!("Replaying {}", path.display());

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    let mut published = 0usize;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let event = match decode_line(&line) {
            None => continue,
            Some(Ok(event)) => event,
            Some(Err(e)) => {
                warn!("{}:{}: skipping malformed line: {}", path.display(), line_no, e);
                continue;
            }
        };

        if published > 0 && !interval.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
        if cancel.is_cancelled() {
            break;
        }
        on_event(event);
        published += 1;
    }

    info!("Replay finished: {} events", published);
    Ok(published)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_line_skips_comments_and_blanks() {
        assert!(decode_line("").is_none());
        assert!(decode_line("   ").is_none());
        assert!(decode_line("# recorded 2024-05-01").is_none());
        assert!(matches!(decode_line("{not json"), Some(Err(SourceError::Decode(_)))));

        let evt = decode_line(r#"{"event":"time_update","data":{"duration":"0:00:02","remaining":"04:58"}}"#)
            .unwrap()
            .unwrap();
        assert_eq!(evt.name(), DashboardEvent::TIME_UPDATE);
    }
}
