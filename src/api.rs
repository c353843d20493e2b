use crate::metrics::ErrorResponse;
use crate::rolling::{Channel, ChannelStats};
use crate::storage::ViewStore;
use crate::view::DashboardView;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ViewStore>,
    pub view_tx: broadcast::Sender<DashboardView>,
    pub shutdown: CancellationToken,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/health", get(health))
        .route("/api/view", get(get_view))
        .route("/api/series/:channel", get(get_series))
        .route("/api/stats/:channel", get(get_stats))
        .route("/api/stream", get(stream))
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" })).into_response()
}

fn error(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
        .into_response()
}

fn no_data() -> Response {
    error(StatusCode::NOT_FOUND, "no data yet")
}

async fn get_view(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.latest() {
        Some(view) => (StatusCode::OK, Json(view)).into_response(),
        None => no_data(),
    }
}

async fn get_series(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> impl IntoResponse {
    let channel: Channel = match channel.parse() {
        Ok(c) => c,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    // Before the first tick every series is simply empty.
    let series = state
        .store
        .with_latest(|view| view.series(channel))
        .unwrap_or_default();
    (StatusCode::OK, Json(series)).into_response()
}

#[derive(Serialize)]
struct StatsResponse {
    channel: Channel,
    #[serde(flatten)]
    stats: ChannelStats,
    display: [String; 3],
}

async fn get_stats(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> impl IntoResponse {
    let channel: Channel = match channel.parse() {
        Ok(c) => c,
        Err(e) => return error(StatusCode::BAD_REQUEST, e.to_string()),
    };
    match state.store.with_latest(|view| StatsResponse {
        channel,
        stats: view.stats(channel),
        display: view.stats_text(channel),
    }) {
        Some(stats) => (StatusCode::OK, Json(stats)).into_response(),
        None => no_data(),
    }
}

async fn stream(
    State(state): State<AppState>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let rx = state.view_tx.subscribe();
    let shutdown = state.shutdown.clone();
    let stream = BroadcastStream::new(rx)
        .take_until(async move { shutdown.cancelled().await })
        .map(|msg| match msg {
            Ok(view) => match serde_json::to_string(&view) {
                Ok(json) => Ok(Event::default().event("view").data(json)),
                Err(e) => Ok(Event::default()
                    .event("error")
                    .data(format!("serialize_error: {e}"))),
            },
            Err(e) => Ok(Event::default()
                .event("error")
                .data(format!("stream_error: {e}"))),
        });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(10))
            .text("keep-alive"),
    )
}

async fn index() -> impl IntoResponse {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>System Dashboard</title>
  <style>
    :root { --bg: #0b0f19; --panel: #0f1626; --border: #2a3550; --text: #e5e7eb; --muted: #9ca3af; }
    body { background: var(--bg); color: var(--text); font-family: ui-sans-serif, system-ui, Segoe UI, Roboto, Arial; margin: 24px; }
    .grid { display: grid; grid-template-columns: repeat(auto-fill, minmax(360px, 1fr)); gap: 16px; }
    .panel { background: var(--panel); border: 1px solid var(--border); border-radius: 10px; padding: 12px 14px; }
    .panel h2 { font-size: 15px; margin: 0 0 8px; display: flex; justify-content: space-between; }
    .muted { color: var(--muted); font-size: 13px; }
    .badge { font-size: 12px; padding: 2px 8px; border-radius: 999px; }
    .normal { background: #064e3b; } .warning { background: #78350f; } .critical { background: #7f1d1d; }
    canvas { width: 100%; height: 120px; }
    table { width: 100%; border-collapse: collapse; font-size: 13px; }
    td, th { text-align: left; padding: 4px 6px; border-bottom: 1px solid var(--border); }
  </style>
</head>
<body>
  <h1>System Dashboard <span id="state" class="badge normal">Monitoring</span></h1>
  <div class="muted">Elapsed <span id="duration">-</span> &middot; Remaining <span id="remaining">-</span> &middot; Last update <span id="updated">-</span></div>
  <div class="grid" id="grid"></div>
  <div class="panel" style="margin-top:16px">
    <h2>Top processes</h2>
    <table><thead><tr><th>PID</th><th>Name</th><th>CPU</th><th>Memory</th></tr></thead><tbody id="procs"></tbody></table>
  </div>
  <p id="footer" class="muted"></p>
  <script>
    const gauges = ['cpu', 'memory', 'gpu', 'disk'];
    const colors = { cpu: '#667eea', memory: '#764ba2', gpu: '#10b981', disk: '#f59e0b', down: '#3b82f6', up: '#ef4444' };
    const grid = document.getElementById('grid');
    for (const name of [...gauges, 'network']) {
      grid.insertAdjacentHTML('beforeend',
        `<div class="panel"><h2><span>${name}</span><span id="${name}-badge"></span></h2>` +
        `<div id="${name}-text" class="muted"></div><canvas id="${name}-chart" width="600" height="160"></canvas></div>`);
    }

    function draw(id, traces, ceiling) {
      const c = document.getElementById(id), ctx = c.getContext('2d');
      ctx.clearRect(0, 0, c.width, c.height);
      const top = ceiling || Math.max(1, ...traces.flatMap(t => t.values));
      for (const t of traces) {
        ctx.strokeStyle = t.color; ctx.lineWidth = 2; ctx.beginPath();
        t.values.forEach((v, i) => {
          const x = t.values.length < 2 ? 0 : i * c.width / (t.values.length - 1);
          const y = c.height - (v / top) * c.height;
          i ? ctx.lineTo(x, y) : ctx.moveTo(x, y);
        });
        ctx.stroke();
      }
    }

    function render(view) {
      for (const name of gauges) {
        const w = view[name];
        const details = w.details.map(d => `${d.label} ${d.value}`).join(' · ');
        document.getElementById(`${name}-text`).textContent =
          `Now ${w.current} · Avg ${w.average} · Max ${w.max} · ${details}`;
        const b = document.getElementById(`${name}-badge`);
        b.className = 'badge ' + (w.badge ? w.badge.status : '');
        b.textContent = w.badge ? w.badge.label : '';
        draw(`${name}-chart`, [{ color: colors[name], values: w.series.map(s => s.value) }], 100);
      }
      const n = view.network;
      document.getElementById('network-text').textContent = `Down ${n.download} · Up ${n.upload}`;
      draw('network-chart', [
        { color: colors.down, values: n.series.download },
        { color: colors.up, values: n.series.upload },
      ]);

      const tbody = document.getElementById('procs');
      tbody.innerHTML = '';
      for (const p of view.processes) {
        const row = tbody.insertRow();
        for (const cell of [p.pid, p.name, p.cpu_percent.toFixed(1) + '%', p.memory_percent.toFixed(1) + '%']) {
          row.insertCell().textContent = cell ?? '';
        }
      }

      if (view.clock) {
        document.getElementById('duration').textContent = view.clock.duration;
        document.getElementById('remaining').textContent = view.clock.remaining;
      }
      document.getElementById('updated').textContent = view.last_update || '-';
      if (view.completion) {
        document.getElementById('state').textContent = 'Complete';
        document.getElementById('footer').textContent = view.completion.message;
      }
    }

    fetch('/api/view').then(r => r.ok ? r.json() : null).then(v => v && render(v));
    const es = new EventSource('/api/stream');
    es.addEventListener('view', e => render(JSON.parse(e.data)));
  </script>
</body>
</html>"#;
