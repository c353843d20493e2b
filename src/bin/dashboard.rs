use clap::Parser;
use metrics_dashboard::api::{router, AppState};
use metrics_dashboard::bus::{self, DashboardActivity};
use metrics_dashboard::config::{Config, SourceKind};
use metrics_dashboard::console;
use metrics_dashboard::dashboard::Dashboard;
use metrics_dashboard::runtime;
use metrics_dashboard::source;
use metrics_dashboard::storage::ViewStore;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

// The event bus is thread-local, so everything runs on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    runtime::init_tracing();
    let cfg = Config::parse();
    info!(
        "Starting dashboard: source={:?}, mode={:?}, max_points={}, bind={}, port={}",
        cfg.source, cfg.mode, cfg.max_points, cfg.bind, cfg.port
    );

    let store = Arc::new(ViewStore::new());
    let cancel = CancellationToken::new();
    let (view_tx, _view_rx) = tokio::sync::broadcast::channel(256);

    // Keep the dashboard activity alive for the whole session.
    let _dashboard_activity = bus::register_dashboard(DashboardActivity::new(
        Dashboard::new(cfg.max_points),
        store.clone(),
        view_tx.clone(),
    ));

    let source_cancel = cancel.clone();
    let source_handle = match cfg.source {
        SourceKind::Sse => {
            let url = cfg.url.clone();
            let reconnect = cfg.reconnect();
            tokio::spawn(async move {
                source::run_sse_source(url, reconnect, source_cancel, bus::publish_event).await;
            })
        }
        SourceKind::Replay => {
            let Some(path) = cfg.replay_file.clone() else {
                error!("--replay-file is required with --source replay");
                std::process::exit(2);
            };
            if !path.exists() {
                error!("Replay file {} does not exist", path.display());
                std::process::exit(2);
            }
            let interval = cfg.replay_interval();
            tokio::spawn(async move {
                match source::run_replay_source(&path, interval, source_cancel, bus::publish_event)
                    .await
                {
                    Ok(n) => info!("Replayed {} events; press Ctrl+C to exit", n),
                    Err(e) => error!("Replay failed: {}", e),
                }
            })
        }
    };

    let console_handle = if cfg.console_enabled() {
        let console_cancel = cancel.clone();
        let console_store = store.clone();
        let refresh = cfg.refresh();
        Some(tokio::spawn(async move {
            console::run_console(console_store, refresh, console_cancel).await;
        }))
    } else {
        None
    };

    let web_handle = if cfg.web_enabled() {
        let state = AppState {
            store: store.clone(),
            view_tx: view_tx.clone(),
            shutdown: cancel.clone(),
        };
        let app = router(state);
        let addr = SocketAddr::from((cfg.bind, cfg.port));
        let listener = match tokio::net::TcpListener::bind(addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind {}: {}", addr, e);
                cancel.cancel();
                std::process::exit(1);
            }
        };
        info!(
            "HTTP dashboard listening on http://{}",
            listener.local_addr().unwrap_or(addr)
        );
        let shutdown = cancel.clone();
        Some(tokio::spawn(async move {
            let res = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            if let Err(e) = res {
                error!("Server error: {}", e);
            }
        }))
    } else {
        None
    };

    runtime::shutdown_signal().await;
    cancel.cancel();

    if let Some(h) = web_handle {
        let _ = h.await;
    }
    if let Some(h) = console_handle {
        let _ = h.await;
    }
    let _ = source_handle.await;
}
