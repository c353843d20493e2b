use crate::rolling::MAX_POINTS;
use clap::{Parser, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    Console,
    Web,
    Both,
}

#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Follow a Server-Sent-Events endpoint
    Sse,
    /// Play back a JSON-lines recording
    Replay,
}

#[derive(Clone, Debug, Parser)]
#[command(
    name = "metrics_dashboard",
    about = "Live dashboard for pushed system-metric snapshots"
)]
pub struct Config {
    /// Where events come from (sse/replay)
    #[arg(long, value_enum, default_value_t = SourceKind::Sse)]
    pub source: SourceKind,

    /// Metrics source event-stream URL
    #[arg(long, default_value = "http://127.0.0.1:5000/events")]
    pub url: String,

    /// JSON-lines file to replay (with --source replay)
    #[arg(long, required_if_eq("source", "replay"))]
    pub replay_file: Option<PathBuf>,

    /// Delay between replayed events in milliseconds (0 = no pacing)
    #[arg(long, default_value_t = 1000)]
    pub replay_interval_ms: u64,

    /// Output mode (console/web/both)
    #[arg(long, value_enum, default_value_t = Mode::Web)]
    pub mode: Mode,

    /// Bind address for HTTP server
    #[arg(long, default_value = "127.0.0.1")]
    pub bind: IpAddr,

    /// HTTP server port
    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    /// Points kept per chart series
    #[arg(long, default_value_t = MAX_POINTS)]
    pub max_points: usize,

    /// Terminal redraw interval in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub refresh_ms: u64,

    /// Delay before reconnecting to the event stream in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub reconnect_ms: u64,
}

impl Config {
    pub fn refresh(&self) -> Duration {
        Duration::from_millis(self.refresh_ms.max(1))
    }

    pub fn reconnect(&self) -> Duration {
        Duration::from_millis(self.reconnect_ms)
    }

    pub fn replay_interval(&self) -> Duration {
        Duration::from_millis(self.replay_interval_ms)
    }

    pub fn web_enabled(&self) -> bool {
        matches!(self.mode, Mode::Web | Mode::Both)
    }

    pub fn console_enabled(&self) -> bool {
        matches!(self.mode, Mode::Console | Mode::Both)
    }
}
