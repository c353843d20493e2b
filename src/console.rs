use crate::format;
use crate::metrics::Status;
use crate::storage::ViewStore;
use crate::view::{DashboardView, GaugeWidget, SessionState};
use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Stylize};
use crossterm::terminal::{Clear, ClearType};
use crossterm::ExecutableCommand;
use std::io::{stdout, Write};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::error;

/// Points shown in each terminal sparkline (the most recent ones).
const SPARK_WIDTH: usize = 60;

pub async fn run_console(store: Arc<ViewStore>, refresh: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = render_once(&store) {
                    error!("Console render error: {}", e);
                }
            }
        }
    }
}

fn render_once(store: &ViewStore) -> std::io::Result<()> {
    let mut out = stdout();
    out.execute(MoveTo(0, 0))?;
    out.execute(Clear(ClearType::All))?;

    let Some(view) = store.latest() else {
        writeln!(out, "System Dashboard")?;
        writeln!(out, "Press Ctrl+C to exit.")?;
        writeln!(out)?;
        writeln!(out, "Waiting for the first snapshot...")?;
        out.flush()?;
        return Ok(());
    };

    for line in render_lines(&view) {
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(())
}

/// Text of one redraw, top to bottom.
pub fn render_lines(view: &DashboardView) -> Vec<String> {
    let mut lines = Vec::new();
    let state = match view.state {
        SessionState::Monitoring => "Monitoring".with(Color::Green).to_string(),
        SessionState::Complete => "Complete".with(Color::Cyan).to_string(),
    };
    lines.push(format!("System Dashboard [{state}]   Press Ctrl+C to exit."));
    if let Some(clock) = &view.clock {
        lines.push(format!(
            "Elapsed {}   Remaining {}",
            clock.duration, clock.remaining
        ));
    }
    lines.push(format!(
        "Last update: {}",
        view.last_update.as_deref().unwrap_or(format::UNAVAILABLE)
    ));
    lines.push(String::new());

    for widget in view.gauges() {
        lines.extend(gauge_lines(widget));
    }

    let net = &view.network;
    lines.push(format!(
        "{:<8} down {}  up {}",
        "network", net.download, net.upload
    ));
    let down: Vec<f64> = net.series.download.iter().copied().collect();
    let up: Vec<f64> = net.series.upload.iter().copied().collect();
    lines.push(format!("         ↓ {}", format::sparkline(tail(&down), None)));
    lines.push(format!("         ↑ {}", format::sparkline(tail(&up), None)));
    lines.push(String::new());

    if !view.processes.is_empty() {
        lines.push(format!("{:>7}  {:<24} {:>7} {:>7}", "PID", "NAME", "CPU", "MEM"));
        for p in &view.processes {
            lines.push(format!(
                "{:>7}  {:<24} {:>6.1}% {:>6.1}%",
                p.pid.map(|pid| pid.to_string()).unwrap_or_default(),
                p.name.as_deref().unwrap_or("?"),
                p.cpu_percent,
                p.memory_percent
            ));
        }
        lines.push(String::new());
    }

    if let Some(done) = &view.completion {
        lines.push(done.message.clone().with(Color::Cyan).to_string());
    }
    lines
}

fn gauge_lines(w: &GaugeWidget) -> Vec<String> {
    let current = match &w.badge {
        Some(badge) => colored(&w.current, badge.status),
        None => w.current.clone(),
    };
    let badge = w.badge.as_ref().map(|b| b.label).unwrap_or("");
    let details = w
        .details
        .iter()
        .map(|d| format!("{} {}", d.label, d.value))
        .collect::<Vec<_>>()
        .join("  ");
    let values: Vec<f64> = w.series.iter().map(|s| s.value).collect();
    vec![
        format!(
            "{:<8} now {}  avg {}  max {}  {}  {}",
            w.channel.as_str(),
            current,
            w.average,
            w.max,
            badge,
            details
        ),
        format!("         {}", format::sparkline(tail(&values), Some(100.0))),
    ]
}

fn tail(values: &[f64]) -> &[f64] {
    &values[values.len().saturating_sub(SPARK_WIDTH)..]
}

fn colored(text: &str, status: Status) -> String {
    let color = match status {
        Status::Normal => Color::Green,
        Status::Warning => Color::Yellow,
        Status::Critical => Color::Red,
    };
    text.with(color).to_string()
}
