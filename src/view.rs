use crate::metrics::{ProcessInfo, Status, TimeUpdate};
use crate::format;
use crate::rolling::{Channel, ChannelStats, Gauge, NetworkSeries, Sample};
use serde::Serialize;

/// A labelled line of secondary text under a widget, e.g. `("Temp", "45.0°C")`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Detail {
    pub label: &'static str,
    pub value: String,
}

impl Detail {
    pub fn new(label: &'static str, value: String) -> Self {
        Self { label, value }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Badge {
    pub status: Status,
    pub label: &'static str,
}

impl From<Status> for Badge {
    fn from(status: Status) -> Self {
        Self {
            status,
            label: status.label(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GaugeWidget {
    pub channel: Channel,
    pub available: bool,
    pub current: String,
    pub average: String,
    pub max: String,
    pub badge: Option<Badge>,
    pub details: Vec<Detail>,
    pub stats: ChannelStats,
    pub series: Vec<Sample>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NetworkWidget {
    pub available: bool,
    pub download: String,
    pub upload: String,
    pub download_stats: ChannelStats,
    pub upload_stats: ChannelStats,
    pub series: NetworkSeries,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    #[default]
    Monitoring,
    Complete,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Completion {
    pub message: String,
    pub report_path: Option<String>,
}

/// Everything a renderer needs for one redraw. Built fresh after each event,
/// so renderers never hold references into the live buffers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardView {
    pub tick: u64,
    pub last_update: Option<String>,
    pub state: SessionState,
    pub cpu: GaugeWidget,
    pub memory: GaugeWidget,
    pub gpu: GaugeWidget,
    pub disk: GaugeWidget,
    pub network: NetworkWidget,
    pub processes: Vec<ProcessInfo>,
    pub clock: Option<TimeUpdate>,
    pub completion: Option<Completion>,
}

impl DashboardView {
    pub fn gauges(&self) -> [&GaugeWidget; 4] {
        [&self.cpu, &self.memory, &self.gpu, &self.disk]
    }

    pub fn gauge(&self, gauge: Gauge) -> &GaugeWidget {
        match gauge {
            Gauge::Cpu => &self.cpu,
            Gauge::Memory => &self.memory,
            Gauge::Gpu => &self.gpu,
            Gauge::Disk => &self.disk,
        }
    }

    /// Visible window of one channel, oldest first.
    pub fn series(&self, channel: Channel) -> Vec<Sample> {
        if let Some(gauge) = channel.gauge() {
            return self.gauge(gauge).series.clone();
        }
        let net = &self.network.series;
        let values = match channel {
            Channel::NetworkUpload => &net.upload,
            _ => &net.download,
        };
        net.timestamps
            .iter()
            .zip(values.iter())
            .map(|(ts, v)| Sample::new(ts.clone(), *v))
            .collect()
    }

    pub fn stats(&self, channel: Channel) -> ChannelStats {
        match channel {
            Channel::NetworkDownload => self.network.download_stats,
            Channel::NetworkUpload => self.network.upload_stats,
            _ => channel
                .gauge()
                .map(|g| self.gauge(g).stats)
                .unwrap_or_default(),
        }
    }

    /// Current/average/max as shown on the widgets.
    pub fn stats_text(&self, channel: Channel) -> [String; 3] {
        if let Some(gauge) = channel.gauge() {
            let w = self.gauge(gauge);
            return [w.current.clone(), w.average.clone(), w.max.clone()];
        }
        let stats = self.stats(channel);
        [
            format::mb_per_sec(stats.current),
            format::mb_per_sec(stats.average),
            format::mb_per_sec(stats.max),
        ]
    }
}
