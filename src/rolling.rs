//! Bounded per-channel history with session-long running statistics.
//!
//! The visible window of every series is capped (oldest sample evicted
//! first), while the running statistics of the cpu, memory and gpu gauges
//! keep accumulating over the whole session.

use crate::metrics::SystemSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default number of points kept per series (five minutes at one tick per second).
pub const MAX_POINTS: usize = 300;

/// A named metric stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Cpu,
    Memory,
    Gpu,
    Disk,
    NetworkDownload,
    NetworkUpload,
}

impl Channel {
    pub const ALL: [Channel; 6] = [
        Channel::Cpu,
        Channel::Memory,
        Channel::Gpu,
        Channel::Disk,
        Channel::NetworkDownload,
        Channel::NetworkUpload,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Cpu => "cpu",
            Channel::Memory => "memory",
            Channel::Gpu => "gpu",
            Channel::Disk => "disk",
            Channel::NetworkDownload => "network-download",
            Channel::NetworkUpload => "network-upload",
        }
    }

    /// Single-valued channel backing this stream, `None` for the network pair.
    pub fn gauge(self) -> Option<Gauge> {
        match self {
            Channel::Cpu => Some(Gauge::Cpu),
            Channel::Memory => Some(Gauge::Memory),
            Channel::Gpu => Some(Gauge::Gpu),
            Channel::Disk => Some(Gauge::Disk),
            Channel::NetworkDownload | Channel::NetworkUpload => None,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown channel `{0}`")]
pub struct UnknownChannel(pub String);

impl FromStr for Channel {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownChannel(s.to_string()))
    }
}

/// Channels that carry one percentage per tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gauge {
    Cpu,
    Memory,
    Gpu,
    Disk,
}

impl Gauge {
    pub const ALL: [Gauge; 4] = [Gauge::Cpu, Gauge::Memory, Gauge::Gpu, Gauge::Disk];

    /// Disk only charts its history; the others also keep session statistics.
    pub fn tracks_stats(self) -> bool {
        !matches!(self, Gauge::Disk)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl From<Gauge> for Channel {
    fn from(g: Gauge) -> Self {
        match g {
            Gauge::Cpu => Channel::Cpu,
            Gauge::Memory => Channel::Memory,
            Gauge::Gpu => Channel::Gpu,
            Gauge::Disk => Channel::Disk,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: String,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value,
        }
    }
}

/// Session-long `{count, sum, max}`; never windowed to the visible series.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct RunningStats {
    pub count: u64,
    pub sum: f64,
    pub max: f64,
}

impl RunningStats {
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.max = self.max.max(value);
    }

    pub fn average(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }

    pub fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }
}

#[derive(Clone, Debug, Default)]
struct GaugeState {
    series: VecDeque<Sample>,
    stats: Option<RunningStats>,
    current: Option<f64>,
}

/// Download and upload traces sharing one time axis. All three columns are
/// appended and evicted together so indices stay aligned.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct NetworkSeries {
    pub timestamps: VecDeque<String>,
    pub download: VecDeque<f64>,
    pub upload: VecDeque<f64>,
}

impl NetworkSeries {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    fn push(&mut self, timestamp: &str, download: f64, upload: f64) {
        self.timestamps.push_back(timestamp.to_string());
        self.download.push_back(download);
        self.upload.push_back(upload);
    }

    fn evict_overflow(&mut self, capacity: usize) {
        while self.timestamps.len() > capacity {
            self.timestamps.pop_front();
            self.download.pop_front();
            self.upload.pop_front();
        }
    }

    fn trace(&self, channel: Channel) -> Vec<Sample> {
        let values = match channel {
            Channel::NetworkUpload => &self.upload,
            _ => &self.download,
        };
        self.timestamps
            .iter()
            .zip(values.iter())
            .map(|(ts, v)| Sample::new(ts.clone(), *v))
            .collect()
    }
}

/// Current/average/max for one channel; `None` means "unavailable".
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ChannelStats {
    pub current: Option<f64>,
    pub average: Option<f64>,
    pub max: Option<f64>,
}

/// Which channels produced a usable reading in one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TickAvailability {
    pub cpu: bool,
    pub memory: bool,
    pub gpu: bool,
    pub disk: bool,
    pub network: bool,
}

impl TickAvailability {
    pub fn gauge(&self, gauge: Gauge) -> bool {
        match gauge {
            Gauge::Cpu => self.cpu,
            Gauge::Memory => self.memory,
            Gauge::Gpu => self.gpu,
            Gauge::Disk => self.disk,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RollingMetricsBuffer {
    capacity: usize,
    gauges: [GaugeState; 4],
    network: NetworkSeries,
    network_current: Option<(f64, f64)>,
}

impl Default for RollingMetricsBuffer {
    fn default() -> Self {
        Self::new(MAX_POINTS)
    }
}

impl RollingMetricsBuffer {
    pub fn new(capacity: usize) -> Self {
        let gauges = Gauge::ALL.map(|g| GaugeState {
            series: VecDeque::with_capacity(capacity + 1),
            stats: g.tracks_stats().then(RunningStats::default),
            current: None,
        });
        Self {
            capacity,
            gauges,
            network: NetworkSeries::default(),
            network_current: None,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends one reading. An error flag or a missing value leaves series and
    /// statistics untouched and marks the channel unavailable.
    ///
    /// Appending may leave the series one over capacity until
    /// [`evict_overflow`](Self::evict_overflow) runs at the end of the tick.
    pub fn ingest(&mut self, gauge: Gauge, timestamp: &str, value: Option<f64>, error: bool) -> bool {
        let state = &mut self.gauges[gauge.index()];
        let value = match value {
            Some(v) if !error => v,
            _ => {
                state.current = None;
                return false;
            }
        };
        state.series.push_back(Sample::new(timestamp, value));
        if let Some(stats) = state.stats.as_mut() {
            stats.record(value);
        }
        state.current = Some(value);
        true
    }

    /// Network counterpart of [`ingest`](Self::ingest): both rates land in
    /// one row, or neither does.
    pub fn ingest_network(
        &mut self,
        timestamp: &str,
        download: Option<f64>,
        upload: Option<f64>,
        error: bool,
    ) -> bool {
        match (download, upload) {
            (Some(down), Some(up)) if !error => {
                self.network.push(timestamp, down, up);
                self.network_current = Some((down, up));
                true
            }
            _ => {
                self.network_current = None;
                false
            }
        }
    }

    /// Drops oldest entries until every series fits the capacity again.
    pub fn evict_overflow(&mut self) {
        for state in self.gauges.iter_mut() {
            while state.series.len() > self.capacity {
                state.series.pop_front();
            }
        }
        self.network.evict_overflow(self.capacity);
    }

    /// Ingests every channel of one tick, then evicts once.
    pub fn apply_snapshot(&mut self, snapshot: &SystemSnapshot, timestamp: &str) -> TickAvailability {
        let cpu = match &snapshot.cpu {
            Some(r) => self.ingest(Gauge::Cpu, timestamp, r.percent, r.error),
            None => self.ingest(Gauge::Cpu, timestamp, None, false),
        };
        let memory = match &snapshot.memory {
            Some(r) => self.ingest(Gauge::Memory, timestamp, r.percent, r.error),
            None => self.ingest(Gauge::Memory, timestamp, None, false),
        };
        let gpu = match snapshot.primary_gpu() {
            Some(r) => self.ingest(Gauge::Gpu, timestamp, r.load, r.error),
            None => self.ingest(Gauge::Gpu, timestamp, None, false),
        };
        let disk = match &snapshot.disk {
            Some(r) => self.ingest(Gauge::Disk, timestamp, r.percent, r.error),
            None => self.ingest(Gauge::Disk, timestamp, None, false),
        };
        let network = match &snapshot.network {
            Some(r) => self.ingest_network(
                timestamp,
                r.download_speed,
                r.upload_speed,
                r.error,
            ),
            None => self.ingest_network(timestamp, None, None, false),
        };
        self.evict_overflow();
        TickAvailability {
            cpu,
            memory,
            gpu,
            disk,
            network,
        }
    }

    /// Copy of the visible window, oldest first.
    pub fn snapshot(&self, channel: Channel) -> Vec<Sample> {
        match channel.gauge() {
            Some(g) => self.gauges[g.index()].series.iter().cloned().collect(),
            None => self.network.trace(channel),
        }
    }

    pub fn network_snapshot(&self) -> NetworkSeries {
        self.network.clone()
    }

    pub fn len(&self, channel: Channel) -> usize {
        match channel.gauge() {
            Some(g) => self.gauges[g.index()].series.len(),
            None => self.network.len(),
        }
    }

    pub fn running_stats(&self, gauge: Gauge) -> Option<RunningStats> {
        self.gauges[gauge.index()].stats
    }

    pub fn current_stats(&self, channel: Channel) -> ChannelStats {
        match channel {
            Channel::NetworkDownload => ChannelStats {
                current: self.network_current.map(|(down, _)| down),
                ..ChannelStats::default()
            },
            Channel::NetworkUpload => ChannelStats {
                current: self.network_current.map(|(_, up)| up),
                ..ChannelStats::default()
            },
            _ => {
                let Some(gauge) = channel.gauge() else {
                    return ChannelStats::default();
                };
                let state = &self.gauges[gauge.index()];
                let stats = state.stats.unwrap_or_default();
                ChannelStats {
                    current: state.current,
                    average: stats.average(),
                    max: stats.max(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{CpuReading, GpuReading, MemoryReading, NetworkReading};

    fn values(buf: &RollingMetricsBuffer, channel: Channel) -> Vec<f64> {
        buf.snapshot(channel).into_iter().map(|s| s.value).collect()
    }

    fn cpu_tick(buf: &mut RollingMetricsBuffer, ts: usize, value: Option<f64>, error: bool) {
        buf.ingest(Gauge::Cpu, &ts.to_string(), value, error);
        buf.evict_overflow();
    }

    #[test]
    fn scenario_with_skipped_tick() {
        let mut buf = RollingMetricsBuffer::default();
        cpu_tick(&mut buf, 1, Some(50.0), false);
        cpu_tick(&mut buf, 2, Some(70.0), false);
        cpu_tick(&mut buf, 3, Some(99.0), true);
        cpu_tick(&mut buf, 4, Some(90.0), false);

        assert_eq!(values(&buf, Channel::Cpu), vec![50.0, 70.0, 90.0]);
        let stats = buf.running_stats(Gauge::Cpu).unwrap();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.sum, 210.0);
        assert_eq!(stats.max, 90.0);
        let view = buf.current_stats(Channel::Cpu);
        assert_eq!(view.current, Some(90.0));
        assert_eq!(view.average, Some(70.0));
        assert_eq!(view.max, Some(90.0));
    }

    #[test]
    fn fifo_eviction_at_capacity() {
        let mut buf = RollingMetricsBuffer::new(3);
        for (i, v) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            cpu_tick(&mut buf, i, Some(v), false);
        }
        let before = buf.snapshot(Channel::Cpu);
        cpu_tick(&mut buf, 3, Some(4.0), false);
        let after = buf.snapshot(Channel::Cpu);

        let mut expected = before[1..].to_vec();
        expected.push(Sample::new("3", 4.0));
        assert_eq!(after, expected);
    }

    #[test]
    fn eviction_drops_every_overflowing_sample() {
        let mut buf = RollingMetricsBuffer::new(3);
        for (i, v) in [1.0, 2.0, 3.0].into_iter().enumerate() {
            cpu_tick(&mut buf, i, Some(v), false);
        }
        buf.ingest(Gauge::Cpu, "3", Some(4.0), false);
        buf.ingest(Gauge::Cpu, "4", Some(5.0), false);
        assert_eq!(buf.len(Channel::Cpu), 5);

        buf.evict_overflow();
        assert_eq!(values(&buf, Channel::Cpu), vec![3.0, 4.0, 5.0]);
        assert_eq!(buf.snapshot(Channel::Cpu)[0].timestamp, "2");
        assert_eq!(buf.running_stats(Gauge::Cpu).unwrap().count, 5);
    }

    #[test]
    fn stats_outlive_the_visible_window() {
        let mut buf = RollingMetricsBuffer::default();
        for i in 1..=301 {
            cpu_tick(&mut buf, i, Some(i as f64), false);
        }
        let shown = values(&buf, Channel::Cpu);
        assert_eq!(shown.len(), MAX_POINTS);
        assert_eq!(shown[0], 2.0);
        assert_eq!(shown[MAX_POINTS - 1], 301.0);

        let expected_avg = (1..=301).sum::<usize>() as f64 / 301.0;
        let stats = buf.current_stats(Channel::Cpu);
        assert_eq!(stats.average, Some(expected_avg));
        assert_eq!(stats.max, Some(301.0));
    }

    #[test]
    fn constant_run_then_spike() {
        let mut buf = RollingMetricsBuffer::default();
        for i in 0..300 {
            cpu_tick(&mut buf, i, Some(10.0), false);
        }
        cpu_tick(&mut buf, 300, Some(20.0), false);

        let series = buf.snapshot(Channel::Cpu);
        assert_eq!(series.len(), 300);
        assert_eq!(series[0], Sample::new("1", 10.0));
        assert_eq!(series[299], Sample::new("300", 20.0));
        let stats = buf.current_stats(Channel::Cpu);
        assert_eq!(stats.max, Some(20.0));
        assert_eq!(stats.average, Some((300.0 * 10.0 + 20.0) / 301.0));
    }

    #[test]
    fn error_tick_leaves_state_untouched() {
        let mut buf = RollingMetricsBuffer::default();
        cpu_tick(&mut buf, 0, Some(30.0), false);
        let series = buf.snapshot(Channel::Cpu);
        let stats = buf.running_stats(Gauge::Cpu);

        cpu_tick(&mut buf, 1, Some(80.0), true);
        assert_eq!(buf.snapshot(Channel::Cpu), series);
        assert_eq!(buf.running_stats(Gauge::Cpu), stats);
        assert_eq!(buf.current_stats(Channel::Cpu).current, None);
        // History-derived figures stay readable while the latest reading is missing.
        assert_eq!(buf.current_stats(Channel::Cpu).average, Some(30.0));
    }

    #[test]
    fn empty_channel_reports_unavailable() {
        let buf = RollingMetricsBuffer::default();
        for channel in Channel::ALL {
            assert_eq!(buf.current_stats(channel), ChannelStats::default());
            assert!(buf.snapshot(channel).is_empty());
        }
    }

    #[test]
    fn disk_and_network_have_no_running_stats() {
        let mut buf = RollingMetricsBuffer::default();
        buf.ingest(Gauge::Disk, "t", Some(40.0), false);
        buf.ingest_network("t", Some(1.5), Some(0.5), false);
        buf.evict_overflow();

        assert!(buf.running_stats(Gauge::Disk).is_none());
        let disk = buf.current_stats(Channel::Disk);
        assert_eq!(disk.current, Some(40.0));
        assert_eq!(disk.average, None);
        assert_eq!(buf.current_stats(Channel::NetworkUpload).current, Some(0.5));
        assert_eq!(buf.current_stats(Channel::NetworkDownload).max, None);
    }

    #[test]
    fn network_columns_stay_aligned() {
        let mut buf = RollingMetricsBuffer::new(5);
        for i in 0..12 {
            let skip = i % 4 == 3;
            buf.ingest_network(
                &i.to_string(),
                Some(i as f64),
                if skip { None } else { Some(i as f64 * 2.0) },
                false,
            );
            buf.evict_overflow();
            let net = buf.network_snapshot();
            assert!(net.len() <= 5);
            assert_eq!(net.timestamps.len(), net.download.len());
            assert_eq!(net.download.len(), net.upload.len());
        }
        let up = buf.snapshot(Channel::NetworkUpload);
        let down = buf.snapshot(Channel::NetworkDownload);
        assert_eq!(up.len(), 5);
        for (u, d) in up.iter().zip(down.iter()) {
            assert_eq!(u.timestamp, d.timestamp);
            assert_eq!(u.value, d.value * 2.0);
        }
    }

    #[test]
    fn capacity_holds_across_mixed_ticks() {
        let mut buf = RollingMetricsBuffer::new(10);
        for i in 0..57 {
            let snap = SystemSnapshot {
                cpu: Some(CpuReading {
                    percent: Some((i % 100) as f64),
                    ..Default::default()
                }),
                memory: (i % 3 != 0).then(|| MemoryReading {
                    percent: Some(50.0),
                    ..Default::default()
                }),
                gpu: Some(if i % 2 == 0 {
                    vec![GpuReading {
                        load: Some(12.0),
                        ..Default::default()
                    }]
                } else {
                    Vec::new()
                }),
                network: Some(NetworkReading {
                    download_speed: Some(1.0),
                    upload_speed: Some(2.0),
                    ..Default::default()
                }),
                ..Default::default()
            };
            buf.apply_snapshot(&snap, &format!("t{i}"));
            for channel in Channel::ALL {
                assert!(buf.len(channel) <= 10, "{channel} overflowed");
            }
        }
        assert_eq!(buf.len(Channel::Cpu), 10);
        assert_eq!(buf.len(Channel::Disk), 0);
        assert_eq!(buf.running_stats(Gauge::Gpu).unwrap().count, 29);
    }

    #[test]
    fn empty_gpu_list_is_unavailable() {
        let mut buf = RollingMetricsBuffer::default();
        let with_gpu = SystemSnapshot {
            gpu: Some(vec![GpuReading {
                load: Some(33.0),
                ..Default::default()
            }]),
            ..Default::default()
        };
        buf.apply_snapshot(&with_gpu, "a");
        let stats = buf.running_stats(Gauge::Gpu);

        let avail = buf.apply_snapshot(
            &SystemSnapshot {
                gpu: Some(Vec::new()),
                ..Default::default()
            },
            "b",
        );
        assert!(!avail.gpu);
        assert_eq!(buf.current_stats(Channel::Gpu).current, None);
        assert_eq!(buf.running_stats(Gauge::Gpu), stats);
        assert_eq!(values(&buf, Channel::Gpu), vec![33.0]);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let mut buf = RollingMetricsBuffer::new(2);
        cpu_tick(&mut buf, 0, Some(1.0), false);
        let mut copy = buf.snapshot(Channel::Cpu);
        copy.clear();
        copy.push(Sample::new("x", 9.0));
        assert_eq!(values(&buf, Channel::Cpu), vec![1.0]);
    }

    #[test]
    fn channel_names_parse() {
        for channel in Channel::ALL {
            assert_eq!(channel.as_str().parse::<Channel>().unwrap(), channel);
        }
        assert!("swap".parse::<Channel>().is_err());
    }
}
