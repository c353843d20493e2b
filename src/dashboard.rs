use crate::format;
use crate::metrics::{
    CpuReading, DashboardEvent, DiskReading, GpuReading, MemoryReading, MonitoringComplete,
    ProcessInfo, Status, SystemSnapshot, TimeUpdate,
};
use crate::rolling::{Channel, Gauge, RollingMetricsBuffer};
use crate::view::{
    Badge, Completion, DashboardView, Detail, GaugeWidget, NetworkWidget, SessionState,
};
use tracing::{debug, info};

#[derive(Clone, Debug, Default)]
struct GaugeDisplay {
    badge: Option<Badge>,
    details: Vec<Detail>,
}

/// Session-scoped dashboard state: the rolling buffers plus everything shown
/// without buffering (badges, detail lines, process table, clock, completion).
pub struct Dashboard {
    buffer: RollingMetricsBuffer,
    displays: [GaugeDisplay; 4],
    processes: Vec<ProcessInfo>,
    clock: Option<TimeUpdate>,
    completion: Option<Completion>,
    tick: u64,
    last_update: Option<String>,
}

impl Dashboard {
    pub fn new(max_points: usize) -> Self {
        Self {
            buffer: RollingMetricsBuffer::new(max_points),
            displays: Gauge::ALL.map(|g| GaugeDisplay {
                badge: None,
                details: unavailable_details(g),
            }),
            processes: Vec::new(),
            clock: None,
            completion: None,
            tick: 0,
            last_update: None,
        }
    }

    pub fn buffer(&self) -> &RollingMetricsBuffer {
        &self.buffer
    }

    /// Applies one inbound event. `label` is the chart timestamp for a
    /// `system_data` tick and is ignored by the other events.
    pub fn handle(&mut self, event: &DashboardEvent, label: &str) {
        match event {
            DashboardEvent::SystemData(snapshot) => self.ingest_tick(snapshot, label),
            DashboardEvent::TimeUpdate(clock) => self.clock = Some(clock.clone()),
            DashboardEvent::MonitoringComplete(done) => self.complete(done),
        }
    }

    fn ingest_tick(&mut self, snapshot: &SystemSnapshot, label: &str) {
        let available = self.buffer.apply_snapshot(snapshot, label);
        self.tick += 1;
        self.last_update = Some(label.to_string());

        self.displays[0] = cpu_display(snapshot.cpu.as_ref().filter(|_| available.cpu));
        self.displays[1] = memory_display(snapshot.memory.as_ref().filter(|_| available.memory));
        self.displays[2] = gpu_display(snapshot.primary_gpu().filter(|_| available.gpu));
        self.displays[3] = disk_display(snapshot.disk.as_ref().filter(|_| available.disk));

        let rows = snapshot.process_rows();
        if !rows.is_empty() {
            self.processes = rows;
        }

        debug!(tick = self.tick, ?available, "Ingested snapshot");
    }

    fn complete(&mut self, done: &MonitoringComplete) {
        let message = match &done.pdf_path {
            Some(path) => format!("Monitoring complete! PDF report generated: {path}"),
            None => done.message.clone(),
        };
        info!("{}", message);
        self.completion = Some(Completion {
            message,
            report_path: done.pdf_path.clone(),
        });
    }

    /// Builds a detached view of the current state.
    pub fn view(&self) -> DashboardView {
        let widgets = Gauge::ALL.map(|g| self.gauge_widget(g));
        let [cpu, memory, gpu, disk] = widgets;

        let net = self.buffer.network_snapshot();
        let down = self.buffer.current_stats(Channel::NetworkDownload);
        let up = self.buffer.current_stats(Channel::NetworkUpload);
        DashboardView {
            tick: self.tick,
            last_update: self.last_update.clone(),
            state: if self.completion.is_some() {
                SessionState::Complete
            } else {
                SessionState::Monitoring
            },
            cpu,
            memory,
            gpu,
            disk,
            network: NetworkWidget {
                available: down.current.is_some(),
                download: format::mb_per_sec(down.current),
                upload: format::mb_per_sec(up.current),
                download_stats: down,
                upload_stats: up,
                series: net,
            },
            processes: self.processes.clone(),
            clock: self.clock.clone(),
            completion: self.completion.clone(),
        }
    }

    fn gauge_widget(&self, gauge: Gauge) -> GaugeWidget {
        let stats = self.buffer.current_stats(gauge.into());
        let display = &self.displays[gauge as usize];
        GaugeWidget {
            channel: gauge.into(),
            available: stats.current.is_some(),
            current: format::pct(stats.current),
            average: format::pct(stats.average),
            max: format::pct(stats.max),
            badge: display.badge.clone(),
            details: display.details.clone(),
            stats,
            series: self.buffer.snapshot(gauge.into()),
        }
    }
}

fn badge(explicit: Option<Status>, percent: Option<f64>) -> Option<Badge> {
    explicit
        .or_else(|| percent.map(Status::from_percent))
        .map(Badge::from)
}

fn unavailable_details(gauge: Gauge) -> Vec<Detail> {
    let na = || format::UNAVAILABLE.to_string();
    match gauge {
        Gauge::Cpu => vec![Detail::new("Temp", na())],
        Gauge::Memory => vec![Detail::new("Used", na()), Detail::new("Available", na())],
        Gauge::Gpu => vec![Detail::new("Temp", na()), Detail::new("Memory", na())],
        Gauge::Disk => vec![Detail::new("Read", na()), Detail::new("Write", na())],
    }
}

fn cpu_display(reading: Option<&CpuReading>) -> GaugeDisplay {
    let Some(r) = reading else {
        return GaugeDisplay {
            badge: None,
            details: unavailable_details(Gauge::Cpu),
        };
    };
    GaugeDisplay {
        badge: badge(r.status, r.percent),
        details: vec![Detail::new("Temp", format::celsius(r.temperature))],
    }
}

fn memory_display(reading: Option<&MemoryReading>) -> GaugeDisplay {
    let Some(r) = reading else {
        return GaugeDisplay {
            badge: None,
            details: unavailable_details(Gauge::Memory),
        };
    };
    GaugeDisplay {
        badge: badge(r.status, r.percent),
        details: vec![
            Detail::new("Used", format::gigabytes(r.used)),
            Detail::new("Available", format::gigabytes(r.available)),
        ],
    }
}

fn gpu_display(reading: Option<&GpuReading>) -> GaugeDisplay {
    let Some(r) = reading else {
        return GaugeDisplay {
            badge: None,
            details: unavailable_details(Gauge::Gpu),
        };
    };
    GaugeDisplay {
        badge: badge(r.status, r.load),
        details: vec![
            Detail::new("Temp", format::celsius(r.temperature)),
            Detail::new("Memory", format::megabyte_ratio(r.memory_used, r.memory_total)),
        ],
    }
}

fn disk_display(reading: Option<&DiskReading>) -> GaugeDisplay {
    let Some(r) = reading else {
        return GaugeDisplay {
            badge: None,
            details: unavailable_details(Gauge::Disk),
        };
    };
    GaugeDisplay {
        badge: badge(r.status, r.percent),
        details: vec![
            Detail::new("Read", format::mb_per_sec(r.read_speed)),
            Detail::new("Write", format::mb_per_sec(r.write_speed)),
        ],
    }
}
