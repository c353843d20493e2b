use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::error::SourceError;

/// Health classification attached to a gauge reading.
///
/// Unknown labels read as `Normal`, the same as a missing badge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Warning,
    Critical,
    #[default]
    #[serde(other)]
    Normal,
}

impl Status {
    /// Derives a status from a usage percentage when the source did not send one.
    pub fn from_percent(percent: f64) -> Self {
        if percent < 60.0 {
            Status::Normal
        } else if percent < 80.0 {
            Status::Warning
        } else {
            Status::Critical
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Status::Normal => "Normal",
            Status::Warning => "Warning",
            Status::Critical => "Critical",
        }
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuReading {
    pub percent: Option<f64>,
    pub per_core: Vec<f64>,
    pub frequency: Option<f64>,
    pub temperature: Option<f64>,
    pub status: Option<Status>,
    #[serde(deserialize_with = "error_flag")]
    pub error: bool,
}

/// Memory figures are in GB.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryReading {
    pub percent: Option<f64>,
    pub used: Option<f64>,
    pub available: Option<f64>,
    pub total: Option<f64>,
    pub swap_percent: Option<f64>,
    pub swap_used: Option<f64>,
    pub status: Option<Status>,
    #[serde(deserialize_with = "error_flag")]
    pub error: bool,
}

/// `load` is a percentage; memory figures are in MB.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuReading {
    pub id: Option<u32>,
    pub name: Option<String>,
    pub load: Option<f64>,
    pub temperature: Option<f64>,
    pub memory_used: Option<f64>,
    pub memory_total: Option<f64>,
    pub memory_percent: Option<f64>,
    pub status: Option<Status>,
    #[serde(deserialize_with = "error_flag")]
    pub error: bool,
}

/// Space in GB, throughput in MB/s.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DiskReading {
    pub percent: Option<f64>,
    pub used: Option<f64>,
    pub free: Option<f64>,
    pub total: Option<f64>,
    pub read_speed: Option<f64>,
    pub write_speed: Option<f64>,
    pub status: Option<Status>,
    #[serde(deserialize_with = "error_flag")]
    pub error: bool,
}

/// Totals in GB, speeds in MB/s.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkReading {
    pub bytes_sent: Option<f64>,
    pub bytes_recv: Option<f64>,
    pub upload_speed: Option<f64>,
    pub download_speed: Option<f64>,
    pub packets_sent: Option<u64>,
    pub packets_recv: Option<u64>,
    #[serde(deserialize_with = "error_flag")]
    pub error: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessInfo {
    pub pid: Option<u32>,
    pub name: Option<String>,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    #[serde(deserialize_with = "error_flag", skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// One `system_data` tick.
///
/// Each sub-record decodes on its own: a record with the wrong shape is
/// logged and treated as missing, without failing the rest of the tick.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSnapshot {
    pub timestamp: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub cpu: Option<CpuReading>,
    #[serde(deserialize_with = "lenient")]
    pub memory: Option<MemoryReading>,
    #[serde(deserialize_with = "lenient")]
    pub gpu: Option<Vec<GpuReading>>,
    #[serde(deserialize_with = "lenient")]
    pub disk: Option<DiskReading>,
    #[serde(deserialize_with = "lenient")]
    pub network: Option<NetworkReading>,
    #[serde(deserialize_with = "lenient")]
    pub processes: Option<Vec<ProcessInfo>>,
}

impl SystemSnapshot {
    /// First GPU of the list, if the source reported one.
    pub fn primary_gpu(&self) -> Option<&GpuReading> {
        self.gpu.as_ref().and_then(|gpus| gpus.first())
    }

    /// Process rows usable for display; error rows and rows without a pid are dropped.
    pub fn process_rows(&self) -> Vec<ProcessInfo> {
        self.processes
            .iter()
            .flatten()
            .filter(|p| !p.error && p.pid.is_some())
            .cloned()
            .collect()
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!("Dropping malformed sub-record: {}", e);
            None
        }
    }))
}

/// Reads a source `error` field as a flag. The collector sends either a
/// message or a boolean; `null`, `false`, `""` and `0` all mean "no error".
fn error_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(flag) => flag,
        serde_json::Value::String(message) => !message.is_empty(),
        serde_json::Value::Number(n) => n.as_f64() != Some(0.0),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    })
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeUpdate {
    pub duration: String,
    pub remaining: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringComplete {
    pub message: String,
    pub pdf_path: Option<String>,
}

/// Everything the metrics source can push at the dashboard.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum DashboardEvent {
    SystemData(SystemSnapshot),
    TimeUpdate(TimeUpdate),
    MonitoringComplete(MonitoringComplete),
}

impl DashboardEvent {
    pub const SYSTEM_DATA: &'static str = "system_data";
    pub const TIME_UPDATE: &'static str = "time_update";
    pub const MONITORING_COMPLETE: &'static str = "monitoring_complete";

    /// Decodes an event from its name and JSON payload, as carried by SSE frames.
    /// An empty name (or the SSE default `message`) means `system_data`.
    pub fn from_parts(name: &str, data: &str) -> Result<Self, SourceError> {
        match name {
            "" | "message" | Self::SYSTEM_DATA => {
                Ok(DashboardEvent::SystemData(serde_json::from_str(data)?))
            }
            Self::TIME_UPDATE => Ok(DashboardEvent::TimeUpdate(serde_json::from_str(data)?)),
            Self::MONITORING_COMPLETE => Ok(DashboardEvent::MonitoringComplete(
                serde_json::from_str(data)?,
            )),
            other => Err(SourceError::UnknownEvent(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DashboardEvent::SystemData(_) => Self::SYSTEM_DATA,
            DashboardEvent::TimeUpdate(_) => Self::TIME_UPDATE,
            DashboardEvent::MonitoringComplete(_) => Self::MONITORING_COMPLETE,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Local wall-clock label used as the chart axis for a tick.
pub fn clock_label() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}
