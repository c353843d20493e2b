//! Live dashboard client for pushed system-metric snapshots.
//!
//! Events from a metrics source ([`source`]) are published on a
//! single-threaded bus ([`bus`]) to the [`dashboard::Dashboard`], which keeps
//! the bounded chart history in a [`rolling::RollingMetricsBuffer`] and
//! publishes a detached [`view::DashboardView`] for the terminal
//! ([`console`]) and HTTP ([`api`]) renderers.

pub mod api;
pub mod bus;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod error;
pub mod format;
pub mod metrics;
pub mod rolling;
pub mod runtime;
pub mod source;
pub mod storage;
pub mod view;
