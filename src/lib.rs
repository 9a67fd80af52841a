//! Library crate for consult-health, the backend liveness monitor of the consultation app.

pub mod config;
pub mod dto;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod services;

pub use config::MonitorConfig;
pub use dto::health::{HealthStatus, ServiceStatus};
pub use error::CheckError;
pub use monitor::{HealthMonitor, MonitorState};
