//! Observable monitor state and the rules for recording a check outcome.

use crate::{dto::health::HealthStatus, error::CheckError};

/// Observable state of a [`HealthMonitor`](super::HealthMonitor).
///
/// A fresh monitor starts with every flag cleared and nothing recorded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorState {
    /// The last check succeeded and the backend reported `healthy`.
    pub is_healthy: bool,
    /// A check is currently waiting on the backend.
    pub is_checking: bool,
    /// Body of the last successful check.
    pub last_status: Option<HealthStatus>,
    /// Description of the last failure, cleared by a successful check.
    pub last_error: Option<String>,
}

impl MonitorState {
    /// Record the outcome of a completed check.
    pub(crate) fn record(&mut self, outcome: Result<HealthStatus, CheckError>) {
        match outcome {
            Ok(status) => {
                self.is_healthy = status.is_healthy();
                self.last_status = Some(status);
                self.last_error = None;
            }
            Err(err) => {
                self.is_healthy = false;
                self.last_status = None;
                self.last_error = Some(err.describe());
            }
        }
    }
}
