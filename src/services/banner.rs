//! Status banner presentation derived from the monitor state.

use std::fmt;

use crate::monitor::MonitorState;

/// What the status banner should show for a given monitor state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Banner {
    /// Nothing has been checked yet.
    Unknown,
    /// First check in progress.
    Checking,
    /// Backend fully healthy; the banner is not shown.
    Hidden,
    /// Backend reachable but a dependency is down.
    Degraded {
        /// Database reachable from the backend.
        database_ok: bool,
        /// LLM service reachable from the backend.
        llm_ok: bool,
    },
    /// Backend unreachable or answering garbage.
    Offline {
        /// Last error recorded by the monitor.
        reason: String,
    },
}

impl Banner {
    /// Derive the banner from the current monitor state.
    pub fn from_state(state: &MonitorState) -> Self {
        if state.is_healthy {
            return Banner::Hidden;
        }

        if let Some(status) = &state.last_status {
            return Banner::Degraded {
                database_ok: status.database_ok,
                llm_ok: status.llm_ok,
            };
        }

        match &state.last_error {
            Some(reason) => Banner::Offline {
                reason: reason.clone(),
            },
            None if state.is_checking => Banner::Checking,
            None => Banner::Unknown,
        }
    }

    /// Whether the UI should display the banner at all.
    pub fn is_visible(&self) -> bool {
        !matches!(self, Banner::Hidden | Banner::Unknown)
    }
}

impl fmt::Display for Banner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Banner::Unknown => f.write_str("backend status unknown"),
            Banner::Checking => f.write_str("checking backend status..."),
            Banner::Hidden => f.write_str("all systems operational"),
            Banner::Degraded {
                database_ok,
                llm_ok,
            } => {
                let down: Vec<&str> = [("database", *database_ok), ("AI assistant", *llm_ok)]
                    .into_iter()
                    .filter_map(|(name, ok)| (!ok).then_some(name))
                    .collect();
                if down.is_empty() {
                    f.write_str("service degraded")
                } else {
                    write!(f, "service degraded: {} unavailable", down.join(" and "))
                }
            }
            Banner::Offline { reason } => write!(f, "backend unreachable: {reason}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::dto::health::{HealthStatus, ServiceStatus};

    use super::*;

    fn with_status(status: ServiceStatus, database_ok: bool, llm_ok: bool) -> MonitorState {
        MonitorState {
            is_healthy: status == ServiceStatus::Healthy,
            is_checking: false,
            last_status: Some(HealthStatus {
                status,
                database_ok,
                llm_ok,
                timestamp: None,
            }),
            last_error: None,
        }
    }

    #[test]
    fn fresh_state_is_unknown_then_checking() {
        let mut state = MonitorState::default();
        assert_eq!(Banner::from_state(&state), Banner::Unknown);

        state.is_checking = true;
        assert_eq!(Banner::from_state(&state), Banner::Checking);
        assert!(Banner::Checking.is_visible());
    }

    #[test]
    fn healthy_hides_banner() {
        let banner = Banner::from_state(&with_status(ServiceStatus::Healthy, true, true));
        assert_eq!(banner, Banner::Hidden);
        assert!(!banner.is_visible());
    }

    #[test]
    fn degraded_names_missing_dependencies() {
        let banner = Banner::from_state(&with_status(ServiceStatus::Degraded, true, false));
        assert_eq!(banner.to_string(), "service degraded: AI assistant unavailable");

        let banner = Banner::from_state(&with_status(ServiceStatus::Unhealthy, false, false));
        assert_eq!(
            banner.to_string(),
            "service degraded: database and AI assistant unavailable"
        );
    }

    #[test]
    fn failure_shows_offline_reason() {
        let state = MonitorState {
            last_error: Some("Network request failed".into()),
            is_checking: true,
            ..MonitorState::default()
        };
        let banner = Banner::from_state(&state);
        assert_eq!(banner.to_string(), "backend unreachable: Network request failed");
    }
}
