//! Decoding of the backend `/health` payload.

use std::fmt;

use serde_json::Value;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::debug;

use crate::error::{CheckError, CheckResult};

/// Overall status reported by the backend `/health` route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceStatus {
    /// Database and LLM are both available.
    Healthy,
    /// Backend reachable but one of its dependencies is down.
    Degraded,
    /// Backend reachable but not able to serve consultations.
    Unhealthy,
    /// Any other status string; never counts as healthy.
    Other(String),
}

impl ServiceStatus {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Degraded => "degraded",
            ServiceStatus::Unhealthy => "unhealthy",
            ServiceStatus::Other(raw) => raw,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ServiceStatus {
    fn from(value: &str) -> Self {
        match value {
            "healthy" => ServiceStatus::Healthy,
            "degraded" => ServiceStatus::Degraded,
            "unhealthy" => ServiceStatus::Unhealthy,
            other => ServiceStatus::Other(other.to_string()),
        }
    }
}

/// Snapshot of the last successful health check.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthStatus {
    /// Status as reported by the backend; never derived from the flags below.
    pub status: ServiceStatus,
    /// Whether the backend could reach its database.
    pub database_ok: bool,
    /// Whether the backend could reach the LLM service.
    pub llm_ok: bool,
    /// Instant the backend produced the report, when it sent a valid RFC 3339 timestamp.
    pub timestamp: Option<OffsetDateTime>,
}

impl HealthStatus {
    /// Decode the JSON body returned by `GET /health`.
    ///
    /// Only `status` is mandatory. Missing dependency flags read as `false` and a missing or
    /// unparseable timestamp is dropped.
    pub fn from_payload(payload: &Value) -> CheckResult<Self> {
        let Some(body) = payload.as_object() else {
            return Err(CheckError::malformed("expected a JSON object"));
        };

        let status = match body.get("status") {
            Some(Value::String(status)) => ServiceStatus::from(status.as_str()),
            Some(_) => return Err(CheckError::malformed("`status` field is not a string")),
            None => return Err(CheckError::malformed("missing string `status` field")),
        };

        let flag = |key: &str| body.get(key).and_then(Value::as_bool).unwrap_or(false);

        let timestamp = body
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|raw| match OffsetDateTime::parse(raw, &Rfc3339) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    debug!(timestamp = raw, error = %err, "ignoring unparseable health timestamp");
                    None
                }
            });

        Ok(Self {
            status,
            database_ok: flag("database"),
            llm_ok: flag("llm"),
            timestamp,
        })
    }

    /// Whether the backend declared itself fully healthy.
    pub fn is_healthy(&self) -> bool {
        self.status == ServiceStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_full_payload() {
        let status = HealthStatus::from_payload(&json!({
            "status": "healthy",
            "database": true,
            "llm": true,
            "timestamp": "2024-05-01T10:00:00Z"
        }))
        .unwrap();

        assert_eq!(status.status, ServiceStatus::Healthy);
        assert!(status.database_ok);
        assert!(status.llm_ok);
        assert_eq!(status.timestamp.unwrap().unix_timestamp(), 1_714_557_600);
        assert!(status.is_healthy());
    }

    #[test]
    fn trusts_status_over_flags() {
        let status = HealthStatus::from_payload(&json!({
            "status": "degraded",
            "database": true,
            "llm": true
        }))
        .unwrap();

        assert_eq!(status.status, ServiceStatus::Degraded);
        assert!(!status.is_healthy());
        assert!(status.timestamp.is_none());
    }

    #[test]
    fn bad_timestamp_is_dropped() {
        let status = HealthStatus::from_payload(&json!({
            "status": "unhealthy",
            "database": false,
            "llm": true,
            "timestamp": "yesterday"
        }))
        .unwrap();

        assert_eq!(status.status, ServiceStatus::Unhealthy);
        assert!(!status.database_ok);
        assert!(status.timestamp.is_none());
    }

    #[test]
    fn rejects_missing_or_invalid_status() {
        let missing = HealthStatus::from_payload(&json!({ "database": true })).unwrap_err();
        assert!(missing.to_string().contains("missing string `status`"));

        let numeric = HealthStatus::from_payload(&json!({ "status": 1 })).unwrap_err();
        assert!(numeric.to_string().contains("not a string"));

        assert!(HealthStatus::from_payload(&json!(["healthy"])).is_err());
    }

    #[test]
    fn unknown_status_string_is_kept_but_not_healthy() {
        let status = HealthStatus::from_payload(&json!({
            "status": "ok",
            "database": true,
            "llm": true
        }))
        .unwrap();

        assert_eq!(status.status, ServiceStatus::Other("ok".into()));
        assert_eq!(status.status.to_string(), "ok");
        assert!(!status.is_healthy());
    }
}
