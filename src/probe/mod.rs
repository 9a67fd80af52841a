//! Transport used by the monitor to reach the backend health endpoint.

mod http;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::CheckResult;

pub use self::http::HttpHealthProbe;

/// Abstraction over a single request to the backend health endpoint.
pub trait HealthProbe: Send + Sync {
    /// Issue one request and return the decoded JSON body.
    fn probe(&self) -> BoxFuture<'static, CheckResult<Value>>;

    /// Location probed, used in logs.
    fn target(&self) -> &str;
}
