use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;

use crate::error::{CheckError, CheckResult};

use super::HealthProbe;

/// Probe issuing `GET {backend_url}/health` through a shared [`reqwest::Client`].
///
/// No request timeout is configured; the transport defaults apply.
#[derive(Clone)]
pub struct HttpHealthProbe {
    client: Client,
    url: Arc<str>,
}

impl HttpHealthProbe {
    /// Build a probe targeting the `/health` route below `backend_url`.
    pub fn new(backend_url: &str) -> CheckResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| CheckError::ClientBuilder { source })?;
        Ok(Self::with_client(client, backend_url))
    }

    /// Build a probe reusing an existing client.
    pub fn with_client(client: Client, backend_url: &str) -> Self {
        let url = Arc::<str>::from(format!("{}/health", backend_url.trim_end_matches('/')));
        Self { client, url }
    }

    async fn fetch(client: Client, url: Arc<str>) -> CheckResult<Value> {
        let response = client
            .get(url.as_ref())
            .send()
            .await
            .map_err(|source| CheckError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::Status {
                url: url.to_string(),
                status,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|source| CheckError::Decode {
                url: url.to_string(),
                source,
            })
    }
}

impl HealthProbe for HttpHealthProbe {
    fn probe(&self) -> BoxFuture<'static, CheckResult<Value>> {
        Box::pin(Self::fetch(self.client.clone(), self.url.clone()))
    }

    fn target(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_health_route() {
        let probe = HttpHealthProbe::new("http://localhost:8000").unwrap();
        assert_eq!(probe.target(), "http://localhost:8000/health");
    }

    #[test]
    fn strips_trailing_slashes() {
        let probe = HttpHealthProbe::new("https://api.example.org/v1//").unwrap();
        assert_eq!(probe.target(), "https://api.example.org/v1/health");
    }
}
