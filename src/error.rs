//! Error types for health checks and configuration loading.

use std::{error::Error, path::PathBuf};

use reqwest::StatusCode;
use thiserror::Error;

/// Boxed error used to carry arbitrary probe failures.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Result alias for a single health probe.
pub type CheckResult<T> = Result<T, CheckError>;

/// Failures that can occur while probing the backend health endpoint.
#[derive(Debug, Error)]
pub enum CheckError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build health client")]
    ClientBuilder {
        /// Underlying reqwest failure.
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or no response arrived.
    #[error("failed to reach health endpoint `{url}`")]
    Request {
        /// Health URL that was requested.
        url: String,
        /// Underlying transport failure.
        #[source]
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status code.
    #[error("health endpoint `{url}` answered with status {status}")]
    Status {
        /// Health URL that was requested.
        url: String,
        /// Status code returned by the backend.
        status: StatusCode,
    },
    /// The response body was not valid JSON.
    #[error("failed to decode health response from `{url}`")]
    Decode {
        /// Health URL that was requested.
        url: String,
        /// Underlying decoding failure.
        #[source]
        source: reqwest::Error,
    },
    /// The body was JSON but did not carry a well-formed `status`.
    #[error("malformed health response: {reason}")]
    Malformed {
        /// What was wrong with the body.
        reason: String,
    },
    /// Generic transport failure reported by a non-HTTP probe.
    #[error("{message}")]
    Transport {
        /// Message reported by the probe.
        message: String,
        /// Optional underlying cause.
        #[source]
        source: Option<BoxError>,
    },
}

impl CheckError {
    /// Construct a transport failure from a plain message.
    pub fn transport(message: impl Into<String>) -> Self {
        CheckError::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Construct a transport failure wrapping an underlying error.
    pub fn transport_with(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        CheckError::Transport {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CheckError::Malformed {
            reason: reason.into(),
        }
    }

    /// Render the error followed by its source chain, e.g. `outer: inner: cause`.
    pub fn describe(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(cause) = source {
            let text = cause.to_string();
            if !message.ends_with(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = cause.source();
        }
        message
    }
}

/// Failures raised while loading the monitor configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read config `{}`", .path.display())]
    Read {
        /// File that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid JSON for the expected shape.
    #[error("failed to parse config `{}`", .path.display())]
    Parse {
        /// File that was parsed.
        path: PathBuf,
        /// Underlying JSON failure.
        #[source]
        source: serde_json::Error,
    },
    /// A setting carried a value that cannot be used.
    #[error("invalid value `{value}` for `{key}`")]
    InvalidValue {
        /// Setting name.
        key: &'static str,
        /// Rejected value.
        value: String,
    },
}
