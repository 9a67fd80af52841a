#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use consult_health::{CheckError, error::CheckResult, probe::HealthProbe};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tokio::{
    sync::oneshot,
    time::{Instant, sleep},
};

/// Scripted answer for one probe call.
pub enum Reply {
    Body(Value),
    Fail(String),
    /// Resolve once the test sends the outcome.
    Wait(oneshot::Receiver<Result<Value, String>>),
}

/// Probe replaying scripted replies; answers `healthy` once the script runs out.
pub struct ScriptedProbe {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Instant>>,
    latency: Duration,
}

impl ScriptedProbe {
    pub fn new(replies: impl IntoIterator<Item = Reply>) -> Arc<Self> {
        Self::with_latency(replies, Duration::ZERO)
    }

    pub fn with_latency(replies: impl IntoIterator<Item = Reply>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            latency,
        })
    }

    pub fn healthy() -> Arc<Self> {
        Self::new(Vec::<Reply>::new())
    }

    pub fn healthy_after(latency: Duration) -> Arc<Self> {
        Self::with_latency(Vec::<Reply>::new(), latency)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Milliseconds between `start` and each probe call.
    pub fn call_offsets(&self, start: Instant) -> Vec<u64> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(start).as_millis() as u64)
            .collect()
    }
}

impl HealthProbe for ScriptedProbe {
    fn probe(&self) -> BoxFuture<'static, CheckResult<Value>> {
        self.calls.lock().unwrap().push(Instant::now());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Body(healthy_body()));
        let latency = self.latency;

        Box::pin(async move {
            if !latency.is_zero() {
                sleep(latency).await;
            }
            match reply {
                Reply::Body(body) => Ok(body),
                Reply::Fail(message) => Err(CheckError::transport(message)),
                Reply::Wait(rx) => match rx.await {
                    Ok(Ok(body)) => Ok(body),
                    Ok(Err(message)) => Err(CheckError::transport(message)),
                    Err(_) => Err(CheckError::transport("probe abandoned")),
                },
            }
        })
    }

    fn target(&self) -> &str {
        "scripted://health"
    }
}

pub fn healthy_body() -> Value {
    json!({
        "status": "healthy",
        "database": true,
        "llm": true,
        "timestamp": "2024-05-01T10:00:00Z"
    })
}

pub fn degraded_body() -> Value {
    json!({
        "status": "degraded",
        "database": true,
        "llm": false,
        "timestamp": "2024-05-01T10:00:05Z"
    })
}

pub fn fail(message: &str) -> Reply {
    Reply::Fail(message.to_string())
}
