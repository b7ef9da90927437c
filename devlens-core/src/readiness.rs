//! Readiness poller - waits for the dev server to answer HTTP
//!
//! Probes the root URL at a fixed interval until one request gets a response
//! or the timeout elapses. Failed probes are retried; there is no backoff.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::{Instant, sleep};

use crate::defaults::{HTTP_PROBE_TIMEOUT, READINESS_POLL_INTERVAL};
use crate::error::HostError;

/// A single reachability check against a URL
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<(), HostError>;
}

/// Probe that treats any HTTP response as reachable
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new() -> Result<Self, HostError> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .timeout(HTTP_PROBE_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<(), HostError> {
        self.client.get(url).send().await?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Readiness {
    Ready { attempts: u32 },
    TimedOut { attempts: u32 },
    /// Waiting was disabled or there was no URL to probe.
    Skipped,
}

pub struct ReadinessPoller {
    probe: Arc<dyn Probe>,
    interval: Duration,
}

impl ReadinessPoller {
    pub fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            interval: READINESS_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// A zero timeout disables waiting. A probe that hangs can hold the loop
    /// past the deadline by up to the probe's own timeout.
    pub async fn wait_until_ready(&self, url: &str, timeout: Duration) -> Readiness {
        if timeout.is_zero() {
            return Readiness::Skipped;
        }

        let started = Instant::now();
        let mut attempts = 0;

        while started.elapsed() < timeout {
            attempts += 1;
            match self.probe.probe(url).await {
                Ok(()) => {
                    tracing::debug!(url = %url, attempts, "Server responded");
                    return Readiness::Ready { attempts };
                }
                Err(e) => {
                    tracing::debug!(url = %url, attempt = attempts, error = %e, "Readiness probe failed");
                }
            }
            sleep(self.interval).await;
        }

        Readiness::TimedOut { attempts }
    }
}
