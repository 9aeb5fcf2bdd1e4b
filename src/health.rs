//! Backend liveness monitoring
//!
//! A probe hits `GET /api/health` with a short timeout; the monitor runs it
//! on a fixed interval and publishes the latest result. Nothing here touches
//! conversation state.

use crate::config::ClientConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Why a probe reported the backend unhealthy
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("Health check timed out after {0:?}")]
    Timeout(Duration),
    #[error("Health request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Backend returned HTTP {0}")]
    Status(StatusCode),
    #[error("Backend reported status '{0}'")]
    NotOk(String),
}

/// Single liveness check
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// `true` only if the backend answered and reported itself healthy
    async fn probe(&self) -> bool;
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    status: String,
}

/// Probe against the backend's health endpoint
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
    url: String,
    timeout: Duration,
}

impl HttpHealthProbe {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, HealthError> {
        Ok(Self {
            client: Client::builder().build()?,
            url: config.health_url(),
            timeout: config.health_timeout,
        })
    }

    /// Run the check, keeping the failure reason
    ///
    /// # Errors
    ///
    /// Returns why the backend counts as unhealthy: timeout, transport
    /// failure, non-success status, or a body whose status is not `ok`.
    pub async fn check(&self) -> Result<(), HealthError> {
        let request = async {
            let response = self.client.get(&self.url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(HealthError::Status(status));
            }
            let body: HealthResponse = response.json().await?;
            if body.status == "ok" {
                Ok(())
            } else {
                Err(HealthError::NotOk(body.status))
            }
        };

        timeout(self.timeout, request)
            .await
            .map_err(|_| HealthError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self) -> bool {
        match self.check().await {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(url = %self.url, error = %e, "Health probe failed");
                false
            }
        }
    }
}

/// Periodic probe publishing the latest backend status.
///
/// Reports `false` until the first probe completes. The background task runs
/// until [`HealthMonitor::shutdown`] or until the monitor is dropped.
pub struct HealthMonitor {
    status_rx: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl HealthMonitor {
    /// Start probing immediately, then once per `interval`
    #[must_use]
    pub fn spawn<P>(probe: P, interval: Duration) -> Self
    where
        P: HealthProbe + 'static,
    {
        let (status_tx, status_rx) = watch::channel(false);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(probe, interval, status_tx, cancel.clone()));

        Self {
            status_rx,
            cancel,
            task: Some(task),
        }
    }

    #[must_use]
    pub fn is_healthy(&self) -> bool {
        *self.status_rx.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.status_rx.clone()
    }

    /// Stop probing and wait for the background task to finish
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for HealthMonitor {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<P: HealthProbe>(
    probe: P,
    interval: Duration,
    status_tx: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let healthy = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            healthy = probe.probe() => healthy,
        };

        let previous = status_tx.send_replace(healthy);
        if previous != healthy {
            if healthy {
                tracing::info!("Backend connected");
            } else {
                tracing::warn!("Backend unreachable");
            }
        }
    }

    tracing::debug!("Health monitor stopped");
}
