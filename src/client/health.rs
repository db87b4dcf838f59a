//! Background liveness monitoring of the REST backend
//!
//! The monitor probes `GET /health` on a fixed interval from a tokio task and
//! publishes the latest result on a watch channel. It stops when its
//! cancellation token fires.

use std::fmt;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::api::ApiClient;

/// Last known state of the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    /// Not probed yet
    Unknown,
    Online,
    Offline,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Unknown => write!(f, "unknown"),
            HealthStatus::Online => write!(f, "online"),
            HealthStatus::Offline => write!(f, "offline"),
        }
    }
}

/// Periodic health probe running on a tokio task
#[derive(Debug)]
pub struct HealthMonitor {
    status: watch::Receiver<HealthStatus>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl HealthMonitor {
    /// Start probing every `interval`
    ///
    /// The first probe runs immediately. Must be called from within a tokio
    /// runtime.
    pub fn spawn(client: ApiClient, interval: Duration) -> Self {
        let (sender, status) = watch::channel(HealthStatus::Unknown);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let next = if client.health().await {
                            HealthStatus::Online
                        } else {
                            HealthStatus::Offline
                        };
                        sender.send_if_modified(|current| {
                            if *current == next {
                                return false;
                            }
                            tracing::info!("Backend is {}", next);
                            *current = next;
                            true
                        });
                    }
                }
            }
            tracing::debug!("Health monitor stopped");
        });

        Self {
            status,
            cancel,
            task,
        }
    }

    /// Most recent probe result
    pub fn status(&self) -> HealthStatus {
        *self.status.borrow()
    }

    /// Receiver notified whenever the status changes
    pub fn subscribe(&self) -> watch::Receiver<HealthStatus> {
        self.status.clone()
    }

    /// Token that stops the monitor when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Stop probing and wait for the task to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!("Health monitor task failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::config::ClientConfig;

    #[tokio::test]
    async fn test_unreachable_backend_reports_offline() {
        // Nothing listens on port 9 of the loopback interface
        let config = ClientConfig {
            health_timeout: Duration::from_millis(500),
            ..ClientConfig::new("http://127.0.0.1:9/api")
        };
        let client = ApiClient::new(config).unwrap();
        let monitor = HealthMonitor::spawn(client, Duration::from_millis(50));

        let mut updates = monitor.subscribe();
        tokio::time::timeout(Duration::from_secs(5), updates.changed())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(monitor.status(), HealthStatus::Offline);
        monitor.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let client = ApiClient::new(ClientConfig::new("http://127.0.0.1:9/api")).unwrap();
        let monitor = HealthMonitor::spawn(client, Duration::from_secs(60));
        let token = monitor.cancellation_token();

        monitor.shutdown().await;
        assert!(token.is_cancelled());
    }
}
