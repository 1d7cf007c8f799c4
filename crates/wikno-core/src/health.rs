//! Background health probing.
//!
//! A [`HealthService`] owns a set of named [`HealthCheck`]s and probes them
//! on a fixed interval from one spawned task. Each cycle runs every check
//! concurrently under a timeout shorter than the interval, so a hung
//! dependency fails the cycle instead of stalling the next one. The overall
//! status is the logical AND of all checks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WiknoError};

/// A single dependency probe.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    async fn check(&self) -> Result<()>;
}

/// Health probing section of a service config.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on one probe cycle. Must be lower than the interval.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_secs() -> u64 {
    5
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(WiknoError::invalid("health.interval_secs must be positive"));
        }
        if self.timeout() >= self.interval() {
            return Err(WiknoError::invalid(format!(
                "health.timeout_ms ({}) must be lower than health.interval_secs ({}s)",
                self.timeout_ms, self.interval_secs
            )));
        }
        Ok(())
    }
}

/// Wire-level serving status reported by the liveness endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServingStatus {
    Serving,
    NotServing,
}

/// A failing check from the latest cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckFailure {
    pub check: String,
    pub reason: String,
}

struct Inner {
    checks: Vec<Arc<dyn HealthCheck>>,
    config: HealthConfig,
    healthy: AtomicBool,
    failures: RwLock<Vec<CheckFailure>>,
}

/// Aggregated health of a service. Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct HealthService {
    inner: Arc<Inner>,
}

impl HealthService {
    /// Create a service. Until the first cycle completes the status is
    /// `Serving` when no checks are registered and `NotServing` otherwise.
    pub fn new(config: HealthConfig, checks: Vec<Arc<dyn HealthCheck>>) -> Self {
        let healthy = checks.is_empty();
        Self {
            inner: Arc::new(Inner {
                checks,
                config,
                healthy: AtomicBool::new(healthy),
                failures: RwLock::new(Vec::new()),
            }),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.inner.healthy.load(Ordering::Acquire)
    }

    pub fn status(&self) -> ServingStatus {
        if self.is_healthy() {
            ServingStatus::Serving
        } else {
            ServingStatus::NotServing
        }
    }

    /// Failures recorded by the latest cycle.
    pub fn failures(&self) -> Vec<CheckFailure> {
        self.inner.failures.read().clone()
    }

    /// Run one probe cycle and publish its result.
    pub async fn probe_once(&self) -> bool {
        let timeout = self.inner.config.timeout();
        let probes = self.inner.checks.iter().map(move |check| {
            let check = check.clone();
            async move {
                let outcome = match tokio::time::timeout(timeout, check.check()).await {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some(format!("timed out after {}ms", timeout.as_millis())),
                };
                outcome.map(|reason| CheckFailure {
                    check: check.name().to_string(),
                    reason,
                })
            }
        });

        let failures: Vec<CheckFailure> = join_ordered(probes).await.into_iter().flatten().collect();
        let healthy = failures.is_empty();

        if healthy != self.is_healthy() {
            if healthy {
                tracing::info!("All health checks passing");
            } else {
                tracing::warn!(failures = ?failures, "Health checks failing");
            }
        }

        *self.inner.failures.write() = failures;
        self.inner.healthy.store(healthy, Ordering::Release);
        healthy
    }

    /// Spawn the probe loop. It stops when `cancel` is triggered.
    pub fn spawn(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let svc = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(svc.inner.config.interval());
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            tracing::info!(
                checks = svc.inner.checks.len(),
                interval_secs = svc.inner.config.interval_secs,
                "Health probing started"
            );

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        tokio::select! {
                            _ = cancel.cancelled() => break,
                            _ = svc.probe_once() => {}
                        }
                    }
                }
            }

            tracing::info!("Health probing stopped");
        })
    }
}

/// Await every future, preserving order.
async fn join_ordered<I, F, T>(futs: I) -> Vec<T>
where
    I: IntoIterator<Item = F>,
    F: std::future::Future<Output = T> + Send + 'static,
    T: Send + 'static,
{
    let mut set = tokio::task::JoinSet::new();
    for (idx, fut) in futs.into_iter().enumerate() {
        set.spawn(async move { (idx, fut.await) });
    }
    let mut out = Vec::with_capacity(set.len());
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(pair) => out.push(pair),
            Err(e) => tracing::error!(error = %e, "Health check task panicked"),
        }
    }
    out.sort_by_key(|(idx, _)| *idx);
    out.into_iter().map(|(_, v)| v).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        ok: bool,
    }

    #[async_trait]
    impl HealthCheck for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn check(&self) -> Result<()> {
            if self.ok {
                Ok(())
            } else {
                Err(WiknoError::unavailable("down"))
            }
        }
    }

    struct Hung;

    #[async_trait]
    impl HealthCheck for Hung {
        fn name(&self) -> &str {
            "hung"
        }

        async fn check(&self) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }
    }

    fn fast_config() -> HealthConfig {
        HealthConfig {
            interval_secs: 1,
            timeout_ms: 50,
        }
    }

    #[test]
    fn test_config_rejects_timeout_not_below_interval() {
        let cfg = HealthConfig {
            interval_secs: 2,
            timeout_ms: 2000,
        };
        assert!(cfg.validate().is_err());
        assert!(HealthConfig::default().validate().is_ok());
    }

    #[tokio::test]
    async fn test_all_checks_must_pass() {
        let svc = HealthService::new(
            fast_config(),
            vec![
                Arc::new(Fixed { name: "db", ok: true }),
                Arc::new(Fixed { name: "identity", ok: false }),
            ],
        );
        assert_eq!(svc.status(), ServingStatus::NotServing);
        assert!(!svc.probe_once().await);
        let failures = svc.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].check, "identity");
    }

    #[tokio::test]
    async fn test_healthy_when_everything_passes() {
        let svc = HealthService::new(fast_config(), vec![Arc::new(Fixed { name: "db", ok: true })]);
        assert!(svc.probe_once().await);
        assert_eq!(svc.status(), ServingStatus::Serving);
        assert!(svc.failures().is_empty());
    }

    #[tokio::test]
    async fn test_hung_check_times_out() {
        let svc = HealthService::new(fast_config(), vec![Arc::new(Hung)]);
        assert!(!svc.probe_once().await);
        assert!(svc.failures()[0].reason.contains("timed out"));
    }

    #[tokio::test]
    async fn test_probe_loop_stops_on_cancel() {
        let svc = HealthService::new(fast_config(), vec![Arc::new(Fixed { name: "db", ok: true })]);
        let cancel = CancellationToken::new();
        let handle = svc.spawn(cancel.clone());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(svc.is_healthy());

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_serving_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&ServingStatus::NotServing).unwrap(),
            "\"NOT_SERVING\""
        );
    }
}
