// ABOUTME: Readiness orchestrator: check, provision if needed, then poll until ready.
// ABOUTME: Bounded by RetryPolicy; every failure path ends in a terminal ReadinessError.

use crate::dependency::DependencySpec;
use crate::diagnostics::{Diagnostics, Warning};
use crate::lifecycle::{LifecycleError, Provisioner, Provisioning};
use crate::probe::HealthCheck;
use std::fmt;
use std::time::Duration;

/// Outcome class of a single readiness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessStatus {
    Ready,
    NotReady,
    /// A capability needed for a full check was missing; reachability alone
    /// was observed and is accepted as readiness.
    Unknown,
}

impl fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadinessStatus::Ready => write!(f, "ready"),
            ReadinessStatus::NotReady => write!(f, "not ready"),
            ReadinessStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// A readiness status with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessResult {
    pub status: ReadinessStatus,
    pub reason: String,
}

impl ReadinessResult {
    pub fn ready(reason: impl Into<String>) -> Self {
        Self {
            status: ReadinessStatus::Ready,
            reason: reason.into(),
        }
    }

    pub fn not_ready(reason: impl Into<String>) -> Self {
        Self {
            status: ReadinessStatus::NotReady,
            reason: reason.into(),
        }
    }

    pub fn unknown(reason: impl Into<String>) -> Self {
        Self {
            status: ReadinessStatus::Unknown,
            reason: reason.into(),
        }
    }

    /// `Ready` and `Unknown` both let the bootstrap continue.
    pub fn is_ready(&self) -> bool {
        matches!(
            self.status,
            ReadinessStatus::Ready | ReadinessStatus::Unknown
        )
    }
}

impl fmt::Display for ReadinessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.status, self.reason)
    }
}

/// Bounds on the post-provisioning poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    interval: Duration,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("max attempts must be at least 1")]
pub struct RetryPolicyError;

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self, RetryPolicyError> {
        if max_attempts == 0 {
            return Err(RetryPolicyError);
        }
        Ok(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            interval: Self::DEFAULT_INTERVAL,
        }
    }
}

/// A dependency that could not be made ready.
#[derive(Debug, thiserror::Error)]
pub enum ReadinessError {
    #[error(
        "{name} is not reachable and no container runtime is available ({reason}); \
         start it manually"
    )]
    RuntimeUnavailable { name: String, reason: String },

    #[error("failed to provision {name}: {source}")]
    Provisioning {
        name: String,
        #[source]
        source: LifecycleError,
    },

    #[error("{name} did not become ready after {attempts} attempt(s): {last}")]
    TimedOut {
        name: String,
        attempts: u32,
        last: ReadinessResult,
    },
}

impl ReadinessError {
    /// Name of the dependency that failed.
    pub fn dependency(&self) -> &str {
        match self {
            ReadinessError::RuntimeUnavailable { name, .. }
            | ReadinessError::Provisioning { name, .. }
            | ReadinessError::TimedOut { name, .. } => name,
        }
    }
}

/// Drives one dependency to readiness.
pub struct Orchestrator<'a> {
    checker: &'a dyn HealthCheck,
    provisioner: Option<&'a dyn Provisioner>,
    policy: RetryPolicy,
}

/// Poll attempts between progress warnings.
const PROGRESS_EVERY: u32 = 5;

impl<'a> Orchestrator<'a> {
    pub fn new(
        checker: &'a dyn HealthCheck,
        provisioner: Option<&'a dyn Provisioner>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            checker,
            provisioner,
            policy,
        }
    }

    /// Check the dependency; if it isn't ready, provision it once and keep
    /// checking, `interval` apart. The first check counts as attempt 1, so a
    /// dependency that never comes up is checked exactly `max_attempts` times.
    pub async fn await_ready(
        &self,
        spec: &DependencySpec,
        diagnostics: &mut Diagnostics,
    ) -> Result<ReadinessResult, ReadinessError> {
        let first = self.checker.check(spec).await;
        if first.is_ready() {
            tracing::info!("{} is ready at {}", spec.name, spec.address());
            return Ok(note_assumed(spec, first, diagnostics));
        }
        tracing::info!("{} is not ready: {}", spec.name, first.reason);

        let provisioner = self.provisioner.ok_or_else(|| ReadinessError::RuntimeUnavailable {
            name: spec.name.clone(),
            reason: "no container runtime detected".to_string(),
        })?;

        provisioner
            .check_available()
            .await
            .map_err(|reason| ReadinessError::RuntimeUnavailable {
                name: spec.name.clone(),
                reason,
            })?;

        let provisioning = provisioner.ensure_running(spec).await.map_err(|source| {
            ReadinessError::Provisioning {
                name: spec.name.clone(),
                source,
            }
        })?;

        if let Provisioning::PortOccupied { occupant } = &provisioning {
            diagnostics.warn(Warning::port_occupied(format!(
                "port {} for {} is held by {}; assuming it serves {} (verify manually)",
                spec.port, spec.name, occupant, spec.name
            )));
            return Ok(ReadinessResult::unknown(format!(
                "port {} occupied by {}",
                spec.port, occupant
            )));
        }

        tracing::info!(
            "Waiting for {} ({}) to become ready...",
            spec.name,
            provisioning
        );

        let mut last = first;
        for attempt in 2..=self.policy.max_attempts() {
            tokio::time::sleep(self.policy.interval()).await;

            last = self.checker.check(spec).await;
            if last.is_ready() {
                tracing::info!(
                    "{} is ready at {} after {} attempt(s)",
                    spec.name,
                    spec.address(),
                    attempt
                );
                return Ok(note_assumed(spec, last, diagnostics));
            }

            if attempt % PROGRESS_EVERY == 0 {
                diagnostics.warn(Warning::waiting_progress(format!(
                    "Still waiting for {} ({}/{}): {}",
                    spec.name,
                    attempt,
                    self.policy.max_attempts(),
                    last.reason
                )));
            }
        }

        Err(ReadinessError::TimedOut {
            name: spec.name.clone(),
            attempts: self.policy.max_attempts(),
            last,
        })
    }
}

fn note_assumed(
    spec: &DependencySpec,
    result: ReadinessResult,
    diagnostics: &mut Diagnostics,
) -> ReadinessResult {
    if result.status == ReadinessStatus::Unknown {
        diagnostics.warn(Warning::readiness_assumed(format!(
            "{}: accepted on reachability alone: {}",
            spec.name, result.reason
        )));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::HealthStrategy;
    use crate::diagnostics::WarningKind;
    use crate::types::{ContainerName, ImageRef};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a script, then repeats the last answer.
    struct Scripted {
        answers: Mutex<VecDeque<ReadinessStatus>>,
        calls: AtomicUsize,
    }

    impl Scripted {
        fn new(answers: &[ReadinessStatus]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().copied().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl HealthCheck for Scripted {
        async fn check(&self, _spec: &DependencySpec) -> ReadinessResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut answers = self.answers.lock();
            let status = if answers.len() > 1 {
                answers.pop_front().unwrap()
            } else {
                answers.front().copied().unwrap_or(ReadinessStatus::NotReady)
            };
            ReadinessResult {
                status,
                reason: "scripted".to_string(),
            }
        }
    }

    struct CountingProvisioner {
        available: bool,
        outcome: fn() -> Result<Provisioning, LifecycleError>,
        calls: AtomicUsize,
    }

    impl CountingProvisioner {
        fn new(outcome: fn() -> Result<Provisioning, LifecycleError>) -> Self {
            Self {
                available: true,
                outcome,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Provisioner for CountingProvisioner {
        async fn check_available(&self) -> Result<(), String> {
            if self.available {
                Ok(())
            } else {
                Err("daemon not responding".to_string())
            }
        }

        async fn ensure_running(
            &self,
            _spec: &DependencySpec,
        ) -> Result<Provisioning, LifecycleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn created() -> Result<Provisioning, LifecycleError> {
        Ok(Provisioning::Created(crate::types::ContainerId::new("c0ffee")))
    }

    fn spec() -> DependencySpec {
        DependencySpec::new(
            "cache",
            "127.0.0.1",
            6379,
            ContainerName::new("cache").unwrap(),
            ImageRef::parse("redis:7-alpine").unwrap(),
            HealthStrategy::RedisPing,
        )
    }

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO).unwrap()
    }

    use ReadinessStatus::{NotReady, Ready, Unknown};

    #[tokio::test]
    async fn ready_on_first_check_skips_provisioning() {
        let checker = Scripted::new(&[Ready]);
        let provisioner = CountingProvisioner::new(created);
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(3));

        let result = orchestrator
            .await_ready(&spec(), &mut Diagnostics::default())
            .await
            .unwrap();

        assert_eq!(result.status, Ready);
        assert_eq!(checker.calls(), 1);
        assert_eq!(provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn provisions_once_across_many_polls() {
        let checker = Scripted::new(&[NotReady, NotReady, NotReady, NotReady, Ready]);
        let provisioner = CountingProvisioner::new(created);
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(10));

        let result = orchestrator
            .await_ready(&spec(), &mut Diagnostics::default())
            .await
            .unwrap();

        assert_eq!(result.status, Ready);
        assert_eq!(provisioner.calls(), 1);
        assert_eq!(checker.calls(), 5);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let checker = Scripted::new(&[NotReady]);
        let provisioner = CountingProvisioner::new(created);
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(3));

        let err = orchestrator
            .await_ready(&spec(), &mut Diagnostics::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ReadinessError::TimedOut { attempts: 3, .. }));
        assert_eq!(checker.calls(), 3);
        assert_eq!(provisioner.calls(), 1);
        assert_eq!(err.dependency(), "cache");
    }

    #[tokio::test]
    async fn progress_is_reported_every_fifth_attempt() {
        let checker = Scripted::new(&[NotReady]);
        let provisioner = CountingProvisioner::new(created);
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(11));
        let mut diagnostics = Diagnostics::default();

        let err = orchestrator
            .await_ready(&spec(), &mut diagnostics)
            .await
            .unwrap_err();

        assert!(matches!(err, ReadinessError::TimedOut { attempts: 11, .. }));
        let progress: Vec<_> = diagnostics
            .of_kind(WarningKind::WaitingProgress)
            .map(|w| w.message.as_str())
            .collect();
        assert_eq!(progress.len(), 2);
        assert!(progress[0].contains("(5/11)"));
        assert!(progress[1].contains("(10/11)"));
        assert!(!progress.iter().any(|m| m.contains("(4/11)")));
    }

    #[tokio::test]
    async fn no_progress_report_before_fifth_attempt() {
        let checker = Scripted::new(&[NotReady, NotReady, NotReady, Ready]);
        let provisioner = CountingProvisioner::new(created);
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(10));
        let mut diagnostics = Diagnostics::default();

        orchestrator
            .await_ready(&spec(), &mut diagnostics)
            .await
            .unwrap();

        assert_eq!(checker.calls(), 4);
        assert!(!diagnostics.has_warnings());
    }

    #[tokio::test]
    async fn no_runtime_fails_fast() {
        let checker = Scripted::new(&[NotReady]);
        let orchestrator = Orchestrator::new(&checker, None, fast(3));

        let err = orchestrator
            .await_ready(&spec(), &mut Diagnostics::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ReadinessError::RuntimeUnavailable { .. }));
        assert!(err.to_string().contains("manually"));
        assert_eq!(checker.calls(), 1);
    }

    #[tokio::test]
    async fn unresponsive_runtime_fails_fast() {
        let checker = Scripted::new(&[NotReady]);
        let mut provisioner = CountingProvisioner::new(created);
        provisioner.available = false;
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(3));

        let err = orchestrator
            .await_ready(&spec(), &mut Diagnostics::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ReadinessError::RuntimeUnavailable { ref reason, .. } if reason.contains("daemon")));
        assert_eq!(provisioner.calls(), 0);
    }

    #[tokio::test]
    async fn provisioning_failure_is_terminal() {
        let checker = Scripted::new(&[NotReady]);
        let provisioner = CountingProvisioner::new(|| {
            Err(LifecycleError::ContainerCreateFailed("port is already allocated".to_string()))
        });
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(3));

        let err = orchestrator
            .await_ready(&spec(), &mut Diagnostics::default())
            .await
            .unwrap_err();

        assert!(matches!(err, ReadinessError::Provisioning { .. }));
        assert_eq!(checker.calls(), 1);
    }

    #[tokio::test]
    async fn port_occupied_is_accepted_with_warning() {
        let checker = Scripted::new(&[NotReady]);
        let provisioner = CountingProvisioner::new(|| {
            Ok(Provisioning::PortOccupied {
                occupant: "container other-redis".to_string(),
            })
        });
        let orchestrator = Orchestrator::new(&checker, Some(&provisioner), fast(3));
        let mut diag = Diagnostics::default();

        let result = orchestrator.await_ready(&spec(), &mut diag).await.unwrap();

        assert_eq!(result.status, Unknown);
        assert!(result.is_ready());
        assert_eq!(checker.calls(), 1);
        assert_eq!(diag.of_kind(WarningKind::PortOccupied).count(), 1);
    }

    #[tokio::test]
    async fn unknown_counts_as_ready_and_is_noted() {
        let checker = Scripted::new(&[Unknown]);
        let orchestrator = Orchestrator::new(&checker, None, fast(3));
        let mut diag = Diagnostics::default();

        let result = orchestrator.await_ready(&spec(), &mut diag).await.unwrap();

        assert_eq!(result.status, Unknown);
        assert_eq!(diag.of_kind(WarningKind::ReadinessAssumed).count(), 1);
    }

    #[test]
    fn retry_policy_rejects_zero_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)), Err(RetryPolicyError));
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 30);
        assert_eq!(policy.interval(), Duration::from_secs(1));
    }
}
