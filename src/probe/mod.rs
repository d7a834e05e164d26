// ABOUTME: Reachability prober: TCP connect plus protocol-specific health checks.
// ABOUTME: Redis is checked strictly via PING; HTTP health endpoints are advisory.

mod http;
mod redis;
mod tcp;

pub use http::{HttpProbeError, get_status};
pub use redis::{PingOutcome, RedisCli};
pub use tcp::is_reachable;

use crate::dependency::{DependencySpec, HealthStrategy};
use crate::readiness::ReadinessResult;
use async_trait::async_trait;
use std::time::Duration;

/// Something that can tell whether a dependency is ready right now.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self, spec: &DependencySpec) -> ReadinessResult;
}

/// The production health checker.
///
/// Strictness differs per strategy. A Redis dependency must answer `PONG`
/// when `redis-cli` is available. An HTTP dependency is accepted once its
/// port is open, whatever the health endpoint says; the endpoint result only
/// decides between `Ready` and `Unknown`.
#[derive(Debug, Clone)]
pub struct Prober {
    connect_timeout: Duration,
    http_timeout: Duration,
    redis_cli: RedisCli,
}

impl Prober {
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);
    pub const HTTP_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn new(connect_timeout: Duration, http_timeout: Duration, redis_cli: RedisCli) -> Self {
        Self {
            connect_timeout,
            http_timeout,
            redis_cli,
        }
    }

    async fn check_redis(&self, spec: &DependencySpec) -> ReadinessResult {
        match self.redis_cli.ping(&spec.host, spec.port).await {
            PingOutcome::Pong => ReadinessResult::ready("PING answered PONG"),
            PingOutcome::Unexpected(answer) => {
                ReadinessResult::not_ready(format!("PING answered '{}'", answer))
            }
            PingOutcome::TimedOut => ReadinessResult::not_ready("PING timed out"),
            PingOutcome::CliUnavailable(reason) => ReadinessResult::unknown(format!(
                "redis-cli unavailable ({}); port is open",
                reason
            )),
        }
    }

    async fn check_http(&self, spec: &DependencySpec, path: &str) -> ReadinessResult {
        match get_status(&spec.host, spec.port, path, self.http_timeout).await {
            Ok(status) if status.is_success() => {
                ReadinessResult::ready(format!("GET {} returned {}", path, status))
            }
            Ok(status) => ReadinessResult::unknown(format!(
                "port is open but GET {} returned {}",
                path, status
            )),
            Err(e) => {
                ReadinessResult::unknown(format!("port is open but GET {} failed: {}", path, e))
            }
        }
    }
}

impl Default for Prober {
    fn default() -> Self {
        Self::new(Self::CONNECT_TIMEOUT, Self::HTTP_TIMEOUT, RedisCli::default())
    }
}

#[async_trait]
impl HealthCheck for Prober {
    async fn check(&self, spec: &DependencySpec) -> ReadinessResult {
        if !is_reachable(&spec.host, spec.port, self.connect_timeout).await {
            return ReadinessResult::not_ready(format!(
                "{} is not accepting connections",
                spec.address()
            ));
        }

        match &spec.health {
            HealthStrategy::TcpConnect => ReadinessResult::ready("port is open"),
            HealthStrategy::RedisPing => self.check_redis(spec).await,
            HealthStrategy::HttpGet { path } => self.check_http(spec, path).await,
        }
    }
}
