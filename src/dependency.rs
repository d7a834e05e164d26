// ABOUTME: Dependency specifications and the reference Redis/Qdrant declarations.
// ABOUTME: A DependencySpec is resolved once from the environment and never mutated.

use crate::config::{EnvChain, Environment};
use crate::error::{Error, Result};
use crate::types::{ContainerName, ImageRef};
use std::fmt;
use std::path::{Path, PathBuf};

/// How readiness is established on top of bare TCP reachability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStrategy {
    /// `redis-cli ping` must answer `PONG`. Without the CLI, an open port suffices.
    RedisPing,
    /// `GET <path>` is attempted, but an open port suffices even if it fails.
    HttpGet { path: String },
    /// An open port is the whole check.
    TcpConnect,
}

impl fmt::Display for HealthStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStrategy::RedisPing => write!(f, "redis ping"),
            HealthStrategy::HttpGet { path } => write!(f, "http GET {path}"),
            HealthStrategy::TcpConnect => write!(f, "tcp connect"),
        }
    }
}

/// A host port published to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PublishedPort {
    pub host: u16,
    pub container: u16,
}

/// A host directory bind-mounted into the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageMount {
    pub host_path: PathBuf,
    pub container_path: String,
}

/// Everything needed to check and, if necessary, provision one dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub container: ContainerName,
    pub image: ImageRef,
    pub ports: Vec<PublishedPort>,
    pub storage: Option<StorageMount>,
    pub command: Option<Vec<String>>,
    pub health: HealthStrategy,
    /// Variables asserted into the application's environment (if unset) at handoff.
    pub exports: Vec<(String, String)>,
}

impl DependencySpec {
    /// A spec publishing `port` to the same container port, with no storage.
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        container: ContainerName,
        image: ImageRef,
        health: HealthStrategy,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port,
            container,
            image,
            ports: vec![PublishedPort {
                host: port,
                container: port,
            }],
            storage: None,
            command: None,
            health,
            exports: Vec::new(),
        }
    }

    pub fn with_storage(mut self, host_path: impl Into<PathBuf>, container_path: &str) -> Self {
        self.storage = Some(StorageMount {
            host_path: host_path.into(),
            container_path: container_path.to_string(),
        });
        self
    }

    pub fn with_command(mut self, command: &[&str]) -> Self {
        self.command = Some(command.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Static description of a dependency, turned into a [`DependencySpec`]
/// by reading the environment.
struct Declaration {
    name: &'static str,
    host: EnvChain,
    port: EnvChain,
    container_var: &'static str,
    container_default: &'static str,
    image_var: &'static str,
    image_default: &'static str,
    container_port: u16,
    /// Extra ports published 1:1 alongside the main one.
    extra_ports: &'static [u16],
    storage_subdir: &'static str,
    storage_target: &'static str,
    command: &'static [&'static str],
    health: fn() -> HealthStrategy,
}

const REDIS: Declaration = Declaration {
    name: "redis",
    host: EnvChain::new("USER_PROFILING_REDIS_HOST", "REDIS_HOST", "localhost"),
    port: EnvChain::new("USER_PROFILING_REDIS_PORT", "REDIS_PORT", "6379"),
    container_var: "REDIS_CONTAINER_NAME",
    container_default: "alias-redis",
    image_var: "REDIS_IMAGE",
    image_default: "redis:7-alpine",
    container_port: 6379,
    extra_ports: &[],
    storage_subdir: "redis",
    storage_target: "/data",
    command: &["redis-server", "--appendonly", "yes"],
    health: redis_health,
};

const QDRANT: Declaration = Declaration {
    name: "qdrant",
    host: EnvChain::new("USER_PROFILING_QDRANT_HOST", "QDRANT_HOST", "localhost"),
    port: EnvChain::new("USER_PROFILING_QDRANT_PORT", "QDRANT_PORT", "6333"),
    container_var: "QDRANT_CONTAINER_NAME",
    container_default: "alias-qdrant",
    image_var: "QDRANT_IMAGE",
    image_default: "qdrant/qdrant:latest",
    container_port: 6333,
    extra_ports: &[6334],
    storage_subdir: "qdrant",
    storage_target: "/qdrant/storage",
    command: &[],
    health: qdrant_health,
};

fn redis_health() -> HealthStrategy {
    HealthStrategy::RedisPing
}

fn qdrant_health() -> HealthStrategy {
    HealthStrategy::HttpGet {
        path: "/health".to_string(),
    }
}

impl Declaration {
    fn resolve(&self, env: &Environment, data_dir: &Path) -> Result<DependencySpec> {
        let host = self.host.resolve(env);
        let port = self.port.resolve(env);
        let port_var = port.source.unwrap_or(self.port.generic);
        let port_number = parse_port(port_var, &port.value)?;

        tracing::debug!(
            dependency = self.name,
            host = %host.value,
            host_from = host.source.unwrap_or("default"),
            port = port_number,
            port_from = port.source.unwrap_or("default"),
            "resolved dependency target"
        );

        let container_name = env.get(self.container_var).unwrap_or(self.container_default);
        let container = ContainerName::new(container_name).map_err(|e| {
            Error::InvalidConfig(format!("{}: {}", self.container_var, e))
        })?;

        let image_name = env.get(self.image_var).unwrap_or(self.image_default);
        let image = ImageRef::parse(image_name)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", self.image_var, e)))?;

        let mut spec = DependencySpec::new(
            self.name,
            host.value.clone(),
            port_number,
            container,
            image,
            (self.health)(),
        )
        .with_storage(data_dir.join(self.storage_subdir), self.storage_target);

        spec.ports = std::iter::once(PublishedPort {
            host: port_number,
            container: self.container_port,
        })
        .chain(self.extra_ports.iter().map(|&p| PublishedPort {
            host: p,
            container: p,
        }))
        .collect();

        if !self.command.is_empty() {
            spec = spec.with_command(self.command);
        }

        spec.exports = vec![
            (self.host.generic.to_string(), host.value),
            (self.port.generic.to_string(), port_number.to_string()),
        ];

        Ok(spec)
    }
}

fn parse_port(var: &str, value: &str) -> Result<u16> {
    match value.trim().parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Error::InvalidConfig(format!(
            "{var}: '{value}' is not a valid port"
        ))),
    }
}

/// The dependencies of the reference deployment, in check order.
pub fn reference_dependencies(env: &Environment, data_dir: &Path) -> Result<Vec<DependencySpec>> {
    [REDIS, QDRANT]
        .iter()
        .map(|decl| decl.resolve(env, data_dir))
        .collect()
}
