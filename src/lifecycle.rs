// ABOUTME: Container lifecycle for dependencies: inspect, start, or create exactly once.
// ABOUTME: Detects foreign port occupants instead of fighting them for the port.

use crate::dependency::DependencySpec;
use crate::probe::is_reachable;
use crate::runtime::{
    BollardRuntime, ContainerConfig, ContainerError, ContainerFilters, ContainerSummary, ImageError, PortMapping,
    ProvisioningRuntime, RuntimeConfig, VolumeMount,
};
use crate::types::{ContainerId, ContainerName};
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

pub const MANAGED_LABEL: &str = "preflight.managed";
pub const DEPENDENCY_LABEL: &str = "preflight.dependency";

/// Observed state of a named container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped { id: ContainerId, state: String },
    Running { id: ContainerId },
}

/// What `ensure_running` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provisioning {
    /// The container was already running; nothing was changed.
    AlreadyRunning,
    /// An existing stopped container was started.
    Started,
    /// A new container was created and started.
    Created(ContainerId),
    /// No container exists and the host port is held by something else.
    /// Nothing was created.
    PortOccupied { occupant: String },
}

impl fmt::Display for Provisioning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provisioning::AlreadyRunning => write!(f, "container already running"),
            Provisioning::Started => write!(f, "started existing container"),
            Provisioning::Created(id) => write!(f, "created container {}", id.short()),
            Provisioning::PortOccupied { occupant } => write!(f, "port held by {occupant}"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    #[error("failed to inspect containers: {0}")]
    InspectFailed(String),

    #[error("failed to prepare storage {path}: {source}")]
    StorageFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to pull image: {0}")]
    ImagePullFailed(String),

    #[error("failed to create container: {0}")]
    ContainerCreateFailed(String),

    #[error("failed to start container: {0}")]
    ContainerStartFailed(String),
}

impl From<ImageError> for LifecycleError {
    fn from(err: ImageError) -> Self {
        LifecycleError::ImagePullFailed(err.to_string())
    }
}

/// Something that can bring a dependency's container up.
#[async_trait]
pub trait Provisioner: Send + Sync {
    /// Whether the runtime answers at all. The error is a human-readable reason.
    async fn check_available(&self) -> Result<(), String>;

    /// Make sure the dependency's container is running. Called at most once
    /// per dependency per run.
    async fn ensure_running(&self, spec: &DependencySpec) -> Result<Provisioning, LifecycleError>;
}

/// Provisions dependency containers on a Docker-compatible runtime.
pub struct ContainerManager<R> {
    runtime: R,
    availability_timeout: Duration,
    port_probe_timeout: Duration,
}

impl<R: ProvisioningRuntime> ContainerManager<R> {
    pub const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const PORT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            availability_timeout: Self::AVAILABILITY_TIMEOUT,
            port_probe_timeout: Self::PORT_PROBE_TIMEOUT,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    /// Current state of the container with exactly this name.
    pub async fn state(&self, name: &ContainerName) -> Result<ContainerState, LifecycleError> {
        let containers = self
            .runtime
            .list_containers(&ContainerFilters::named(name.as_str()))
            .await
            .map_err(|e| LifecycleError::InspectFailed(e.to_string()))?;

        // The name filter matches substrings; only an exact match counts.
        let Some(found) = containers.into_iter().find(|c| name.matches(&c.name)) else {
            return Ok(ContainerState::Absent);
        };

        if found.is_running() {
            Ok(ContainerState::Running { id: found.id })
        } else {
            Ok(ContainerState::Stopped {
                id: found.id,
                state: found.state,
            })
        }
    }

    /// Who holds `port`, if anyone: a running container publishing it, or an
    /// unidentified process accepting connections on `host:port`.
    pub async fn port_occupant(
        &self,
        host: &str,
        port: u16,
    ) -> Result<Option<String>, LifecycleError> {
        let running = self
            .runtime
            .list_containers(&ContainerFilters::running())
            .await
            .map_err(|e| LifecycleError::InspectFailed(e.to_string()))?;

        if let Some(holder) = running
            .iter()
            .find(|c| c.published_ports.contains(&port))
        {
            return Ok(Some(describe(holder)));
        }

        if is_reachable(host, port, self.port_probe_timeout).await {
            return Ok(Some("a process outside the container runtime".to_string()));
        }

        Ok(None)
    }

    async fn start(&self, name: &ContainerName) -> Result<(), LifecycleError> {
        self.runtime
            .start_container(name.as_str())
            .await
            .map_err(|e| LifecycleError::ContainerStartFailed(e.to_string()))
    }

    async fn create(&self, spec: &DependencySpec) -> Result<Provisioning, LifecycleError> {
        if let Some(storage) = &spec.storage {
            tokio::fs::create_dir_all(&storage.host_path)
                .await
                .map_err(|source| LifecycleError::StorageFailed {
                    path: storage.host_path.display().to_string(),
                    source,
                })?;
        }

        if !self.runtime.image_exists(&spec.image).await? {
            tracing::info!("Pulling {}...", spec.image);
            self.runtime.pull_image(&spec.image).await?;
        }

        let config = container_config(spec);
        match self.runtime.create_container(&config).await {
            Ok(id) => {
                tracing::info!("Created container {} ({})", spec.container, id.short());
                self.start(&spec.container).await?;
                Ok(Provisioning::Created(id))
            }
            // Someone created it between our inspection and now.
            Err(ContainerError::AlreadyExists(_)) => {
                self.start(&spec.container).await?;
                Ok(Provisioning::Started)
            }
            Err(e) => Err(LifecycleError::ContainerCreateFailed(e.to_string())),
        }
    }
}

fn describe(container: &ContainerSummary) -> String {
    format!("container {} ({})", container.name, container.image)
}

/// Runtime configuration for a dependency's container.
pub fn container_config(spec: &DependencySpec) -> ContainerConfig {
    let labels = HashMap::from([
        (MANAGED_LABEL.to_string(), "true".to_string()),
        (DEPENDENCY_LABEL.to_string(), spec.name.clone()),
    ]);

    let ports = spec
        .ports
        .iter()
        .map(|p| PortMapping {
            host_port: p.host,
            container_port: p.container,
        })
        .collect();

    let volumes = spec
        .storage
        .iter()
        .map(|s| VolumeMount {
            source: s.host_path.display().to_string(),
            target: s.container_path.clone(),
        })
        .collect();

    ContainerConfig {
        name: spec.container.to_string(),
        image: spec.image.clone(),
        labels,
        ports,
        volumes,
        command: spec.command.clone(),
    }
}

#[async_trait]
impl<R: ProvisioningRuntime> Provisioner for ContainerManager<R> {
    async fn check_available(&self) -> Result<(), String> {
        match tokio::time::timeout(self.availability_timeout, self.runtime.info()).await {
            Ok(Ok(meta)) => {
                tracing::debug!("Using {} {} ({}/{})", meta.name, meta.version, meta.os, meta.arch);
                Ok(())
            }
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err(format!(
                "runtime did not answer within {}s",
                self.availability_timeout.as_secs()
            )),
        }
    }

    async fn ensure_running(&self, spec: &DependencySpec) -> Result<Provisioning, LifecycleError> {
        match self.state(&spec.container).await? {
            ContainerState::Running { .. } => {
                tracing::info!("Container {} is already running", spec.container);
                Ok(Provisioning::AlreadyRunning)
            }
            ContainerState::Stopped { state, .. } => {
                tracing::info!("Starting existing container {} ({})", spec.container, state);
                self.start(&spec.container).await?;
                Ok(Provisioning::Started)
            }
            ContainerState::Absent => {
                if let Some(occupant) = self.port_occupant(&spec.host, spec.port).await? {
                    return Ok(Provisioning::PortOccupied { occupant });
                }
                tracing::info!("Creating container {} from {}", spec.container, spec.image);
                self.create(spec).await
            }
        }
    }
}

/// Stands in for the container manager when no runtime could be reached.
///
/// Carries the reason so that a dependency needing provisioning fails with
/// the actual connection problem.
#[derive(Debug, Clone)]
pub struct NoRuntime {
    reason: String,
}

impl NoRuntime {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Provisioner for NoRuntime {
    async fn check_available(&self) -> Result<(), String> {
        Err(self.reason.clone())
    }

    async fn ensure_running(&self, _spec: &DependencySpec) -> Result<Provisioning, LifecycleError> {
        Err(LifecycleError::InspectFailed(self.reason.clone()))
    }
}

/// Provisioner for the local container runtime.
///
/// Connection problems are not fatal here: a missing runtime only matters
/// once some dependency needs provisioning, and then it reports why.
pub fn local_provisioner(config: &RuntimeConfig) -> Box<dyn Provisioner> {
    match BollardRuntime::connect_local(config) {
        Ok(runtime) => {
            tracing::debug!("Container runtime: {}", runtime.runtime_type());
            Box::new(ContainerManager::new(runtime))
        }
        Err(e) => {
            tracing::debug!("No container runtime ({:?}): {}", e.kind(), e);
            Box::new(NoRuntime::new(e.to_string()))
        }
    }
}
