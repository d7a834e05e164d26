// ABOUTME: Container operations trait for container runtimes.
// ABOUTME: List, create, and start containers.

use super::shared_types::ContainerConfig;
use crate::types::ContainerId;
use async_trait::async_trait;

/// Container lifecycle operations.
#[async_trait]
pub trait ContainerOps: Send + Sync {
    /// List containers matching the given filters.
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError>;

    /// Create a container from the given configuration.
    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError>;

    /// Start a created or stopped container, by name or ID.
    async fn start_container(&self, container: &str) -> Result<(), ContainerError>;
}

/// Filters for listing containers.
#[derive(Debug, Clone, Default)]
pub struct ContainerFilters {
    /// Filter by name (the runtime matches substrings).
    pub name: Option<String>,
    /// Include stopped containers.
    pub all: bool,
}

impl ContainerFilters {
    /// Running containers only.
    pub fn running() -> Self {
        Self::default()
    }

    /// Running and stopped containers whose name contains `name`.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            all: true,
        }
    }
}

/// Summary information about a container.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    pub id: ContainerId,
    /// Name without the leading `/`.
    pub name: String,
    pub image: String,
    /// Lowercase runtime state (`running`, `exited`, `created`, ...).
    pub state: String,
    /// Host ports this container publishes.
    pub published_ports: Vec<u16>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }
}

/// Errors from container operations.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    #[error("container not found: {0}")]
    NotFound(String),

    #[error("container already exists: {0}")]
    AlreadyExists(String),

    #[error("image not found: {0}")]
    ImageNotFound(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}
