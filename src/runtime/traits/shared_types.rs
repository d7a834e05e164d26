// ABOUTME: Shared types used across runtime trait definitions.
// ABOUTME: ContainerConfig, PortMapping, VolumeMount, RuntimeMetadata.

use crate::types::ImageRef;
use std::collections::HashMap;

/// Configuration for creating a dependency container.
///
/// Containers are always created with the `unless-stopped` restart policy so
/// they come back with the daemon.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Name for the container.
    pub name: String,
    /// Image to run.
    pub image: ImageRef,
    /// Labels to apply.
    pub labels: HashMap<String, String>,
    /// TCP port mappings.
    pub ports: Vec<PortMapping>,
    /// Read-write bind mounts.
    pub volumes: Vec<VolumeMount>,
    /// Command to run (overrides image CMD).
    pub command: Option<Vec<String>>,
}

/// A host TCP port published to a container port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    pub host_port: u16,
    pub container_port: u16,
}

/// Bind mount configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    /// Absolute host path.
    pub source: String,
    /// Target path in container.
    pub target: String,
}

/// Runtime metadata.
#[derive(Debug, Clone)]
pub struct RuntimeMetadata {
    /// Runtime name (e.g., "Docker", "Podman").
    pub name: String,
    /// Runtime version.
    pub version: String,
    /// Operating system.
    pub os: String,
    /// Architecture.
    pub arch: String,
}
