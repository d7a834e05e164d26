// ABOUTME: Capability traits for container runtimes.
// ABOUTME: Defines ContainerOps, ImageOps, and RuntimeInfo.

mod container;
mod image;
mod runtime_info;
mod shared_types;

pub use container::{ContainerError, ContainerFilters, ContainerOps, ContainerSummary};
pub use image::{ImageError, ImageOps};
pub use runtime_info::{RuntimeInfo, RuntimeInfoError};
pub use shared_types::*;

/// Everything the lifecycle manager needs from a runtime.
pub trait ProvisioningRuntime: ContainerOps + ImageOps + RuntimeInfo {}

impl<T: ContainerOps + ImageOps + RuntimeInfo> ProvisioningRuntime for T {}
