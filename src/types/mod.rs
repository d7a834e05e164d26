// ABOUTME: Validated domain types shared across the bootstrapper.
// ABOUTME: Container names, image references, and runtime-assigned container IDs.

mod container_name;
mod id;
mod image_ref;

pub use container_name::{ContainerName, ContainerNameError};
pub use id::ContainerId;
pub use image_ref::{ImageRef, ParseImageRefError};
