// ABOUTME: Container runtime boundary for Docker and Podman.
// ABOUTME: Capability traits, local runtime detection, and the bollard implementation.

mod bollard;
mod detection;
mod error;
pub mod traits;
mod types;

pub use bollard::BollardRuntime;
pub use detection::{DetectionError, detect_local};
pub use error::{RuntimeError, RuntimeErrorKind};
pub use traits::*;
pub use types::{DetectedRuntime, RuntimeConfig, RuntimeType};
