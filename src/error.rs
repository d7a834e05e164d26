// ABOUTME: Application-wide error types for preflight.
// ABOUTME: Uses thiserror for ergonomic error handling.

use crate::bootstrap::HandoffError;
use crate::config::OverlayError;
use crate::readiness::ReadinessError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Overlay(#[from] OverlayError),

    #[error(transparent)]
    NotReady(#[from] ReadinessError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
