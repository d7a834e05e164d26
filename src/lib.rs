// ABOUTME: Library root for preflight - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod bootstrap;
pub mod config;
pub mod dependency;
pub mod diagnostics;
pub mod error;
pub mod lifecycle;
pub mod probe;
pub mod readiness;
pub mod runtime;
pub mod types;
