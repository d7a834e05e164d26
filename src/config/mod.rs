// ABOUTME: Configuration resolution: overlay file, environment snapshot, typed settings.
// ABOUTME: Produces the immutable Config every other component reads from.

mod environment;
mod overlay;

pub use environment::{EnvChain, Environment, Resolved};
pub use overlay::{Overlay, OverlayError, SkipReason, SkippedLine};

use crate::bootstrap::AppCommand;
use crate::dependency::{DependencySpec, reference_dependencies};
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::{Error, Result};
use crate::readiness::RetryPolicy;
use crate::runtime::{RuntimeConfig, RuntimeType};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const OVERLAY_FILENAME: &str = ".env";
pub const DATA_DIRNAME: &str = "data";

/// Fully resolved bootstrap settings. Built once, then only read.
#[derive(Debug, Clone)]
pub struct Config {
    /// Environment after the overlay; the application's environment at handoff.
    pub env: Environment,
    pub dependencies: Vec<DependencySpec>,
    pub retry: RetryPolicy,
    pub data_dir: PathBuf,
    pub runtime: RuntimeConfig,
    pub app: AppCommand,
}

impl Config {
    /// Load the overlay (or the default one when `overlay_path` is `None`),
    /// merge it into `base`, and derive typed settings.
    ///
    /// Overlay values replace values already present in `base`.
    pub fn resolve(
        overlay_path: Option<&Path>,
        base: Environment,
        diagnostics: &mut Diagnostics,
    ) -> Result<Self> {
        let root = project_root();
        let path = overlay_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(OVERLAY_FILENAME));

        let mut env = base;
        load_overlay(&path, &mut env, diagnostics)?;
        Self::from_environment(env, &root)
    }

    /// Derive typed settings from an already merged environment.
    pub fn from_environment(env: Environment, project_root: &Path) -> Result<Self> {
        // Bind mounts need absolute sources; relative overrides are rooted
        // at the project, like the default.
        let data_dir = match env.get("PREFLIGHT_DATA_DIR").map(PathBuf::from) {
            Some(dir) if dir.is_relative() => project_root.join(dir),
            Some(dir) => dir,
            None => project_root.join(DATA_DIRNAME),
        };

        let retry = RetryPolicy::new(
            parse_number(&env, "PREFLIGHT_MAX_ATTEMPTS", RetryPolicy::DEFAULT_MAX_ATTEMPTS)?,
            Duration::from_secs(parse_number(
                &env,
                "PREFLIGHT_INTERVAL_SECS",
                RetryPolicy::DEFAULT_INTERVAL.as_secs(),
            )?),
        )
        .map_err(|e| Error::InvalidConfig(format!("PREFLIGHT_MAX_ATTEMPTS: {e}")))?;

        let runtime = RuntimeConfig {
            runtime: env
                .get("CONTAINER_RUNTIME")
                .map(|s| {
                    s.parse::<RuntimeType>()
                        .map_err(|e| Error::InvalidConfig(format!("CONTAINER_RUNTIME: {e}")))
                })
                .transpose()?,
            socket: env.get("CONTAINER_SOCKET").map(str::to_string),
            docker_host: env.get("DOCKER_HOST").map(str::to_string),
        };

        let app = AppCommand::alias_agent(env.get("PYTHON").unwrap_or("python"));
        let dependencies = reference_dependencies(&env, &data_dir)?;

        Ok(Self {
            env,
            dependencies,
            retry,
            data_dir,
            runtime,
            app,
        })
    }
}

fn load_overlay(path: &Path, env: &mut Environment, diagnostics: &mut Diagnostics) -> Result<()> {
    let Some(overlay) = Overlay::load(path)? else {
        diagnostics.warn(Warning::overlay_missing(format!(
            "overlay file {} not found; using existing environment",
            path.display()
        )));
        return Ok(());
    };

    for skipped in overlay.skipped() {
        diagnostics.warn(Warning::overlay_line_skipped(format!(
            "{}:{}: skipped line ({})",
            path.display(),
            skipped.line,
            skipped.reason
        )));
    }

    let applied = env.apply(&overlay);
    tracing::info!("Loaded {} variable(s) from {}", applied, path.display());
    Ok(())
}

fn parse_number<T: std::str::FromStr>(env: &Environment, var: &str, default: T) -> Result<T> {
    match env.get(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("{var}: '{raw}' is not a valid number"))),
    }
}

/// Directory the default overlay and data directory live in: the parent of
/// the directory holding the executable. Falls back to the working directory.
pub fn project_root() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent()?.parent().map(Path::to_path_buf))
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
