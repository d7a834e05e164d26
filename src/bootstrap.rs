// ABOUTME: Bootstrap driver: readies every dependency in order, then hands off.
// ABOUTME: Fails fast on the first dependency that cannot be made ready.

use crate::config::{Config, Environment};
use crate::dependency::DependencySpec;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::lifecycle::Provisioner;
use crate::probe::HealthCheck;
use crate::readiness::{Orchestrator, ReadinessError, ReadinessResult, RetryPolicy};
use std::fmt;
use std::process::Command;

/// The primary application process started after a successful bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl AppCommand {
    pub const ALIAS_AGENT_MODULE: &str = "alias.server.alias_agent_app";

    /// `<python> -m alias.server.alias_agent_app`
    pub fn alias_agent(python: &str) -> Self {
        Self {
            program: python.to_string(),
            args: vec!["-m".to_string(), Self::ALIAS_AGENT_MODULE.to_string()],
        }
    }

    /// A process builder whose environment is exactly `env`, including
    /// any captured variables that are not valid UTF-8.
    pub fn command(&self, env: &Environment) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .envs(env.iter_opaque())
            .envs(env.iter());
        command
    }
}

impl fmt::Display for AppCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Result of readying the declared dependencies.
#[derive(Debug)]
pub struct BootstrapOutcome {
    /// Results in declaration order, up to and excluding a failed dependency.
    pub results: Vec<(String, ReadinessResult)>,
    /// The terminal failure that stopped the run, if any.
    pub failure: Option<ReadinessError>,
    pub warnings: Vec<Warning>,
}

impl BootstrapOutcome {
    pub fn success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn result(&self, name: &str) -> Option<&ReadinessResult> {
        self.results
            .iter()
            .find(|(dep, _)| dep == name)
            .map(|(_, result)| result)
    }
}

/// Sequences readiness across dependencies.
pub struct Bootstrap<'a> {
    checker: &'a dyn HealthCheck,
    provisioner: Option<&'a dyn Provisioner>,
    policy: RetryPolicy,
}

impl<'a> Bootstrap<'a> {
    pub fn new(
        checker: &'a dyn HealthCheck,
        provisioner: Option<&'a dyn Provisioner>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            checker,
            provisioner,
            policy,
        }
    }

    /// Ready each dependency in turn. The next one is not looked at until the
    /// previous one is ready; the first failure ends the run.
    pub async fn run(
        &self,
        dependencies: &[DependencySpec],
        mut diagnostics: Diagnostics,
    ) -> BootstrapOutcome {
        let orchestrator = Orchestrator::new(self.checker, self.provisioner, self.policy);
        let mut results = Vec::with_capacity(dependencies.len());
        let mut failure = None;

        for spec in dependencies {
            match orchestrator.await_ready(spec, &mut diagnostics).await {
                Ok(result) => results.push((spec.name.clone(), result)),
                Err(e) => {
                    tracing::error!("{}", e);
                    failure = Some(e);
                    break;
                }
            }
        }

        BootstrapOutcome {
            results,
            failure,
            warnings: diagnostics.into_warnings(),
        }
    }

    /// Ready everything in `config`, then hand off to the application.
    ///
    /// Returns only if the launcher returns, which the real one does not do
    /// on success.
    pub async fn run_and_hand_off(
        &self,
        config: &Config,
        launcher: &dyn Launcher,
        diagnostics: Diagnostics,
    ) -> Result<BootstrapOutcome> {
        let mut outcome = self.run(&config.dependencies, diagnostics).await;
        if let Some(failure) = outcome.failure.take() {
            return Err(failure.into());
        }

        for (name, result) in &outcome.results {
            tracing::info!("  {}: {}", name, result);
        }
        if !outcome.warnings.is_empty() {
            tracing::warn!(
                "{} warning(s) raised; starting anyway",
                outcome.warnings.len()
            );
        }

        let env = finalize_environment(&config.env, &config.dependencies);
        tracing::info!("Starting {}", config.app);
        launcher.hand_off(&config.app, &env)?;
        Ok(outcome)
    }
}

/// The application's environment: `env` plus each dependency's exported
/// variables, where not already set.
pub fn finalize_environment(env: &Environment, dependencies: &[DependencySpec]) -> Environment {
    let mut finalized = env.clone();
    for spec in dependencies {
        for (key, value) in &spec.exports {
            finalized.set_default(key, value);
        }
    }
    finalized
}

#[derive(Debug, thiserror::Error)]
pub enum HandoffError {
    #[error("failed to start {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

/// Transfers control to the application process.
pub trait Launcher: Send + Sync {
    fn hand_off(&self, app: &AppCommand, env: &Environment) -> std::result::Result<(), HandoffError>;
}

/// Replaces the current process with the application (Unix), or runs it
/// and exits with its status (elsewhere).
#[derive(Debug, Default, Clone, Copy)]
pub struct ExecLauncher;

impl Launcher for ExecLauncher {
    #[cfg(unix)]
    fn hand_off(&self, app: &AppCommand, env: &Environment) -> std::result::Result<(), HandoffError> {
        use std::os::unix::process::CommandExt;

        // exec only returns on failure.
        let source = app.command(env).exec();
        Err(HandoffError::Launch {
            program: app.program.clone(),
            source,
        })
    }

    #[cfg(not(unix))]
    fn hand_off(&self, app: &AppCommand, env: &Environment) -> std::result::Result<(), HandoffError> {
        let status = app
            .command(env)
            .status()
            .map_err(|source| HandoffError::Launch {
                program: app.program.clone(),
                source,
            })?;
        std::process::exit(status.code().unwrap_or(1));
    }
}
