// ABOUTME: Fakes for the runtime capability traits, health checks, and handoff.
// ABOUTME: Record every call so tests can assert on provisioning side effects.

use async_trait::async_trait;
use parking_lot::Mutex;
use preflight::bootstrap::{AppCommand, HandoffError, Launcher};
use preflight::config::Environment;
use preflight::dependency::DependencySpec;
use preflight::probe::HealthCheck;
use preflight::readiness::{ReadinessResult, ReadinessStatus};
use preflight::runtime::{
    ContainerConfig, ContainerError, ContainerFilters, ContainerOps, ContainerSummary, ImageError,
    ImageOps, RuntimeInfo, RuntimeInfoError, RuntimeMetadata,
};
use preflight::types::{ContainerId, ImageRef};
use std::collections::{HashMap, HashSet, VecDeque};

// =============================================================================
// FakeRuntime
// =============================================================================

#[derive(Default)]
struct RuntimeState {
    containers: Vec<ContainerSummary>,
    images: HashSet<String>,
    created: Vec<ContainerConfig>,
    started: Vec<String>,
    pulled: Vec<String>,
    list_calls: usize,
}

/// In-memory container runtime.
pub struct FakeRuntime {
    state: Mutex<RuntimeState>,
    available: bool,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RuntimeState::default()),
            available: true,
        }
    }

    /// A runtime whose daemon doesn't answer.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    pub fn with_container(self, name: &str, state: &str, published_ports: &[u16]) -> Self {
        {
            let mut s = self.state.lock();
            let id = ContainerId::new(format!("existing-{}", s.containers.len()));
            s.containers.push(ContainerSummary {
                id,
                name: name.to_string(),
                image: "fake/image:latest".to_string(),
                state: state.to_string(),
                published_ports: published_ports.to_vec(),
            });
        }
        self
    }

    pub fn with_image(self, image: &str) -> Self {
        self.state.lock().images.insert(image.to_string());
        self
    }

    pub fn created(&self) -> Vec<ContainerConfig> {
        self.state.lock().created.clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().started.clone()
    }

    pub fn pulled(&self) -> Vec<String> {
        self.state.lock().pulled.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().list_calls
    }
}

#[async_trait]
impl ContainerOps for FakeRuntime {
    async fn list_containers(
        &self,
        filters: &ContainerFilters,
    ) -> Result<Vec<ContainerSummary>, ContainerError> {
        let mut s = self.state.lock();
        s.list_calls += 1;
        Ok(s.containers
            .iter()
            // Substring match, like the real name filter.
            .filter(|c| filters.name.as_ref().is_none_or(|n| c.name.contains(n.as_str())))
            .filter(|c| filters.all || c.is_running())
            .cloned()
            .collect())
    }

    async fn create_container(
        &self,
        config: &ContainerConfig,
    ) -> Result<ContainerId, ContainerError> {
        let mut s = self.state.lock();
        if s.containers.iter().any(|c| c.name == config.name) {
            return Err(ContainerError::AlreadyExists(config.name.clone()));
        }
        let id = ContainerId::new(format!("created-{}", s.created.len()));
        s.containers.push(ContainerSummary {
            id: id.clone(),
            name: config.name.clone(),
            image: config.image.to_string(),
            state: "created".to_string(),
            published_ports: config.ports.iter().map(|p| p.host_port).collect(),
        });
        s.created.push(config.clone());
        Ok(id)
    }

    async fn start_container(&self, container: &str) -> Result<(), ContainerError> {
        let mut s = self.state.lock();
        let Some(found) = s.containers.iter_mut().find(|c| c.name == container) else {
            return Err(ContainerError::NotFound(container.to_string()));
        };
        found.state = "running".to_string();
        s.started.push(container.to_string());
        Ok(())
    }
}

#[async_trait]
impl ImageOps for FakeRuntime {
    async fn image_exists(&self, reference: &ImageRef) -> Result<bool, ImageError> {
        Ok(self.state.lock().images.contains(&reference.to_string()))
    }

    async fn pull_image(&self, reference: &ImageRef) -> Result<(), ImageError> {
        let mut s = self.state.lock();
        s.images.insert(reference.to_string());
        s.pulled.push(reference.to_string());
        Ok(())
    }
}

#[async_trait]
impl RuntimeInfo for FakeRuntime {
    async fn info(&self) -> Result<RuntimeMetadata, RuntimeInfoError> {
        if !self.available {
            return Err(RuntimeInfoError::ConnectionFailed(
                "connection refused".to_string(),
            ));
        }
        Ok(RuntimeMetadata {
            name: "Fake".to_string(),
            version: "0.0.0".to_string(),
            os: "linux".to_string(),
            arch: "x86_64".to_string(),
        })
    }
}

// =============================================================================
// ScriptedChecker
// =============================================================================

/// Health checker answering from a per-dependency script. The last answer
/// repeats once the script runs out; unscripted dependencies are not ready.
#[derive(Default)]
pub struct ScriptedChecker {
    scripts: Mutex<HashMap<String, VecDeque<ReadinessStatus>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, name: &str, answers: &[ReadinessStatus]) -> Self {
        self.scripts
            .lock()
            .insert(name.to_string(), answers.iter().copied().collect());
        self
    }

    pub fn calls(&self, name: &str) -> usize {
        self.calls.lock().get(name).copied().unwrap_or(0)
    }
}

#[async_trait]
impl HealthCheck for ScriptedChecker {
    async fn check(&self, spec: &DependencySpec) -> ReadinessResult {
        *self.calls.lock().entry(spec.name.clone()).or_default() += 1;

        let mut scripts = self.scripts.lock();
        let status = match scripts.get_mut(&spec.name) {
            Some(answers) if answers.len() > 1 => answers.pop_front(),
            Some(answers) => answers.front().copied(),
            None => None,
        }
        .unwrap_or(ReadinessStatus::NotReady);

        ReadinessResult {
            status,
            reason: format!("scripted {}", spec.name),
        }
    }
}

// =============================================================================
// RecordingLauncher
// =============================================================================

/// Launcher that records the handoff instead of performing it.
#[derive(Default)]
pub struct RecordingLauncher {
    launches: Mutex<Vec<(AppCommand, Environment)>>,
}

impl RecordingLauncher {
    pub fn launches(&self) -> Vec<(AppCommand, Environment)> {
        self.launches.lock().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn hand_off(&self, app: &AppCommand, env: &Environment) -> Result<(), HandoffError> {
        self.launches.lock().push((app.clone(), env.clone()));
        Ok(())
    }
}
