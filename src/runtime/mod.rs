//! Container runtime adapter.

mod docker;
mod inspect;

use std::path::{Path, PathBuf};

pub use docker::DockerCli;
pub use inspect::{decode_container, ContainerInfo};

use crate::error::Result;

/// A bind mount from the host into a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub source: PathBuf,
    pub target: String,
    pub read_only: bool,
}

/// Everything needed to create one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub network: String,
    /// Memory limit in MiB.
    pub memory_mib: Option<u32>,
    pub cpu_shares: Option<u32>,
    pub mounts: Vec<Mount>,
    /// `(host, container)` port pairs.
    pub ports: Vec<(u16, u16)>,
}

/// State of a container as observed through inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Absent,
    Stopped,
    Running,
}

impl ContainerState {
    pub fn of(info: Option<&ContainerInfo>) -> Self {
        match info {
            None => Self::Absent,
            Some(info) if info.running => Self::Running,
            Some(_) => Self::Stopped,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

/// Operations the lifecycle manager needs from a container runtime.
#[allow(async_fn_in_trait)]
pub trait ContainerRuntime {
    /// `None` when no container has this name.
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>>;
    /// Create a stopped container and return its identifier.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;
    async fn start_container(&self, name: &str) -> Result<()>;
    async fn stop_container(&self, name: &str) -> Result<()>;
    async fn remove_container(&self, name: &str) -> Result<()>;

    async fn network_exists(&self, name: &str) -> Result<bool>;
    async fn create_network(&self, name: &str) -> Result<()>;
    async fn remove_network(&self, name: &str) -> Result<()>;

    async fn image_exists(&self, image: &str) -> Result<bool>;
    async fn build_image(&self, image: &str, context: &Path) -> Result<()>;

    /// Run a command inside a container attached to the terminal.
    async fn exec_interactive(&self, name: &str, command: &[&str]) -> Result<()>;
    /// Print a container's logs to the terminal.
    async fn print_logs(&self, name: &str) -> Result<()>;
}
