//! Dependency-ordered container lifecycle of one instance.

mod containers;

pub use containers::{container_spec, ensure_image};

use crate::context::Context;
use crate::error::{AppError, Result};
use crate::instance::{reconstruct_from_live, InstanceConfig, InstanceNames, Role};
use crate::paths::InstanceLayout;
use crate::process::ProcessRunner;
use crate::provision::{ensure_network, ArtifactFetcher, Provisioner};
use crate::runtime::{ContainerRuntime, ContainerState};

/// Command run by `shell` inside a container.
const SHELL: &str = "sh";

/// Observed state of an instance's runtime objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceStatus {
    pub containers: Vec<(Role, String, ContainerState)>,
    pub network: String,
    pub network_exists: bool,
}

/// Drives the three containers of one instance through the runtime.
pub struct Lifecycle<'a, R> {
    ctx: &'a Context,
    runtime: &'a R,
    names: InstanceNames,
}

impl<'a, R: ContainerRuntime> Lifecycle<'a, R> {
    pub fn new(ctx: &'a Context, runtime: &'a R, instance: &str) -> Self {
        Self {
            ctx,
            runtime,
            names: ctx.names(instance),
        }
    }

    async fn state(&self, role: Role) -> Result<ContainerState> {
        let info = self
            .runtime
            .inspect_container(&self.names.container(role))
            .await?;
        Ok(ContainerState::of(info.as_ref()))
    }

    async fn require_deployed(&self) -> Result<()> {
        for role in Role::START_ORDER {
            if self.state(role).await? == ContainerState::Absent {
                return Err(AppError::instance_not_deployed(self.names.instance()));
            }
        }
        Ok(())
    }

    /// Name of `role`'s container, failing if it is gone.
    async fn present(&self, role: Role) -> Result<String> {
        let name = self.names.container(role);
        if self.state(role).await? == ContainerState::Absent {
            return Err(AppError::container_missing(&name));
        }
        Ok(name)
    }

    /// Provision host state, then create and start every container.
    ///
    /// Nothing is touched when any container of the instance already exists.
    pub async fn deploy<F, P>(
        &self,
        config: &InstanceConfig,
        provisioner: &Provisioner<'_, F, P>,
    ) -> Result<()>
    where
        F: ArtifactFetcher,
        P: ProcessRunner,
    {
        for role in Role::START_ORDER {
            if self.state(role).await? != ContainerState::Absent {
                return Err(AppError::instance_already_deployed(self.names.instance()));
            }
        }

        let layout = InstanceLayout::new(self.ctx.root(), &config.name);
        let cert_dir = provisioner.provision(config, &layout, &self.names).await?;
        ensure_network(self.runtime, &self.names.network()).await?;

        for role in Role::START_ORDER {
            ensure_image(self.runtime, self.ctx, &self.names, role).await?;
        }

        for role in Role::START_ORDER {
            let spec = container_spec(role, config, &self.names, &layout, &cert_dir);
            log::info!("Creating {}", spec.name);
            let id = self.runtime.create_container(&spec).await?;
            log::debug!("{} has id {}", spec.name, id);
            log::info!("Starting {}", spec.name);
            self.runtime.start_container(&spec.name).await?;
        }

        if self.ctx.settings().restart_after_deploy {
            log::info!("Restarting instance {} after first boot", config.name);
            self.restart().await?;
        }

        log::info!("Instance {} deployed", config.name);
        Ok(())
    }

    pub async fn start(&self) -> Result<()> {
        self.require_deployed().await?;
        for role in Role::START_ORDER {
            let name = self.present(role).await?;
            log::info!("Starting {name}");
            self.runtime.start_container(&name).await?;
        }
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.require_deployed().await?;
        for role in Role::STOP_ORDER {
            let name = self.present(role).await?;
            log::info!("Stopping {name}");
            self.runtime.stop_container(&name).await?;
        }
        Ok(())
    }

    pub async fn restart(&self) -> Result<()> {
        self.stop().await?;
        self.start().await
    }

    /// Stop and remove whatever exists of the instance, including its network.
    pub async fn destroy(&self) -> Result<()> {
        for role in Role::STOP_ORDER {
            if self.state(role).await? == ContainerState::Running {
                let name = self.names.container(role);
                log::info!("Stopping {name}");
                self.runtime.stop_container(&name).await?;
            }
        }

        for role in Role::STOP_ORDER {
            let name = self.names.container(role);
            if self.state(role).await? == ContainerState::Absent {
                log::info!("{name} does not exist, skipping");
                continue;
            }
            log::info!("Removing {name}");
            self.runtime.remove_container(&name).await?;
        }

        let network = self.names.network();
        if self.runtime.network_exists(&network).await? {
            log::info!("Removing network {network}");
            self.runtime.remove_network(&network).await?;
        }
        Ok(())
    }

    /// Interactive shell in `role`'s container.
    pub async fn shell(&self, role: Role) -> Result<()> {
        self.require_deployed().await?;
        let name = self.present(role).await?;
        self.runtime.exec_interactive(&name, &[SHELL]).await
    }

    pub async fn logs(&self, role: Role) -> Result<()> {
        self.require_deployed().await?;
        let name = self.present(role).await?;
        self.runtime.print_logs(&name).await
    }

    /// Configuration as the running containers report it.
    pub async fn info(&self) -> Result<InstanceConfig> {
        reconstruct_from_live(self.runtime, &self.names).await
    }

    pub async fn status(&self) -> Result<InstanceStatus> {
        let mut containers = Vec::with_capacity(Role::START_ORDER.len());
        for role in Role::START_ORDER {
            containers.push((role, self.names.container(role), self.state(role).await?));
        }
        let network = self.names.network();
        let network_exists = self.runtime.network_exists(&network).await?;
        Ok(InstanceStatus {
            containers,
            network,
            network_exists,
        })
    }
}
