use std::path::Path;

use super::inspect::decode_container;
use super::{ContainerInfo, ContainerRuntime, ContainerSpec};
use crate::error::{AppError, Result};
use crate::process::{CommandOutput, CommandSpec, OutputMode, ProcessRunner};

/// Container runtime driven through the `docker` command line.
pub struct DockerCli<'a, P> {
    binary: String,
    runner: &'a P,
}

impl<'a, P: ProcessRunner> DockerCli<'a, P> {
    pub fn new(binary: impl Into<String>, runner: &'a P) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::new(self.binary.clone()).args(args)
    }

    async fn checked(&self, action: &str, command: CommandSpec) -> Result<CommandOutput> {
        let output = self.runner.run(&command).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(AppError::runtime(action, output.failure_detail()))
        }
    }

    /// Run an `inspect`-style query; `Ok(None)` when the object does not exist.
    async fn query(&self, command: CommandSpec) -> Result<Option<CommandOutput>> {
        let output = self.runner.run(&command).await?;
        if output.success() {
            return Ok(Some(output));
        }
        if is_not_found(&output.stderr) {
            return Ok(None);
        }
        Err(AppError::runtime(
            &command.command_line(),
            output.failure_detail(),
        ))
    }
}

/// Whether stderr is the runtime's report of a missing object, as opposed to
/// any other failure such as an unreachable daemon socket.
fn is_not_found(stderr: &str) -> bool {
    const MISSING: [&str; 4] = [
        "no such container",
        "no such object",
        "no such image",
        "no such network",
    ];
    stderr.lines().any(|line| {
        let line = line.to_ascii_lowercase();
        MISSING.iter().any(|m| line.contains(m))
            || (line.contains("network ") && line.trim_end().ends_with(" not found"))
    })
}

/// Arguments of `docker create` for a container spec.
pub(crate) fn create_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec![
        "create".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--network".to_string(),
        spec.network.clone(),
    ];
    if let Some(mib) = spec.memory_mib {
        args.push("--memory".to_string());
        args.push(format!("{mib}m"));
    }
    if let Some(shares) = spec.cpu_shares {
        args.push("--cpu-shares".to_string());
        args.push(shares.to_string());
    }
    for mount in &spec.mounts {
        let mut volume = format!("{}:{}", mount.source.display(), mount.target);
        if mount.read_only {
            volume.push_str(":ro");
        }
        args.push("--volume".to_string());
        args.push(volume);
    }
    for (host, container) in &spec.ports {
        args.push("--publish".to_string());
        args.push(format!("{host}:{container}"));
    }
    args.push(spec.image.clone());
    args
}

impl<P: ProcessRunner> ContainerRuntime for DockerCli<'_, P> {
    async fn inspect_container(&self, name: &str) -> Result<Option<ContainerInfo>> {
        let Some(output) = self
            .query(self.command(["container", "inspect", name]))
            .await?
        else {
            return Ok(None);
        };
        decode_container(name, &output.stdout).map(Some)
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let output = self
            .checked("create", self.command(create_args(spec)))
            .await?;
        let id = output.stdout.trim().to_string();
        if id.is_empty() {
            return Err(AppError::malformed_metadata(
                &spec.name,
                "runtime returned no container id",
            ));
        }
        Ok(id)
    }

    async fn start_container(&self, name: &str) -> Result<()> {
        self.checked("start", self.command(["start", name])).await?;
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        self.checked("stop", self.command(["stop", name])).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        self.checked("remove", self.command(["rm", name])).await?;
        Ok(())
    }

    async fn network_exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .query(self.command(["network", "inspect", name]))
            .await?
            .is_some())
    }

    async fn create_network(&self, name: &str) -> Result<()> {
        self.checked("network create", self.command(["network", "create", name]))
            .await?;
        Ok(())
    }

    async fn remove_network(&self, name: &str) -> Result<()> {
        self.checked("network remove", self.command(["network", "rm", name]))
            .await?;
        Ok(())
    }

    async fn image_exists(&self, image: &str) -> Result<bool> {
        Ok(self
            .query(self.command(["image", "inspect", image]))
            .await?
            .is_some())
    }

    async fn build_image(&self, image: &str, context: &Path) -> Result<()> {
        let command = self
            .command(["build", "--tag", image])
            .arg(context.display().to_string())
            .mode(OutputMode::Stream);
        self.checked("build", command).await?;
        Ok(())
    }

    async fn exec_interactive(&self, name: &str, command: &[&str]) -> Result<()> {
        let spec = self
            .command(["exec", "--interactive", "--tty", name])
            .args(command.iter().copied())
            .mode(OutputMode::Interactive);
        self.checked("exec", spec).await?;
        Ok(())
    }

    async fn print_logs(&self, name: &str) -> Result<()> {
        let spec = self
            .command(["logs", name])
            .mode(OutputMode::Interactive);
        self.checked("logs", spec).await?;
        Ok(())
    }
}
