//! Host checks run before touching the container runtime.

use crate::context::Context;
use crate::error::{AppError, Result};
use crate::process::{CommandSpec, OutputMode, ProcessRunner};

fn ensure_root(is_root: bool) -> Result<()> {
    if is_root {
        Ok(())
    } else {
        Err(AppError::not_root())
    }
}

#[cfg(unix)]
pub fn require_root() -> Result<()> {
    ensure_root(nix::unistd::geteuid().is_root())
}

#[cfg(not(unix))]
pub fn require_root() -> Result<()> {
    ensure_root(false)
}

/// Fail with `MissingPrerequisite` unless `program --version` runs.
pub async fn require_program<P: ProcessRunner>(runner: &P, program: &str) -> Result<()> {
    let output = runner
        .run(&CommandSpec::new(program).arg("--version"))
        .await?;
    if !output.success() {
        return Err(AppError::missing_prerequisite(format!(
            "{program}: {}",
            output.failure_detail()
        )));
    }
    log::debug!("{}", output.stdout.trim());
    Ok(())
}

/// The root must contain the configuration templates.
pub fn require_deployment_root(ctx: &Context) -> Result<()> {
    let templates = ctx.root_path(&ctx.settings().templates_dir);
    if templates.is_dir() {
        Ok(())
    } else {
        Err(AppError::wrong_directory(
            &ctx.root().display().to_string(),
            &ctx.settings().templates_dir.display().to_string(),
        ))
    }
}

/// Shell line refreshing the apt index and installing `packages`.
fn apt_line(packages: &[String]) -> String {
    if packages.is_empty() {
        "apt-get update".to_string()
    } else {
        format!("apt-get update && apt-get install -y {}", packages.join(" "))
    }
}

/// Install host packages through apt, in one shell-out.
pub async fn install_prereqs<P: ProcessRunner>(runner: &P, packages: &[String]) -> Result<()> {
    log::info!("Installing host packages: {}", packages.join(" "));
    runner
        .run_checked(&CommandSpec::shell(apt_line(packages)).mode(OutputMode::Stream))
        .await?;
    Ok(())
}
