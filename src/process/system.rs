use std::io;
use std::process::Stdio;

use tokio::process::Command;

use super::{CommandOutput, CommandSpec, OutputMode, ProcessRunner};
use crate::context::Verbosity;
use crate::error::{AppError, Result};

/// Runs commands on the local host.
#[derive(Debug, Clone, Copy)]
pub struct SystemRunner {
    verbosity: Verbosity,
}

impl SystemRunner {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn build(command: &CommandSpec) -> Command {
        if command.shell {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command.command_line());
            cmd
        } else {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args);
            cmd
        }
    }

    fn attached(&self, mode: OutputMode) -> bool {
        match mode {
            OutputMode::Capture => false,
            OutputMode::Stream => self.verbosity.is_verbose(),
            OutputMode::Interactive => true,
        }
    }
}

impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        log::debug!("$ {}", command.command_line());

        let mut cmd = Self::build(command);
        let spawn_error = |e: io::Error| {
            let program = if command.shell { "sh" } else { command.program.as_str() };
            if e.kind() == io::ErrorKind::NotFound {
                AppError::missing_prerequisite(format!("program not found: {program}"))
            } else {
                AppError::process(format!("Failed to run {program}: {e}"))
            }
        };

        if self.attached(command.mode) {
            if command.mode == OutputMode::Interactive {
                cmd.stdin(Stdio::inherit());
            } else {
                cmd.stdin(Stdio::null());
            }
            let status = cmd
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(spawn_error)?;
            return Ok(CommandOutput {
                code: status.code(),
                ..CommandOutput::default()
            });
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(spawn_error)?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        if !result.success() {
            log::debug!("`{}` -> {}", command.command_line(), result.failure_detail());
        }
        Ok(result)
    }
}
