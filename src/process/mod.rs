//! External command execution.
//!
//! Every interaction with the host, including the container runtime CLI,
//! goes through a [`ProcessRunner`].

mod system;

pub use system::SystemRunner;

use crate::error::{AppError, Result};

/// How the child's standard streams are wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout/stderr for the caller.
    Capture,
    /// Progress output: shown when verbose, captured otherwise.
    Stream,
    /// Attached to the operator's terminal, including stdin.
    Interactive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Run the joined command line through `sh -c`.
    pub shell: bool,
    pub mode: OutputMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            shell: false,
            mode: OutputMode::Capture,
        }
    }

    /// A command line interpreted by the shell.
    pub fn shell(line: impl Into<String>) -> Self {
        Self {
            shell: true,
            ..Self::new(line)
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn mode(mut self, mode: OutputMode) -> Self {
        self.mode = mode;
        self
    }

    /// Full command line as typed in a shell.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Short description of a failure: stderr if any, otherwise stdout or the exit code.
    pub fn failure_detail(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        let code = self
            .code
            .map(|c| format!("exit code {c}"))
            .unwrap_or_else(|| "killed by signal".to_string());
        if !stderr.is_empty() {
            format!("{code}: {stderr}")
        } else if !stdout.is_empty() {
            format!("{code}: {stdout}")
        } else {
            code
        }
    }
}

/// Runs external commands to completion.
#[allow(async_fn_in_trait)]
pub trait ProcessRunner {
    /// Run a command. A non-zero exit is reported in the output, not as an error.
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput>;

    /// Run a command and fail unless it exits with status zero.
    async fn run_checked(&self, command: &CommandSpec) -> Result<CommandOutput> {
        let output = self.run(command).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(AppError::process(format!(
                "`{}` failed with {}",
                command.command_line(),
                output.failure_detail()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_program_and_args() {
        let cmd = CommandSpec::new("docker").args(["network", "inspect"]).arg("net");
        assert_eq!(cmd.command_line(), "docker network inspect net");
        assert!(!cmd.shell);
        assert_eq!(cmd.mode, OutputMode::Capture);
    }

    #[test]
    fn failure_detail_prefers_stderr() {
        let out = CommandOutput {
            code: Some(1),
            stdout: "noise".to_string(),
            stderr: "Error: No such container\n".to_string(),
        };
        assert_eq!(out.failure_detail(), "exit code 1: Error: No such container");
        assert_eq!(CommandOutput::failed(2, "").failure_detail(), "exit code 2");
    }
}
