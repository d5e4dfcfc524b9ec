//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::instance::{ConfigOverrides, Limit, Role, DEFAULT_INSTANCE};

/// Deploy and manage named Genomizer instances on this host.
#[derive(Parser, Debug)]
#[command(name = "genomizer-deploy")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log every external command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Instance to act on
    #[arg(short, long, global = true, default_value = DEFAULT_INSTANCE)]
    pub instance: String,

    /// Deployment root holding instance directories and templates
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Settings file (defaults to <root>/genomizer-deploy.toml)
    #[arg(long, global = true)]
    pub settings: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the host packages the deployment needs
    InstallPrereqs,
    /// Provision and start a new instance
    Deploy(DeployArgs),
    /// Show the configuration of a deployed instance
    Info,
    /// Start every container of the instance
    Start,
    /// Stop every container of the instance
    Stop,
    /// Stop, then start the instance
    Restart,
    /// Back up instance data (not available)
    Backup(BackupArgs),
    /// Stop and remove the instance's containers and network
    Destroy,
    /// Open a shell inside one container
    Shell(ContainerArg),
    /// Print the logs of one container
    Logs(ContainerArg),
    /// Print resolved configuration, names and runtime state
    Debug,
}

#[derive(Args, Debug, Default)]
pub struct DeployArgs {
    /// RAM limit in MiB, or "unlimited"
    #[arg(long)]
    pub ram: Option<Limit>,

    /// CPU shares, or "unlimited"
    #[arg(long)]
    pub cpu: Option<Limit>,

    /// Public HTTPS port
    #[arg(long = "port", visible_alias = "https-port")]
    pub https_port: Option<u16>,

    /// Public HTTP port
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Publish the application server directly on this port
    #[arg(long)]
    pub server_port: Option<u16>,

    /// Host directory mounted as the server's /tmp
    #[arg(long)]
    pub tmp: Option<PathBuf>,

    /// Host directory for server and database data
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Directory with server.crt, server.key and dhparam.pem
    #[arg(long)]
    pub cert: Option<PathBuf>,
}

impl DeployArgs {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            ram: self.ram,
            cpu: self.cpu,
            server_port: self.server_port,
            http_port: self.http_port,
            https_port: self.https_port,
            tmp_dir: self.tmp.clone(),
            data_dir: self.data.clone(),
            cert_dir: self.cert.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct BackupArgs {
    /// Where the backup would be written
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ContainerArg {
    /// Container role
    #[arg(short, long, value_enum, default_value_t = Role::Server)]
    pub container: Role,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn deploy_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "genomizer-deploy",
            "--instance",
            "dev1",
            "deploy",
            "--ram",
            "unlimited",
            "--port",
            "4999",
            "--tmp",
            "/scratch",
        ])
        .unwrap();
        assert_eq!(cli.instance, "dev1");
        let Commands::Deploy(args) = cli.command else {
            unreachable!("expected deploy");
        };
        let overrides = args.overrides();
        assert_eq!(overrides.ram, Some(Limit::Unlimited));
        assert_eq!(overrides.https_port, Some(4999));
        assert_eq!(overrides.http_port, None);
        assert_eq!(overrides.cpu, None);
        assert_eq!(overrides.tmp_dir, Some(PathBuf::from("/scratch")));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["genomizer-deploy", "logs", "-c", "nginx", "-v"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.instance, DEFAULT_INSTANCE);
        let Commands::Logs(arg) = cli.command else {
            unreachable!("expected logs");
        };
        assert_eq!(arg.container, Role::Nginx);
    }

    #[test]
    fn bad_limit_is_rejected() {
        assert!(Cli::try_parse_from(["genomizer-deploy", "deploy", "--cpu", "lots"]).is_err());
    }
}
