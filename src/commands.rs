//! Command dispatch: precondition checks, then one lifecycle operation.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::cli::{Cli, Commands};
use crate::config::Settings;
use crate::context::{Context, Verbosity};
use crate::error::{AppError, Result};
use crate::instance::{ConfigOverrides, ConfigTable, InstanceConfig};
use crate::lifecycle::{InstanceStatus, Lifecycle};
use crate::preflight;
use crate::process::SystemRunner;
use crate::provision::{HttpFetcher, Provisioner};
use crate::runtime::DockerCli;

fn absolute_root(root: &Path) -> Result<PathBuf> {
    if root.is_absolute() {
        Ok(root.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(root))
    }
}

/// Execute one parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    if matches!(cli.command, Commands::Backup(_)) {
        return Err(AppError::not_implemented("backup"));
    }

    let verbosity = Verbosity::from_flag(cli.verbose);
    let root = absolute_root(&cli.root)?;
    let settings = Settings::load(&root, cli.settings.as_deref())?;
    let table = ConfigTable::with_overlay(&settings.instances);
    if !table.contains(&cli.instance) {
        log::info!(
            "Known instances: {}",
            table.names().collect::<Vec<_>>().join(", ")
        );
        return Err(AppError::unknown_instance(&cli.instance));
    }

    let ctx = Context::new(verbosity, root, settings);
    let runner = SystemRunner::new(verbosity);

    preflight::require_root()?;
    if matches!(cli.command, Commands::InstallPrereqs) {
        return preflight::install_prereqs(&runner, &ctx.settings().prerequisites).await;
    }
    preflight::require_program(&runner, &ctx.settings().docker).await?;

    let docker = DockerCli::new(ctx.settings().docker.clone(), &runner);
    let lifecycle = Lifecycle::new(&ctx, &docker, &cli.instance);

    match cli.command {
        Commands::Deploy(args) => {
            preflight::require_deployment_root(&ctx)?;
            let config = table.resolve(&cli.instance, &args.overrides(), ctx.root())?;
            log::info!("Deploying instance {}", config.name);
            let fetcher = HttpFetcher::new()?;
            let provisioner = Provisioner::new(&ctx, &fetcher, &runner);
            lifecycle.deploy(&config, &provisioner).await
        }
        Commands::Info => {
            let config = lifecycle.info().await?;
            println!("{config}");
            Ok(())
        }
        Commands::Start => lifecycle.start().await,
        Commands::Stop => lifecycle.stop().await,
        Commands::Restart => lifecycle.restart().await,
        Commands::Destroy => lifecycle.destroy().await,
        Commands::Shell(arg) => lifecycle.shell(arg.container).await,
        Commands::Logs(arg) => lifecycle.logs(arg.container).await,
        Commands::Debug => {
            let config = table.resolve(&cli.instance, &ConfigOverrides::default(), ctx.root())?;
            let status = lifecycle.status().await?;
            print!("{}", debug_report(&ctx, &config, &status));
            Ok(())
        }
        Commands::InstallPrereqs | Commands::Backup(_) => Ok(()),
    }
}

fn debug_report(ctx: &Context, config: &InstanceConfig, status: &InstanceStatus) -> String {
    let names = ctx.names(&config.name);
    let mut out = String::new();
    let _ = writeln!(out, "root:        {}", ctx.root().display());
    let _ = writeln!(out, "{config}");
    let _ = writeln!(out, "network:     {} ({})", status.network, presence(status.network_exists));
    for (role, container, state) in &status.containers {
        let _ = writeln!(
            out,
            "{:<12} {} [{}] image {}",
            format!("{role}:"),
            container,
            state.as_str(),
            names.image(*role)
        );
    }
    out
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "absent"
    }
}
