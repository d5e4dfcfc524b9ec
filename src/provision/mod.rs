//! Idempotent acquisition of everything an instance needs on the host.

mod fetch;
mod template;

use std::fs;
use std::path::{Path, PathBuf};

pub use fetch::{
    ensure_artifact, url_file_name, Artifact, ArtifactFetcher, ArtifactOutcome, HttpFetcher,
};
pub use template::{
    nginx_substitutions, render, settings_substitutions, template_config, Substitution,
};

use crate::context::Context;
use crate::error::{AppError, Result};
use crate::instance::{InstanceConfig, InstanceNames};
use crate::paths::{pgdata_dir, InstanceLayout, NGINX_CONF, SETTINGS_CFG};
use crate::process::{CommandSpec, OutputMode, ProcessRunner};
use crate::runtime::ContainerRuntime;

/// Files nginx expects in its certificate directory.
pub const CERT_FILES: [&str; 3] = ["server.crt", "server.key", "dhparam.pem"];

/// Create `path` and its parents unless it already exists.
pub fn ensure_directory(path: &Path) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    log::info!("Creating directory {}", path.display());
    fs::create_dir_all(path)
        .map_err(|e| AppError::io(format!("failed to create {}: {}", path.display(), e)))
}

/// Create the network unless the runtime already knows it.
pub async fn ensure_network<R: ContainerRuntime>(runtime: &R, name: &str) -> Result<()> {
    if runtime.network_exists(name).await? {
        log::debug!("Network {name} already exists");
        return Ok(());
    }
    log::info!("Creating network {name}");
    runtime.create_network(name).await
}

fn missing_cert_files(dir: &Path) -> Vec<&'static str> {
    CERT_FILES
        .into_iter()
        .filter(|name| !dir.join(name).is_file())
        .collect()
}

/// Prepares instance-local state: directories, artifacts, certificates and configuration.
pub struct Provisioner<'a, F, P> {
    ctx: &'a Context,
    fetcher: &'a F,
    runner: &'a P,
}

impl<'a, F: ArtifactFetcher, P: ProcessRunner> Provisioner<'a, F, P> {
    pub fn new(ctx: &'a Context, fetcher: &'a F, runner: &'a P) -> Self {
        Self {
            ctx,
            fetcher,
            runner,
        }
    }

    pub async fn ensure_artifact(&self, artifact: &Artifact) -> Result<ArtifactOutcome> {
        ensure_artifact(self.fetcher, artifact).await
    }

    /// Every remote artifact of an instance.
    pub fn artifacts(&self, layout: &InstanceLayout) -> Result<Vec<Artifact>> {
        let sources = &self.ctx.settings().artifacts;
        let mut artifacts = vec![
            Artifact::file("server jar", &sources.server_jar, layout.server_jar()),
            Artifact::file("tester jar", &sources.tester_jar, layout.tester_jar()),
            Artifact::archive("resources", &sources.resources, layout.resources_dir()),
            Artifact::archive("web client", &sources.web_client, layout.web_dir()),
        ];
        for url in &sources.sql {
            let file_name = url_file_name(url)
                .ok_or_else(|| AppError::config(format!("sql url has no file name: {url}")))?;
            artifacts.push(Artifact::file(
                format!("sql {file_name}"),
                url,
                layout.sql_dir().join(file_name),
            ));
        }
        Ok(artifacts)
    }

    /// Return the directory nginx should mount, generating certificates when needed.
    ///
    /// A supplied directory is used as is and must already hold every file.
    pub async fn materialize_certificates(
        &self,
        layout: &InstanceLayout,
        supplied: Option<&Path>,
    ) -> Result<PathBuf> {
        if let Some(dir) = supplied {
            let missing = missing_cert_files(dir);
            if !missing.is_empty() {
                return Err(AppError::missing_certificates(
                    &dir.display().to_string(),
                    &missing,
                ));
            }
            log::info!("Using certificates from {}", dir.display());
            return Ok(dir.to_path_buf());
        }

        let dir = layout.generated_cert_dir();
        ensure_directory(&dir)?;
        if missing_cert_files(&dir).is_empty() {
            log::debug!("Reusing certificates in {}", dir.display());
            return Ok(dir);
        }

        log::info!("Generating certificates in {}", dir.display());
        let tool = self.ctx.root_path(&self.ctx.settings().cert_tool);
        // The tool prompts for certificate fields.
        let command = CommandSpec::new(tool.display().to_string())
            .arg(dir.display().to_string())
            .mode(OutputMode::Interactive);
        self.runner.run_checked(&command).await?;

        let missing = missing_cert_files(&dir);
        if !missing.is_empty() {
            return Err(AppError::process(format!(
                "{} did not produce {}",
                tool.display(),
                missing.join(", ")
            )));
        }
        Ok(dir)
    }

    /// Address written in place of the loopback address in templates.
    pub async fn host_ip(&self) -> Result<String> {
        if let Some(ip) = &self.ctx.settings().host_ip {
            return Ok(ip.clone());
        }
        let output = self
            .runner
            .run_checked(&CommandSpec::new("hostname").arg("-I"))
            .await?;
        output
            .stdout
            .split_whitespace()
            .next()
            .map(str::to_string)
            .ok_or_else(|| AppError::process("hostname -I reported no address"))
    }

    fn template_source(&self, file_name: &str) -> PathBuf {
        self.ctx
            .root_path(&self.ctx.settings().templates_dir)
            .join(file_name)
    }

    /// Bring the instance's host state to "present". Safe to repeat.
    pub async fn provision(
        &self,
        config: &InstanceConfig,
        layout: &InstanceLayout,
        names: &InstanceNames,
    ) -> Result<PathBuf> {
        log::info!("Provisioning instance {}", config.name);
        for dir in [
            layout.dir().to_path_buf(),
            layout.sql_dir(),
            config.tmp_dir.clone(),
            config.data_dir.clone(),
            pgdata_dir(config),
        ] {
            ensure_directory(&dir)?;
        }

        for artifact in self.artifacts(layout)? {
            self.ensure_artifact(&artifact).await?;
        }

        let cert_dir = self
            .materialize_certificates(layout, config.cert_dir.as_deref())
            .await?;

        let host_ip = self.host_ip().await?;
        log::info!("Rendering configuration for host {host_ip}");
        template_config(
            &self.template_source(SETTINGS_CFG),
            &layout.settings_cfg(),
            &settings_substitutions(names, &host_ip),
        )?;
        template_config(
            &self.template_source(NGINX_CONF),
            &layout.nginx_conf(),
            &nginx_substitutions(names, &host_ip),
        )?;

        Ok(cert_dir)
    }
}
