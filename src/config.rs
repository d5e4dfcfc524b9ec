//! Deployment settings loaded from an optional TOML file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::instance::InstanceDefaults;

/// File name looked up under the deployment root when `--settings` is not given.
pub const SETTINGS_FILE_NAME: &str = "genomizer-deploy.toml";

const RELEASES_URL: &str = "https://github.com/genomizer/genomizer-server/releases/latest/download";
const SQL_URL: &str = "https://raw.githubusercontent.com/genomizer/genomizer-server/master/sql";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Prefix of every container, image and network name.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Container runtime CLI.
    #[serde(default = "default_docker")]
    pub docker: String,
    /// Address substituted for the loopback address in templates.
    #[serde(default)]
    pub host_ip: Option<String>,
    #[serde(default = "default_images_dir")]
    pub images_dir: PathBuf,
    #[serde(default = "default_templates_dir")]
    pub templates_dir: PathBuf,
    #[serde(default = "default_cert_tool")]
    pub cert_tool: PathBuf,
    /// Stop and start the whole stack once after the first boot.
    #[serde(default = "default_true")]
    pub restart_after_deploy: bool,
    /// Host packages installed by `install-prereqs`.
    #[serde(default = "default_prerequisites")]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub artifacts: ArtifactSources,
    /// Extra named instances, or replacements for the built-in ones.
    #[serde(default)]
    pub instances: BTreeMap<String, InstanceDefaults>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtifactSources {
    #[serde(default = "default_server_jar")]
    pub server_jar: String,
    #[serde(default = "default_tester_jar")]
    pub tester_jar: String,
    #[serde(default = "default_resources")]
    pub resources: String,
    #[serde(default = "default_web_client")]
    pub web_client: String,
    #[serde(default = "default_sql")]
    pub sql: Vec<String>,
}

fn default_prefix() -> String {
    "genomizer".to_string()
}

fn default_docker() -> String {
    "docker".to_string()
}

fn default_images_dir() -> PathBuf {
    PathBuf::from("docker")
}

fn default_templates_dir() -> PathBuf {
    PathBuf::from("templates")
}

fn default_cert_tool() -> PathBuf {
    PathBuf::from("scripts").join("generate-cert.sh")
}

fn default_true() -> bool {
    true
}

fn default_prerequisites() -> Vec<String> {
    vec!["docker.io".to_string(), "openssl".to_string()]
}

fn default_server_jar() -> String {
    format!("{RELEASES_URL}/genomizer-server.jar")
}

fn default_tester_jar() -> String {
    format!("{RELEASES_URL}/genomizer-server-tester.jar")
}

fn default_resources() -> String {
    format!("{RELEASES_URL}/resources.tar.gz")
}

fn default_web_client() -> String {
    "https://github.com/genomizer/genomizer-web/archive/refs/heads/master.tar.gz".to_string()
}

fn default_sql() -> Vec<String> {
    vec![
        format!("{SQL_URL}/genomizer_database_tables.sql"),
        format!("{SQL_URL}/add_test_tuples.sql"),
    ]
}

impl Default for ArtifactSources {
    fn default() -> Self {
        Self {
            server_jar: default_server_jar(),
            tester_jar: default_tester_jar(),
            resources: default_resources(),
            web_client: default_web_client(),
            sql: default_sql(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            docker: default_docker(),
            host_ip: None,
            images_dir: default_images_dir(),
            templates_dir: default_templates_dir(),
            cert_tool: default_cert_tool(),
            restart_after_deploy: true,
            prerequisites: default_prerequisites(),
            artifacts: ArtifactSources::default(),
            instances: BTreeMap::new(),
        }
    }
}

impl Settings {
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content.trim_start_matches('\u{feff}')).map_err(AppError::from)
    }

    /// Load settings for a deployment root.
    ///
    /// An explicit path must exist. Otherwise the root's settings file and then the
    /// user config directory are tried, falling back to built-in defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            let path = if path.is_absolute() {
                path.to_path_buf()
            } else {
                root.join(path)
            };
            return Self::load_file(&path);
        }

        let mut candidates = vec![root.join(SETTINGS_FILE_NAME)];
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("genomizer-deploy").join("settings.toml"));
        }

        for candidate in candidates {
            if candidate.is_file() {
                return Self::load_file(&candidate);
            }
        }

        log::debug!("No settings file found, using built-in defaults");
        Ok(Self::default())
    }

    fn load_file(path: &Path) -> Result<Self> {
        log::debug!("Loading settings from {}", path.display());
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::config(format!("Failed to read settings {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }
}
