//! Path layout of a deployment root and its instance directories.

use std::path::{Path, PathBuf};

use crate::instance::InstanceConfig;

pub const SERVER_JAR: &str = "genomizer-server.jar";
pub const TESTER_JAR: &str = "genomizer-server-tester.jar";
pub const SETTINGS_CFG: &str = "settings.cfg";
pub const NGINX_CONF: &str = "nginx.conf";

/// Files and directories under `<root>/<instance>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceLayout {
    dir: PathBuf,
}

impl InstanceLayout {
    pub fn new(root: &Path, instance: &str) -> Self {
        Self {
            dir: root.join(instance),
        }
    }

    /// The instance directory, mounted read-only into the server container.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn server_jar(&self) -> PathBuf {
        self.dir.join(SERVER_JAR)
    }

    pub fn tester_jar(&self) -> PathBuf {
        self.dir.join(TESTER_JAR)
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.dir.join("resources")
    }

    pub fn web_dir(&self) -> PathBuf {
        self.dir.join("genomizer-web")
    }

    pub fn sql_dir(&self) -> PathBuf {
        self.dir.join("sql")
    }

    pub fn settings_cfg(&self) -> PathBuf {
        self.dir.join(SETTINGS_CFG)
    }

    pub fn nginx_conf(&self) -> PathBuf {
        self.dir.join(NGINX_CONF)
    }

    /// Where certificates are generated when none are supplied.
    pub fn generated_cert_dir(&self) -> PathBuf {
        self.dir.join("cert")
    }
}

/// Postgres data directory under an instance's data dir.
pub fn pgdata_dir(config: &InstanceConfig) -> PathBuf {
    config.data_dir.join("pgdata")
}
