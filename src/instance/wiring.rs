//! Deterministic naming of runtime objects and the fixed container wiring.

use std::fmt;

/// Port the application server listens on inside its container.
pub const SERVER_INTERNAL_PORT: u16 = 7000;
pub const NGINX_HTTP_PORT: u16 = 80;
pub const NGINX_HTTPS_PORT: u16 = 443;

pub const TMP_MOUNT: &str = "/tmp";
pub const DATA_MOUNT: &str = "/data";
pub const CERT_MOUNT: &str = "/etc/nginx/ssl";
pub const APP_MOUNT: &str = "/genomizer";
pub const PGDATA_MOUNT: &str = "/var/lib/postgresql/data";
pub const SQL_MOUNT: &str = "/docker-entrypoint-initdb.d";
pub const NGINX_CONF_MOUNT: &str = "/etc/nginx/nginx.conf";
pub const WEB_MOUNT: &str = "/usr/share/nginx/html";

/// One of the three containers of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, clap::ValueEnum)]
pub enum Role {
    Postgres,
    Server,
    Nginx,
}

impl Role {
    /// Dependency order: every role only needs the ones before it.
    pub const START_ORDER: [Self; 3] = [Self::Postgres, Self::Server, Self::Nginx];
    pub const STOP_ORDER: [Self; 3] = [Self::Nginx, Self::Server, Self::Postgres];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Server => "server",
            Self::Nginx => "nginx",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime object names of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceNames {
    prefix: String,
    instance: String,
}

impl InstanceNames {
    pub fn new(prefix: impl Into<String>, instance: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            instance: instance.into(),
        }
    }

    pub fn instance(&self) -> &str {
        &self.instance
    }

    /// `<prefix>-<role>-<instance>`
    pub fn container(&self, role: Role) -> String {
        format!("{}-{}-{}", self.prefix, role, self.instance)
    }

    pub fn network(&self) -> String {
        format!("{}-net-{}", self.prefix, self.instance)
    }

    /// Images are shared by every instance.
    pub fn image(&self, role: Role) -> String {
        format!("{}-{}", self.prefix, role)
    }

    /// Container name as it appears in the unmodified templates.
    pub fn template_host(&self, role: Role) -> String {
        format!("genomizer-{}", role)
    }
}
