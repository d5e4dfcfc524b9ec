//! Named instance configurations: static defaults and override merging.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{AppError, Result};

/// The instance commands act on when none is named.
pub const DEFAULT_INSTANCE: &str = "production";

/// A resource limit; the runtime's `0` maps to `Unlimited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "LimitRepr")]
pub enum Limit {
    #[default]
    Unlimited,
    Limited(u32),
}

impl Limit {
    /// Normalize a raw runtime value where zero means "not set".
    pub fn from_runtime(value: u64) -> Result<Self> {
        if value == 0 {
            return Ok(Self::Unlimited);
        }
        u32::try_from(value)
            .map(Self::Limited)
            .map_err(|_| AppError::config(format!("limit {value} out of range")))
    }

    pub fn value(&self) -> Option<u32> {
        match self {
            Self::Unlimited => None,
            Self::Limited(v) => Some(*v),
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Limited(v) => write!(f, "{v}"),
        }
    }
}

impl FromStr for Limit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::Unlimited);
        }
        match s.parse::<u32>() {
            Ok(0) => Ok(Self::Unlimited),
            Ok(v) => Ok(Self::Limited(v)),
            Err(_) => Err(format!("expected a positive integer or \"unlimited\", got {s:?}")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LimitRepr {
    Number(u32),
    Text(String),
}

impl TryFrom<LimitRepr> for Limit {
    type Error = String;

    fn try_from(repr: LimitRepr) -> std::result::Result<Self, Self::Error> {
        match repr {
            LimitRepr::Number(0) => Ok(Self::Unlimited),
            LimitRepr::Number(v) => Ok(Self::Limited(v)),
            LimitRepr::Text(s) => s.parse(),
        }
    }
}

/// Host port bindings; `None` leaves the port unpublished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ports {
    pub server: Option<u16>,
    pub http: Option<u16>,
    pub https: Option<u16>,
}

/// Fully resolved parameters of one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceConfig {
    pub name: String,
    /// RAM limit in MiB.
    pub ram: Limit,
    /// CPU shares.
    pub cpu: Limit,
    pub ports: Ports,
    pub tmp_dir: PathBuf,
    pub data_dir: PathBuf,
    /// Externally supplied certificate directory.
    pub cert_dir: Option<PathBuf>,
}

impl fmt::Display for InstanceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn port(p: Option<u16>) -> String {
            p.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string())
        }

        writeln!(f, "instance:    {}", self.name)?;
        writeln!(f, "ram (MiB):   {}", self.ram)?;
        writeln!(f, "cpu shares:  {}", self.cpu)?;
        writeln!(f, "server port: {}", port(self.ports.server))?;
        writeln!(f, "http port:   {}", port(self.ports.http))?;
        writeln!(f, "https port:  {}", port(self.ports.https))?;
        writeln!(f, "tmp dir:     {}", self.tmp_dir.display())?;
        writeln!(f, "data dir:    {}", self.data_dir.display())?;
        match &self.cert_dir {
            Some(dir) => write!(f, "cert dir:    {}", dir.display()),
            None => write!(f, "cert dir:    (generated)"),
        }
    }
}

/// Static defaults of one named instance, as written in the settings file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct InstanceDefaults {
    #[serde(default)]
    pub ram: Limit,
    #[serde(default)]
    pub cpu: Limit,
    #[serde(default)]
    pub server_port: Option<u16>,
    #[serde(default)]
    pub http_port: Option<u16>,
    #[serde(default)]
    pub https_port: Option<u16>,
    #[serde(default)]
    pub tmp_dir: Option<PathBuf>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub cert_dir: Option<PathBuf>,
}

impl InstanceDefaults {
    fn builtin(ram: Limit, cpu: Limit, http: u16, https: u16) -> Self {
        Self {
            ram,
            cpu,
            http_port: Some(http),
            https_port: Some(https),
            ..Self::default()
        }
    }
}

/// Values supplied on the command line; `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub ram: Option<Limit>,
    pub cpu: Option<Limit>,
    pub server_port: Option<u16>,
    pub http_port: Option<u16>,
    pub https_port: Option<u16>,
    pub tmp_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub cert_dir: Option<PathBuf>,
}

/// Table of named instance defaults.
#[derive(Debug, Clone)]
pub struct ConfigTable {
    entries: BTreeMap<String, InstanceDefaults>,
}

impl Default for ConfigTable {
    fn default() -> Self {
        let dev = Limit::Limited(4000);
        let small = Limit::Limited(2000);
        let one = Limit::Limited(1);
        let entries = BTreeMap::from([
            (
                DEFAULT_INSTANCE.to_string(),
                InstanceDefaults::builtin(Limit::Unlimited, Limit::Unlimited, 80, 443),
            ),
            ("dev1".to_string(), InstanceDefaults::builtin(dev, one, 8081, 4431)),
            ("dev2".to_string(), InstanceDefaults::builtin(dev, one, 8082, 4432)),
            ("dev3".to_string(), InstanceDefaults::builtin(dev, one, 8083, 4433)),
            ("web".to_string(), InstanceDefaults::builtin(small, one, 8090, 4490)),
            ("client".to_string(), InstanceDefaults::builtin(small, one, 8091, 4491)),
        ]);
        Self { entries }
    }
}

impl ConfigTable {
    /// Built-in table with settings-file entries layered on top.
    pub fn with_overlay(extra: &BTreeMap<String, InstanceDefaults>) -> Self {
        let mut table = Self::default();
        for (name, defaults) in extra {
            table.entries.insert(name.clone(), defaults.clone());
        }
        table
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Look up `name` and merge `overrides` on top. Relative paths resolve against `root`.
    pub fn resolve(
        &self,
        name: &str,
        overrides: &ConfigOverrides,
        root: &Path,
    ) -> Result<InstanceConfig> {
        let defaults = self
            .entries
            .get(name)
            .ok_or_else(|| AppError::unknown_instance(name))?;

        let tmp_dir = overrides
            .tmp_dir
            .clone()
            .or_else(|| defaults.tmp_dir.clone())
            .unwrap_or_else(|| PathBuf::from("tmp").join(name));
        let data_dir = overrides
            .data_dir
            .clone()
            .or_else(|| defaults.data_dir.clone())
            .unwrap_or_else(|| PathBuf::from("data").join(name));
        let cert_dir = overrides
            .cert_dir
            .clone()
            .or_else(|| defaults.cert_dir.clone());

        Ok(InstanceConfig {
            name: name.to_string(),
            ram: overrides.ram.unwrap_or(defaults.ram),
            cpu: overrides.cpu.unwrap_or(defaults.cpu),
            ports: Ports {
                server: overrides.server_port.or(defaults.server_port),
                http: overrides.http_port.or(defaults.http_port),
                https: overrides.https_port.or(defaults.https_port),
            },
            tmp_dir: absolutize(root, tmp_dir),
            data_dir: absolutize(root, data_dir),
            cert_dir: cert_dir.map(|dir| absolutize(root, dir)),
        })
    }
}

fn absolutize(root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        root.join(path)
    }
}
