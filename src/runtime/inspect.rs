//! Typed decoding of `docker container inspect` output.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{AppError, Result};

/// Observed state of one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerInfo {
    pub id: String,
    pub running: bool,
    /// Memory limit in bytes, `0` when unset.
    pub memory_bytes: u64,
    /// CPU shares, `0` when unset.
    pub cpu_shares: u64,
    /// Bind mounts keyed by container path.
    pub binds: BTreeMap<String, PathBuf>,
    /// Exposed container ports (tcp) mapped to their published host port.
    pub ports: BTreeMap<u16, Option<u16>>,
}

impl ContainerInfo {
    pub fn bind_source(&self, target: &str) -> Option<&PathBuf> {
        self.binds.get(target)
    }

    /// Host port for a container port; `None` when unpublished or not exposed.
    pub fn published_port(&self, container_port: u16) -> Option<u16> {
        self.ports.get(&container_port).copied().flatten()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawContainer {
    id: String,
    state: RawState,
    host_config: RawHostConfig,
    #[serde(default)]
    mounts: Vec<RawMount>,
    network_settings: RawNetworkSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawState {
    running: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawHostConfig {
    memory: u64,
    cpu_shares: u64,
    #[serde(default)]
    port_bindings: Option<RawPortMap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawMount {
    #[serde(rename = "Type")]
    kind: String,
    source: String,
    destination: String,
}

type RawPortMap = HashMap<String, Option<Vec<RawPortBinding>>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawNetworkSettings {
    #[serde(default)]
    ports: Option<RawPortMap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RawPortBinding {
    host_port: String,
}

/// Decode the JSON array printed by `docker container inspect <name>`.
pub fn decode_container(name: &str, json: &str) -> Result<ContainerInfo> {
    let mut raw: Vec<RawContainer> = serde_json::from_str(json)
        .map_err(|e| AppError::malformed_metadata(name, e.to_string()))?;

    if raw.len() != 1 {
        return Err(AppError::malformed_metadata(
            name,
            format!("expected one object, got {}", raw.len()),
        ));
    }
    let raw = raw.remove(0);

    let binds = raw
        .mounts
        .into_iter()
        .filter(|m| m.kind == "bind")
        .map(|m| (m.destination, PathBuf::from(m.source)))
        .collect();

    // Configured bindings survive a stop; live ones only fill gaps.
    let mut ports = BTreeMap::new();
    decode_ports(name, raw.host_config.port_bindings, &mut ports)?;
    decode_ports(name, raw.network_settings.ports, &mut ports)?;

    Ok(ContainerInfo {
        id: raw.id,
        running: raw.state.running,
        memory_bytes: raw.host_config.memory,
        cpu_shares: raw.host_config.cpu_shares,
        binds,
        ports,
    })
}

fn decode_ports(
    name: &str,
    raw: Option<RawPortMap>,
    ports: &mut BTreeMap<u16, Option<u16>>,
) -> Result<()> {
    for (key, bindings) in raw.unwrap_or_default() {
        let Some(port) = parse_tcp_port(&key) else {
            if !key.ends_with("/udp") && !key.ends_with("/sctp") {
                return Err(AppError::malformed_metadata(
                    name,
                    format!("bad port key {key:?}"),
                ));
            }
            continue;
        };
        let host_port = match bindings.as_deref().and_then(|b| b.first()) {
            Some(binding) if binding.host_port.is_empty() => None,
            Some(binding) => Some(binding.host_port.parse::<u16>().map_err(|_| {
                AppError::malformed_metadata(
                    name,
                    format!("bad host port {:?} for {key}", binding.host_port),
                )
            })?),
            None => None,
        };
        let entry = ports.entry(port).or_insert(None);
        if entry.is_none() {
            *entry = host_port;
        }
    }
    Ok(())
}

fn parse_tcp_port(key: &str) -> Option<u16> {
    let (port, proto) = key.split_once('/').unwrap_or((key, "tcp"));
    if proto != "tcp" {
        return None;
    }
    port.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const NGINX: &str = r#"[{
        "Id": "f00d",
        "State": {"Status": "running", "Running": true},
        "HostConfig": {"Memory": 2097152000, "CpuShares": 2},
        "Mounts": [
            {"Type": "bind", "Source": "/srv/dev1/cert", "Destination": "/etc/nginx/ssl", "RW": false},
            {"Type": "volume", "Source": "/var/lib/docker/volumes/x", "Destination": "/cache"}
        ],
        "NetworkSettings": {
            "Ports": {
                "80/tcp": [{"HostIp": "0.0.0.0", "HostPort": "8081"}, {"HostIp": "::", "HostPort": "8081"}],
                "443/tcp": null,
                "53/udp": null
            }
        }
    }]"#;

    #[test]
    fn decodes_limits_binds_and_ports() {
        let info = decode_container("nginx", NGINX).unwrap();
        assert_eq!(info.id, "f00d");
        assert!(info.running);
        assert_eq!(info.memory_bytes, 2_097_152_000);
        assert_eq!(info.cpu_shares, 2);
        assert_eq!(
            info.bind_source("/etc/nginx/ssl"),
            Some(&PathBuf::from("/srv/dev1/cert"))
        );
        assert_eq!(info.bind_source("/cache"), None);
        assert_eq!(info.published_port(80), Some(8081));
        assert_eq!(info.published_port(443), None);
        assert_eq!(info.published_port(7000), None);
    }

    #[test]
    fn stopped_container_without_ports_decodes() {
        let json = r#"[{
            "Id": "abc",
            "State": {"Running": false},
            "HostConfig": {"Memory": 0, "CpuShares": 0},
            "Mounts": [],
            "NetworkSettings": {"Ports": {}}
        }]"#;
        let info = decode_container("pg", json).unwrap();
        assert!(!info.running);
        assert!(info.ports.is_empty());
        assert!(info.binds.is_empty());
    }

    #[test]
    fn configured_bindings_are_reported_while_stopped() {
        let json = r#"[{
            "Id": "abc",
            "State": {"Running": false},
            "HostConfig": {
                "Memory": 0,
                "CpuShares": 0,
                "PortBindings": {"7000/tcp": [{"HostIp": "", "HostPort": "7001"}], "80/tcp": [{"HostIp": "", "HostPort": ""}]}
            },
            "NetworkSettings": {"Ports": {}}
        }]"#;
        let info = decode_container("server", json).unwrap();
        assert_eq!(info.published_port(7000), Some(7001));
        assert_eq!(info.published_port(80), None);
    }

    #[test]
    fn missing_host_config_is_malformed() {
        let json = r#"[{"Id": "abc", "State": {"Running": true}, "NetworkSettings": {}}]"#;
        let err = decode_container("server", json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRuntimeMetadata);
    }

    #[test]
    fn non_numeric_host_port_is_malformed() {
        let json = r#"[{
            "Id": "abc",
            "State": {"Running": true},
            "HostConfig": {"Memory": 0, "CpuShares": 0},
            "NetworkSettings": {"Ports": {"7000/tcp": [{"HostIp": "", "HostPort": "http"}]}}
        }]"#;
        let err = decode_container("server", json).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRuntimeMetadata);
    }

    #[test]
    fn empty_array_is_malformed() {
        let err = decode_container("server", "[]").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedRuntimeMetadata);
    }
}
