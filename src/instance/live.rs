use crate::error::{AppError, Result};
use crate::runtime::{ContainerInfo, ContainerRuntime};

use super::config::{InstanceConfig, Limit, Ports};
use super::wiring::{
    InstanceNames, Role, CERT_MOUNT, DATA_MOUNT, NGINX_HTTPS_PORT, NGINX_HTTP_PORT,
    SERVER_INTERNAL_PORT, TMP_MOUNT,
};

const MIB: u64 = 1024 * 1024;

/// Rebuild an instance's configuration from what the runtime reports.
///
/// Only the server and nginx containers are inspected. Nothing is modified.
pub async fn reconstruct_from_live<R: ContainerRuntime>(
    runtime: &R,
    names: &InstanceNames,
) -> Result<InstanceConfig> {
    let server = inspect_required(runtime, names, Role::Server).await?;
    let nginx = inspect_required(runtime, names, Role::Nginx).await?;

    let server_name = names.container(Role::Server);
    let tmp_dir = required_bind(&server, &server_name, TMP_MOUNT)?;
    let data_dir = required_bind(&server, &server_name, DATA_MOUNT)?;

    Ok(InstanceConfig {
        name: names.instance().to_string(),
        ram: Limit::from_runtime(server.memory_bytes / MIB)?,
        cpu: Limit::from_runtime(server.cpu_shares)?,
        ports: Ports {
            server: server.published_port(SERVER_INTERNAL_PORT),
            http: nginx.published_port(NGINX_HTTP_PORT),
            https: nginx.published_port(NGINX_HTTPS_PORT),
        },
        tmp_dir,
        data_dir,
        cert_dir: nginx.bind_source(CERT_MOUNT).cloned(),
    })
}

async fn inspect_required<R: ContainerRuntime>(
    runtime: &R,
    names: &InstanceNames,
    role: Role,
) -> Result<ContainerInfo> {
    runtime
        .inspect_container(&names.container(role))
        .await?
        .ok_or_else(|| AppError::instance_not_deployed(names.instance()))
}

fn required_bind(
    info: &ContainerInfo,
    container: &str,
    target: &str,
) -> Result<std::path::PathBuf> {
    info.bind_source(target).cloned().ok_or_else(|| {
        AppError::malformed_metadata(container, format!("no bind mount for {target}"))
    })
}
