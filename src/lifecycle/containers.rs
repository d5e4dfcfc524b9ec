//! Container specs and images per role.

use std::path::Path;

use crate::context::Context;
use crate::error::{AppError, Result};
use crate::instance::wiring::{
    APP_MOUNT, CERT_MOUNT, DATA_MOUNT, NGINX_CONF_MOUNT, NGINX_HTTPS_PORT, NGINX_HTTP_PORT,
    PGDATA_MOUNT, SERVER_INTERNAL_PORT, SQL_MOUNT, TMP_MOUNT, WEB_MOUNT,
};
use crate::instance::{InstanceConfig, InstanceNames, Role};
use crate::paths::{pgdata_dir, InstanceLayout};
use crate::runtime::{ContainerRuntime, ContainerSpec, Mount};

fn mount(source: impl AsRef<Path>, target: &str, read_only: bool) -> Mount {
    Mount {
        source: source.as_ref().to_path_buf(),
        target: target.to_string(),
        read_only,
    }
}

/// How the container for `role` is created.
pub fn container_spec(
    role: Role,
    config: &InstanceConfig,
    names: &InstanceNames,
    layout: &InstanceLayout,
    cert_dir: &Path,
) -> ContainerSpec {
    let mut spec = ContainerSpec {
        name: names.container(role),
        image: names.image(role),
        network: names.network(),
        memory_mib: None,
        cpu_shares: None,
        mounts: Vec::new(),
        ports: Vec::new(),
    };

    match role {
        Role::Postgres => {
            spec.mounts = vec![
                mount(pgdata_dir(config), PGDATA_MOUNT, false),
                mount(layout.sql_dir(), SQL_MOUNT, true),
            ];
        }
        Role::Server => {
            spec.memory_mib = config.ram.value();
            // The daemon stores shares below 2 as 2, so `info` reports cpu=1 as 2.
            spec.cpu_shares = config.cpu.value();
            spec.mounts = vec![
                mount(&config.tmp_dir, TMP_MOUNT, false),
                mount(&config.data_dir, DATA_MOUNT, false),
                mount(layout.dir(), APP_MOUNT, true),
            ];
            spec.ports = config
                .ports
                .server
                .map(|host| (host, SERVER_INTERNAL_PORT))
                .into_iter()
                .collect();
        }
        Role::Nginx => {
            spec.memory_mib = config.ram.value();
            spec.cpu_shares = config.cpu.value();
            spec.mounts = vec![
                mount(cert_dir, CERT_MOUNT, true),
                mount(layout.nginx_conf(), NGINX_CONF_MOUNT, true),
                mount(layout.web_dir(), WEB_MOUNT, true),
            ];
            spec.ports = [
                (config.ports.http, NGINX_HTTP_PORT),
                (config.ports.https, NGINX_HTTPS_PORT),
            ]
            .into_iter()
            .filter_map(|(host, internal)| host.map(|h| (h, internal)))
            .collect();
        }
    }

    spec
}

/// Reuse the role's image, or build it from `<images_dir>/<role>`.
pub async fn ensure_image<R: ContainerRuntime>(
    runtime: &R,
    ctx: &Context,
    names: &InstanceNames,
    role: Role,
) -> Result<()> {
    let image = names.image(role);
    if runtime.image_exists(&image).await? {
        log::debug!("Image {image} present");
        return Ok(());
    }

    let build_context = ctx
        .root_path(&ctx.settings().images_dir)
        .join(role.as_str());
    if !build_context.is_dir() {
        return Err(AppError::missing_prerequisite(format!(
            "image {image} not found and no build context at {}",
            build_context.display()
        )));
    }

    log::info!("Building image {image} from {}", build_context.display());
    runtime.build_image(&image, &build_context).await
}
