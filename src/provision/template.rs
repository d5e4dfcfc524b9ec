//! Literal placeholder substitution for configuration templates.

use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::instance::{InstanceNames, Role};

const LOOPBACK: &str = "127.0.0.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Substitution {
    pub from: String,
    pub to: String,
}

impl Substitution {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Replacements for the server's `settings.cfg`.
pub fn settings_substitutions(names: &InstanceNames, host_ip: &str) -> Vec<Substitution> {
    vec![
        Substitution::new(
            names.template_host(Role::Postgres),
            names.container(Role::Postgres),
        ),
        Substitution::new(LOOPBACK, host_ip),
    ]
}

/// Replacements for nginx's `nginx.conf`.
pub fn nginx_substitutions(names: &InstanceNames, host_ip: &str) -> Vec<Substitution> {
    vec![
        Substitution::new(
            names.template_host(Role::Server),
            names.container(Role::Server),
        ),
        Substitution::new(LOOPBACK, host_ip),
    ]
}

/// Apply every substitution, in order, to all occurrences.
pub fn render(source: &[u8], substitutions: &[Substitution]) -> Vec<u8> {
    substitutions.iter().fold(source.to_vec(), |text, sub| {
        replace_all(&text, sub.from.as_bytes(), sub.to.as_bytes())
    })
}

fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Vec<u8> {
    if from.is_empty() {
        return haystack.to_vec();
    }
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.windows(from.len()).position(|w| w == from) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(to);
        rest = &rest[pos + from.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// Render `source` into `dest`. The destination is replaced atomically.
pub fn template_config(source: &Path, dest: &Path, substitutions: &[Substitution]) -> Result<()> {
    let content = fs::read(source).map_err(|e| {
        AppError::missing_prerequisite(format!("template {}: {}", source.display(), e))
    })?;
    let rendered = render(&content, substitutions);

    let mut tmp_name = dest.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp = dest.with_file_name(tmp_name);
    fs::write(&tmp, rendered)?;
    fs::rename(&tmp, dest)?;
    log::debug!("Rendered {} -> {}", source.display(), dest.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn substitutions_apply_in_order() {
        let subs = [Substitution::new("a", "b"), Substitution::new("b", "c")];
        assert_eq!(render(b"ab", &subs), b"cc");
    }

    #[test]
    fn settings_table_renames_database_host() {
        let names = InstanceNames::new("genomizer", "dev1");
        let out = render(
            b"db=genomizer-postgres:5432\nbind=127.0.0.1\nbackup=127.0.0.1\n",
            &settings_substitutions(&names, "192.168.0.7"),
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "db=genomizer-postgres-dev1:5432\nbind=192.168.0.7\nbackup=192.168.0.7\n"
        );
    }

    #[test]
    fn nginx_table_leaves_other_hosts_alone() {
        let names = InstanceNames::new("lab", "web");
        let out = render(
            b"proxy_pass http://genomizer-server:7000; # genomizer-postgres\n",
            &nginx_substitutions(&names, "10.0.0.1"),
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "proxy_pass http://lab-server-web:7000; # genomizer-postgres\n"
        );
    }

    #[test]
    fn template_config_overwrites_destination() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("nginx.conf.in");
        let dest = dir.path().join("nginx.conf");
        fs::write(&source, "listen 127.0.0.1;").unwrap();
        fs::write(&dest, "stale").unwrap();

        template_config(&source, &dest, &[Substitution::new("127.0.0.1", "10.9.8.7")]).unwrap();

        assert_eq!(fs::read_to_string(&dest).unwrap(), "listen 10.9.8.7;");
        assert!(!dir.path().join("nginx.conf.tmp").exists());
    }

    #[test]
    fn missing_template_is_a_prerequisite_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = template_config(&dir.path().join("absent"), &dir.path().join("out"), &[])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingPrerequisite);
    }
}
