//! Archive extraction for downloaded bundles.
//!
//! Every entry loses its first path component (like `tar --strip-components=1`),
//! so `genomizer-web-master/index.html` lands at `<dest>/index.html`.

mod extract;
mod path;
mod tar_gz;
mod zip_ops;

use std::path::Path;

use crate::error::{AppError, ErrorKind, Result};

/// Archive formats recognised by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

impl ArchiveFormat {
    /// Detect the format from a URL or file name, ignoring any query string.
    pub fn detect(name: &str) -> Option<Self> {
        let name = name.split(['?', '#']).next().unwrap_or(name);
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if lower.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }
}

/// Extract `archive_path` into `dest_dir`, dropping the top-level path component.
pub fn extract_stripped(format: ArchiveFormat, archive_path: &Path, dest_dir: &Path) -> Result<()> {
    match format {
        ArchiveFormat::TarGz => tar_gz::extract_tar_gz_stripped(archive_path, dest_dir),
        ArchiveFormat::Zip => zip_ops::extract_zip_stripped(archive_path, dest_dir),
    }
    .map_err(|e| match e.kind() {
        ErrorKind::Archive => e,
        _ => AppError::archive(format!("{}: {}", archive_path.display(), e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_format_from_url() {
        assert_eq!(
            ArchiveFormat::detect("https://x/archive/refs/heads/master.tar.gz"),
            Some(ArchiveFormat::TarGz)
        );
        assert_eq!(ArchiveFormat::detect("bundle.TGZ"), Some(ArchiveFormat::TarGz));
        assert_eq!(
            ArchiveFormat::detect("https://x/web.zip?token=1"),
            Some(ArchiveFormat::Zip)
        );
        assert_eq!(ArchiveFormat::detect("server.jar"), None);
    }
}
