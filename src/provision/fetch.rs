//! Artifact download and placement.

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use futures_util::StreamExt as _;
use reqwest::Client;

use crate::archive::{extract_stripped, ArchiveFormat};
use crate::error::{AppError, Result};

/// Source of remote artifacts.
#[allow(async_fn_in_trait)]
pub trait ArtifactFetcher {
    /// Write the body behind `url` to `dest`, replacing any existing file.
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()>;
}

/// Streams artifacts over HTTP(S).
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("genomizer-deploy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl ArtifactFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, dest: &Path) -> Result<()> {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::network_with_url(url, e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AppError::network_with_url(url, resp.status().to_string()));
        }

        let mut file = fs::File::create(dest)?;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| AppError::network_with_url(url, e.to_string()))?;
            file.write_all(&chunk)?;
        }
        file.flush()?;

        Ok(())
    }
}

/// One remote artifact and where it lands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub name: String,
    pub url: String,
    /// File path, or the directory an archive is unpacked into.
    pub target: PathBuf,
    pub unpack: bool,
}

impl Artifact {
    pub fn file(name: impl Into<String>, url: impl Into<String>, target: PathBuf) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            target,
            unpack: false,
        }
    }

    pub fn archive(name: impl Into<String>, url: impl Into<String>, target: PathBuf) -> Self {
        Self {
            unpack: true,
            ..Self::file(name, url, target)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactOutcome {
    /// Target already present; nothing fetched.
    Skipped,
    Fetched,
}

/// Fetch `artifact` unless its target already exists.
///
/// Partial downloads and extractions use sibling paths that are renamed into
/// place last, so an interrupted run never leaves a target that looks complete.
pub async fn ensure_artifact<F: ArtifactFetcher>(
    fetcher: &F,
    artifact: &Artifact,
) -> Result<ArtifactOutcome> {
    if artifact.target.exists() {
        log::info!(
            "{} already present at {}, skipping",
            artifact.name,
            artifact.target.display()
        );
        return Ok(ArtifactOutcome::Skipped);
    }

    log::info!("Fetching {} from {}", artifact.name, artifact.url);
    if let Some(parent) = artifact.target.parent() {
        fs::create_dir_all(parent)?;
    }

    if !artifact.unpack {
        let part = sibling(&artifact.target, "part");
        fetcher.fetch(&artifact.url, &part).await?;
        fs::rename(&part, &artifact.target)?;
        return Ok(ArtifactOutcome::Fetched);
    }

    let format = ArchiveFormat::detect(&artifact.url).ok_or_else(|| {
        AppError::config(format!(
            "cannot tell archive format of {} from {}",
            artifact.name, artifact.url
        ))
    })?;
    let download = sibling(&artifact.target, &format!("{}.part", format.extension()));
    let staging = sibling(&artifact.target, "staging");

    fetcher.fetch(&artifact.url, &download).await?;
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    log::debug!("Unpacking {} into {}", download.display(), staging.display());
    extract_stripped(format, &download, &staging)?;
    fs::rename(&staging, &artifact.target)?;
    if let Err(e) = fs::remove_file(&download) {
        log::warn!("Failed to remove {}: {}", download.display(), e);
    }

    Ok(ArtifactOutcome::Fetched)
}

/// `<dir>/<name>.<suffix>` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// Last path segment of a URL, without query or fragment.
pub fn url_file_name(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    path.rsplit('/').next().filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{tar_gz, FakeFetcher};

    const JAR_URL: &str = "http://mirror/genomizer-server.jar";
    const WEB_URL: &str = "http://mirror/web/master.tar.gz";

    #[tokio::test]
    async fn second_call_fetches_nothing_and_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().with(JAR_URL, "v1");
        let artifact = Artifact::file("server jar", JAR_URL, dir.path().join("server.jar"));

        assert_eq!(
            ensure_artifact(&fetcher, &artifact).await.unwrap(),
            ArtifactOutcome::Fetched
        );
        assert_eq!(
            ensure_artifact(&fetcher, &artifact).await.unwrap(),
            ArtifactOutcome::Skipped
        );
        assert_eq!(fetcher.fetched(), [JAR_URL]);
        assert_eq!(fs::read_to_string(&artifact.target).unwrap(), "v1");
        assert!(!dir.path().join("server.jar.part").exists());
    }

    #[tokio::test]
    async fn archive_is_unpacked_without_top_directory() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().with(
            WEB_URL,
            tar_gz(&[("genomizer-web-master/index.html", Some("<html/>"))]),
        );
        let target = dir.path().join("genomizer-web");
        let artifact = Artifact::archive("web client", WEB_URL, target.clone());

        ensure_artifact(&fetcher, &artifact).await.unwrap();

        assert_eq!(fs::read_to_string(target.join("index.html")).unwrap(), "<html/>");
        assert!(!dir.path().join("genomizer-web.staging").exists());
        assert!(!dir.path().join("genomizer-web.tar.gz.part").exists());
    }

    #[tokio::test]
    async fn failed_fetch_leaves_target_absent() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default();
        let artifact = Artifact::file("tester jar", JAR_URL, dir.path().join("tester.jar"));

        let err = ensure_artifact(&fetcher, &artifact).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
        assert!(!artifact.target.exists());
    }

    #[tokio::test]
    async fn unknown_archive_suffix_is_rejected_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = FakeFetcher::default().with("http://mirror/blob", "x");
        let artifact = Artifact::archive("blob", "http://mirror/blob", dir.path().join("blob"));

        let err = ensure_artifact(&fetcher, &artifact).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert!(fetcher.fetched().is_empty());
    }

    #[test]
    fn url_file_name_drops_query() {
        assert_eq!(url_file_name("http://h/sql/a.sql?raw=1"), Some("a.sql"));
        assert_eq!(url_file_name("http://h/sql/"), None);
    }
}
