use std::{
    fmt::Debug,
    path::{Path, PathBuf},
    time::Duration,
};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use url::Url;

use crate::{error::ChartError, workspace::ScratchWorkspace};

const DEFAULT_ARCHIVE_NAME: &str = "chart.tgz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimits {
    pub timeout: Duration,
    pub max_download_bytes: u64,
}

impl Default for FetchLimits {
    fn default() -> Self {
        FetchLimits {
            timeout: Duration::from_secs(60),
            max_download_bytes: 20 * 1024 * 1024,
        }
    }
}

#[derive(Clone)]
pub struct ChartClient {
    http_client: reqwest::Client,
    scratch_root: Option<PathBuf>,
    limits: FetchLimits,
}

impl Debug for ChartClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartClient")
            .field("scratch_root", &self.scratch_root)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

/// A chart archive on local disk, together with the workspace holding it.
#[derive(Debug)]
pub struct DownloadedArchive {
    workspace: ScratchWorkspace,
    path: PathBuf,
    size: u64,
}

impl DownloadedArchive {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn close(self) {
        self.workspace.close();
    }
}

impl ChartClient {
    pub fn new(scratch_root: Option<PathBuf>, limits: FetchLimits) -> Result<Self, ChartError> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("chart-client/", env!("CARGO_PKG_VERSION")))
            .timeout(limits.timeout)
            .build()?;
        Ok(ChartClient {
            http_client,
            scratch_root,
            limits,
        })
    }

    pub fn scratch_root(&self) -> Option<&Path> {
        self.scratch_root.as_deref()
    }

    /// Stream the resource at `url` into a fresh scratch workspace.
    ///
    /// Any failure drops the workspace, so nothing is left behind on error.
    pub async fn download(&self, url: &Url) -> Result<DownloadedArchive, ChartError> {
        let workspace = ScratchWorkspace::create(self.scratch_root(), "chart-download-")?;
        let path = workspace.join(archive_file_name(url));
        let mut file = tokio::fs::File::create(&path)
            .await
            .map_err(ChartError::storage("failed to create temp file"))?;

        info!(%url, "Downloading chart");
        let mut resp = self.http_client.get(url.clone()).send().await?;
        if !resp.status().is_success() {
            return Err(ChartError::UnexpectedStatus(resp.status().as_u16()));
        }
        let max = self.limits.max_download_bytes;
        if resp.content_length().is_some_and(|len| len > max) {
            return Err(ChartError::DownloadTooLarge(max));
        }

        let mut size: u64 = 0;
        while let Some(chunk) = resp.chunk().await? {
            size += chunk.len() as u64;
            if size > max {
                return Err(ChartError::DownloadTooLarge(max));
            }
            file.write_all(&chunk)
                .await
                .map_err(ChartError::storage("failed to copy content to file"))?;
        }
        file.flush()
            .await
            .map_err(ChartError::storage("failed to copy content to file"))?;
        debug!(path = %path.display(), size, "Successfully downloaded chart");

        Ok(DownloadedArchive {
            workspace,
            path,
            size,
        })
    }
}

fn archive_file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or(DEFAULT_ARCHIVE_NAME)
        .to_string()
}
