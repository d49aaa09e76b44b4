use std::{
    fmt::Debug,
    io::Write,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use chart_client::files::{ChartMetadata, MetadataError};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("invalid chart: {0}")]
    InvalidChart(#[from] MetadataError),
    #[error("library chart '{0}' cannot be templated")]
    LibraryChart(String),
    #[error("unable to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("unable to write override values: {0}")]
    Values(#[source] std::io::Error),
    #[error("rendering did not finish within {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Failed(String),
}

/// Release identity handed to the engine; fixed per deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    pub release_name: String,
    pub namespace: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            release_name: "my-release".to_string(),
            namespace: "default".to_string(),
        }
    }
}

/// A chart loaded by an engine. Only the engine that produced it looks inside.
#[derive(Debug, Clone)]
pub struct LoadedChart {
    pub dir: PathBuf,
    pub metadata: ChartMetadata,
}

#[async_trait]
pub trait RenderEngine: Debug + Send + Sync {
    async fn load_chart(&self, dir: &Path) -> Result<LoadedChart, RenderError>;

    async fn render(
        &self,
        chart: &LoadedChart,
        settings: &RenderSettings,
        values: &Map<String, Value>,
    ) -> Result<String, RenderError>;
}

/// Renders charts by running `helm template`.
#[derive(Debug, Clone)]
pub struct HelmCli {
    binary: String,
    timeout: Duration,
}

impl HelmCli {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        HelmCli {
            binary: binary.into(),
            timeout,
        }
    }

    /// Write the overrides next to the chart directory, inside the same
    /// scratch workspace. The file is removed when the handle is dropped.
    fn values_file(
        chart: &LoadedChart,
        values: &Map<String, Value>,
    ) -> std::io::Result<NamedTempFile> {
        let parent = chart.dir.parent().unwrap_or(&chart.dir);
        let mut file = tempfile::Builder::new()
            .prefix("overrides-")
            .suffix(".json")
            .tempfile_in(parent)?;
        // JSON is valid YAML, which is what --values expects.
        serde_json::to_writer(file.as_file_mut(), values)?;
        file.as_file_mut().flush()?;
        Ok(file)
    }
}

#[async_trait]
impl RenderEngine for HelmCli {
    async fn load_chart(&self, dir: &Path) -> Result<LoadedChart, RenderError> {
        let metadata = ChartMetadata::from_chart_dir(dir)?;
        if metadata.is_library() {
            return Err(RenderError::LibraryChart(metadata.name));
        }
        info!(chart = %metadata.name, version = %metadata.version, "Loaded chart");
        Ok(LoadedChart {
            dir: dir.to_path_buf(),
            metadata,
        })
    }

    async fn render(
        &self,
        chart: &LoadedChart,
        settings: &RenderSettings,
        values: &Map<String, Value>,
    ) -> Result<String, RenderError> {
        let values_file = Self::values_file(chart, values).map_err(RenderError::Values)?;

        let mut command = Command::new(&self.binary);
        command
            .arg("template")
            .arg(&settings.release_name)
            .arg(&chart.dir)
            .arg("--namespace")
            .arg(&settings.namespace)
            .arg("--values")
            .arg(values_file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true);
        debug!(?command, "Running helm");

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| RenderError::Timeout(self.timeout))?
            .map_err(|source| RenderError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RenderError::Failed(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
