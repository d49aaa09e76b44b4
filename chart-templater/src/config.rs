use std::{
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use chart_client::{ExtractLimits, FetchLimits};
use serde::Deserialize;

use crate::engine::RenderSettings;

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    pub listen: SocketAddr,
    pub static_dir: PathBuf,
    pub scratch_dir: Option<PathBuf>,
    pub release_name: String,
    pub namespace: String,
    pub helm: HelmConfig,
    pub limits: Limits,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HelmConfig {
    pub binary: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub download_timeout_secs: u64,
    pub max_download_bytes: u64,
    pub max_entries: usize,
    pub max_extracted_bytes: u64,
}

impl Default for Configuration {
    fn default() -> Self {
        let render = RenderSettings::default();
        Configuration {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            static_dir: PathBuf::from("static"),
            scratch_dir: None,
            release_name: render.release_name,
            namespace: render.namespace,
            helm: HelmConfig::default(),
            limits: Limits::default(),
        }
    }
}

impl Default for HelmConfig {
    fn default() -> Self {
        HelmConfig {
            binary: "helm".to_string(),
            timeout_secs: 60,
        }
    }
}

impl Default for Limits {
    fn default() -> Self {
        let fetch = FetchLimits::default();
        let extract = ExtractLimits::default();
        Limits {
            download_timeout_secs: fetch.timeout.as_secs(),
            max_download_bytes: fetch.max_download_bytes,
            max_entries: extract.max_entries,
            max_extracted_bytes: extract.max_extracted_bytes,
        }
    }
}

impl Configuration {
    /// Load the configuration.
    ///
    /// An explicit path must exist. Without one, `config.yaml` in the working
    /// directory is used when present, built-in defaults otherwise.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => Ok(Self::default()),
        }
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Unable to read the configuration file: {}", path.display()))?;
        serde_yaml::from_reader(file)
            .with_context(|| format!("Unable to parse config file: {}", path.display()))
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            release_name: self.release_name.clone(),
            namespace: self.namespace.clone(),
        }
    }

    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            timeout: Duration::from_secs(self.limits.download_timeout_secs),
            max_download_bytes: self.limits.max_download_bytes,
        }
    }

    pub fn extract_limits(&self) -> ExtractLimits {
        ExtractLimits {
            max_entries: self.limits.max_entries,
            max_extracted_bytes: self.limits.max_extracted_bytes,
        }
    }

    pub fn helm_timeout(&self) -> Duration {
        Duration::from_secs(self.helm.timeout_secs)
    }
}
