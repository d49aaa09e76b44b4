use std::{fs, path::Path};

pub const CHART_FILE: &str = "Chart.yaml";

/// The `Chart.yaml` document at the root of a chart.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ChartMetadata {
    pub api_version: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub app_version: Option<String>,
    #[serde(default, rename = "type")]
    pub chart_type: Option<String>,
    #[serde(default)]
    pub kube_version: Option<String>,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<ChartDependency>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
#[non_exhaustive]
pub struct ChartDependency {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    #[error("unable to read Chart.yaml: {0}")]
    Read(#[from] std::io::Error),
    #[error("unable to parse Chart.yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Chart.yaml field '{0}' must not be empty")]
    EmptyField(&'static str),
}

impl ChartMetadata {
    pub fn from_yaml(document: &str) -> Result<Self, MetadataError> {
        let metadata: ChartMetadata = serde_yaml::from_str(document)?;
        if metadata.name.trim().is_empty() {
            return Err(MetadataError::EmptyField("name"));
        }
        if metadata.version.trim().is_empty() {
            return Err(MetadataError::EmptyField("version"));
        }
        Ok(metadata)
    }

    pub fn from_chart_dir(dir: &Path) -> Result<Self, MetadataError> {
        Self::from_yaml(&fs::read_to_string(dir.join(CHART_FILE))?)
    }

    /// Library charts only provide helpers and cannot be rendered on their own.
    pub fn is_library(&self) -> bool {
        self.chart_type.as_deref() == Some("library")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chart_yaml() {
        let metadata = ChartMetadata::from_yaml(
            r#"
apiVersion: v2
name: foo
version: 1.0.0
appVersion: "2.3"
type: application
dependencies:
  - name: common
    version: 1.x.x
    repository: https://charts.example.test
"#,
        )
        .unwrap();
        assert_eq!(metadata.name, "foo");
        assert_eq!(metadata.version, "1.0.0");
        assert_eq!(metadata.app_version.as_deref(), Some("2.3"));
        assert!(!metadata.is_library());
        assert_eq!(metadata.dependencies.len(), 1);
        assert_eq!(metadata.dependencies[0].name, "common");
    }

    #[test]
    fn library_charts_are_detected() {
        let metadata =
            ChartMetadata::from_yaml("apiVersion: v2\nname: lib\nversion: 0.1.0\ntype: library\n")
                .unwrap();
        assert!(metadata.is_library());
    }

    #[test]
    fn missing_fields_are_rejected() {
        assert!(matches!(
            ChartMetadata::from_yaml("apiVersion: v2\nname: foo\n"),
            Err(MetadataError::Parse(_))
        ));
        assert!(matches!(
            ChartMetadata::from_yaml("apiVersion: v2\nname: ''\nversion: 1.0.0\n"),
            Err(MetadataError::EmptyField("name"))
        ));
    }

    #[test]
    fn reads_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ChartMetadata::from_chart_dir(dir.path()),
            Err(MetadataError::Read(_))
        ));
        fs::write(
            dir.path().join(CHART_FILE),
            "apiVersion: v1\nname: bar\nversion: 0.2.0\n",
        )
        .unwrap();
        assert_eq!(
            ChartMetadata::from_chart_dir(dir.path()).unwrap().name,
            "bar"
        );
    }
}
