use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::error::ChartError;

pub const VALUES_FILE: &str = "values.yaml";

/// The chart root found in an extracted archive and its default values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartTree {
    pub root: PathBuf,
    /// Raw `values.yaml` content, empty when the chart ships none.
    pub values: String,
    pub values_exist: bool,
}

/// Find the single top-level directory of an extracted chart archive.
pub fn locate(extracted_root: &Path) -> Result<ChartTree, ChartError> {
    let mut candidates = Vec::new();
    for entry in fs::read_dir(extracted_root)
        .map_err(ChartError::storage("failed to read extracted directory"))?
    {
        let entry = entry.map_err(ChartError::storage("failed to read extracted directory"))?;
        let file_type = entry
            .file_type()
            .map_err(ChartError::storage("failed to read extracted directory"))?;
        if file_type.is_dir() {
            candidates.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    candidates.sort();

    let name = match candidates.len() {
        0 => return Err(ChartError::ChartNotFound),
        1 => candidates.remove(0),
        _ => return Err(ChartError::AmbiguousChartRoot(candidates)),
    };
    let root = extracted_root.join(&name);

    // Served as text whatever its encoding; invalid sequences become U+FFFD.
    let (values, values_exist) = match fs::read(root.join(VALUES_FILE)) {
        Ok(bytes) => (String::from_utf8_lossy(&bytes).into_owned(), true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => (String::new(), false),
        Err(source) => {
            return Err(ChartError::StorageError {
                context: "failed to read values.yaml",
                source,
            })
        }
    };
    debug!(chart = %name, values_exist, "Located chart root");

    Ok(ChartTree {
        root,
        values,
        values_exist,
    })
}
