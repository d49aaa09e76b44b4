use std::{
    fs::{self, File},
    io::{self, Read},
    path::{Component, Path, PathBuf},
};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use thiserror::Error;
use tracing::{debug, info};

use crate::{error::ChartError, workspace::ScratchWorkspace};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open tarball: {0}")]
    Open(#[source] io::Error),
    #[error("failed to read tar header: {0}")]
    Header(#[source] io::Error),
    #[error("entry '{0}' escapes the extraction directory")]
    PathEscape(String),
    #[error("archive has more than {0} entries")]
    TooManyEntries(usize),
    #[error("archive expands to more than {0} bytes")]
    TooLarge(u64),
    #[error("failed to create directory '{entry}': {source}")]
    CreateDirectory {
        entry: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to copy file content for '{entry}': {source}")]
    WriteFile {
        entry: String,
        #[source]
        source: io::Error,
    },
    #[error("extraction task aborted: {0}")]
    Aborted(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractLimits {
    pub max_entries: usize,
    pub max_extracted_bytes: u64,
}

impl Default for ExtractLimits {
    fn default() -> Self {
        ExtractLimits {
            max_entries: 10_000,
            max_extracted_bytes: 200 * 1024 * 1024,
        }
    }
}

/// The unpacked content of an archive.
#[derive(Debug)]
pub struct ExtractedTree {
    workspace: ScratchWorkspace,
    entries: usize,
    bytes: u64,
}

impl ExtractedTree {
    pub fn root(&self) -> &Path {
        self.workspace.path()
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn close(self) {
        self.workspace.close();
    }
}

/// Unpack a gzipped tarball into a new scratch workspace below `scratch_root`.
///
/// Only directories and regular files are materialised. Every entry name is
/// checked before anything is written for it; a name that would land outside
/// the workspace aborts the whole extraction.
pub fn extract(
    archive: &Path,
    scratch_root: Option<&Path>,
    limits: &ExtractLimits,
) -> Result<ExtractedTree, ChartError> {
    let file = File::open(archive).map_err(ExtractError::Open)?;
    let workspace = ScratchWorkspace::create(scratch_root, "chart-extract-")?;
    let (entries, bytes) = unpack(file, workspace.path(), limits)?;
    info!(entries, bytes, "Extracted chart archive");
    Ok(ExtractedTree {
        workspace,
        entries,
        bytes,
    })
}

/// Same as [`extract`], on the blocking thread pool.
pub async fn extract_async(
    archive: PathBuf,
    scratch_root: Option<PathBuf>,
    limits: ExtractLimits,
) -> Result<ExtractedTree, ChartError> {
    tokio::task::spawn_blocking(move || extract(&archive, scratch_root.as_deref(), &limits))
        .await
        .map_err(|err| ExtractError::Aborted(err.to_string()))?
}

fn unpack<R: Read>(
    reader: R,
    destination: &Path,
    limits: &ExtractLimits,
) -> Result<(usize, u64), ExtractError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut count = 0;
    let mut budget = limits.max_extracted_bytes;

    for entry in archive.entries().map_err(ExtractError::Header)? {
        let mut entry = entry.map_err(ExtractError::Header)?;
        count += 1;
        if count > limits.max_entries {
            return Err(ExtractError::TooManyEntries(limits.max_entries));
        }

        let name = entry.path().map_err(ExtractError::Header)?.into_owned();
        let entry_name = name.to_string_lossy().into_owned();
        let relative = match contained_path(&name) {
            Some(relative) => relative,
            None => return Err(ExtractError::PathEscape(entry_name)),
        };
        if relative.as_os_str().is_empty() {
            continue;
        }
        let target = destination.join(&relative);

        let kind = entry.header().entry_type();
        match kind {
            EntryType::Directory => {
                fs::create_dir_all(&target).map_err(|source| ExtractError::CreateDirectory {
                    entry: entry_name,
                    source,
                })?;
            }
            EntryType::Regular | EntryType::Continuous => {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent).map_err(|source| {
                        ExtractError::CreateDirectory {
                            entry: entry_name.clone(),
                            source,
                        }
                    })?;
                }
                let mut out = File::create(&target).map_err(|source| ExtractError::WriteFile {
                    entry: entry_name.clone(),
                    source,
                })?;
                // One extra byte so that reaching the budget exactly is not an error.
                let copied = io::copy(&mut (&mut entry).take(budget.saturating_add(1)), &mut out)
                    .map_err(|source| ExtractError::WriteFile {
                        entry: entry_name,
                        source,
                    })?;
                if copied > budget {
                    return Err(ExtractError::TooLarge(limits.max_extracted_bytes));
                }
                budget -= copied;
            }
            _ => {
                debug!(entry = %entry_name, ?kind, "Skipping unsupported entry");
            }
        }
    }

    Ok((count, limits.max_extracted_bytes - budget))
}

/// Normalise an entry name to a path relative to the extraction root.
///
/// Returns `None` for absolute names and names with `..` components.
fn contained_path(name: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in name.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}
