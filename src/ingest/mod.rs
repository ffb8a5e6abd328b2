//! Turning user-selected files into stored entries
//!
//! Every file is handled on its own: a failure is reported for that file
//! and the others carry on.

use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::SystemTime,
};

use thiserror::Error;
use walkdir::WalkDir;

use crate::{
    domain::{entry::GpxEntry, id::EntryId},
    gpx::{self, error::GpxError},
    notify::Notifier,
    storage::{db::system_time_to_i64, error::StoreError, track_store::TrackStore},
};

const GPX_EXTENSION: &str = ".gpx";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("only .gpx files are accepted: {0}")]
    NotGpx(String),

    #[error("could not read file: {0}")]
    Read(#[from] std::io::Error),

    #[error(transparent)]
    Gpx(#[from] GpxError),

    #[error("could not store file: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub enum FileSource {
    /// content already read by the client
    Text(String),
    Path(PathBuf),
    /// the client could not read the file; holds its reason
    Unreadable(String),
}

#[derive(Debug)]
pub struct UploadedFile {
    pub name: String,
    pub source: FileSource,
}

impl UploadedFile {
    pub fn from_text(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Text(content.into()),
        }
    }

    pub fn unreadable(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: FileSource::Unreadable(reason.into()),
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Self {
            name,
            source: FileSource::Path(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    Added {
        index: usize,
        id: EntryId,
        name: String,
    },
    Rejected {
        name: String,
        reason: String,
    },
}

impl IngestOutcome {
    pub fn is_added(&self) -> bool {
        matches!(self, IngestOutcome::Added { .. })
    }

    #[cfg(test)]
    pub fn name(&self) -> &str {
        match self {
            IngestOutcome::Added { name, .. } | IngestOutcome::Rejected { name, .. } => name,
        }
    }
}

pub fn is_gpx_name(name: &str) -> bool {
    name.to_lowercase().ends_with(GPX_EXTENSION)
}

/// Expands directories to the `.gpx` files below them.
///
/// Other paths are kept as given so that a wrong extension is reported
/// for them rather than silently ignored.
pub fn collect_gpx_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    paths
        .iter()
        .flat_map(|path| {
            if path.is_dir() {
                scan_dir(path)
            } else {
                vec![path.clone()]
            }
        })
        .collect()
}

fn scan_dir(root: &Path) -> Vec<PathBuf> {
    let root_str = root.to_string_lossy();
    let mut paths = WalkDir::new(root)
        .into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => {
                log::warn!("error while scanning dir {root_str}, skipping an entry: {err}");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().to_path_buf())
        .filter(|p| is_gpx_name(&p.to_string_lossy()))
        .collect::<Vec<_>>();
    paths.sort();
    paths
}

fn read_lossy(path: &Path) -> Result<String, std::io::Error> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

enum PendingRead<'scope> {
    Done(String, Result<String, IngestError>),
    Reading(String, thread::ScopedJoinHandle<'scope, Result<String, std::io::Error>>),
}

/// Reads every file with a `.gpx` name; files on disk are read concurrently.
///
/// Results come back in selection order.
pub fn read_all(files: Vec<UploadedFile>) -> Vec<(String, Result<String, IngestError>)> {
    thread::scope(|s| {
        let pending = files
            .into_iter()
            .map(|file| {
                if !is_gpx_name(&file.name) {
                    let err = IngestError::NotGpx(file.name.clone());
                    return PendingRead::Done(file.name, Err(err));
                }
                match file.source {
                    FileSource::Text(text) => PendingRead::Done(file.name, Ok(text)),
                    FileSource::Unreadable(reason) => {
                        let err = IngestError::Read(std::io::Error::other(reason));
                        PendingRead::Done(file.name, Err(err))
                    }
                    FileSource::Path(path) => {
                        PendingRead::Reading(file.name, s.spawn(move || read_lossy(&path)))
                    }
                }
            })
            .collect::<Vec<_>>();

        pending
            .into_iter()
            .map(|p| match p {
                PendingRead::Done(name, result) => (name, result),
                PendingRead::Reading(name, handle) => {
                    let result = handle
                        .join()
                        .unwrap_or_else(|_| Err(std::io::Error::other("reader thread panicked")))
                        .map_err(IngestError::from);
                    (name, result)
                }
            })
            .collect()
    })
}

fn admit(
    store: &mut TrackStore,
    name: &str,
    content: Result<String, IngestError>,
) -> Result<(usize, EntryId), IngestError> {
    let content = content?;
    gpx::validate(&content)?;

    let added_at = system_time_to_i64(SystemTime::now()).unwrap_or_default();
    let entry = GpxEntry::new(name, content, added_at);
    let id = entry.id;
    store.push(entry)?;
    Ok((store.len() - 1, id))
}

fn rejection_message(name: &str, err: &IngestError) -> String {
    match err {
        IngestError::NotGpx(_) => format!("Only .gpx files are accepted: {name}"),
        IngestError::Read(_) => format!("Error reading file: {name}"),
        _ => format!("Error processing file {name}: {err}"),
    }
}

/// Validates and stores every file, reporting each result through `notifier`.
pub fn ingest(
    files: Vec<UploadedFile>,
    store: &mut TrackStore,
    notifier: &mut Notifier,
) -> Vec<IngestOutcome> {
    read_all(files)
        .into_iter()
        .map(|(name, content)| match admit(store, &name, content) {
            Ok((index, id)) => {
                notifier.success(format!("File loaded: {name}"));
                IngestOutcome::Added { index, id, name }
            }
            Err(err) => {
                log::debug!("rejected {name}: {err:?}");
                notifier.error(rejection_message(&name, &err));
                IngestOutcome::Rejected {
                    reason: err.to_string(),
                    name,
                }
            }
        })
        .collect()
}
