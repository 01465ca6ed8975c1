//! Registration of discovered workspaces into the record file.

use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;

use workscope_core::{
    EnvSnapshot, RegistrationSummary, ScanError, ScanWarning, WorkspaceEntry, WorkspacesFile,
    vars,
};

/// File name of the record file inside the state directory.
pub const RECORD_FILE_NAME: &str = "workspaces.json";

/// `WORKSCOPE_WORKSPACES_FILE`, else `<home>/.workscope/workspaces.json`.
pub fn default_record_path(env: &EnvSnapshot, home: &Path) -> PathBuf {
    match env.get_non_empty(vars::WORKSPACES_FILE) {
        Some(path) => PathBuf::from(path),
        None => home.join(".workscope").join(RECORD_FILE_NAME),
    }
}

/// Registry of known workspaces backed by a JSON file.
#[derive(Debug)]
pub struct WorkspaceRegistry {
    path: PathBuf,
    file: WorkspacesFile,
    warnings: Vec<ScanWarning>,
}

impl WorkspaceRegistry {
    /// Load the registry at `path`.
    ///
    /// A missing file starts an empty registry and a malformed one is
    /// replaced on the next save. Other read failures are errors.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ScanError> {
        let path = path.into();
        let mut warnings = Vec::new();
        let file = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => WorkspacesFile::default(),
            Ok(raw) => WorkspacesFile::parse(&raw).unwrap_or_else(|err| {
                tracing::warn!("Failed to parse {}: {err}", path.display());
                warnings.push(ScanWarning::malformed_record(&path, &err));
                WorkspacesFile::default()
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => WorkspacesFile::default(),
            Err(err) => return Err(ScanError::io(&path, err)),
        };
        Ok(Self {
            path,
            file,
            warnings,
        })
    }

    /// Problems found while loading the record file.
    pub fn warnings(&self) -> &[ScanWarning] {
        &self.warnings
    }

    /// Create an empty registry that will be written to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: WorkspacesFile::default(),
            warnings: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Registered workspaces in registration order.
    pub fn workspaces(&self) -> &[WorkspaceEntry] {
        &self.file.workspaces
    }

    pub fn record(&self) -> &WorkspacesFile {
        &self.file
    }

    /// Register discovered paths, stamp them with the current time and save.
    pub fn register_bulk<I, P>(&mut self, paths: I) -> Result<RegistrationSummary, ScanError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let summary = self.register_at(paths, Utc::now().timestamp_millis());
        self.save()?;
        Ok(summary)
    }

    /// Register discovered paths in memory with an explicit timestamp.
    ///
    /// New absolute paths are added, known paths have `lastSeen` refreshed,
    /// and relative paths or repeats within the batch are skipped.
    pub fn register_at<I, P>(&mut self, paths: I, now_millis: i64) -> RegistrationSummary
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut summary = RegistrationSummary::default();
        let mut batch = HashSet::new();

        for path in paths {
            let path = path.as_ref();
            if !path.is_absolute() || !batch.insert(path.to_path_buf()) {
                tracing::debug!("Skipping workspace {}", path.display());
                summary.skipped += 1;
                continue;
            }

            match self.file.workspaces.iter_mut().find(|entry| entry.path == path) {
                Some(entry) => {
                    entry.last_seen = now_millis;
                    summary.updated += 1;
                }
                None => {
                    self.file
                        .workspaces
                        .push(WorkspaceEntry::new(path, now_millis));
                    summary.added += 1;
                }
            }
        }

        summary
    }

    /// Write the record file atomically, creating parent directories.
    pub fn save(&self) -> Result<(), ScanError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|e| ScanError::io(parent, e))?;

        let json = serde_json::to_string_pretty(&self.file).map_err(|source| {
            ScanError::Serialize {
                path: self.path.clone(),
                source,
            }
        })?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|e| ScanError::io(parent, e))?;
        writeln!(tmp, "{json}").map_err(|e| ScanError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ScanError::io(&self.path, e.error))?;

        tracing::debug!("Saved {} workspaces to {}", self.file.len(), self.path.display());
        Ok(())
    }
}
