//! Per-request workspace lifecycle
//!
//! Every request gets its own uniquely named directory holding the submitted
//! source and, for compiled languages, an `output` directory for build
//! artifacts. The directory is removed when the request finishes, whatever
//! the outcome.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::config::{Config, Language};

/// Name of the build output directory inside a workspace
pub const OUTPUT_DIR: &str = "output";

/// Errors that occur while preparing a workspace
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("failed to create workspace directory {path}: {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("workspace manager is shut down")]
    Closed,
}

/// An ephemeral directory owned by exactly one request
///
/// # Cleanup
///
/// Call [`release()`](Self::release) when the request is done. If a workspace
/// is dropped without being released (for example while unwinding), `Drop`
/// removes the directory synchronously and logs a warning.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,

    /// Path to the workspace directory
    path: PathBuf,

    /// Build output directory, present only for compiled languages
    output_dir: Option<PathBuf>,

    released: bool,

    /// Concurrency permit, returned to the manager when the workspace goes away
    _permit: OwnedSemaphorePermit,
}

impl Workspace {
    /// Get the workspace ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the path to the workspace directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the build output directory (compiled languages only)
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Directory a program should run in: the output directory when there is one
    pub fn run_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.path)
    }

    /// Get the host path to a file inside the workspace
    ///
    /// Returns an error if the name could escape the workspace.
    pub fn file_path(&self, name: &str) -> Result<PathBuf, WorkspaceError> {
        if name.is_empty() || name.contains("..") || name.starts_with('/') {
            return Err(WorkspaceError::InvalidPath(format!(
                "path traversal not allowed: {name}"
            )));
        }
        Ok(self.path.join(name))
    }

    /// Write a file into the workspace
    #[instrument(skip(self, content), fields(workspace = %self.id))]
    pub async fn write_file(&self, name: &str, content: &[u8]) -> Result<PathBuf, WorkspaceError> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|source| WorkspaceError::Write {
                path: path.clone(),
                source,
            })?;
        debug!(?path, len = content.len(), "wrote file to workspace");
        Ok(path)
    }

    /// Remove the workspace directory and everything in it
    ///
    /// Never fails: individual removal errors are logged and skipped.
    #[instrument(skip(self), fields(workspace = %self.id))]
    pub async fn release(mut self) {
        self.remove_dir().await;
    }

    /// Delete the directory off the runtime and mark it released for `Drop`
    async fn remove_dir(&mut self) {
        let path = self.path.clone();
        let failures = tokio::task::spawn_blocking(move || remove_tree(&path))
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "workspace removal task failed");
                1
            });
        self.released = true;

        if failures == 0 {
            debug!("workspace released");
        } else {
            warn!(
                failures,
                path = %self.path.display(),
                "workspace released with leftover entries"
            );
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if !self.released {
            warn!(
                workspace = %self.id,
                path = %self.path.display(),
                "Workspace dropped without release, removing synchronously"
            );
            remove_tree(&self.path);
        }
    }
}

/// Recursively delete `path`, returning the number of entries that could not be removed.
///
/// Entries that are already gone count as removed.
fn remove_tree(path: &Path) -> usize {
    match fs::remove_dir_all(path) {
        Ok(()) => return 0,
        Err(e) if e.kind() == ErrorKind::NotFound => return 0,
        Err(e) => debug!(path = %path.display(), error = %e, "bulk removal failed, walking tree"),
    }

    let mut failures = 0;
    if let Ok(entries) = fs::read_dir(path) {
        for entry in entries.flatten() {
            let entry_path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            if is_dir {
                failures += remove_tree(&entry_path);
            } else if let Err(e) = fs::remove_file(&entry_path)
                && e.kind() != ErrorKind::NotFound
            {
                warn!(path = %entry_path.display(), error = %e, "failed to remove file");
                failures += 1;
            }
        }
    }

    if let Err(e) = fs::remove_dir(path)
        && e.kind() != ErrorKind::NotFound
    {
        warn!(path = %path.display(), error = %e, "failed to remove directory");
        failures += 1;
    }
    failures
}

/// Allocates workspaces under a root directory
///
/// A semaphore bounds how many workspaces exist at once; [`acquire`](Self::acquire)
/// waits for a free slot.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    root: PathBuf,

    /// Number of concurrent workspaces allowed
    capacity: usize,

    semaphore: Arc<Semaphore>,
}

impl WorkspaceManager {
    /// Create a new workspace manager
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            root: root.into(),
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
        }
    }

    /// Create a workspace manager from service configuration
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.workspace_root, config.max_concurrent_executions)
    }

    /// Get the root directory workspaces are created under
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Acquire a fresh workspace for one request
    #[instrument(skip(self, language), fields(language = %language.id))]
    pub async fn acquire(&self, language: &Language) -> Result<Workspace, WorkspaceError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| WorkspaceError::Closed)?;

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: self.root.clone(),
                source,
            })?;

        let id = Uuid::new_v4();
        let path = self.root.join(format!("run-{id}"));

        // create_dir fails if the directory exists, so two requests can never share one
        tokio::fs::create_dir(&path)
            .await
            .map_err(|source| WorkspaceError::Create {
                path: path.clone(),
                source,
            })?;

        let mut workspace = Workspace {
            id,
            path,
            output_dir: None,
            released: false,
            _permit: permit,
        };

        if language.is_compiled() {
            let output_dir = workspace.path.join(OUTPUT_DIR);
            // On error the half-built workspace is dropped, which removes it
            tokio::fs::create_dir(&output_dir)
                .await
                .map_err(|source| WorkspaceError::Create {
                    path: output_dir.clone(),
                    source,
                })?;
            workspace.output_dir = Some(output_dir);
        }

        debug!(id = %workspace.id, path = %workspace.path.display(), "acquired workspace");
        Ok(workspace)
    }

    /// Get the number of workspaces that can still be acquired without waiting
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Get the maximum number of concurrent workspaces
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
