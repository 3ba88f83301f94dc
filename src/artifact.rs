//! Lifecycle of files written during an issuance call.
//!
//! Transient artifacts (the CSR and anything else that only exists to feed the next
//! pipeline step) live in an [`ArtifactScope`] and are removed when the scope is
//! dropped, whichever way the enclosing call exits. Final outputs (keys and
//! certificates) go through [`write_new_file`], which never replaces an existing
//! file and never leaves a half-written one behind.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::{CertSmithError, Result};

const ARTIFACT_PREFIX: &str = ".certsmith-";
const ARTIFACT_RANDOM_BYTES: usize = 24;

/// Directory a new file next to `path` should be created in.
pub(crate) fn parent_dir(path: &Path) -> &Path {
    path.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
}

/// Owns the transient files of one issuance call.
///
/// Every file created through [`ArtifactScope::create`] is deleted on drop. Removal
/// errors are logged and swallowed, so cleanup can never mask the caller's result.
#[derive(Debug)]
pub struct ArtifactScope {
    dir: PathBuf,
    artifacts: Vec<NamedTempFile>,
}

impl ArtifactScope {
    /// Creates an empty scope whose artifacts will be written to `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            artifacts: Vec::new(),
        }
    }

    /// Creates an empty scope writing next to `path`.
    pub fn beside(path: &Path) -> Self {
        Self::new(parent_dir(path))
    }

    /// Writes `contents` to a uniquely named file ending in `suffix` and registers it.
    pub fn create(&mut self, suffix: &str, contents: &[u8]) -> Result<PathBuf> {
        let mut file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(suffix)
            .rand_bytes(ARTIFACT_RANDOM_BYTES)
            .tempfile_in(&self.dir)
            .map_err(|e| CertSmithError::io(&self.dir, e))?;
        let path = file.path().to_path_buf();
        file.write_all(contents)
            .and_then(|()| file.flush())
            .map_err(|e| CertSmithError::io(&path, e))?;
        tracing::debug!("created transient artifact {}", path.display());
        self.artifacts.push(file);
        Ok(path)
    }

    /// Removes a registered artifact right away instead of waiting for the scope to end.
    pub fn discard(&mut self, path: &Path) {
        if let Some(index) = self.artifacts.iter().position(|f| f.path() == path) {
            close_artifact(self.artifacts.swap_remove(index));
        }
    }

    /// Paths of the artifacts currently alive in this scope.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|f| f.path().to_path_buf()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }
}

impl Drop for ArtifactScope {
    fn drop(&mut self) {
        for file in self.artifacts.drain(..) {
            close_artifact(file);
        }
    }
}

fn close_artifact(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    match file.close() {
        Ok(()) => tracing::debug!("removed transient artifact {}", path.display()),
        Err(e) => tracing::warn!(
            "Failed to cleanup temporary file {}: {e}",
            path.display()
        ),
    }
}

/// Atomically creates `path` holding `contents`.
///
/// The data is staged in a temporary file in the same directory and linked into
/// place without clobbering, so an existing file is reported as
/// [`CertSmithError::AlreadyExists`] and a failed write leaves nothing at `path`.
/// Staged files are owner-only; `world_readable` widens the final file to 0644 on
/// Unix (certificates), otherwise it stays 0600 (private keys).
pub fn write_new_file(path: &Path, contents: &[u8], world_readable: bool) -> Result<()> {
    let dir = parent_dir(path);
    let mut file = tempfile::Builder::new()
        .prefix(ARTIFACT_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| CertSmithError::io(dir, e))?;
    file.write_all(contents)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| CertSmithError::io(file.path(), e))?;

    if world_readable {
        set_world_readable(file.path()).map_err(|e| CertSmithError::io(file.path(), e))?;
    }

    file.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == std::io::ErrorKind::AlreadyExists {
            CertSmithError::AlreadyExists(path.to_path_buf())
        } else {
            CertSmithError::io(path, e.error)
        }
    })?;
    Ok(())
}

#[cfg(unix)]
fn set_world_readable(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_world_readable(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
