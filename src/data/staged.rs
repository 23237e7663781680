//! Output files that appear only once every one of them has been written.

use crate::error::Result;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A set of outputs written to temporary files next to their targets.
///
/// [`StagedFiles::commit`] renames every temporary file onto its target.
/// Dropping the set without committing removes the temporaries and leaves
/// the targets untouched.
#[derive(Debug, Default)]
pub struct StagedFiles {
    files: Vec<(NamedTempFile, PathBuf)>,
}

impl StagedFiles {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a temporary file for `target` and return the path to write.
    ///
    /// The temporary file lives in the target's directory and keeps its
    /// extension, so writers that pick a format from the extension still work.
    pub fn stage<P: AsRef<Path>>(&mut self, target: P) -> Result<PathBuf> {
        let target = target.as_ref();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let suffix = target
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let file = tempfile::Builder::new()
            .prefix(".strata-")
            .suffix(&suffix)
            .tempfile_in(dir)?;
        let path = file.path().to_path_buf();
        self.files.push((file, target.to_path_buf()));
        Ok(path)
    }

    /// Number of staged outputs.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Move every staged file onto its target.
    pub fn commit(self) -> Result<()> {
        for (file, target) in self.files {
            file.persist(&target).map_err(|e| e.error)?;
            debug!(path = %target.display(), "committed output");
        }
        Ok(())
    }
}
