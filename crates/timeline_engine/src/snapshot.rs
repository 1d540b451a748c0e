use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::types::Platform;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot directory missing or not writable: {0}")]
    Dir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Deterministic snapshot name: `{platform}-{short_hash(url)}.html`.
pub fn snapshot_filename(platform: Platform, profile_url: &str) -> String {
    format!("{platform}-{}.html", short_hash(profile_url))
}

fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(8);
    for byte in digest.iter().take(4) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}

fn ensure_snapshot_dir(dir: &Path) -> Result<(), SnapshotError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| SnapshotError::Dir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(SnapshotError::Dir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| SnapshotError::Dir(e.to_string()))?;
    }
    // Basic writability probe: try creating a temp file.
    NamedTempFile::new_in(dir).map_err(|e| SnapshotError::Dir(e.to_string()))?;
    Ok(())
}

/// Persists page HTML for post-mortem inspection when a fetch could not
/// find its content. Writes a temp file then renames, so a crash never
/// leaves a half-written snapshot behind.
pub struct SnapshotWriter {
    dir: PathBuf,
}

impl SnapshotWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn write(
        &self,
        platform: Platform,
        profile_url: &str,
        html: &str,
    ) -> Result<PathBuf, SnapshotError> {
        ensure_snapshot_dir(&self.dir)?;

        let target = self.dir.join(snapshot_filename(platform, profile_url));
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(html.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // Replace existing file if present to keep determinism.
        if target.exists() {
            fs::remove_file(&target)?;
        }
        tmp.persist(&target)
            .map_err(|e| SnapshotError::Io(e.error))?;
        Ok(target)
    }
}
