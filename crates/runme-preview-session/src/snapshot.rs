//! Temp snapshot files for previewing unsaved buffer content.

use std::io::Write;
use std::path::Path;

use tempfile::TempPath;
use tracing::debug;

use runme_preview_core::{Error, Result};

/// A temporary `.md` file holding a copy of buffer content.
///
/// The file is removed by [`SnapshotFile::remove`], or, as a fallback,
/// when the value is dropped.
#[derive(Debug)]
pub struct SnapshotFile {
    path: TempPath,
}

impl SnapshotFile {
    /// Path of the snapshot on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete the file, reporting failure as [`Error::ResourceCleanupFailed`].
    pub fn remove(self) -> Result<()> {
        let path = self.path.to_path_buf();
        debug!("Removing snapshot: {}", path.display());
        self.path.close().map_err(|e| Error::ResourceCleanupFailed {
            path,
            reason: e.to_string(),
        })
    }
}

/// Write `lines` to a new temp file with a `.md` suffix, one line per row.
///
/// Fails with [`Error::EmptyBuffer`] without creating a file when there is
/// no content (no lines, or only empty lines).
pub fn tmp_file(lines: &[String]) -> Result<SnapshotFile> {
    if lines.iter().all(|line| line.is_empty()) {
        return Err(Error::EmptyBuffer);
    }

    let mut file = tempfile::Builder::new()
        .prefix("runme-preview-")
        .suffix(".md")
        .tempfile()?;

    for line in lines {
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
    }
    file.flush()?;

    let path = file.into_temp_path();
    debug!("Wrote {} line(s) to snapshot {}", lines.len(), path.display());
    Ok(SnapshotFile { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_snapshot_contents() {
        let snapshot = tmp_file(&lines(&["a", "b", ""])).unwrap();
        let path = snapshot.path().to_path_buf();

        assert_eq!(path.extension().unwrap(), "md");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["a", "b", ""]);

        snapshot.remove().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_empty_buffer() {
        assert!(matches!(tmp_file(&[]), Err(Error::EmptyBuffer)));
        assert!(matches!(tmp_file(&lines(&[""])), Err(Error::EmptyBuffer)));
    }

    #[test]
    fn test_drop_removes_file() {
        let snapshot = tmp_file(&lines(&["# Title"])).unwrap();
        let path = snapshot.path().to_path_buf();
        assert!(path.exists());

        drop(snapshot);
        assert!(!path.exists());
    }

    #[test]
    fn test_remove_after_external_delete_reports_failure() {
        let snapshot = tmp_file(&lines(&["text"])).unwrap();
        std::fs::remove_file(snapshot.path()).unwrap();

        let result = snapshot.remove();
        assert!(matches!(result, Err(Error::ResourceCleanupFailed { .. })));
    }
}
