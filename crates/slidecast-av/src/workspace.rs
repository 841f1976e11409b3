//! Scratch directories for intermediate files.
//!
//! A [`JobWorkspace`] is a uniquely named directory under a configured root
//! (normally `storage.work_dir`). It is removed when dropped, whether the
//! work inside it succeeded or not.

use std::path::{Path, PathBuf};

use slidecast_core::{Error, Result};
use tempfile::TempDir;

/// Self-cleaning scratch directory.
///
/// # Example
///
/// ```no_run
/// use slidecast_av::JobWorkspace;
///
/// let ws = JobWorkspace::new_in(std::path::Path::new("./data/work"), "job-").unwrap();
/// let manifest = ws.file("concat.txt");
/// // ... write intermediates ...
/// drop(ws); // directory and contents removed
/// ```
#[derive(Debug)]
pub struct JobWorkspace {
    temp_dir: TempDir,
}

impl JobWorkspace {
    /// Create a workspace under `root`, creating `root` if needed.
    pub fn new_in(root: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(root)
            .map_err(|e| Error::system(format!("create work dir {}", root.display()), e))?;

        let temp_dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir_in(root)
            .map_err(|e| Error::system(format!("create workspace in {}", root.display()), e))?;

        Ok(Self { temp_dir })
    }

    /// Path to the workspace directory.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Path for a named file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    /// Remove the workspace now, reporting any failure.
    pub fn close(self) -> Result<()> {
        let path = self.temp_dir.path().to_path_buf();
        self.temp_dir
            .close()
            .map_err(|e| Error::system(format!("remove workspace {}", path.display()), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn workspace_lives_under_root() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::new_in(root.path(), "job-").unwrap();
        assert!(ws.path().starts_with(root.path()));
        assert!(ws
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("job-"));

        let f = ws.file("part0.wav");
        assert!(f.starts_with(ws.path()));
        assert_eq!(f.file_name().unwrap(), "part0.wav");
    }

    #[test]
    fn creates_missing_root() {
        let root = tempfile::tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        let ws = JobWorkspace::new_in(&nested, "x").unwrap();
        assert!(nested.is_dir());
        assert!(ws.path().is_dir());
    }

    #[test]
    fn drop_removes_contents() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::new_in(root.path(), "job-").unwrap();
        fs::write(ws.file("intermediate.wav"), b"data").unwrap();
        let dir = ws.path().to_path_buf();
        drop(ws);
        assert!(!dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn close_reports_success() {
        let root = tempfile::tempdir().unwrap();
        let ws = JobWorkspace::new_in(root.path(), "job-").unwrap();
        let dir = ws.path().to_path_buf();
        ws.close().unwrap();
        assert!(!dir.exists());
    }
}
