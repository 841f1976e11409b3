//! JSON-array ledger store.
//!
//! Appends are a read-modify-write of the whole array, serialized by an
//! async mutex so concurrent jobs in one process never lose each other's
//! entries. The new contents go to a temp file in the ledger's directory and
//! are renamed over the old file, so readers see either the old array or the
//! new one.
//!
//! A missing or empty file reads as no entries. A file that does not parse
//! is moved aside to `<ledger>.corrupt` on the next append and the ledger
//! starts over.

use std::io::Write;
use std::path::{Path, PathBuf};

use slidecast_core::{Error, JobId, Result};
use tokio::sync::Mutex;

use crate::entry::LedgerEntry;

/// Append-only ledger of completed renders.
#[derive(Debug)]
pub struct JobLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

enum Loaded {
    Entries(Vec<LedgerEntry>),
    Corrupt(String),
}

impl JobLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the ledger file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry.
    ///
    /// # Errors
    ///
    /// [`Error::System`] when the ledger cannot be read or written.
    pub async fn append(&self, entry: LedgerEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let mut entries = match self.load().await? {
            Loaded::Entries(entries) => entries,
            Loaded::Corrupt(reason) => {
                self.quarantine(&reason).await;
                Vec::new()
            }
        };

        let id = entry.id;
        entries.push(entry);
        self.store(&entries).await?;

        tracing::info!(job_id = %id, entries = entries.len(), ledger = %self.path.display(), "ledger entry appended");
        Ok(())
    }

    /// All entries in append order. A missing ledger is empty.
    ///
    /// # Errors
    ///
    /// [`Error::System`] when the file exists but cannot be read.
    pub async fn list(&self) -> Result<Vec<LedgerEntry>> {
        match self.load().await? {
            Loaded::Entries(entries) => Ok(entries),
            Loaded::Corrupt(reason) => {
                tracing::warn!(ledger = %self.path.display(), %reason, "ledger unreadable, listing as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Look up a single entry.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when no entry has this id.
    pub async fn find(&self, id: JobId) -> Result<LedgerEntry> {
        self.list()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::not_found("ledger entry", id))
    }

    async fn load(&self) -> Result<Loaded> {
        let content = match tokio::fs::read(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(Loaded::Entries(Vec::new()))
            }
            Err(e) => {
                return Err(Error::system(
                    format!("read ledger {}", self.path.display()),
                    e,
                ))
            }
        };

        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Loaded::Entries(Vec::new()));
        }

        match serde_json::from_slice(&content) {
            Ok(entries) => Ok(Loaded::Entries(entries)),
            Err(e) => Ok(Loaded::Corrupt(e.to_string())),
        }
    }

    async fn quarantine(&self, reason: &str) {
        let mut aside = self.path.clone().into_os_string();
        aside.push(".corrupt");
        let aside = PathBuf::from(aside);

        match tokio::fs::rename(&self.path, &aside).await {
            Ok(()) => tracing::warn!(
                ledger = %self.path.display(),
                moved_to = %aside.display(),
                %reason,
                "unparsable ledger moved aside"
            ),
            Err(e) => tracing::warn!(ledger = %self.path.display(), error = %e, "could not move unparsable ledger aside"),
        }
    }

    async fn store(&self, entries: &[LedgerEntry]) -> Result<()> {
        let json = serde_json::to_vec_pretty(entries)
            .map_err(|e| Error::Internal(format!("serialize ledger: {e}")))?;
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || write_atomically(&path, &json))
            .await
            .map_err(|e| Error::Internal(format!("ledger writer panicked: {e}")))?
    }
}

fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir)
        .map_err(|e| Error::system(format!("create ledger dir {}", dir.display()), e))?;

    let context = || format!("write ledger {}", path.display());
    let mut tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| Error::system(context(), e))?;
    tmp.write_all(contents)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::system(context(), e))?;
    tmp.persist(path)
        .map_err(|e| Error::system(context(), e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::fixtures::entry;
    use std::sync::Arc;

    #[tokio::test]
    async fn missing_file_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JobLedger::new(dir.path().join("ledger.json"));
        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_file_lists_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "  \n").unwrap();
        assert!(JobLedger::new(path).list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn append_then_list_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JobLedger::new(dir.path().join("nested").join("ledger.json"));

        let first = entry("first.mp4");
        let second = entry("second.mp4");
        ledger.append(first.clone()).await.unwrap();
        ledger.append(second.clone()).await.unwrap();

        let listed = ledger.list().await.unwrap();
        assert_eq!(listed, vec![first, second]);

        // still a plain JSON array on disk
        let raw = std::fs::read_to_string(ledger.path()).unwrap();
        assert!(raw.trim_start().starts_with('['));
    }

    #[tokio::test]
    async fn concurrent_appends_lose_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = Arc::new(JobLedger::new(dir.path().join("ledger.json")));

        let tasks: Vec<_> = (0..16)
            .map(|i| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.append(entry(&format!("out{i}.mp4"))).await })
            })
            .collect();
        for t in tasks {
            t.await.unwrap().unwrap();
        }

        let mut names: Vec<_> = ledger
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.output_filename)
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 16);
    }

    #[tokio::test]
    async fn corrupt_file_is_moved_aside() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{not json").unwrap();
        let ledger = JobLedger::new(&path);

        assert!(ledger.list().await.unwrap().is_empty());

        let e = entry("fresh.mp4");
        ledger.append(e.clone()).await.unwrap();
        assert_eq!(ledger.list().await.unwrap(), vec![e]);

        let aside = dir.path().join("ledger.json.corrupt");
        assert_eq!(std::fs::read_to_string(aside).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn non_utf8_file_is_treated_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let garbage = [0xffu8, 0xfe, 0x00, 0x5b];
        std::fs::write(&path, garbage).unwrap();
        let ledger = JobLedger::new(&path);

        assert!(ledger.list().await.unwrap().is_empty());

        let e = entry("after-garbage.mp4");
        ledger.append(e.clone()).await.unwrap();
        assert_eq!(ledger.list().await.unwrap(), vec![e]);

        let aside = dir.path().join("ledger.json.corrupt");
        assert_eq!(std::fs::read(aside).unwrap(), garbage);
    }

    #[tokio::test]
    async fn find_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = JobLedger::new(dir.path().join("ledger.json"));
        let e = entry("a.mp4");
        ledger.append(e.clone()).await.unwrap();

        assert_eq!(ledger.find(e.id).await.unwrap(), e);
        let err = ledger.find(JobId::new()).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
