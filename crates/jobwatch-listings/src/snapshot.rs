//! Persisted set of postings known as of the last reported run.
//!
//! The file is pretty-printed JSON keyed by posting identity, with keys sorted
//! so that successive snapshots diff cleanly:
//!
//! ```json
//! {
//!   "saved_at": "2025-03-08T16:00:04Z",
//!   "postings": {
//!     "a1": { "title": "Data Scientist", "url": "https://...", "department": "Data Science" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::{ListingsError, Posting, PostingId, PostingRecord};

/// The set of postings known as of the last successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When this snapshot was written (absent for in-memory snapshots).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<DateTime<Utc>>,
    postings: BTreeMap<PostingId, PostingRecord>,
}

impl Snapshot {
    pub fn from_postings(postings: &[Posting]) -> Self {
        Self {
            saved_at: None,
            postings: postings
                .iter()
                .map(|p| (p.id.clone(), p.record()))
                .collect(),
        }
    }

    pub fn contains(&self, id: &PostingId) -> bool {
        self.postings.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    /// All postings, ordered by identity.
    pub fn postings(&self) -> Vec<Posting> {
        self.postings
            .iter()
            .map(|(id, record)| Posting::from_record(id.clone(), record.clone()))
            .collect()
    }
}

/// Loads and saves the snapshot file.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the last snapshot.
    ///
    /// A missing file is a first run and yields an empty snapshot. A file that
    /// cannot be decoded is logged and treated as empty. Only failing to read
    /// an existing file is an error.
    #[tracing::instrument(skip(self), fields(path = %self.path.display()))]
    pub fn load(&self) -> Result<Snapshot, ListingsError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!("no previous snapshot, starting fresh");
                return Ok(Snapshot::default());
            }
            Err(e) => return Err(ListingsError::io(&self.path, e)),
        };

        match serde_json::from_slice::<Snapshot>(&bytes) {
            Ok(snapshot) => {
                debug!(count = snapshot.len(), saved_at = ?snapshot.saved_at, "loaded snapshot");
                Ok(snapshot)
            }
            Err(e) => {
                warn!(error = %e, "snapshot is corrupt, treating as empty");
                Ok(Snapshot::default())
            }
        }
    }

    /// Replace the snapshot on disk.
    ///
    /// Writes a temporary file beside the target and renames it into place,
    /// so readers (including a concurrent process) see either the old or the
    /// new snapshot, never a partial one.
    #[tracing::instrument(
        skip(self, snapshot),
        fields(path = %self.path.display(), count = snapshot.len())
    )]
    pub fn save(&self, snapshot: &Snapshot) -> Result<(), ListingsError> {
        let mut stamped = snapshot.clone();
        stamped.saved_at = Some(Utc::now());
        let json = serde_json::to_vec_pretty(&stamped)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| ListingsError::io(&dir, e))?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| ListingsError::io(&dir, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.write_all(b"\n"))
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ListingsError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ListingsError::io(&self.path, e.error))?;

        info!("saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn sample() -> Vec<Posting> {
        vec![
            Posting::new("Data Scientist", "https://example.com/ds")
                .with_id(PostingId::from("ds"))
                .with_department("Data Science")
                .with_location("Boston"),
            Posting::new("Physiologist", "https://example.com/ph"),
        ]
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("snapshot.json"));
        let snapshot = Snapshot::from_postings(&sample());

        store.save(&snapshot).unwrap();
        let loaded = store.load().unwrap();

        assert!(loaded.saved_at.is_some());
        assert_eq!(loaded.postings(), snapshot.postings());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = SnapshotStore::new(&path).load().unwrap();
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_file_is_keyed_by_identity() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        SnapshotStore::new(&path)
            .save(&Snapshot::from_postings(&sample()))
            .unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let postings = value["postings"].as_object().unwrap();
        assert_eq!(postings["ds"]["title"], "Data Scientist");
        assert_eq!(postings["ds"]["department"], "Data Science");
        assert!(postings.contains_key("physiologist | https://example.com/ph"));
    }

    #[test]
    fn test_save_creates_parent_dirs_and_overwrites() {
        let dir = tempdir().unwrap();
        let store = SnapshotStore::new(dir.path().join("state/nested/snapshot.json"));

        store.save(&Snapshot::from_postings(&sample())).unwrap();
        store
            .save(&Snapshot::from_postings(&sample()[..1]))
            .unwrap();

        assert_eq!(store.load().unwrap().len(), 1);
        let leftovers = std::fs::read_dir(dir.path().join("state/nested"))
            .unwrap()
            .count();
        assert_eq!(leftovers, 1, "temporary files should be renamed away");
    }

    #[test]
    fn test_unreadable_path_is_io_error() {
        let dir = tempdir().unwrap();
        // A directory where the file should be cannot be read as a snapshot.
        let err = SnapshotStore::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ListingsError::Io { .. }));
    }
}
