use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::history::types::PullRequest;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read or write cache file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache file {}: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to serialize cache records: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// JSON-file store of assembled pull-request records, one file per
/// `(owner, repo)` pair under a cache directory.
///
/// `load` distinguishes "never fetched" (file absent, `None`) from
/// "fetched zero PRs" (empty array, `Some(vec![])`). Writes go through a
/// temp file and rename so readers never observe a torn file. There is no
/// cross-process locking; concurrent invocations against the same pair
/// must be serialized by the caller.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Deterministic path for one repository's records.
    pub fn path(&self, owner: &str, repo: &str) -> PathBuf {
        self.dir.join(format!("{owner}_{repo}_prs.json"))
    }

    /// Read the cached records, or `None` when the repository has never
    /// been fetched. Malformed JSON is fatal — there is no recovery or
    /// overwrite of a corrupt file.
    pub fn load(&self, owner: &str, repo: &str) -> Result<Option<Vec<PullRequest>>, CacheError> {
        let path = self.path(owner, repo);
        if !path.exists() {
            debug!(path = %path.display(), "no cache file");
            return Ok(None);
        }

        let contents = fs::read_to_string(&path)?;
        let records = serde_json::from_str(&contents)
            .map_err(|source| CacheError::Corrupt { path: path.clone(), source })?;
        debug!(path = %path.display(), "loaded cache file");
        Ok(Some(records))
    }

    /// Overwrite the file with the full record set. Used after a bulk
    /// assembly.
    pub fn save_all(
        &self,
        owner: &str,
        repo: &str,
        records: &[PullRequest],
    ) -> Result<(), CacheError> {
        let path = self.path(owner, repo);
        self.write_atomic(&path, records)?;
        info!(path = %path.display(), count = records.len(), "cache written");
        Ok(())
    }

    /// Read-modify-write of a single record. Replaces an existing entry
    /// with the same PR number rather than appending a duplicate, so
    /// numbers stay unique within the file.
    pub fn append_one(
        &self,
        owner: &str,
        repo: &str,
        record: PullRequest,
    ) -> Result<(), CacheError> {
        let mut records = self.load(owner, repo)?.unwrap_or_default();
        match records.iter_mut().find(|r| r.number == record.number) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
        self.save_all(owner, repo, &records)
    }

    fn write_atomic(&self, path: &Path, records: &[PullRequest]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let serialized = serde_json::to_string(records).map_err(CacheError::Serialize)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(number: u64, title: &str) -> PullRequest {
        PullRequest {
            number,
            title: title.to_string(),
            body: None,
            commits: vec![],
        }
    }

    fn store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let cache = CacheStore::new(dir.path());
        (dir, cache)
    }

    #[test]
    fn test_absent_file_loads_as_none() {
        let (_dir, cache) = store();
        assert!(cache.load("org", "repo").unwrap().is_none());
    }

    #[test]
    fn test_empty_set_is_distinct_from_absent() {
        let (_dir, cache) = store();
        cache.save_all("org", "repo", &[]).unwrap();
        let loaded = cache.load("org", "repo").unwrap();
        assert_eq!(loaded.unwrap().len(), 0);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let (_dir, cache) = store();
        cache
            .save_all("org", "repo", &[record(1, "first"), record(2, "second")])
            .unwrap();
        let loaded = cache.load("org", "repo").unwrap().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1].title, "second");
    }

    #[test]
    fn test_path_is_keyed_by_owner_and_repo() {
        let (_dir, cache) = store();
        assert!(cache
            .path("octo", "hello")
            .ends_with("octo_hello_prs.json"));
    }

    #[test]
    fn test_append_to_absent_cache_creates_file() {
        let (_dir, cache) = store();
        cache.append_one("org", "repo", record(42, "t")).unwrap();
        let loaded = cache.load("org", "repo").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].number, 42);
    }

    #[test]
    fn test_append_preserves_existing_records() {
        let (_dir, cache) = store();
        cache
            .save_all("org", "repo", &[record(1, "one"), record(2, "two")])
            .unwrap();
        cache.append_one("org", "repo", record(43, "new")).unwrap();
        let loaded = cache.load("org", "repo").unwrap().unwrap();
        let numbers: Vec<u64> = loaded.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 43]);
        assert_eq!(loaded[0].title, "one");
    }

    #[test]
    fn test_append_same_number_replaces_instead_of_duplicating() {
        let (_dir, cache) = store();
        cache.append_one("org", "repo", record(42, "stale")).unwrap();
        cache.append_one("org", "repo", record(42, "fresh")).unwrap();
        let loaded = cache.load("org", "repo").unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "fresh");
    }

    #[test]
    fn test_corrupt_file_is_fatal() {
        let (_dir, cache) = store();
        fs::create_dir_all(cache.path("org", "repo").parent().unwrap()).unwrap();
        fs::write(cache.path("org", "repo"), "{not json").unwrap();
        let err = cache.load("org", "repo").unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }
}
