//! File-backed history store.
//!
//! An ordered sequence of Page Records, unique by URL, most recent first.
//! Every mutation rewrites the whole file atomically (write to a temp file,
//! then rename) behind a single writer lock; partial writes never hit disk.

use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::error::{PagelensError, Result};
use crate::record::PageRecord;

pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All records, most recent first. A missing file is an empty history.
    pub async fn list(&self) -> Result<Vec<PageRecord>> {
        self.load()
    }

    /// Record at `index`, if in range.
    pub async fn get(&self, index: usize) -> Result<Option<PageRecord>> {
        Ok(self.load()?.into_iter().nth(index))
    }

    /// Insert-or-update keyed by URL: an existing record is overwritten in
    /// place (store position preserved); otherwise the record goes to the
    /// front.
    pub async fn upsert(&self, record: PageRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load()?;
        match records.iter_mut().find(|r| r.url == record.url) {
            Some(existing) => *existing = record,
            None => records.insert(0, record),
        }
        self.save(&records)
    }

    /// Delete by position. Returns false when the index is out of range.
    pub async fn delete(&self, index: usize) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut records = self.load()?;
        if index >= records.len() {
            return Ok(false);
        }
        records.remove(index);
        self.save(&records)?;
        Ok(true)
    }

    fn load(&self) -> Result<Vec<PageRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| PagelensError::Store(format!("failed to read history: {e}")))?;
        serde_json::from_str(&data)
            .map_err(|e| PagelensError::Store(format!("history file is corrupt: {e}")))
    }

    fn save(&self, records: &[PageRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)
            .map_err(|e| PagelensError::Store(format!("failed to serialize history: {e}")))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| PagelensError::Store(format!("failed to write history: {e}")))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| PagelensError::Store(format!("failed to replace history: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(url: &str, title: &str) -> PageRecord {
        PageRecord {
            url: url.into(),
            title: title.into(),
            retrieved_at: "2026-01-01 00:00:00".into(),
            ..Default::default()
        }
    }

    fn store_in(dir: &TempDir) -> HistoryStore {
        HistoryStore::new(dir.path().join("history.json"))
    }

    #[tokio::test]
    async fn test_missing_file_is_empty_history() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list().await.unwrap().is_empty());
        assert!(store.get(0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_inserts_at_front() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("https://a.test", "a")).await.unwrap();
        store.upsert(record("https://b.test", "b")).await.unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].url, "https://b.test");
        assert_eq!(records[1].url, "https://a.test");
    }

    #[tokio::test]
    async fn test_upsert_same_url_overwrites_in_place() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("https://a.test", "a")).await.unwrap();
        store.upsert(record("https://b.test", "b")).await.unwrap();
        store.upsert(record("https://c.test", "c")).await.unwrap();

        // Re-fetch the middle URL with different content.
        store
            .upsert(record("https://b.test", "b updated"))
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 3);
        // Position preserved, fields replaced.
        assert_eq!(records[1].url, "https://b.test");
        assert_eq!(records[1].title, "b updated");
        assert_eq!(
            records.iter().filter(|r| r.url == "https://b.test").count(),
            1
        );
    }

    #[tokio::test]
    async fn test_delete_preserves_relative_order() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        for name in ["e", "d", "c", "b", "a"] {
            store
                .upsert(record(&format!("https://{name}.test"), name))
                .await
                .unwrap();
        }
        // Store is now a, b, c, d, e. Remove index 2.
        assert!(store.delete(2).await.unwrap());

        let records = store.list().await.unwrap();
        let titles: Vec<_> = records.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "d", "e"]);
    }

    #[tokio::test]
    async fn test_delete_out_of_range() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("https://a.test", "a")).await.unwrap();
        assert!(!store.delete(5).await.unwrap());
        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_no_temp_file_left_behind() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        store.upsert(record("https://a.test", "a")).await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .filter(|n| n.ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "temp files left: {leftovers:?}");
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        let store = HistoryStore::new(path);
        let err = store.list().await.unwrap_err();
        assert!(matches!(err, PagelensError::Store(_)));
    }
}
