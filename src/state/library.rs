/// Durable image store
///
/// Hands a captured or edited image from one screen to the next. In-memory
/// session state (history, panels) does not survive that hand-off, so the
/// current image goes through this store under a well-known key.
///
/// Two implementations:
/// - `SqliteImageStore`: single-table SQLite catalog, survives restarts
/// - `MemoryImageStore`: memory-only mode and tests
///
/// The store is an explicit service object: the composition root opens it
/// and passes it to whoever needs it.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::data::{ImagePayload, StoredImageRecord};
use crate::error::StorageError;

pub type StoreResult<T> = Result<T, StorageError>;

/// Async key-value contract for image payloads
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Insert or replace the record under `key`
    async fn set_item(&self, key: &str, payload: &ImagePayload) -> StoreResult<()>;

    /// Payload under `key`, or `None` if absent
    async fn get_item(&self, key: &str) -> StoreResult<Option<ImagePayload>>;

    /// Full record under `key`, or `None` if absent
    async fn get_record(&self, key: &str) -> StoreResult<Option<StoredImageRecord>>;

    async fn remove_item(&self, key: &str) -> StoreResult<()>;

    async fn clear(&self) -> StoreResult<()>;

    /// All stored keys, sorted
    async fn keys(&self) -> StoreResult<Vec<String>>;

    /// Delete records written before `cutoff`; returns how many were removed
    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize>;

    /// Best-effort sweep of records older than `max_age`
    ///
    /// Failures are logged and swallowed; this is maintenance, not a
    /// user-facing operation.
    async fn cleanup_expired(&self, max_age: Duration) {
        let max_age = match chrono::Duration::from_std(max_age) {
            Ok(age) => age,
            Err(e) => {
                tracing::warn!(error = %e, "Invalid max age for image cleanup");
                return;
            }
        };
        let Some(cutoff) = Utc::now().checked_sub_signed(max_age) else {
            tracing::warn!(?max_age, "Max age reaches past the earliest timestamp, skipping cleanup");
            return;
        };
        match self.delete_older_than(cutoff).await {
            Ok(0) => tracing::debug!("No expired images"),
            Ok(removed) => tracing::info!(removed, "Removed expired images"),
            Err(e) => tracing::warn!(error = %e, "Image cleanup failed"),
        }
    }
}

/// SQLite-backed image store
///
/// rusqlite::Connection is Send but not Sync, so it lives behind a mutex and
/// every query runs on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteImageStore {
    conn: Arc<Mutex<Connection>>,
    db_path: PathBuf,
}

impl SqliteImageStore {
    /// Open (or create) the store at `path` and initialize the schema.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let db_path = path.into();
        let open_path = db_path.clone();

        let conn = tokio::task::spawn_blocking(move || -> StoreResult<Connection> {
            if let Some(parent) = open_path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let conn = Connection::open(&open_path).map_err(|source| StorageError::Open {
                path: open_path.display().to_string(),
                source,
            })?;
            init_schema(&conn)?;
            Ok(conn)
        })
        .await
        .map_err(|e| StorageError::Worker(e.to_string()))??;

        tracing::info!(path = %db_path.display(), "Image store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path,
        })
    }

    /// Open an in-memory SQLite database (same schema, nothing on disk)
    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StorageError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: PathBuf::from(":memory:"),
        })
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Run `f` against the connection on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StorageError::Worker("connection mutex poisoned".into()))?;
            f(&*guard)
        })
        .await
        .map_err(|e| StorageError::Worker(e.to_string()))?
    }
}

/// Create the images table if it doesn't exist
fn init_schema(conn: &Connection) -> StoreResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS images (
            key         TEXT PRIMARY KEY,
            mime        TEXT NOT NULL,
            data        BLOB NOT NULL,
            timestamp   INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_images_timestamp
         ON images(timestamp)",
        [],
    )?;

    Ok(())
}

fn timestamp_from_millis(key: &str, millis: i64) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| StorageError::Corrupt {
            key: key.to_string(),
            reason: format!("invalid timestamp {}", millis),
        })
}

#[async_trait]
impl ImageStore for SqliteImageStore {
    async fn set_item(&self, key: &str, payload: &ImagePayload) -> StoreResult<()> {
        let key = key.to_string();
        let payload = payload.clone();
        let now = Utc::now().timestamp_millis();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO images (key, mime, data, timestamp) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(key) DO UPDATE SET
                    mime = excluded.mime,
                    data = excluded.data,
                    timestamp = excluded.timestamp",
                rusqlite::params![key, payload.mime, payload.bytes, now],
            )?;
            tracing::debug!(key = %key, bytes = payload.bytes.len(), "Stored image");
            Ok(())
        })
        .await
    }

    async fn get_item(&self, key: &str) -> StoreResult<Option<ImagePayload>> {
        Ok(self.get_record(key).await?.map(|record| record.data))
    }

    async fn get_record(&self, key: &str) -> StoreResult<Option<StoredImageRecord>> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            let row = conn
                .query_row(
                    "SELECT mime, data, timestamp FROM images WHERE key = ?1",
                    [&key],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Vec<u8>>(1)?,
                            row.get::<_, i64>(2)?,
                        ))
                    },
                )
                .optional()?;

            match row {
                Some((mime, bytes, millis)) => Ok(Some(StoredImageRecord {
                    timestamp: timestamp_from_millis(&key, millis)?,
                    data: ImagePayload::new(mime, bytes),
                    key,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        let key = key.to_string();
        self.with_conn(move |conn| {
            conn.execute("DELETE FROM images WHERE key = ?1", [&key])?;
            Ok(())
        })
        .await
    }

    async fn clear(&self) -> StoreResult<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM images", [])?;
            Ok(())
        })
        .await
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM images ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(keys)
        })
        .await
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let cutoff = cutoff.timestamp_millis();
        self.with_conn(move |conn| {
            let removed = conn.execute("DELETE FROM images WHERE timestamp < ?1", [cutoff])?;
            Ok(removed)
        })
        .await
    }
}

// Implement Debug for better error messages
impl std::fmt::Debug for SqliteImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteImageStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Memory-only image store
#[derive(Debug, Default, Clone)]
pub struct MemoryImageStore {
    records: Arc<tokio::sync::Mutex<HashMap<String, StoredImageRecord>>>,
}

impl MemoryImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a record as-is, keeping its timestamp
    pub async fn insert_record(&self, record: StoredImageRecord) {
        self.records.lock().await.insert(record.key.clone(), record);
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn set_item(&self, key: &str, payload: &ImagePayload) -> StoreResult<()> {
        self.insert_record(StoredImageRecord::new(key, payload.clone()))
            .await;
        Ok(())
    }

    async fn get_item(&self, key: &str) -> StoreResult<Option<ImagePayload>> {
        Ok(self.records.lock().await.get(key).map(|r| r.data.clone()))
    }

    async fn get_record(&self, key: &str) -> StoreResult<Option<StoredImageRecord>> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.records.lock().await.remove(key);
        Ok(())
    }

    async fn clear(&self) -> StoreResult<()> {
        self.records.lock().await.clear();
        Ok(())
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys: Vec<String> = self.records.lock().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete_older_than(&self, cutoff: DateTime<Utc>) -> StoreResult<usize> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.timestamp >= cutoff);
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::{CAPTURED_IMAGE_KEY, EDITED_IMAGE_KEY};
    use pretty_assertions::assert_eq;

    fn payload(tag: u8) -> ImagePayload {
        ImagePayload::new("image/jpeg", vec![0xFF, 0xD8, tag, 0xFF, 0xD9])
    }

    async fn sqlite_store(dir: &tempfile::TempDir) -> SqliteImageStore {
        SqliteImageStore::open(dir.path().join("nested").join("images.db"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;

        store.set_item(CAPTURED_IMAGE_KEY, &payload(1)).await.unwrap();
        let loaded = store.get_item(CAPTURED_IMAGE_KEY).await.unwrap();
        assert_eq!(loaded, Some(payload(1)));
    }

    #[tokio::test]
    async fn test_missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;
        assert_eq!(store.get_item("nothing-here").await.unwrap(), None);

        let memory = MemoryImageStore::new();
        assert_eq!(memory.get_item("nothing-here").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_item_upserts() {
        let dir = tempfile::tempdir().unwrap();
        let store = sqlite_store(&dir).await;

        store.set_item(CAPTURED_IMAGE_KEY, &payload(1)).await.unwrap();
        store.set_item(CAPTURED_IMAGE_KEY, &payload(2)).await.unwrap();

        assert_eq!(store.keys().await.unwrap(), vec![CAPTURED_IMAGE_KEY.to_string()]);
        assert_eq!(store.get_item(CAPTURED_IMAGE_KEY).await.unwrap(), Some(payload(2)));
    }

    #[tokio::test]
    async fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = sqlite_store(&dir).await;
            store.set_item(EDITED_IMAGE_KEY, &payload(3)).await.unwrap();
        }
        let reopened = sqlite_store(&dir).await;
        assert_eq!(reopened.get_item(EDITED_IMAGE_KEY).await.unwrap(), Some(payload(3)));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let store = SqliteImageStore::open_in_memory().await.unwrap();
        store.set_item(CAPTURED_IMAGE_KEY, &payload(1)).await.unwrap();
        store.set_item(EDITED_IMAGE_KEY, &payload(2)).await.unwrap();

        store.remove_item(CAPTURED_IMAGE_KEY).await.unwrap();
        assert_eq!(store.keys().await.unwrap(), vec![EDITED_IMAGE_KEY.to_string()]);

        // Removing a missing key is fine
        store.remove_item(CAPTURED_IMAGE_KEY).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_failure_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file
        let result = SqliteImageStore::open(dir.path()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_delete_older_than() {
        let store = SqliteImageStore::open_in_memory().await.unwrap();
        store.set_item(CAPTURED_IMAGE_KEY, &payload(1)).await.unwrap();

        let past = Utc::now() - chrono::Duration::hours(1);
        assert_eq!(store.delete_older_than(past).await.unwrap(), 0);

        let future = Utc::now() + chrono::Duration::hours(1);
        assert_eq!(store.delete_older_than(future).await.unwrap(), 1);
        assert_eq!(store.get_item(CAPTURED_IMAGE_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cleanup_expired_keeps_fresh_records() {
        let store = MemoryImageStore::new();
        let mut stale = StoredImageRecord::new(CAPTURED_IMAGE_KEY, payload(1));
        stale.timestamp = Utc::now() - chrono::Duration::days(2);
        store.insert_record(stale).await;
        store.set_item(EDITED_IMAGE_KEY, &payload(2)).await.unwrap();

        store.cleanup_expired(Duration::from_secs(24 * 60 * 60)).await;

        assert_eq!(store.keys().await.unwrap(), vec![EDITED_IMAGE_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_expired_on_sqlite() {
        let store = SqliteImageStore::open_in_memory().await.unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO images (key, mime, data, timestamp) VALUES ('old', 'image/png', x'00', 0)",
                    [],
                )?;
                Ok(())
            })
            .await
            .unwrap();
        store.set_item(EDITED_IMAGE_KEY, &payload(2)).await.unwrap();

        store.cleanup_expired(Duration::from_secs(24 * 60 * 60)).await;

        assert_eq!(store.keys().await.unwrap(), vec![EDITED_IMAGE_KEY.to_string()]);
    }

    #[tokio::test]
    async fn test_cleanup_expired_with_huge_max_age_keeps_everything() {
        let store = MemoryImageStore::new();
        store.set_item(CAPTURED_IMAGE_KEY, &payload(1)).await.unwrap();

        store.cleanup_expired(Duration::from_secs(10_000_000_000_000)).await;
        store.cleanup_expired(Duration::MAX).await;

        assert_eq!(store.keys().await.unwrap(), vec![CAPTURED_IMAGE_KEY.to_string()]);
    }

    /// Store whose every operation fails
    #[derive(Default)]
    struct BrokenStore {
        sweeps: std::sync::atomic::AtomicUsize,
    }

    fn broken() -> StorageError {
        StorageError::Worker("disk gone".into())
    }

    #[async_trait]
    impl ImageStore for BrokenStore {
        async fn set_item(&self, _key: &str, _payload: &ImagePayload) -> StoreResult<()> {
            Err(broken())
        }

        async fn get_item(&self, _key: &str) -> StoreResult<Option<ImagePayload>> {
            Err(broken())
        }

        async fn get_record(&self, _key: &str) -> StoreResult<Option<StoredImageRecord>> {
            Err(broken())
        }

        async fn remove_item(&self, _key: &str) -> StoreResult<()> {
            Err(broken())
        }

        async fn clear(&self) -> StoreResult<()> {
            Err(broken())
        }

        async fn keys(&self) -> StoreResult<Vec<String>> {
            Err(broken())
        }

        async fn delete_older_than(&self, _cutoff: DateTime<Utc>) -> StoreResult<usize> {
            self.sweeps.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err(broken())
        }
    }

    #[tokio::test]
    async fn test_cleanup_expired_swallows_store_failure() {
        let store = BrokenStore::default();
        store.cleanup_expired(Duration::from_secs(60)).await;
        assert_eq!(store.sweeps.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_record_timestamp_is_recent() {
        let store = SqliteImageStore::open_in_memory().await.unwrap();
        let before = Utc::now() - chrono::Duration::seconds(1);
        store.set_item(CAPTURED_IMAGE_KEY, &payload(1)).await.unwrap();

        let record = store.get_record(CAPTURED_IMAGE_KEY).await.unwrap().unwrap();
        assert_eq!(record.key, CAPTURED_IMAGE_KEY);
        assert!(record.timestamp >= before);
    }
}
