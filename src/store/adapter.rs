use std::{
    future::Future,
    io::ErrorKind,
    ops::Deref,
    path::{Path, PathBuf},
};

use anyhow::Result;
use fs4::tokio::AsyncFileExt;
use tokio::{
    fs::File,
    io::{AsyncReadExt, AsyncWriteExt},
};
use tracing::{debug, warn};

use super::entities::Store;

/// Interface for abstracting persistence of the store.
pub trait StoreAdapter: Send + Sync {
    /// Reads the whole store. Missing or malformed content loads as an empty
    /// store, so the caller never has to handle a read failure.
    fn load(&self) -> impl Future<Output = Store> + Send;

    /// Serializes and writes the whole store, replacing prior content.
    fn save(&self, store: &Store) -> impl Future<Output = Result<()>> + Send;
}

impl<T: Deref + Send + Sync> StoreAdapter for T
where
    T::Target: StoreAdapter,
{
    fn load(&self) -> impl Future<Output = Store> + Send {
        self.deref().load()
    }

    fn save(&self, store: &Store) -> impl Future<Output = Result<()>> + Send {
        self.deref().save(store)
    }
}

/// The main realization of [StoreAdapter]. Reads and writes go through
/// advisory file locks so a second uncoordinated instance degrades to
/// last-write-wins instead of interleaved partial writes.
pub struct JsonStoreAdapter {
    path: PathBuf,
}

impl JsonStoreAdapter {
    pub fn new(path: PathBuf) -> Result<Self, std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    async fn read_contents(path: &Path) -> std::io::Result<String> {
        debug!("Reading store {path:?}");
        let mut file = File::open(path).await?;
        file.lock_shared()?;
        let mut contents = String::new();
        let result = file.read_to_string(&mut contents).await;
        file.unlock_async().await?;
        result?;
        Ok(contents)
    }
}

impl StoreAdapter for JsonStoreAdapter {
    async fn load(&self) -> Store {
        let contents = match Self::read_contents(&self.path).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Store::default(),
            Err(e) => {
                warn!("Failed to read store at {:?}: {e}", self.path);
                return Store::default();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(v) => v,
            Err(e) => {
                // Might happen after a shutdown cutting a write short.
                warn!("Store at {:?} holds illegal json, substituting an empty one: {e}", self.path);
                Store::default()
            }
        }
    }

    async fn save(&self, store: &Store) -> Result<()> {
        let buffer = serde_json::to_vec(store)?;

        let mut file = File::options()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .await?;

        // Semi-safe acquire-release for the file
        file.lock_exclusive()?;
        let result = async {
            file.set_len(0).await?;
            file.write_all(&buffer).await?;
            file.flush().await?;
            Ok::<_, anyhow::Error>(())
        }
        .await;
        file.unlock_async().await?;
        result
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::tempdir;

    use crate::store::entities::Store;

    use super::{JsonStoreAdapter, StoreAdapter};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn start_time() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn populated_store() -> Store {
        let mut store = Store::default();
        let record = store.day_mut("2018-07-04");
        record.begin_session(start_time());
        record.close_session(start_time() + Duration::seconds(90));
        record.total_ms = 90_000;
        store
    }

    #[tokio::test]
    async fn test_save_load_round_trip() -> Result<()> {
        let dir = tempdir()?;
        let adapter = JsonStoreAdapter::new(dir.path().join("st_data_v2.json"))?;

        let store = populated_store();
        adapter.save(&store).await?;

        assert_eq!(adapter.load().await, store);
        Ok(())
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let adapter = JsonStoreAdapter::new(dir.path().join("st_data_v2.json"))?;

        assert!(adapter.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_load_corrupt_file_is_empty() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("st_data_v2.json");
        std::fs::write(&path, "{\"2018-07-04\": {\"totalMs\":")?;

        let adapter = JsonStoreAdapter::new(path)?;
        assert!(adapter.load().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_save_replaces_longer_content() -> Result<()> {
        let dir = tempdir()?;
        let adapter = JsonStoreAdapter::new(dir.path().join("st_data_v2.json"))?;

        adapter.save(&populated_store()).await?;
        let small = Store::default();
        adapter.save(&small).await?;

        assert_eq!(adapter.load().await, small);
        Ok(())
    }

    #[tokio::test]
    async fn test_new_creates_parent_directories() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("state/screentime/st_data_v2.json");
        let adapter = JsonStoreAdapter::new(path)?;

        adapter.save(&Store::default()).await?;
        assert!(adapter.load().await.is_empty());
        Ok(())
    }
}
