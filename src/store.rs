use std::collections::HashMap;
use std::fs;
use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{MarketDashError, Result};

pub const DATASET_ENTITY: &str = "dataset";
pub const ADSPENDS_ENTITY: &str = "adspends";
pub const CLICKS_ENTITY: &str = "clicks";

/// Cache keys are scoped per user: `dataset-cache:user_42`. Nothing is
/// ever shared or merged across user ids.
pub fn cache_key(entity: &str, user_id: &str) -> String {
    format!("{}-cache:user_{}", entity, user_id)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub rows: Vec<T>,
    pub last_updated: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(rows: Vec<T>) -> Self {
        Self {
            rows,
            last_updated: Utc::now(),
        }
    }
}

type FetchOutcome<T> = std::result::Result<Arc<CacheEntry<T>>, Arc<MarketDashError>>;
type SharedFetch<T> = Shared<BoxFuture<'static, FetchOutcome<T>>>;

/// Read-through cache for one entity kind. Explicit and injectable: callers
/// construct a store per entity and pass it where it is needed.
///
/// Concurrent reads of the same key are coalesced: the second caller awaits
/// the first caller's in-flight future instead of issuing a duplicate
/// fetch. There is no ordering guarantee beyond last-fetch-wins, and the
/// cache is never a write source of truth: mutations go through the
/// gateway and are followed by `invalidate` plus a refetch.
pub struct EntityStore<T> {
    entries: Mutex<HashMap<String, Arc<CacheEntry<T>>>>,
    pending: Mutex<HashMap<String, SharedFetch<T>>>,
    persist_dir: Option<PathBuf>,
}

impl<T> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EntityStore<T> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            persist_dir: None,
        }
    }

    /// Enables best-effort JSON snapshot persistence under `dir`. IO
    /// problems are logged and swallowed; persistence never fails a read.
    pub fn with_persistence(dir: impl Into<PathBuf>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            pending: Mutex::new(HashMap::new()),
            persist_dir: Some(dir.into()),
        }
    }

    pub fn cached(&self, key: &str) -> Option<Arc<CacheEntry<T>>> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    pub fn invalidate(&self, key: &str) {
        self.entries.lock().unwrap().remove(key);
        if let Some(path) = self.persist_path(key) {
            if path.exists() {
                if let Err(err) = fs::remove_file(&path) {
                    warn!("failed to remove cache snapshot {:?}: {}", path, err);
                }
            }
        }
    }

    /// Wholesale invalidation of every entry belonging to one user, used on
    /// logout, explicit refresh, and delete-all.
    pub fn invalidate_user(&self, user_id: &str) {
        let suffix = format!(":user_{}", user_id);
        let keys: Vec<String> = self
            .entries
            .lock()
            .unwrap()
            .keys()
            .filter(|key| key.ends_with(&suffix))
            .cloned()
            .collect();
        for key in keys {
            self.invalidate(&key);
        }
    }

    fn persist_path(&self, key: &str) -> Option<PathBuf> {
        self.persist_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.json", key.replace(':', "_"))))
    }
}

impl<T> EntityStore<T>
where
    T: Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Returns the cached rows for `key`, falling back to a persisted
    /// snapshot, and only then to `fetch`. Concurrent callers share one
    /// in-flight fetch per key.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<Arc<CacheEntry<T>>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        if let Some(entry) = self.cached(key) {
            return Ok(entry);
        }
        if let Some(entry) = self.load_persisted(key) {
            let entry = Arc::new(entry);
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), entry.clone());
            return Ok(entry);
        }

        let shared = {
            let mut pending = self.pending.lock().unwrap();
            match pending.get(key) {
                Some(existing) => {
                    debug!("coalescing concurrent fetch for {}", key);
                    existing.clone()
                }
                None => {
                    let fut = fetch();
                    let shared: SharedFetch<T> = async move {
                        fut.await
                            .map(|rows| Arc::new(CacheEntry::new(rows)))
                            .map_err(Arc::new)
                    }
                    .boxed()
                    .shared();
                    pending.insert(key.to_string(), shared.clone());
                    shared
                }
            }
        };

        let outcome = shared.await;
        self.pending.lock().unwrap().remove(key);

        match outcome {
            Ok(entry) => {
                self.entries
                    .lock()
                    .unwrap()
                    .insert(key.to_string(), entry.clone());
                self.persist(key, &entry);
                Ok(entry)
            }
            Err(err) => Err(MarketDashError::Fetch(err)),
        }
    }

    fn load_persisted(&self, key: &str) -> Option<CacheEntry<T>> {
        let path = self.persist_path(key)?;
        let data = fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(entry) => {
                debug!("loaded cache snapshot for {} from {:?}", key, path);
                Some(entry)
            }
            Err(err) => {
                warn!("discarding unreadable cache snapshot {:?}: {}", path, err);
                None
            }
        }
    }

    fn persist(&self, key: &str, entry: &CacheEntry<T>) {
        let Some(path) = self.persist_path(key) else {
            return;
        };
        let write = || -> Result<()> {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, serde_json::to_string(entry)?)?;
            Ok(())
        };
        if let Err(err) = write() {
            warn!("failed to persist cache snapshot {:?}: {}", path, err);
        }
    }
}
