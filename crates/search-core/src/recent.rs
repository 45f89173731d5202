//! Recently searched queries, most recent first.
//!
//! [`RecentQueryStore`] owns the eviction policy: unique entries, bounded by
//! a capacity, re-recording moves an entry to the front. Where the list lives
//! between runs is up to the [`QueryStore`] it is opened with.

use crate::error::StoreError;
use crate::query::MovieQuery;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::{Arc, PoisonError};
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentQuery {
    pub query: MovieQuery,
    /// Monotonic; larger is more recent
    pub order: u64,
    pub recorded_at: DateTime<Utc>,
}

#[async_trait]
pub trait QueryStore: Send + Sync + 'static {
    async fn load_all(&self) -> Result<Vec<RecentQuery>, StoreError>;

    /// Replaces whatever was saved before
    async fn save_all(&self, entries: &[RecentQuery]) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryQueryStore {
    entries: std::sync::Mutex<Vec<RecentQuery>>,
}

#[async_trait]
impl QueryStore for MemoryQueryStore {
    async fn load_all(&self) -> Result<Vec<RecentQuery>, StoreError> {
        Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }

    async fn save_all(&self, entries: &[RecentQuery]) -> Result<(), StoreError> {
        *self.entries.lock().unwrap_or_else(PoisonError::into_inner) = entries.to_vec();
        Ok(())
    }
}

/// The whole list under a single key of a sled tree. Saves are not flushed;
/// sled syncs in the background and owners flush the db on exit.
#[derive(Clone)]
pub struct SledQueryStore {
    tree: sled::Tree,
}

impl SledQueryStore {
    pub const TREE_NAME: &'static str = "recent-queries";
    const KEY: &'static [u8] = b"entries";

    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self::new(db.open_tree(Self::TREE_NAME)?))
    }
}

#[async_trait]
impl QueryStore for SledQueryStore {
    async fn load_all(&self) -> Result<Vec<RecentQuery>, StoreError> {
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<RecentQuery>, StoreError> {
            match tree.get(Self::KEY)? {
                Some(bytes) => Ok(bincode::deserialize(&bytes)?),
                None => Ok(Vec::new()),
            }
        })
        .await?
    }

    async fn save_all(&self, entries: &[RecentQuery]) -> Result<(), StoreError> {
        let bytes = bincode::serialize(entries)?;
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            tree.insert(Self::KEY, bytes)?;
            Ok(())
        })
        .await?
    }
}

struct Recents {
    entries: Vec<RecentQuery>,
    next_order: u64,
}

impl Recents {
    fn from_saved(mut entries: Vec<RecentQuery>, capacity: usize) -> Self {
        entries.sort_by(|a, b| b.order.cmp(&a.order));
        let mut seen = HashSet::new();
        entries.retain(|entry| seen.insert(entry.query.clone()));
        entries.truncate(capacity);

        let next_order = entries.first().map_or(0, |entry| entry.order + 1);
        Self { entries, next_order }
    }

    fn record(&mut self, query: MovieQuery, capacity: usize) {
        self.entries.retain(|entry| entry.query != query);
        self.entries.insert(
            0,
            RecentQuery {
                query,
                order: self.next_order,
                recorded_at: Utc::now(),
            },
        );
        self.next_order += 1;
        self.entries.truncate(capacity);
    }
}

pub struct RecentQueryStore {
    capacity: usize,
    // Held across `save_all` so saves land in the order they were recorded
    recents: Mutex<Recents>,
    backend: Arc<dyn QueryStore>,
}

impl RecentQueryStore {
    /// Loads what `backend` has saved, dropping duplicates and anything over
    /// `capacity`.
    pub async fn open(capacity: usize, backend: Arc<dyn QueryStore>) -> Result<Self, StoreError> {
        let saved = backend.load_all().await?;
        let recents = Recents::from_saved(saved, capacity);
        debug!(count = recents.entries.len(), capacity, "loaded recent queries");

        Ok(Self {
            capacity,
            recents: Mutex::new(recents),
            backend,
        })
    }

    pub fn in_memory(capacity: usize) -> Self {
        Self {
            capacity,
            recents: Mutex::new(Recents::from_saved(Vec::new(), capacity)),
            backend: Arc::new(MemoryQueryStore::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub async fn record(&self, query: MovieQuery) -> Result<(), StoreError> {
        let mut recents = self.recents.lock().await;
        recents.record(query, self.capacity);
        self.backend.save_all(&recents.entries).await
    }

    pub async fn recent(&self, limit: usize) -> Vec<RecentQuery> {
        let recents = self.recents.lock().await;
        recents.entries.iter().take(limit).cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.recents.lock().await.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(text: &str) -> MovieQuery {
        MovieQuery::new(text).unwrap()
    }

    async fn texts(store: &RecentQueryStore, limit: usize) -> Vec<String> {
        store
            .recent(limit)
            .await
            .into_iter()
            .map(|entry| entry.query.to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_capacity_evicts_oldest() {
        let store = RecentQueryStore::in_memory(10);

        for i in 0..11 {
            store.record(query(&format!("query {i}"))).await.unwrap();
        }

        let recent = texts(&store, 100).await;
        assert_eq!(recent.len(), 10);
        assert_eq!(recent.first().map(String::as_str), Some("query 10"));
        assert!(!recent.contains(&"query 0".to_string()));
    }

    #[tokio::test]
    async fn test_re_recording_moves_to_front() {
        let store = RecentQueryStore::in_memory(10);
        for text in ["batman", "ironman", "alien"] {
            store.record(query(text)).await.unwrap();
        }

        store.record(query("batman")).await.unwrap();

        assert_eq!(texts(&store, 10).await, vec!["batman", "alien", "ironman"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_recent_respects_limit() {
        let store = RecentQueryStore::in_memory(10);
        for text in ["a", "b", "c", "d"] {
            store.record(query(text)).await.unwrap();
        }

        assert_eq!(texts(&store, 2).await, vec!["d", "c"]);
        assert!(texts(&store, 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_orders_are_monotonic() {
        let store = RecentQueryStore::in_memory(3);
        for text in ["a", "b", "a"] {
            store.record(query(text)).await.unwrap();
        }

        let orders: Vec<u64> = store.recent(3).await.iter().map(|e| e.order).collect();
        assert_eq!(orders, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_open_normalizes_saved_entries() {
        let backend = Arc::new(MemoryQueryStore::default());
        let now = Utc::now();
        let saved: Vec<RecentQuery> = [("a", 1), ("b", 4), ("a", 3), ("c", 2)]
            .into_iter()
            .map(|(text, order)| RecentQuery { query: query(text), order, recorded_at: now })
            .collect();
        backend.save_all(&saved).await.unwrap();

        let store = RecentQueryStore::open(2, backend).await.unwrap();

        assert_eq!(texts(&store, 10).await, vec!["b", "a"]);
        store.record(query("d")).await.unwrap();
        assert_eq!(store.recent(1).await[0].order, 5);
    }

    #[tokio::test]
    async fn test_sled_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir");
        let db = sled::open(dir.path()).expect("open sled");
        {
            let backend = Arc::new(SledQueryStore::open(&db).unwrap());
            let store = RecentQueryStore::open(10, backend).await.unwrap();
            store.record(query("batman")).await.unwrap();
            store.record(query("ironman")).await.unwrap();
        }

        let backend = Arc::new(SledQueryStore::open(&db).unwrap());
        let store = RecentQueryStore::open(10, backend).await.unwrap();

        assert_eq!(texts(&store, 10).await, vec!["ironman", "batman"]);
    }

    #[tokio::test]
    async fn test_sled_store_persists_after_owner_flush() {
        let dir = tempfile::tempdir().expect("temp dir");
        {
            let db = sled::open(dir.path()).expect("open sled");
            let backend = Arc::new(SledQueryStore::open(&db).unwrap());
            let store = RecentQueryStore::open(10, backend).await.unwrap();
            store.record(query("alien")).await.unwrap();
            db.flush_async().await.unwrap();
        }

        let db = sled::open(dir.path()).expect("reopen sled");
        let backend = Arc::new(SledQueryStore::open(&db).unwrap());
        let store = RecentQueryStore::open(10, backend).await.unwrap();

        assert_eq!(texts(&store, 10).await, vec!["alien"]);
    }
}
