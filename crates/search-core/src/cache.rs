//! Response cache
//! Remembers catalog pages per (query, page) so a repeated search can show
//! something before the network answers. Purely best effort: a failing cache
//! is logged and behaves like an empty one.

use crate::error::StoreError;
use crate::query::MovieQuery;
use async_trait::async_trait;
use rpc::movies::MoviesPage;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, warn};

#[async_trait]
pub trait ResponseCache: Send + Sync + 'static {
    async fn get(&self, query: &MovieQuery, page: u32) -> Option<MoviesPage>;

    async fn put(&self, query: &MovieQuery, page: &MoviesPage);
}

/// Never hits. Used when the response cache is switched off.
#[derive(Debug, Default)]
pub struct NoResponseCache;

#[async_trait]
impl ResponseCache for NoResponseCache {
    async fn get(&self, _query: &MovieQuery, _page: u32) -> Option<MoviesPage> {
        None
    }

    async fn put(&self, _query: &MovieQuery, _page: &MoviesPage) {}
}

#[derive(Debug, Default)]
pub struct MemoryResponseCache {
    entries: RwLock<HashMap<(MovieQuery, u32), MoviesPage>>,
}

impl MemoryResponseCache {
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ResponseCache for MemoryResponseCache {
    async fn get(&self, query: &MovieQuery, page: u32) -> Option<MoviesPage> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(query.clone(), page))
            .cloned()
    }

    async fn put(&self, query: &MovieQuery, page: &MoviesPage) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((query.clone(), page.page), page.clone());
    }
}

/// Pages stored in a sled tree, bincode encoded.
#[derive(Clone)]
pub struct SledResponseCache {
    tree: sled::Tree,
}

impl SledResponseCache {
    pub const TREE_NAME: &'static str = "responses";

    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }

    pub fn open(db: &sled::Db) -> Result<Self, StoreError> {
        Ok(Self::new(db.open_tree(Self::TREE_NAME)?))
    }

    /// Fixed-width page number first, then the query text
    fn key(query: &MovieQuery, page: u32) -> Vec<u8> {
        let mut key = Vec::with_capacity(4 + query.as_str().len());
        key.extend_from_slice(&page.to_be_bytes());
        key.extend_from_slice(query.as_str().as_bytes());
        key
    }

    async fn load(&self, key: Vec<u8>) -> Result<Option<MoviesPage>, StoreError> {
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || -> Result<Option<MoviesPage>, StoreError> {
            match tree.get(key)? {
                Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
                None => Ok(None),
            }
        })
        .await?
    }

    async fn store(&self, key: Vec<u8>, page: &MoviesPage) -> Result<(), StoreError> {
        let bytes = bincode::serialize(page)?;
        let tree = self.tree.clone();
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            tree.insert(key, bytes)?;
            tree.flush()?;
            Ok(())
        })
        .await?
    }

    /// Number of cached pages
    pub fn stats(&self) -> usize {
        self.tree.len()
    }

    /// Drop every cached page, returns how many there were
    pub fn clear(&self) -> Result<usize, StoreError> {
        let count = self.tree.len();
        self.tree.clear()?;
        self.tree.flush()?;
        Ok(count)
    }
}

#[async_trait]
impl ResponseCache for SledResponseCache {
    async fn get(&self, query: &MovieQuery, page: u32) -> Option<MoviesPage> {
        match self.load(Self::key(query, page)).await {
            Ok(hit) => {
                debug!(%query, page, hit = hit.is_some(), "response cache lookup");
                hit
            }
            Err(e) => {
                warn!(%query, page, "response cache read failed: {}", e);
                None
            }
        }
    }

    async fn put(&self, query: &MovieQuery, page: &MoviesPage) {
        if let Err(e) = self.store(Self::key(query, page.page), page).await {
            warn!(%query, page = page.page, "response cache write failed: {}", e);
        }
    }
}
