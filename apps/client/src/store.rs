use crate::config::Config;
use crate::error::{Result, WrapErr};
use search_core::{
    NoResponseCache, RecentQueryStore, ResponseCache, SledQueryStore, SledResponseCache,
};
use std::sync::Arc;
use tracing::debug;

/// Sled database shared by the response cache and the recent queries
pub fn open_db(config: &Config) -> Result<sled::Db> {
    let path = config.store_path();
    std::fs::create_dir_all(&path)?;
    debug!("opening store at {:?}", path);
    sled::open(&path).wrap_err_with(|| format!("Open store {}", path.display()))
}

pub fn response_cache(config: &Config, db: &sled::Db) -> Result<Arc<dyn ResponseCache>> {
    if !config.search.response_cache {
        return Ok(Arc::new(NoResponseCache));
    }
    Ok(Arc::new(SledResponseCache::open(db)?))
}

pub async fn recent_queries(config: &Config, db: &sled::Db) -> Result<Arc<RecentQueryStore>> {
    let backend = Arc::new(SledQueryStore::open(db)?);
    let store = RecentQueryStore::open(config.search.recent_queries_capacity, backend).await?;
    Ok(Arc::new(store))
}
