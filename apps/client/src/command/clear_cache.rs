//! 清除缓存命令

use super::Command;
use crate::config::Config;
use crate::error::Result;
use crate::store;
use search_core::{SledQueryStore, SledResponseCache};

pub struct ClearCacheCommand {
    config: Config,
    all: bool,
}

impl ClearCacheCommand {
    pub fn new(config: Config, all: bool) -> Self {
        Self { config, all }
    }
}

#[async_trait::async_trait]
impl Command for ClearCacheCommand {
    async fn execute(&self) -> Result<()> {
        let db = store::open_db(&self.config)?;

        let cleared = SledResponseCache::open(&db)?.clear()?;
        println!("Removed {cleared} cached pages");

        if self.all && db.drop_tree(SledQueryStore::TREE_NAME)? {
            println!("Forgot recent queries");
        }

        db.flush_async().await?;
        Ok(())
    }
}
