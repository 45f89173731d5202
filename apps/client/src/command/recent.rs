use super::Command;
use crate::config::Config;
use crate::error::Result;
use crate::store;
use chrono::Local;
use search_core::RecentQuery;

pub struct RecentCommand {
    config: Config,
    limit: Option<usize>,
}

impl RecentCommand {
    pub fn new(config: Config, limit: Option<usize>) -> Self {
        Self { config, limit }
    }
}

pub fn format_entry(position: usize, entry: &RecentQuery) -> String {
    let when = entry.recorded_at.with_timezone(&Local).format("%Y-%m-%d %H:%M");
    format!("{position:>3}. {}  ({when})", entry.query)
}

#[async_trait::async_trait]
impl Command for RecentCommand {
    async fn execute(&self) -> Result<()> {
        let db = store::open_db(&self.config)?;
        let recent = store::recent_queries(&self.config, &db).await?;
        let limit = self.limit.unwrap_or(self.config.search.suggestions_to_show);

        let entries = recent.recent(limit).await;
        if entries.is_empty() {
            println!("No recent queries");
        }
        for (i, entry) in entries.iter().enumerate() {
            println!("{}", format_entry(i + 1, entry));
        }

        Ok(())
    }
}
