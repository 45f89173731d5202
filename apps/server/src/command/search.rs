//! 本地搜索命令，不经过 RPC

use super::Command;
use crate::catalog::MovieCatalog;
use crate::config::Config;
use crate::error::Result;

pub struct SearchCommand {
    config: Config,
    query: String,
    page: u32,
}

impl SearchCommand {
    pub fn new(config: Config, query: String, page: u32) -> Self {
        Self { config, query, page }
    }
}

#[async_trait::async_trait]
impl Command for SearchCommand {
    async fn execute(&self) -> Result<()> {
        let catalog = MovieCatalog::load(self.config.catalog_path.as_deref(), self.config.page_size)?;
        let result = catalog.search(&self.query, self.page)?;

        println!(
            "\"{}\" page {}/{}: {} movies",
            self.query.trim(),
            result.page,
            result.total_pages,
            result.movies.len()
        );
        for movie in &result.movies {
            let year = movie
                .release_date
                .as_deref()
                .and_then(|date| date.get(..4))
                .unwrap_or("----");
            let genre = movie.genre.map(|g| g.to_string()).unwrap_or_default();
            println!("  {:<10} {}  {:<50} {}", movie.id.0, year, movie.title, genre);
        }

        Ok(())
    }
}
