pub mod clear_cache;
pub mod interactive;
pub mod recent;

use crate::error::Result;

pub use clear_cache::ClearCacheCommand;
pub use interactive::InteractiveCommand;
pub use recent::RecentCommand;

#[async_trait::async_trait]
pub trait Command {
    async fn execute(&self) -> Result<()>;
}
