pub mod movies;

use movies::{CatalogFault, MoviesPage};

#[tarpc::service]
pub trait Catalog {
    /// Heartbeat
    async fn ping() -> String;

    /// Search the catalog; `page` starts at 1
    async fn search_movies(query: String, page: u32) -> Result<MoviesPage, CatalogFault>;
}
