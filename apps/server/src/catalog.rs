//! In-memory movie catalog
//!
//! Search is a case-insensitive substring match on title and overview, in
//! catalog order, cut into fixed-size pages.

use crate::error::{Result, WrapErr};
use rpc::movies::{CatalogFault, Movie, MoviesPage};
use std::path::Path;
use tracing::{debug, info};

const DEMO_CATALOG: &str = include_str!("../assets/catalog.json");

pub struct MovieCatalog {
    movies: Vec<Movie>,
    page_size: u32,
}

impl MovieCatalog {
    pub fn from_json(json: &str, page_size: u32) -> Result<Self> {
        let movies: Vec<Movie> = serde_json::from_str(json)?;
        Ok(Self {
            movies,
            page_size: page_size.max(1),
        })
    }

    /// Loads `path`, or the bundled demo catalog when there is none
    pub fn load(path: Option<&Path>, page_size: u32) -> Result<Self> {
        let catalog = match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .wrap_err_with(|| format!("Read catalog {}", path.display()))?;
                Self::from_json(&json, page_size)
                    .wrap_err_with(|| format!("Parse catalog {}", path.display()))?
            }
            None => Self::from_json(DEMO_CATALOG, page_size).wrap_err("Parse demo catalog")?,
        };
        info!(movies = catalog.len(), page_size = catalog.page_size, "catalog loaded");
        Ok(catalog)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn search(&self, query: &str, page: u32) -> std::result::Result<MoviesPage, CatalogFault> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CatalogFault::EmptyQuery);
        }
        if page == 0 {
            return Err(CatalogFault::InvalidPage { page });
        }

        let matches: Vec<&Movie> = self
            .movies
            .iter()
            .filter(|movie| {
                movie.title.to_lowercase().contains(&needle)
                    || movie.overview.to_lowercase().contains(&needle)
            })
            .collect();

        let page_size = self.page_size as usize;
        let total_pages = matches.len().div_ceil(page_size).max(1) as u32;
        let start = (page as usize - 1).saturating_mul(page_size);
        let movies: Vec<Movie> = matches
            .into_iter()
            .skip(start)
            .take(page_size)
            .cloned()
            .collect();

        debug!(query = %needle, page, total_pages, found = movies.len(), "catalog search");
        Ok(MoviesPage {
            page,
            total_pages,
            movies,
        })
    }
}
