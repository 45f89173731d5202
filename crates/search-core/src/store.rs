//! Result Store accumulates the pages of the current query.
//! Pages are keyed by page number, so a page delivered twice (cached, then
//! fresh) replaces itself instead of duplicating its movies. The flattened
//! list is rebuilt on every append; pages are small and few.

use rpc::movies::{Movie, MoviesPage};
use std::collections::BTreeMap;

#[derive(Debug)]
pub struct PaginatedResultStore {
    pages: BTreeMap<u32, MoviesPage>,
    /// Reported by the most recently merged page
    total_pages: u32,
    /// Pages in ascending page number, movies in page order
    movies: Vec<Movie>,
}

impl Default for PaginatedResultStore {
    fn default() -> Self {
        Self {
            pages: BTreeMap::new(),
            total_pages: 1,
            movies: Vec::new(),
        }
    }
}

impl PaginatedResultStore {
    pub fn append(&mut self, page: MoviesPage) {
        self.total_pages = page.total_pages;
        self.pages.insert(page.page, page);
        self.movies = self
            .pages
            .values()
            .flat_map(|page| page.movies.iter().cloned())
            .collect();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    pub fn get(&self, index: usize) -> Option<&Movie> {
        self.movies.get(index)
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    /// Highest merged page number, 0 before anything was merged
    pub fn current_page(&self) -> u32 {
        self.pages.keys().next_back().copied().unwrap_or(0)
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn has_more_pages(&self) -> bool {
        self.current_page() < self.total_pages
    }

    pub fn next_page(&self) -> u32 {
        self.current_page() + 1
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
