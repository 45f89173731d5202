// search-core/src/lib.rs
//! 电影搜索核心库
//!
//! Paginated movie search driven by a single controller:
//! - two-phase fetching, cached page first, catalog answer second
//! - one cancellable fetch in flight at a time
//! - recent queries persisted through a pluggable store

pub mod cache;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod query;
pub mod recent;
pub mod runtime;
pub mod store;
pub mod task;

#[cfg(test)]
mod testing;

pub use cache::{MemoryResponseCache, NoResponseCache, ResponseCache, SledResponseCache};
pub use config::SearchConfig;
pub use controller::{
    CommandOutcome, LoadKind, LoadingState, SearchChannels, SearchController, SearchEvent,
    SearchObserver, SearchState, SkipReason,
};
pub use error::{ErrorCategory, FetchError, IndexOutOfRange, StoreError};
pub use fetcher::{Deliveries, Delivery, MovieDataSource, TaskDelivery, TwoPhaseFetcher};
pub use query::{MovieQuery, QueryError};
pub use recent::{MemoryQueryStore, QueryStore, RecentQuery, RecentQueryStore, SledQueryStore};
pub use runtime::{SearchHandle, SearchService, ServiceStopped};
pub use store::PaginatedResultStore;
pub use task::{CancellableTask, TaskToken};
