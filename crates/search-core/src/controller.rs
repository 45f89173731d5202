//! Search controller
//!
//! Owns the current query, the accumulated pages and the one fetch that may
//! be in flight. It is driven from a single context: commands come in through
//! its `&mut self` methods and fetch results through [`SearchController::apply`],
//! never concurrently. Outputs are published on `watch` channels, navigation
//! requests on an event channel; the controller never calls back into its
//! host.

use crate::cache::ResponseCache;
use crate::error::{ErrorCategory, IndexOutOfRange};
use crate::fetcher::{Deliveries, Delivery, MovieDataSource, TaskDelivery, TwoPhaseFetcher};
use crate::query::MovieQuery;
use crate::recent::{RecentQuery, RecentQueryStore};
use crate::store::PaginatedResultStore;
use crate::task::{TaskSlot, TaskToken};
use rpc::movies::{Movie, MoviesPage};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    /// Rebuilding the whole list: new query
    Full,
    /// Appending one more page
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchState {
    #[default]
    Idle,
    Loading(LoadKind),
    Loaded,
}

/// Published view of [`SearchState`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadingState {
    #[default]
    Idle,
    Full,
    Next,
}

impl From<SearchState> for LoadingState {
    fn from(state: SearchState) -> Self {
        match state {
            SearchState::Idle | SearchState::Loaded => LoadingState::Idle,
            SearchState::Loading(LoadKind::Full) => LoadingState::Full,
            SearchState::Loading(LoadKind::Next) => LoadingState::Next,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    EmptyQuery,
    LoadInProgress,
    NoMorePages,
    /// Nothing was searched yet
    NoQuery,
    NothingInFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Started { page: u32 },
    Cancelled,
    Skipped(SkipReason),
}

/// Requests for the host, which decides how to present them
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    ShowMovieDetails(Movie),
    ShowQuerySuggestions,
    CloseQuerySuggestions,
}

#[derive(Debug, Clone)]
pub struct SearchObserver {
    pub items: watch::Receiver<Vec<Movie>>,
    pub query: watch::Receiver<String>,
    pub loading: watch::Receiver<LoadingState>,
    pub error: watch::Receiver<Option<ErrorCategory>>,
}

struct Outputs {
    items: watch::Sender<Vec<Movie>>,
    query: watch::Sender<String>,
    loading: watch::Sender<LoadingState>,
    error: watch::Sender<Option<ErrorCategory>>,
}

impl Outputs {
    fn new() -> Self {
        Self {
            items: watch::Sender::new(Vec::new()),
            query: watch::Sender::new(String::new()),
            loading: watch::Sender::new(LoadingState::Idle),
            error: watch::Sender::new(None),
        }
    }

    fn observe(&self) -> SearchObserver {
        SearchObserver {
            items: self.items.subscribe(),
            query: self.query.subscribe(),
            loading: self.loading.subscribe(),
            error: self.error.subscribe(),
        }
    }
}

/// Channels the driver of a [`SearchController`] has to drain
pub struct SearchChannels {
    pub deliveries: Deliveries,
    pub events: mpsc::UnboundedReceiver<SearchEvent>,
}

pub struct SearchController {
    fetcher: TwoPhaseFetcher,
    results: PaginatedResultStore,
    active: TaskSlot,
    state: SearchState,
    query: Option<MovieQuery>,
    recent: Arc<RecentQueryStore>,
    outputs: Outputs,
    events: mpsc::UnboundedSender<SearchEvent>,
}

impl SearchController {
    pub fn new(
        source: Arc<dyn MovieDataSource>,
        cache: Arc<dyn ResponseCache>,
        recent: Arc<RecentQueryStore>,
    ) -> (Self, SearchChannels) {
        let (fetcher, deliveries) = TwoPhaseFetcher::new(source, cache);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let controller = Self {
            fetcher,
            results: PaginatedResultStore::default(),
            active: TaskSlot::default(),
            state: SearchState::Idle,
            query: None,
            recent,
            outputs: Outputs::new(),
            events: events_tx,
        };
        let channels = SearchChannels {
            deliveries,
            events: events_rx,
        };
        (controller, channels)
    }

    // ===== Commands =====

    pub fn submit_query(&mut self, text: &str) -> CommandOutcome {
        match MovieQuery::new(text) {
            Ok(query) => self.search(query),
            Err(_) => {
                debug!("ignoring blank search text");
                CommandOutcome::Skipped(SkipReason::EmptyQuery)
            }
        }
    }

    pub fn select_suggestion(&mut self, query: MovieQuery) -> CommandOutcome {
        self.search(query)
    }

    pub fn load_next_page(&mut self) -> CommandOutcome {
        if let SearchState::Loading(_) = self.state {
            return CommandOutcome::Skipped(SkipReason::LoadInProgress);
        }
        let Some(query) = self.query.clone() else {
            return CommandOutcome::Skipped(SkipReason::NoQuery);
        };
        if !self.results.has_more_pages() {
            return CommandOutcome::Skipped(SkipReason::NoMorePages);
        }

        // Nothing merged yet: the first page failed and this is a retry
        let kind = if self.results.page_count() == 0 {
            LoadKind::Full
        } else {
            LoadKind::Next
        };
        let page = self.results.next_page();
        self.start_load(query, kind, page)
    }

    pub fn cancel_search(&mut self) -> CommandOutcome {
        if !self.active.cancel() {
            return CommandOutcome::Skipped(SkipReason::NothingInFlight);
        }
        info!(query = ?self.query, "search cancelled");
        self.set_state(SearchState::Idle);
        CommandOutcome::Cancelled
    }

    pub fn select_item(&self, index: usize) -> Result<&Movie, IndexOutOfRange> {
        self.results.get(index).ok_or(IndexOutOfRange {
            index,
            len: self.results.len(),
        })
    }

    pub fn show_item_details(&self, index: usize) -> Result<(), IndexOutOfRange> {
        let movie = self.select_item(index)?.clone();
        self.emit(SearchEvent::ShowMovieDetails(movie));
        Ok(())
    }

    pub fn show_query_suggestions(&self) {
        self.emit(SearchEvent::ShowQuerySuggestions);
    }

    pub fn close_query_suggestions(&self) {
        self.emit(SearchEvent::CloseQuerySuggestions);
    }

    pub async fn recent_queries(&self, limit: usize) -> Vec<RecentQuery> {
        self.recent.recent(limit).await
    }

    // ===== Fetch results =====

    /// Merge one delivery. Deliveries of any fetch other than the active one
    /// are dropped.
    pub async fn apply(&mut self, delivery: TaskDelivery) {
        let token = delivery.token();
        if !self.active.is_current(token) {
            trace!(epoch = token.epoch(), "dropping stale delivery");
            return;
        }

        match delivery.into_delivery() {
            Delivery::Provisional(page) => {
                debug!(page = page.page, "showing cached page");
                self.merge(page);
            }
            Delivery::Final(Ok(page)) => {
                self.active.finish(token);
                self.merge(page);
                self.clear_error();
                self.set_state(SearchState::Loaded);
                self.remember_query().await;
            }
            Delivery::Final(Err(error)) => {
                self.active.finish(token);
                self.set_state(SearchState::Idle);
                match error.category() {
                    Some(category) => {
                        warn!(query = ?self.query, "search failed: {}", error);
                        self.outputs.error.send_replace(Some(category));
                    }
                    None => debug!("catalog reported the fetch as cancelled"),
                }
            }
        }
    }

    // ===== Reads =====

    pub fn observe(&self) -> SearchObserver {
        self.outputs.observe()
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn movies(&self) -> &[Movie] {
        self.results.movies()
    }

    pub fn current_query(&self) -> Option<&MovieQuery> {
        self.query.as_ref()
    }

    pub fn current_page(&self) -> u32 {
        self.results.current_page()
    }

    pub fn total_pages(&self) -> u32 {
        self.results.total_pages()
    }

    pub fn has_more_pages(&self) -> bool {
        self.results.has_more_pages()
    }

    pub(crate) fn active_token(&self) -> Option<TaskToken> {
        self.active.token()
    }

    // ===== Internals =====

    fn search(&mut self, query: MovieQuery) -> CommandOutcome {
        info!(%query, "new search");
        self.active.cancel();
        self.results.reset();
        self.outputs.items.send_replace(Vec::new());
        self.outputs.query.send_replace(query.to_string());
        self.clear_error();
        self.query = Some(query.clone());
        self.start_load(query, LoadKind::Full, 1)
    }

    fn start_load(&mut self, query: MovieQuery, kind: LoadKind, page: u32) -> CommandOutcome {
        self.set_state(SearchState::Loading(kind));
        let task = self.fetcher.fetch(query, page);
        debug!(epoch = task.token().epoch(), page, ?kind, "fetch started");
        self.active.replace(task);
        CommandOutcome::Started { page }
    }

    fn merge(&mut self, page: MoviesPage) {
        self.results.append(page);
        self.outputs.items.send_replace(self.results.movies().to_vec());
    }

    fn clear_error(&self) {
        self.outputs.error.send_if_modified(|error| error.take().is_some());
    }

    fn set_state(&mut self, state: SearchState) {
        self.state = state;
        let loading = LoadingState::from(state);
        self.outputs.loading.send_if_modified(|current| {
            let changed = *current != loading;
            *current = loading;
            changed
        });
    }

    async fn remember_query(&self) {
        let Some(query) = self.query.clone() else {
            return;
        };
        if let Err(e) = self.recent.record(query).await {
            warn!("could not save recent query: {}", e);
        }
    }

    fn emit(&self, event: SearchEvent) {
        if self.events.send(event).is_err() {
            trace!("no one listens to search events");
        }
    }
}
