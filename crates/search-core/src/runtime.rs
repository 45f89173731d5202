//! Runs a [`SearchController`] on its own tokio task.
//!
//! Commands and fetch deliveries are funnelled into one loop, so the
//! controller never sees two of them at once. Callers talk to it through a
//! cloneable [`SearchHandle`].

use crate::cache::ResponseCache;
use crate::controller::{CommandOutcome, SearchController, SearchEvent, SearchObserver};
use crate::error::IndexOutOfRange;
use crate::fetcher::{Deliveries, MovieDataSource};
use crate::query::MovieQuery;
use crate::recent::{RecentQuery, RecentQueryStore};
use rpc::movies::Movie;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("search service is not running")]
pub struct ServiceStopped;

enum Request {
    Submit {
        text: String,
        reply: oneshot::Sender<CommandOutcome>,
    },
    SelectSuggestion {
        query: MovieQuery,
        reply: oneshot::Sender<CommandOutcome>,
    },
    LoadNextPage {
        reply: oneshot::Sender<CommandOutcome>,
    },
    Cancel {
        reply: oneshot::Sender<CommandOutcome>,
    },
    SelectItem {
        index: usize,
        reply: oneshot::Sender<Result<Movie, IndexOutOfRange>>,
    },
    ShowItemDetails {
        index: usize,
        reply: oneshot::Sender<Result<(), IndexOutOfRange>>,
    },
    ShowQuerySuggestions,
    CloseQuerySuggestions,
    RecentQueries {
        limit: usize,
        reply: oneshot::Sender<Vec<RecentQuery>>,
    },
    Shutdown,
}

#[derive(Clone)]
pub struct SearchHandle {
    tx: mpsc::UnboundedSender<Request>,
    observer: SearchObserver,
}

impl SearchHandle {
    async fn ask<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Request,
    ) -> Result<T, ServiceStopped> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).map_err(|_| ServiceStopped)?;
        rx.await.map_err(|_| ServiceStopped)
    }

    fn tell(&self, request: Request) -> Result<(), ServiceStopped> {
        self.tx.send(request).map_err(|_| ServiceStopped)
    }

    pub async fn submit_query(&self, text: impl Into<String>) -> Result<CommandOutcome, ServiceStopped> {
        let text = text.into();
        self.ask(|reply| Request::Submit { text, reply }).await
    }

    pub async fn select_suggestion(&self, query: MovieQuery) -> Result<CommandOutcome, ServiceStopped> {
        self.ask(|reply| Request::SelectSuggestion { query, reply }).await
    }

    pub async fn load_next_page(&self) -> Result<CommandOutcome, ServiceStopped> {
        self.ask(|reply| Request::LoadNextPage { reply }).await
    }

    pub async fn cancel_search(&self) -> Result<CommandOutcome, ServiceStopped> {
        self.ask(|reply| Request::Cancel { reply }).await
    }

    pub async fn select_item(&self, index: usize) -> Result<Result<Movie, IndexOutOfRange>, ServiceStopped> {
        self.ask(|reply| Request::SelectItem { index, reply }).await
    }

    pub async fn show_item_details(&self, index: usize) -> Result<Result<(), IndexOutOfRange>, ServiceStopped> {
        self.ask(|reply| Request::ShowItemDetails { index, reply }).await
    }

    pub fn show_query_suggestions(&self) -> Result<(), ServiceStopped> {
        self.tell(Request::ShowQuerySuggestions)
    }

    pub fn close_query_suggestions(&self) -> Result<(), ServiceStopped> {
        self.tell(Request::CloseQuerySuggestions)
    }

    pub async fn recent_queries(&self, limit: usize) -> Result<Vec<RecentQuery>, ServiceStopped> {
        self.ask(|reply| Request::RecentQueries { limit, reply }).await
    }

    pub fn observe(&self) -> SearchObserver {
        self.observer.clone()
    }
}

pub struct SearchService {
    handle: SearchHandle,
    events: Option<mpsc::UnboundedReceiver<SearchEvent>>,
    worker: JoinHandle<()>,
}

impl SearchService {
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        source: Arc<dyn MovieDataSource>,
        cache: Arc<dyn ResponseCache>,
        recent: Arc<RecentQueryStore>,
    ) -> Self {
        let (controller, channels) = SearchController::new(source, cache, recent);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SearchHandle {
            tx,
            observer: controller.observe(),
        };

        let worker = tokio::spawn(run(controller, channels.deliveries, rx));
        info!("search service started");

        Self {
            handle,
            events: Some(channels.events),
            worker,
        }
    }

    pub fn handle(&self) -> SearchHandle {
        self.handle.clone()
    }

    /// Navigation events; only the first caller gets the receiver.
    pub fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<SearchEvent>> {
        self.events.take()
    }

    /// Cancels any fetch in flight and waits for the loop to exit.
    pub async fn shutdown(self) {
        // Already gone if the loop panicked
        let _ = self.handle.tx.send(Request::Shutdown);
        if let Err(e) = self.worker.await {
            error!("search service stopped abnormally: {}", e);
        }
    }
}

async fn run(
    mut controller: SearchController,
    mut deliveries: Deliveries,
    mut rx: mpsc::UnboundedReceiver<Request>,
) {
    loop {
        tokio::select! {
            biased;
            request = rx.recv() => match request {
                None | Some(Request::Shutdown) => break,
                Some(request) => handle(&mut controller, request).await,
            },
            Some(delivery) = deliveries.recv() => controller.apply(delivery).await,
        }
    }

    controller.cancel_search();
    info!("search service stopped");
}

async fn handle(controller: &mut SearchController, request: Request) {
    // A dropped reply receiver only means the caller stopped waiting
    match request {
        Request::Submit { text, reply } => {
            let _ = reply.send(controller.submit_query(&text));
        }
        Request::SelectSuggestion { query, reply } => {
            let _ = reply.send(controller.select_suggestion(query));
        }
        Request::LoadNextPage { reply } => {
            let outcome = controller.load_next_page();
            debug!(?outcome, "load next page");
            let _ = reply.send(outcome);
        }
        Request::Cancel { reply } => {
            let _ = reply.send(controller.cancel_search());
        }
        Request::SelectItem { index, reply } => {
            let _ = reply.send(controller.select_item(index).cloned());
        }
        Request::ShowItemDetails { index, reply } => {
            let _ = reply.send(controller.show_item_details(index));
        }
        Request::ShowQuerySuggestions => controller.show_query_suggestions(),
        Request::CloseQuerySuggestions => controller.close_query_suggestions(),
        Request::RecentQueries { limit, reply } => {
            let _ = reply.send(controller.recent_queries(limit).await);
        }
        // The loop exits before getting here
        Request::Shutdown => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryResponseCache;
    use crate::controller::{LoadingState, SkipReason};
    use crate::testing::{ScriptedSource, movies_page, query};

    fn service(source: &Arc<ScriptedSource>) -> SearchService {
        SearchService::spawn(
            source.clone(),
            Arc::new(MemoryResponseCache::default()),
            Arc::new(RecentQueryStore::in_memory(10)),
        )
    }

    #[tokio::test]
    async fn test_search_and_page_through_service() {
        let source = Arc::new(ScriptedSource::default());
        source.respond("batman", 1, Ok(movies_page("batman", 1, 2, 20)));
        source.respond("batman", 2, Ok(movies_page("batman", 2, 2, 20)));
        let service = service(&source);
        let handle = service.handle();
        let mut observer = handle.observe();

        assert_eq!(handle.submit_query("batman").await, Ok(CommandOutcome::Started { page: 1 }));
        observer.items.wait_for(|items| items.len() == 20).await.unwrap();
        observer.loading.wait_for(|l| *l == LoadingState::Idle).await.unwrap();

        assert_eq!(handle.load_next_page().await, Ok(CommandOutcome::Started { page: 2 }));
        observer.items.wait_for(|items| items.len() == 40).await.unwrap();
        observer.loading.wait_for(|l| *l == LoadingState::Idle).await.unwrap();

        assert_eq!(
            handle.load_next_page().await,
            Ok(CommandOutcome::Skipped(SkipReason::NoMorePages))
        );
        let movie = handle.select_item(39).await.unwrap().unwrap();
        assert_eq!(movie.id.0, "batman-2-19");

        let recent = handle.recent_queries(5).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].query, query("batman"));

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_reach_receiver() {
        let source = Arc::new(ScriptedSource::default());
        source.respond("alien", 1, Ok(movies_page("alien", 1, 1, 2)));
        let mut service = service(&source);
        let mut events = service.take_events().expect("first take");
        assert!(service.take_events().is_none());
        let handle = service.handle();
        let mut observer = handle.observe();

        handle.select_suggestion(query("alien")).await.unwrap();
        observer.items.wait_for(|items| items.len() == 2).await.unwrap();
        handle.show_query_suggestions().unwrap();
        handle.show_item_details(0).await.unwrap().unwrap();

        assert_eq!(events.recv().await, Some(SearchEvent::ShowQuerySuggestions));
        assert!(matches!(events.recv().await, Some(SearchEvent::ShowMovieDetails(_))));

        service.shutdown().await;
    }

    #[tokio::test]
    async fn test_handle_fails_after_shutdown() {
        let source = Arc::new(ScriptedSource::default());
        let _gate = source.gate("batman");
        let service = service(&source);
        let handle = service.handle();

        handle.submit_query("batman").await.unwrap();
        service.shutdown().await;

        assert_eq!(handle.cancel_search().await, Err(ServiceStopped));
        assert_eq!(handle.show_query_suggestions(), Err(ServiceStopped));
    }
}
