//! Cache-then-network fetching
//!
//! Each fetch runs on its own tokio task and reports back over one channel:
//! an optional [`Delivery::Provisional`] page taken from the response cache,
//! then exactly one [`Delivery::Final`] with the catalog's answer. Both are
//! sent from the same task, so the provisional page always arrives first.

use crate::cache::ResponseCache;
use crate::error::FetchError;
use crate::query::MovieQuery;
use crate::task::{CancelFlag, CancellableTask, TaskToken};
use async_trait::async_trait;
use rpc::movies::MoviesPage;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// The remote catalog. Failing fetches must not have side effects.
#[async_trait]
pub trait MovieDataSource: Send + Sync + 'static {
    async fn fetch(&self, query: &MovieQuery, page: u32) -> Result<MoviesPage, FetchError>;
}

#[derive(Debug)]
pub enum Delivery {
    /// Cached copy, may be replaced by the final page
    Provisional(MoviesPage),
    Final(Result<MoviesPage, FetchError>),
}

#[derive(Debug)]
pub struct TaskDelivery {
    token: TaskToken,
    flag: CancelFlag,
    delivery: Delivery,
}

impl TaskDelivery {
    pub fn token(&self) -> TaskToken {
        self.token
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }

    pub fn into_delivery(self) -> Delivery {
        self.delivery
    }

    #[cfg(test)]
    pub(crate) fn forged(token: TaskToken, delivery: Delivery) -> Self {
        Self {
            token,
            flag: CancelFlag::default(),
            delivery,
        }
    }
}

/// Receiving end of a [`TwoPhaseFetcher`]. Deliveries of tasks that were
/// cancelled before being received are skipped here.
pub struct Deliveries {
    rx: mpsc::UnboundedReceiver<TaskDelivery>,
}

impl Deliveries {
    /// Cancel safe
    pub async fn recv(&mut self) -> Option<TaskDelivery> {
        loop {
            let delivery = self.rx.recv().await?;
            if delivery.flag.is_raised() {
                trace!(epoch = delivery.token.epoch(), "skipping delivery of cancelled fetch");
                continue;
            }
            return Some(delivery);
        }
    }
}

struct DeliverySink {
    token: TaskToken,
    flag: CancelFlag,
    tx: mpsc::UnboundedSender<TaskDelivery>,
}

impl DeliverySink {
    fn send(&self, delivery: Delivery) {
        if self.flag.is_raised() {
            return;
        }
        // The receiver is gone when the owner shut down; nothing left to tell
        let _ = self.tx.send(TaskDelivery {
            token: self.token,
            flag: self.flag.clone(),
            delivery,
        });
    }
}

pub struct TwoPhaseFetcher {
    source: Arc<dyn MovieDataSource>,
    cache: Arc<dyn ResponseCache>,
    tx: mpsc::UnboundedSender<TaskDelivery>,
    last_epoch: u64,
}

impl TwoPhaseFetcher {
    pub fn new(source: Arc<dyn MovieDataSource>, cache: Arc<dyn ResponseCache>) -> (Self, Deliveries) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Self {
            source,
            cache,
            tx,
            last_epoch: 0,
        };
        (fetcher, Deliveries { rx })
    }

    /// Must be called from within a tokio runtime.
    pub fn fetch(&mut self, query: MovieQuery, page: u32) -> CancellableTask {
        self.last_epoch += 1;
        let token = TaskToken::new(self.last_epoch);
        let flag = CancelFlag::default();
        let sink = DeliverySink {
            token,
            flag: flag.clone(),
            tx: self.tx.clone(),
        };

        let source = self.source.clone();
        let cache = self.cache.clone();
        let handle = tokio::spawn(async move {
            run_fetch(source.as_ref(), cache.as_ref(), query, page, sink).await;
        });

        CancellableTask::new(token, flag, handle)
    }
}

async fn run_fetch(
    source: &dyn MovieDataSource,
    cache: &dyn ResponseCache,
    query: MovieQuery,
    page: u32,
    sink: DeliverySink,
) {
    let epoch = sink.token.epoch();

    if let Some(cached) = cache.get(&query, page).await {
        debug!(epoch, %query, page, movies = cached.movies.len(), "cache hit");
        sink.send(Delivery::Provisional(cached));
    }

    let result = source.fetch(&query, page).await;
    match &result {
        Ok(fresh) => {
            debug!(epoch, %query, page, movies = fresh.movies.len(), "catalog answered");
            cache.put(&query, fresh).await;
        }
        Err(e) => debug!(epoch, %query, page, "catalog fetch failed: {}", e),
    }

    sink.send(Delivery::Final(result));
}
