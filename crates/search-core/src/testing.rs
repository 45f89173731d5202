//! Fixtures shared by the unit tests

use crate::error::FetchError;
use crate::fetcher::MovieDataSource;
use crate::query::MovieQuery;
use async_trait::async_trait;
use rpc::movies::{Movie, MovieId, MoviesPage};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;

pub(crate) fn query(text: &str) -> MovieQuery {
    MovieQuery::new(text).expect("non-empty query")
}

/// Movie ids are `{prefix}-{page}-{index}`
pub(crate) fn movies_page(prefix: &str, page: u32, total_pages: u32, count: usize) -> MoviesPage {
    let movies = (0..count)
        .map(|i| Movie {
            id: MovieId(format!("{prefix}-{page}-{i}")),
            title: format!("{prefix} #{page}.{i}"),
            genre: None,
            poster_path: None,
            overview: String::new(),
            release_date: None,
        })
        .collect();
    MoviesPage {
        page,
        total_pages,
        movies,
    }
}

/// Answers from a script. Queries with a gate wait for one permit per fetch.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    responses: Mutex<HashMap<(String, u32), VecDeque<Result<MoviesPage, FetchError>>>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub(crate) fn respond(&self, query: &str, page: u32, result: Result<MoviesPage, FetchError>) {
        self.responses
            .lock()
            .unwrap()
            .entry((query.to_string(), page))
            .or_default()
            .push_back(result);
    }

    pub(crate) fn gate(&self, query: &str) -> Arc<Semaphore> {
        self.gates
            .lock()
            .unwrap()
            .entry(query.to_string())
            .or_insert_with(|| Arc::new(Semaphore::new(0)))
            .clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MovieDataSource for ScriptedSource {
    async fn fetch(&self, query: &MovieQuery, page: u32) -> Result<MoviesPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gates.lock().unwrap().get(query.as_str()).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate closed").forget();
        }

        self.responses
            .lock()
            .unwrap()
            .get_mut(&(query.to_string(), page))
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(FetchError::Server(format!("nothing scripted for {query} page {page}"))))
    }
}
