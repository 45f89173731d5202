//! Catalog reached over the server's unix socket

use async_trait::async_trait;
use rpc::CatalogClient;
use rpc::movies::{CatalogFault, MoviesPage};
use search_core::{FetchError, MovieDataSource, MovieQuery};
use std::path::PathBuf;
use tarpc::client::RpcError;
use tarpc::{client, context, tokio_serde::formats::Bincode};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Connects on first use, and again after the connection was lost.
pub struct RemoteCatalog {
    socket_path: PathBuf,
    client: Mutex<Option<CatalogClient>>,
}

impl RemoteCatalog {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            client: Mutex::new(None),
        }
    }

    async fn connect(&self) -> Result<CatalogClient, FetchError> {
        let mut transport =
            tarpc::serde_transport::unix::connect(&self.socket_path, Bincode::default);
        transport.config_mut().max_frame_length(usize::MAX);

        let transport = transport.await.map_err(|e| {
            FetchError::Connectivity(format!(
                "could not connect to {:?}: {}",
                self.socket_path, e
            ))
        })?;

        info!("connected to catalog at {:?}", self.socket_path);
        Ok(CatalogClient::new(client::Config::default(), transport).spawn())
    }

    async fn client(&self) -> Result<CatalogClient, FetchError> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }
        let client = self.connect().await?;
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn disconnect(&self) {
        if self.client.lock().await.take().is_some() {
            debug!("dropped catalog connection");
        }
    }

    pub async fn ping(&self) -> Result<String, FetchError> {
        let client = self.client().await?;
        match client.ping(context::current()).await {
            Ok(pong) => Ok(pong),
            Err(e) => Err(self.transport_failure(e).await),
        }
    }

    async fn transport_failure(&self, error: RpcError) -> FetchError {
        match error {
            RpcError::Server(e) => FetchError::Server(e.to_string()),
            e => {
                warn!("catalog call failed: {}", e);
                self.disconnect().await;
                FetchError::Connectivity(e.to_string())
            }
        }
    }
}

#[async_trait]
impl MovieDataSource for RemoteCatalog {
    async fn fetch(&self, query: &MovieQuery, page: u32) -> Result<MoviesPage, FetchError> {
        let client = self.client().await?;
        match client
            .search_movies(context::current(), query.to_string(), page)
            .await
        {
            Ok(answer) => check_answer(page, answer),
            Err(e) => Err(self.transport_failure(e).await),
        }
    }
}

fn check_answer(
    requested: u32,
    answer: Result<MoviesPage, CatalogFault>,
) -> Result<MoviesPage, FetchError> {
    let page = answer.map_err(|fault| FetchError::Server(fault.to_string()))?;
    if page.page != requested {
        return Err(FetchError::Decode(format!(
            "asked for page {requested}, got page {}",
            page.page
        )));
    }
    if page.total_pages == 0 {
        return Err(FetchError::Decode(format!("page {requested} reports zero pages")));
    }
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{future, prelude::*};
    use rpc::Catalog;
    use rstest::rstest;
    use std::path::Path;
    use tarpc::server::{self, Channel};

    fn page(page: u32, total_pages: u32) -> MoviesPage {
        MoviesPage {
            page,
            total_pages,
            movies: Vec::new(),
        }
    }

    #[rstest]
    #[case(1, Ok(page(1, 3)), None)]
    #[case(2, Ok(page(1, 3)), Some("decode"))]
    #[case(1, Ok(page(1, 0)), Some("decode"))]
    #[case(1, Err(CatalogFault::EmptyQuery), Some("server"))]
    #[case(0, Err(CatalogFault::InvalidPage { page: 0 }), Some("server"))]
    fn test_check_answer(
        #[case] requested: u32,
        #[case] answer: Result<MoviesPage, CatalogFault>,
        #[case] failure: Option<&str>,
    ) {
        let kind = match check_answer(requested, answer) {
            Ok(_) => None,
            Err(FetchError::Decode(_)) => Some("decode"),
            Err(FetchError::Server(_)) => Some("server"),
            Err(other) => panic!("unexpected error {other:?}"),
        };
        assert_eq!(kind, failure);
    }

    #[derive(Clone)]
    struct FixedCatalog;

    impl Catalog for FixedCatalog {
        async fn ping(self, _c: context::Context) -> String {
            "Pong".to_string()
        }

        async fn search_movies(
            self,
            _c: context::Context,
            query: String,
            page: u32,
        ) -> Result<MoviesPage, CatalogFault> {
            match query.as_str() {
                "skewed" => Ok(MoviesPage {
                    page: page + 1,
                    total_pages: 9,
                    movies: Vec::new(),
                }),
                _ => Ok(MoviesPage {
                    page,
                    total_pages: 3,
                    movies: Vec::new(),
                }),
            }
        }
    }

    async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
        tokio::spawn(fut);
    }

    async fn serve_fixed(path: &Path) {
        let mut listener = tarpc::serde_transport::unix::listen(path, Bincode::default)
            .await
            .expect("listen");
        listener.config_mut().max_frame_length(usize::MAX);

        tokio::spawn(
            listener
                .filter_map(|r| future::ready(r.ok()))
                .map(server::BaseChannel::with_defaults)
                .map(|channel| channel.execute(FixedCatalog.serve()).for_each(spawn))
                .buffer_unordered(10)
                .for_each(|_| async {}),
        );
    }

    fn query(text: &str) -> MovieQuery {
        MovieQuery::new(text).unwrap()
    }

    #[tokio::test]
    async fn test_missing_socket_is_connectivity() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = RemoteCatalog::new(dir.path().join("nobody-home.sock"));

        let result = catalog.fetch(&query("batman"), 1).await;

        assert!(matches!(result, Err(FetchError::Connectivity(_))));
        assert_eq!(
            result.unwrap_err().category(),
            Some(search_core::ErrorCategory::NoConnection)
        );
    }

    #[tokio::test]
    async fn test_fetch_over_socket() {
        let dir = tempfile::tempdir().unwrap();
        let socket = dir.path().join("catalog.sock");
        serve_fixed(&socket).await;
        let catalog = RemoteCatalog::new(&socket);

        assert_eq!(catalog.ping().await.unwrap(), "Pong");
        let fetched = catalog.fetch(&query("batman"), 2).await.unwrap();
        assert_eq!((fetched.page, fetched.total_pages), (2, 3));

        let skewed = catalog.fetch(&query("skewed"), 1).await;
        assert!(matches!(skewed, Err(FetchError::Decode(_))));
    }
}
