use super::Command;
use crate::catalog::MovieCatalog;
use crate::config::Config;
use crate::error::Result;
use futures::{future, prelude::*};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use rpc::{
    Catalog,
    movies::{CatalogFault, MoviesPage},
};
use tarpc::{
    context::Context,
    server::{self, Channel},
    tokio_serde::formats::Bincode,
};

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}

#[derive(Clone)]
struct CatalogServer {
    catalog: Arc<MovieCatalog>,
    latency: Duration,
}

impl Catalog for CatalogServer {
    async fn ping(self, _c: Context) -> String {
        "Pong".to_string()
    }

    async fn search_movies(
        self,
        _c: Context,
        query: String,
        page: u32,
    ) -> std::result::Result<MoviesPage, CatalogFault> {
        debug!(%query, page, "search request");
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.catalog.search(&query, page)
    }
}

pub struct ServeCommand {
    config: Config,
}

impl ServeCommand {
    pub fn new(cfg: Config) -> Self {
        Self { config: cfg }
    }
}

#[async_trait::async_trait]
impl Command for ServeCommand {
    async fn execute(&self) -> Result<()> {
        let unix_socket_path = self
            .config
            .runtime_dir
            .join(config::constants::UNIX_SOCKET_FILE_NAME);

        if let Some(parent) = unix_socket_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if unix_socket_path.exists() {
            fs::remove_file(&unix_socket_path)?;
        }

        let catalog = MovieCatalog::load(self.config.catalog_path.as_deref(), self.config.page_size)?;
        let server = CatalogServer {
            catalog: Arc::new(catalog),
            latency: Duration::from_millis(self.config.latency_ms),
        };

        info!("listening on {:?}", unix_socket_path);
        let mut listener =
            tarpc::serde_transport::unix::listen(&unix_socket_path, Bincode::default).await?;
        listener.config_mut().max_frame_length(usize::MAX);

        let serving = listener
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            .map(|channel| {
                let server = server.clone();
                channel.execute(server.serve()).for_each(spawn)
            })
            .buffer_unordered(10)
            .for_each(|_| async {});

        tokio::select! {
            _ = serving => {}
            _ = tokio::signal::ctrl_c() => info!("interrupted, shutting down"),
        }

        fs::remove_file(&unix_socket_path)?;
        Ok(())
    }
}
