//! Line based search prompt
//!
//! Plain text starts a search, everything else is a `/command`. Results,
//! loading state and errors are printed as they change, independently of
//! the prompt.

use super::Command;
use super::recent::format_entry;
use crate::config::Config;
use crate::error::{OptionExt, Result};
use crate::remote::RemoteCatalog;
use crate::store;
use rpc::movies::{Movie, MovieId};
use search_core::{
    CommandOutcome, LoadingState, SearchEvent, SearchHandle, SearchObserver, SearchService,
    SkipReason,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

const HELP: &str = "\
commands:
  <text>     search for movies
  /next      load the next page
  /cancel    stop the running search
  /suggest   show recent queries
  /pick N    search recent query N again
  /open N    show details of movie N
  /close     hide recent queries
  /help      show this help
  /quit      leave";

#[derive(Debug, PartialEq)]
enum Input {
    Search(String),
    Next,
    Cancel,
    Suggest,
    Pick(usize),
    Open(usize),
    Close,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl Input {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Input::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Input::Search(line.to_string());
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let number = parts.next().map(str::parse::<usize>);
        match (name, number) {
            ("next" | "n", None) => Input::Next,
            ("cancel" | "c", None) => Input::Cancel,
            ("suggest" | "s", None) => Input::Suggest,
            ("close", None) => Input::Close,
            ("help" | "h", None) => Input::Help,
            ("quit" | "q", None) => Input::Quit,
            ("pick" | "p", Some(Ok(n))) if n > 0 => Input::Pick(n),
            ("open" | "o", Some(Ok(n))) if n > 0 => Input::Open(n),
            _ => Input::Invalid(line.to_string()),
        }
    }
}

/// Turns successive item lists into lines to print: only what was appended,
/// or the whole list when earlier items changed.
#[derive(Default)]
struct ResultPrinter {
    shown: Vec<MovieId>,
}

impl ResultPrinter {
    fn update(&mut self, items: &[Movie]) -> Vec<String> {
        let unchanged_prefix = self.shown.len() <= items.len()
            && self.shown.iter().zip(items).all(|(id, movie)| *id == movie.id);

        let mut lines = Vec::new();
        let start = if unchanged_prefix {
            self.shown.len()
        } else {
            if !items.is_empty() {
                lines.push("-- results replaced --".to_string());
            }
            0
        };

        for (index, movie) in items.iter().enumerate().skip(start) {
            lines.push(format_movie(index + 1, movie));
        }
        self.shown = items.iter().map(|movie| movie.id.clone()).collect();
        lines
    }
}

fn format_movie(position: usize, movie: &Movie) -> String {
    let year = movie
        .release_date
        .as_deref()
        .and_then(|date| date.get(..4))
        .unwrap_or("----");
    format!("{position:>4}. {} ({year})", movie.title)
}

fn format_details(movie: &Movie) -> String {
    let mut details = format!("== {} ==\n", movie.title);
    if let Some(genre) = movie.genre {
        details.push_str(&format!("genre:    {genre}\n"));
    }
    if let Some(date) = &movie.release_date {
        details.push_str(&format!("released: {date}\n"));
    }
    if let Some(poster) = &movie.poster_path {
        details.push_str(&format!("poster:   {poster}\n"));
    }
    details.push_str(&movie.overview);
    details
}

fn describe_outcome(outcome: CommandOutcome) -> Option<&'static str> {
    match outcome {
        CommandOutcome::Started { .. } => None,
        CommandOutcome::Cancelled => Some("cancelled"),
        CommandOutcome::Skipped(SkipReason::EmptyQuery) => Some("nothing to search for"),
        CommandOutcome::Skipped(SkipReason::LoadInProgress) => Some("still loading"),
        CommandOutcome::Skipped(SkipReason::NoMorePages) => Some("no more pages"),
        CommandOutcome::Skipped(SkipReason::NoQuery) => Some("search for something first"),
        CommandOutcome::Skipped(SkipReason::NothingInFlight) => Some("nothing to cancel"),
    }
}

async fn render(mut observer: SearchObserver) {
    let mut printer = ResultPrinter::default();
    loop {
        tokio::select! {
            changed = observer.items.changed() => {
                if changed.is_err() {
                    break;
                }
                let items = observer.items.borrow_and_update().clone();
                for line in printer.update(&items) {
                    println!("{line}");
                }
            }
            changed = observer.loading.changed() => {
                if changed.is_err() {
                    break;
                }
                match *observer.loading.borrow_and_update() {
                    LoadingState::Full => println!("searching \"{}\" ...", observer.query.borrow().as_str()),
                    LoadingState::Next => println!("loading more ..."),
                    LoadingState::Idle => {}
                }
            }
            changed = observer.error.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(category) = *observer.error.borrow_and_update() {
                    println!("!! {category}");
                }
            }
        }
    }
    debug!("renderer stopped");
}

async fn navigate(
    mut events: mpsc::UnboundedReceiver<SearchEvent>,
    handle: SearchHandle,
    suggestions: usize,
) {
    while let Some(event) = events.recv().await {
        match event {
            SearchEvent::ShowMovieDetails(movie) => println!("{}", format_details(&movie)),
            SearchEvent::ShowQuerySuggestions => match handle.recent_queries(suggestions).await {
                Ok(entries) if entries.is_empty() => println!("no recent queries"),
                Ok(entries) => {
                    for (i, entry) in entries.iter().enumerate() {
                        println!("{}", format_entry(i + 1, entry));
                    }
                }
                Err(e) => warn!("{}", e),
            },
            SearchEvent::CloseQuerySuggestions => println!("-- suggestions closed --"),
        }
    }
}

pub struct InteractiveCommand {
    config: Config,
}

impl InteractiveCommand {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Returns `false` once the user asked to leave
    async fn dispatch(&self, handle: &SearchHandle, input: Input) -> Result<bool> {
        let outcome = match input {
            Input::Search(text) => Some(handle.submit_query(text).await?),
            Input::Next => Some(handle.load_next_page().await?),
            Input::Cancel => Some(handle.cancel_search().await?),
            Input::Suggest => {
                handle.show_query_suggestions()?;
                None
            }
            Input::Close => {
                handle.close_query_suggestions()?;
                None
            }
            Input::Pick(n) => {
                let entries = handle.recent_queries(self.config.search.suggestions_to_show).await?;
                match entries.into_iter().nth(n - 1) {
                    Some(entry) => Some(handle.select_suggestion(entry.query).await?),
                    None => {
                        println!("no recent query #{n}");
                        None
                    }
                }
            }
            Input::Open(n) => {
                if let Err(e) = handle.show_item_details(n - 1).await? {
                    println!("no movie #{n}: {e}");
                }
                None
            }
            Input::Help => {
                println!("{HELP}");
                None
            }
            Input::Quit => return Ok(false),
            Input::Empty => None,
            Input::Invalid(line) => {
                println!("unknown command {line:?}, try /help");
                None
            }
        };

        if let Some(message) = outcome.and_then(describe_outcome) {
            println!("({message})");
        }
        Ok(true)
    }
}

#[async_trait::async_trait]
impl Command for InteractiveCommand {
    async fn execute(&self) -> Result<()> {
        let db = store::open_db(&self.config)?;
        let cache = store::response_cache(&self.config, &db)?;
        let recent = store::recent_queries(&self.config, &db).await?;
        let source = Arc::new(RemoteCatalog::new(self.config.socket_path()));

        let mut service = SearchService::spawn(source, cache, recent);
        let handle = service.handle();
        let events = service.take_events().ok_or_eyre("search events already taken")?;

        let renderer = tokio::spawn(render(handle.observe()));
        let navigator = tokio::spawn(navigate(
            events,
            handle.clone(),
            self.config.search.suggestions_to_show,
        ));

        println!("{HELP}");
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            if !self.dispatch(&handle, Input::parse(&line)).await? {
                break;
            }
        }

        service.shutdown().await;
        renderer.abort();
        navigator.abort();
        db.flush_async().await?;
        Ok(())
    }
}
