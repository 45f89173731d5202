use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovieId(pub String);

impl fmt::Display for MovieId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Genre {
    Adventure,
    ScienceFiction,
    Action,
    Drama,
    Animation,
}

/// A catalog entry. Clients only rely on `id` for identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    pub genre: Option<Genre>,
    pub poster_path: Option<String>,
    pub overview: String,
    /// `YYYY-MM-DD`, as reported by the catalog
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoviesPage {
    pub page: u32,
    pub total_pages: u32,
    pub movies: Vec<Movie>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum CatalogFault {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("page {page} does not exist, pages start at 1")]
    InvalidPage { page: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_from_catalog_json() {
        const RAW: &str = r#"{
            "id": "tt0372784",
            "title": "Batman Begins",
            "genre": "action",
            "poster_path": null,
            "overview": "Bruce Wayne becomes Batman.",
            "release_date": "2005-06-15"
        }"#;

        let movie: Movie = serde_json::from_str(RAW).expect("valid movie json");
        assert_eq!(movie.id, MovieId("tt0372784".into()));
        assert_eq!(movie.genre, Some(Genre::Action));
        assert_eq!(movie.genre.map(|g| g.to_string()).as_deref(), Some("action"));
    }

    #[test]
    fn test_missing_optional_fields() {
        const RAW: &str = r#"{ "id": "1", "title": "Untitled", "overview": "" }"#;

        let movie: Movie = serde_json::from_str(RAW).expect("optional fields may be absent");
        assert_eq!(movie.genre, None);
        assert_eq!(movie.release_date, None);
    }

    #[test]
    fn test_page_survives_bincode() {
        let page = MoviesPage {
            page: 2,
            total_pages: 3,
            movies: vec![Movie {
                id: MovieId("7".into()),
                title: "Interstellar".into(),
                genre: Some(Genre::ScienceFiction),
                poster_path: Some("/interstellar.jpg".into()),
                overview: "Space".into(),
                release_date: None,
            }],
        };

        let bytes = bincode::serialize(&page).expect("serialize");
        let back: MoviesPage = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(back, page);
    }
}
