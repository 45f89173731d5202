use crate::error::Result;
use config::{AppStrategy, constants as config_constants, create_strategy, resolve_dir};
use search_core::SearchConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub search: SearchConfig,

    // === System state ===
    pub runtime_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub config_path: PathBuf,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct RawConfig {
    search: SearchConfig,
}

struct Dirs {
    runtime_dir: PathBuf,
    cache_dir: PathBuf,
    config_path: PathBuf,
}

impl Dirs {
    fn resolve() -> Result<Self> {
        let strategy = create_strategy()?;

        let config_path = resolve_dir("CONFIG_DIRECTORY", &strategy, |s| Some(s.config_dir()))
            .join(config_constants::CLIENT_CONFIG_FILE_NAME);
        let runtime_dir = resolve_dir("RUNTIME_DIRECTORY", &strategy, |s| s.runtime_dir());
        let cache_dir = resolve_dir("CACHE_DIRECTORY", &strategy, |s| Some(s.cache_dir()));

        Ok(Self {
            runtime_dir,
            cache_dir,
            config_path,
        })
    }
}

impl Config {
    fn from_raw(raw: RawConfig, dirs: Dirs) -> Self {
        Self {
            search: raw.search,
            runtime_dir: dirs.runtime_dir,
            cache_dir: dirs.cache_dir,
            config_path: dirs.config_path,
        }
    }

    pub fn load() -> Result<Config> {
        let dirs = Dirs::resolve()?;

        let raw_config: RawConfig = match std::fs::read_to_string(&dirs.config_path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RawConfig::default(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self::from_raw(raw_config, dirs))
    }

    pub fn load_str(config_str: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(config_str)?;
        Ok(Self::from_raw(raw, Dirs::resolve()?))
    }

    pub fn socket_path(&self) -> PathBuf {
        self.runtime_dir.join(config_constants::UNIX_SOCKET_FILE_NAME)
    }

    pub fn store_path(&self) -> PathBuf {
        self.cache_dir.join(config_constants::CLIENT_STORE_DIR_NAME)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_load_config_defaults() {
        let cfg = Config::load_str("").expect("Failed to load config");
        assert_eq!(cfg.search, SearchConfig::default());
        assert!(cfg.socket_path().ends_with(config_constants::UNIX_SOCKET_FILE_NAME));
        assert!(cfg.store_path().ends_with(config_constants::CLIENT_STORE_DIR_NAME));
    }

    #[test]
    fn test_load_config_values() {
        const USER_CONFIG: &str = r#"
        [search]
        suggestions-to-show = 3
        "#;

        let cfg = Config::load_str(USER_CONFIG).expect("Failed to load config");

        assert_eq!(cfg.search.suggestions_to_show, 3);
        assert_eq!(cfg.search.recent_queries_capacity, 10);
    }

    #[test]
    fn test_load_config_unknown_field() {
        const USER_CONFIG: &str = r#"
        [search]
        page-size = 50
        "#;

        let err = Config::load_str(USER_CONFIG).unwrap_err();
        assert!(err.to_string().contains("unknown field `page-size`"));
    }
}
