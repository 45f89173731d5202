pub mod constants;

pub use etcetera::AppStrategy;
use etcetera::{AppStrategyArgs, choose_app_strategy};

use std::path::PathBuf;
use std::env;


pub fn create_strategy() -> std::result::Result<impl AppStrategy, etcetera::HomeDirError> {
    choose_app_strategy(AppStrategyArgs {
        top_level_domain: constants::TOP_LEVEL_DOMAIN.to_string(),
        author: constants::AUTHOR.to_string(),
        app_name: constants::APP_NAME.to_string(),
    })
}

pub fn resolve_dir<S, F>(env_key: &str, strategy: &S, strategy_fn: F) -> PathBuf
where
    S: AppStrategy,
    F: FnOnce(&S) -> Option<PathBuf>,
{
    env::var_os(env_key)
        .map(PathBuf::from)
        .or_else(|| strategy_fn(strategy))
        .unwrap_or_else(temp_app_dir)
}

/// Like [`resolve_dir`], but also survives a missing home directory by
/// falling back to the temp dir. Used by serde `default` functions, which
/// cannot fail.
pub fn resolve_dir_or_temp<F>(env_key: &str, strategy_fn: F) -> PathBuf
where
    F: FnOnce(&dyn AppStrategyDirs) -> Option<PathBuf>,
{
    if let Some(dir) = env::var_os(env_key) {
        return PathBuf::from(dir);
    }
    match create_strategy() {
        Ok(strategy) => strategy_fn(&strategy).unwrap_or_else(temp_app_dir),
        Err(_) => temp_app_dir(),
    }
}

/// Object-safe view over the directories an [`AppStrategy`] knows about
pub trait AppStrategyDirs {
    fn config_dir(&self) -> PathBuf;
    fn cache_dir(&self) -> PathBuf;
    fn runtime_dir(&self) -> Option<PathBuf>;
}

impl<S: AppStrategy> AppStrategyDirs for S {
    fn config_dir(&self) -> PathBuf {
        AppStrategy::config_dir(self)
    }

    fn cache_dir(&self) -> PathBuf {
        AppStrategy::cache_dir(self)
    }

    fn runtime_dir(&self) -> Option<PathBuf> {
        AppStrategy::runtime_dir(self)
    }
}

fn temp_app_dir() -> PathBuf {
    env::temp_dir().join(constants::APP_NAME)
}
