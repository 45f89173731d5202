use crate::error::Result;
use config::{AppStrategy, create_strategy, resolve_dir, resolve_dir_or_temp};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default = "default_config", deny_unknown_fields)]
pub struct Config {
    pub runtime_dir: PathBuf,
    /// 电影目录 JSON 文件，未设置时使用内置的演示目录
    pub catalog_path: Option<PathBuf>,
    pub page_size: u32,
    /// Artificial delay before each answer, in milliseconds
    pub latency_ms: u64,
}

fn default_config() -> Config {
    Config {
        runtime_dir: resolve_dir_or_temp("RUNTIME_DIRECTORY", |s| s.runtime_dir()),
        catalog_path: None,
        page_size: 10,
        latency_ms: 0,
    }
}

impl Config {
    fn load_str(user_config_str: &str) -> Result<Config> {
        let user_config: Config = toml::from_str(user_config_str)?;
        Ok(user_config)
    }

    pub fn load() -> Result<Config> {
        let strategy = create_strategy()?;
        let config_dir = resolve_dir("CONFIG_DIRECTORY", &strategy, |s| Some(s.config_dir()));
        let config_path = config_dir.join(config::constants::SERVER_CONFIG_FILE_NAME);

        match std::fs::read_to_string(&config_path) {
            Ok(user_config_str) => Self::load_str(&user_config_str),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // 配置文件不存在，创建示例配置文件
                Self::create_example_config(&config_path)?;
                Self::load_str("")
            }
            Err(e) => Err(e.into()),
        }
    }

    fn create_example_config(config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let example_config = r#"# Catalog server configuration
#
# Created on first run. Restart the server after editing.

# Movie catalog as a JSON array; the bundled demo catalog is used when unset
# catalog-path = "/path/to/catalog.json"

# Movies per page
page-size = 10

# Delay every answer, handy for trying out cancellation
latency-ms = 0

# runtime-dir = "/custom/runtime/path"
"#;

        std::fs::write(config_path, example_config)?;
        info!("created example config at {:?}", config_path);

        Ok(())
    }
}
