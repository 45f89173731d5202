pub const TOP_LEVEL_DOMAIN: &str = "org";
pub const AUTHOR: &str = "moviesearch";
pub const APP_NAME: &str = "moviesearch";

pub const UNIX_SOCKET_FILE_NAME: &str = "catalog.sock";

pub const SERVER_CONFIG_FILE_NAME: &str = "server.toml";
pub const CLIENT_CONFIG_FILE_NAME: &str = "client.toml";

/// Sled database holding the response cache and the recent queries
pub const CLIENT_STORE_DIR_NAME: &str = "store";
