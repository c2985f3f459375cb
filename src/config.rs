use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub seed: SeedConfig,
    pub forum: ForumConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum request body size in bytes (default: 1MB)
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// JSON file holding the persisted snapshot. In-memory when unset
    pub state_path: Option<String>,
    /// Key the snapshot is stored under
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    /// Seed file with categories and threads. Built-in data when unset
    pub seed_path: Option<String>,
    /// Delay before seeded threads are loaded, in milliseconds
    #[serde(default = "default_load_delay_ms")]
    pub load_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForumConfig {
    /// Author assigned to posts that don't name one
    #[serde(default = "default_author_id")]
    pub default_author_id: String,
    /// Reply levels rendered below a thread; replies deeper than this are refused
    #[serde(default = "default_max_reply_depth")]
    pub max_reply_depth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_max_body_size() -> usize { 1024 * 1024 } // 1MB
fn default_namespace() -> String { crate::store::DEFAULT_NAMESPACE.to_string() }
fn default_load_delay_ms() -> u64 { 1000 }
fn default_author_id() -> String { "user-1".to_string() }
fn default_max_reply_depth() -> usize { crate::store::DEFAULT_MAX_REPLY_DEPTH }
fn default_cors_origins() -> String { "*".to_string() }

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                max_body_size: default_max_body_size(),
            },
            storage: StorageConfig {
                state_path: None,
                namespace: default_namespace(),
            },
            seed: SeedConfig {
                seed_path: None,
                load_delay_ms: default_load_delay_ms(),
            },
            forum: ForumConfig {
                default_author_id: default_author_id(),
                max_reply_depth: default_max_reply_depth(),
            },
            security: SecurityConfig {
                cors_origins: default_cors_origins(),
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            server: ServerConfig {
                host: std::env::var("HOST").unwrap_or_else(|_| default_host()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_port),
                max_body_size: std::env::var("MAX_BODY_SIZE")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_max_body_size),
            },
            storage: StorageConfig {
                state_path: std::env::var("STATE_PATH").ok().filter(|p| !p.is_empty()),
                namespace: std::env::var("STORAGE_NAMESPACE")
                    .unwrap_or_else(|_| default_namespace()),
            },
            seed: SeedConfig {
                seed_path: std::env::var("SEED_PATH").ok().filter(|p| !p.is_empty()),
                load_delay_ms: std::env::var("SEED_LOAD_DELAY_MS")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_load_delay_ms),
            },
            forum: ForumConfig {
                default_author_id: std::env::var("DEFAULT_AUTHOR_ID")
                    .unwrap_or_else(|_| default_author_id()),
                max_reply_depth: std::env::var("MAX_REPLY_DEPTH")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or_else(default_max_reply_depth),
            },
            security: SecurityConfig {
                cors_origins: std::env::var("CORS_ORIGINS")
                    .unwrap_or_else(|_| default_cors_origins()),
            },
        }
    }
}
