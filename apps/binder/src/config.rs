use anyhow::{bail, Context, Result};

const DEFAULT_CARD_API_URL: &str = "https://api.pokemontcg.io/v2";

/// Where binder documents are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres { database_url: String },
    /// Process-local, lost on restart. For local development.
    Memory,
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub card_api_url: String,
    pub card_api_key: Option<String>,
    pub port: u16,
    pub rust_log: String,
    pub default_grid_size: String,
    pub default_min_pages: u32,
    pub default_max_pages: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let storage = match optional_env("BINDER_STORE").as_deref().unwrap_or("postgres") {
            "postgres" => StorageBackend::Postgres {
                database_url: require_env("DATABASE_URL")?,
            },
            "memory" => StorageBackend::Memory,
            other => bail!("BINDER_STORE must be 'postgres' or 'memory', got '{other}'"),
        };

        let config = Config {
            storage,
            card_api_url: optional_env("CARD_API_URL")
                .unwrap_or_else(|| DEFAULT_CARD_API_URL.to_string()),
            card_api_key: optional_env("CARD_API_KEY"),
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            default_grid_size: optional_env("DEFAULT_GRID_SIZE").unwrap_or_else(|| "3x3".to_string()),
            default_min_pages: parse_env("DEFAULT_MIN_PAGES", 1)?,
            default_max_pages: parse_env("DEFAULT_MAX_PAGES", 100)?,
        };

        crate::layout::grid::try_resolve(&config.default_grid_size)
            .context("DEFAULT_GRID_SIZE must name a known grid")?;
        if config.default_min_pages > config.default_max_pages {
            bail!("DEFAULT_MIN_PAGES must not exceed DEFAULT_MAX_PAGES");
        }

        Ok(config)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        None => Ok(default),
    }
}
