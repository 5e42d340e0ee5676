//! Service configuration.
//!
//! [`ServiceConfig`] is loaded from an optional TOML file (path in
//! `AISEARCH_CONFIG`) and then overridden by the deployment environment
//! variables (`SEARXNG_API_BASE`, `API_PORT`, `ENABLED_ENGINES`, ...).

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use aisearch_pipeline::config::parse_engine_list;
use aisearch_pipeline::{Crawl4AiFetcher, Fetcher, HttpFetcher, PipelineConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Environment variable naming the TOML config file.
pub const CONFIG_PATH_ENV: &str = "AISEARCH_CONFIG";

const DEFAULT_SEARXNG_URL: &str = "http://localhost:8080";
const DEFAULT_SEARXNG_PATH: &str = "search";

/// Top-level service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP listener settings.
    pub server: ServerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Search-then-fetch pipeline settings.
    pub pipeline: PipelineConfig,
    /// Page-fetching collaborator selection.
    pub fetcher: FetcherConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address.
    pub host: String,
    /// Bind port. `0` picks a free port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// The `host:port` string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
        }
    }
}

/// Which page-fetching collaborator to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetcherBackend {
    /// Plain HTTP download with in-process extraction.
    #[default]
    Http,
    /// Headless-browser rendering through a Crawl4AI server.
    Crawl4ai,
}

/// Page-fetching collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Selected collaborator.
    pub backend: FetcherBackend,
    /// Crawl4AI server base URL.
    pub crawl4ai_url: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            backend: FetcherBackend::Http,
            crawl4ai_url: "http://localhost:11235".to_owned(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| ServiceError::Config(e.to_string()))
    }

    /// Load configuration the way the binary does: optional file from
    /// `AISEARCH_CONFIG`, then process environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is unreadable or an override is malformed.
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_PATH_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None => Self::default(),
        };
        config.apply_env_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Apply deployment environment overrides using `lookup` to read variables.
    ///
    /// `SEARXNG_API_BASE` wins over `SEARXNG_URL`/`SEARXNG_PATH`. Empty
    /// values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Config`] if a numeric override does not parse.
    pub fn apply_env_overrides<L>(&mut self, lookup: L) -> Result<()>
    where
        L: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(base) = get("SEARXNG_API_BASE") {
            self.pipeline.searxng_api_base = base.trim().trim_end_matches('/').to_owned();
        } else {
            let url = get("SEARXNG_URL");
            let path = get("SEARXNG_PATH");
            if url.is_some() || path.is_some() {
                let url = url.unwrap_or_else(|| DEFAULT_SEARXNG_URL.to_owned());
                let path = path.unwrap_or_else(|| DEFAULT_SEARXNG_PATH.to_owned());
                self.pipeline.searxng_api_base = format!(
                    "{}/{}",
                    url.trim().trim_end_matches('/'),
                    path.trim().trim_matches('/')
                );
            }
        }

        if let Some(host) = get("API_HOST") {
            self.server.host = host.trim().to_owned();
        }
        if let Some(port) = get("API_PORT") {
            self.server.port = parse_var("API_PORT", &port)?;
        }
        if let Some(limit) = get("DEFAULT_SEARCH_LIMIT") {
            self.pipeline.default_max_results = parse_var("DEFAULT_SEARCH_LIMIT", &limit)?;
        }
        if let Some(threshold) = get("CONTENT_FILTER_THRESHOLD") {
            self.pipeline.fetch.content_filter_threshold =
                parse_var("CONTENT_FILTER_THRESHOLD", &threshold)?;
        }
        if let Some(words) = get("WORD_COUNT_THRESHOLD") {
            self.pipeline.fetch.word_count_threshold = parse_var("WORD_COUNT_THRESHOLD", &words)?;
        }
        if let Some(engines) = get("DISABLED_ENGINES") {
            self.pipeline.disabled_engines = parse_engine_list(&engines);
        }
        if let Some(engines) = get("ENABLED_ENGINES") {
            self.pipeline.enabled_engines = parse_engine_list(&engines);
        }
        if let Some(url) = get("CRAWL4AI_URL") {
            self.fetcher.backend = FetcherBackend::Crawl4ai;
            self.fetcher.crawl4ai_url = url.trim().to_owned();
        }
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level.trim().to_lowercase();
        }
        Ok(())
    }

    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<()> {
        if self.server.host.trim().is_empty() {
            return Err(ServiceError::Config("server.host must not be empty".into()));
        }
        if self.fetcher.backend == FetcherBackend::Crawl4ai
            && self.fetcher.crawl4ai_url.trim().is_empty()
        {
            return Err(ServiceError::Config(
                "fetcher.crawl4ai_url must not be empty".into(),
            ));
        }
        self.pipeline.validate()?;
        Ok(())
    }

    /// Build the configured page-fetching collaborator (not yet initialised).
    ///
    /// # Errors
    ///
    /// Returns an error if the collaborator's HTTP client cannot be built.
    pub fn build_fetcher(&self) -> Result<Fetcher> {
        let fetch = self.pipeline.fetch.clone();
        Ok(match self.fetcher.backend {
            FetcherBackend::Http => Fetcher::Http(HttpFetcher::new(fetch)),
            FetcherBackend::Crawl4ai => {
                Fetcher::Crawl4Ai(Crawl4AiFetcher::new(&self.fetcher.crawl4ai_url, fetch)?)
            }
        })
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ServiceError::Config(format!("invalid {name} value {raw:?}: {e}")))
}
