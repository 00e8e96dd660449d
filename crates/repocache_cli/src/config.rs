//! Configuration file support for repocache.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `REPOCACHE_`, e.g., `REPOCACHE_DATABASE_URL`)
//! 3. Config file (./repocache.toml, then ~/.config/repocache/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/repocache/repocache.db`
//! on Linux (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "postgres://localhost/repocache"
//!
//! [refetch]
//! stale_after_days = 6
//! max_pages = 10
//! page_interval_ms = 1000
//! timeout_secs = 300
//! skip_cleanup_on_partial = false
//! schedule_interval_secs = 60
//!
//! [github]
//! token = "ghp_..."  # or use REPOCACHE_GITHUB_TOKEN env var
//!
//! [gitlab]
//! api_url = "https://gitlab.example.com/api/v4"
//! token = "glpat-..."
//!
//! [gitea]
//! api_url = "https://codeberg.org/api/v1"
//! token = "..."
//! ```

use std::path::PathBuf;
use std::time::Duration;

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use directories::ProjectDirs;
use repocache::entity::platform::Platform;
use repocache::refetch::{
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_INTERVAL, DEFAULT_STALE_AFTER_DAYS, RefetchOptions,
};
use repocache::source::PlatformEndpoint;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub refetch: RefetchConfig,
    pub github: PlatformConfig,
    pub gitlab: PlatformConfig,
    pub gitea: PlatformConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Supports sqlite:// and postgres:// schemes.
    pub url: Option<String>,
}

/// Refetch driver settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RefetchConfig {
    /// Pairs whose oldest row is older than this are refetched.
    pub stale_after_days: i64,
    /// Page cap per run.
    pub max_pages: usize,
    /// Pause between page requests.
    pub page_interval_ms: u64,
    /// Wall-clock limit for one run.
    pub timeout_secs: u64,
    /// Keep unseen rows when a listing was cut short by the page cap.
    pub skip_cleanup_on_partial: bool,
    /// Delay between runs in `schedule` mode.
    pub schedule_interval_secs: u64,
}

impl Default for RefetchConfig {
    fn default() -> Self {
        Self {
            stale_after_days: DEFAULT_STALE_AFTER_DAYS,
            max_pages: DEFAULT_MAX_PAGES,
            page_interval_ms: DEFAULT_PAGE_INTERVAL.as_millis() as u64,
            timeout_secs: 300,
            skip_cleanup_on_partial: false,
            schedule_interval_secs: 60,
        }
    }
}

impl RefetchConfig {
    pub fn options(&self) -> RefetchOptions {
        RefetchOptions {
            stale_after: chrono::Duration::days(self.stale_after_days),
            max_pages: self.max_pages,
            page_interval: Duration::from_millis(self.page_interval_ms),
            skip_cleanup_on_partial: self.skip_cleanup_on_partial,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn schedule_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_interval_secs)
    }
}

/// API settings for one platform.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// API token.
    /// Can also be set via REPOCACHE_<PLATFORM>_TOKEN environment variable.
    pub token: Option<String>,
    /// API base URL; the platform's public API when unset.
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/repocache/config.toml)
    /// 3. Local config file (./repocache.toml)
    /// 4. Environment variables with REPOCACHE_ prefix
    pub fn load() -> Self {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("repocache.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./repocache.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // REPOCACHE_GITHUB_TOKEN -> github.token
        builder = builder.add_source(
            Environment::with_prefix("REPOCACHE")
                .separator("_")
                .try_parsing(true),
        );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<Config>() {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to deserialize config: {}", e);
                    Config::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to build config: {}", e);
                Config::default()
            }
        }
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter creates the SQLite file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("repocache.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    pub fn platform(&self, platform: Platform) -> &PlatformConfig {
        match platform {
            Platform::GitHub => &self.github,
            Platform::GitLab => &self.gitlab,
            Platform::Gitea => &self.gitea,
        }
    }

    /// API endpoint for a platform, with configured overrides applied.
    pub fn endpoint(&self, platform: Platform) -> PlatformEndpoint {
        let configured = self.platform(platform);
        let mut endpoint = PlatformEndpoint::default_for(platform);
        if let Some(api_url) = &configured.api_url {
            endpoint.api_base = api_url.trim_end_matches('/').to_string();
        }
        endpoint.token = configured.token.clone().filter(|t| !t.is_empty());
        endpoint
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repocache").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/repocache` or `~/.local/state/repocache`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "repocache").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
