use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::platform::Platform;
use crate::platform::PlatformError;
use crate::repository::RepositoryError;

/// Rows untouched for this many days make their pair a refetch candidate.
pub const DEFAULT_STALE_AFTER_DAYS: i64 = 6;

/// Pages fetched per run before giving up on a complete listing.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// Pause between consecutive page requests.
pub const DEFAULT_PAGE_INTERVAL: Duration = Duration::from_secs(1);

/// Tunables for a refetch run.
#[derive(Debug, Clone)]
pub struct RefetchOptions {
    pub stale_after: chrono::Duration,
    /// Values below 1 are treated as 1.
    pub max_pages: usize,
    pub page_interval: Duration,
    /// Keep unseen rows when the page cap cut the listing short.
    pub skip_cleanup_on_partial: bool,
}

impl Default for RefetchOptions {
    fn default() -> Self {
        Self {
            stale_after: chrono::Duration::days(DEFAULT_STALE_AFTER_DAYS),
            max_pages: DEFAULT_MAX_PAGES,
            page_interval: DEFAULT_PAGE_INTERVAL,
            skip_cleanup_on_partial: false,
        }
    }
}

/// What a completed run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchReport {
    pub participant: i64,
    pub platform: Platform,
    /// Linked account the listing was read from.
    pub account_id: i32,
    pub started_at: DateTime<Utc>,
    pub pages_fetched: usize,
    /// Records returned by the platform.
    pub records_received: usize,
    /// Records stored (complete ones).
    pub records_kept: usize,
    /// The page cap was reached while more pages remained.
    pub partial_list: bool,
    /// Rows removed because the listing no longer contained them.
    pub deleted_count: u64,
}

/// Result of one `refetch_once` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefetchOutcome {
    /// Nothing is stale.
    Idle,
    /// Another run holds the pair.
    Busy { participant: i64, platform: Platform },
    Completed(RefetchReport),
}

/// Payload of the `fetch_repos:{account_id}` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchReposPayload {
    pub partial_list: bool,
    pub deleted_count: u64,
}

/// Errors that abort a refetch run. The run's transaction is rolled back.
#[derive(Debug, Error)]
pub enum RefetchError {
    #[error("Store error: {0}")]
    Store(#[from] RepositoryError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("Participant {participant} has no linked {platform} account")]
    AccountNotFound { participant: i64, platform: Platform },

    #[error("Refetch timed out after {after:?}")]
    TimedOut { after: Duration },
}

impl RefetchError {
    /// Whether the next scheduled run may succeed without intervention.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(e) => e.is_transient(),
            Self::Platform(e) => e.is_transient(),
            Self::TimedOut { .. } => true,
            Self::AccountNotFound { .. } => false,
        }
    }
}
