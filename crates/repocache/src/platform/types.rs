use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::elsewhere;
use crate::entity::platform::Platform;

use super::errors::Result;

/// One repository as reported by a platform listing.
///
/// `owner_id` and `last_update` may be missing from a listing; such records
/// are never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRepo {
    pub platform: Platform,
    /// `owner/name` path on the platform.
    pub slug: String,
    /// Platform's stable identifier.
    pub remote_id: String,
    pub owner_id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub is_fork: Option<bool>,
    pub stars_count: Option<i32>,
    pub last_update: Option<DateTime<Utc>>,
    /// Platform-specific leftovers, stored as JSON text.
    pub extra_info: serde_json::Value,
}

impl RemoteRepo {
    /// Whether the record carries both an owner and a last-update time.
    /// An empty owner id counts as missing.
    pub fn is_complete(&self) -> bool {
        self.owner_id.as_deref().is_some_and(|id| !id.is_empty()) && self.last_update.is_some()
    }
}

/// One page of a listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoPage {
    pub records: Vec<RemoteRepo>,
    /// Opaque cursor for the next page; `None` on the last page.
    pub next: Option<String>,
}

/// Credentials and context for one listing run against one account.
#[derive(Clone)]
pub struct AuthSession {
    pub account_id: i32,
    pub platform: Platform,
    pub access_token: Option<String>,
    pub opened_at: DateTime<Utc>,
}

impl AuthSession {
    /// An unauthenticated session.
    pub fn anonymous(account: &elsewhere::Model) -> Self {
        Self {
            account_id: account.id,
            platform: account.platform,
            access_token: None,
            opened_at: Utc::now(),
        }
    }

    /// A session carrying an access token.
    pub fn with_token(account: &elsewhere::Model, token: impl Into<String>) -> Self {
        Self {
            access_token: Some(token.into()),
            ..Self::anonymous(account)
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("account_id", &self.account_id)
            .field("platform", &self.platform)
            .field(
                "access_token",
                &self.access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("opened_at", &self.opened_at)
            .finish()
    }
}

/// Source of paginated repository listings for linked accounts.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Open an authenticated (or anonymous) session for `account`.
    async fn open_session(&self, account: &elsewhere::Model) -> Result<AuthSession>;

    /// Fetch one page. `cursor` is `None` for the first page and otherwise the
    /// `next` value of the previous page.
    async fn fetch_page(
        &self,
        account: &elsewhere::Model,
        session: &AuthSession,
        cursor: Option<&str>,
    ) -> Result<RepoPage>;
}

#[async_trait]
impl<S: PageSource + ?Sized> PageSource for Arc<S> {
    async fn open_session(&self, account: &elsewhere::Model) -> Result<AuthSession> {
        (**self).open_session(account).await
    }

    async fn fetch_page(
        &self,
        account: &elsewhere::Model,
        session: &AuthSession,
        cursor: Option<&str>,
    ) -> Result<RepoPage> {
        (**self).fetch_page(account, session, cursor).await
    }
}
