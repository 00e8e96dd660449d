//! The refetch driver.
//!
//! One invocation picks the `(participant, platform)` pair with the stalest
//! cached row, re-reads that account's listing page by page, reconciles each
//! page into the store, removes rows the listing no longer contains and
//! records an outcome event. Everything happens in one transaction: any
//! failure leaves the store exactly as it was.
//!
//! ```ignore
//! let refetcher = Refetcher::new(db, HttpPageSource::new(transport));
//! match refetcher.refetch_once().await? {
//!     RefetchOutcome::Completed(report) => println!("{} pages", report.pages_fetched),
//!     RefetchOutcome::Idle | RefetchOutcome::Busy { .. } => {}
//! }
//! ```

mod clock;
mod lock;
mod types;

use std::time::Duration;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::accounts;
use crate::entity::platform::Platform;
use crate::events;
use crate::platform::PageSource;
use crate::reconcile::upsert_repos;
use crate::repository::{self, RepositoryError};

pub use clock::{Clock, ManualClock, SystemClock};
pub use lock::lock_key;
pub use types::{
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_INTERVAL, DEFAULT_STALE_AFTER_DAYS, FetchReposPayload,
    RefetchError, RefetchOptions, RefetchOutcome, RefetchReport,
};

type Result<T> = std::result::Result<T, RefetchError>;

/// Drives refetch runs against one store and one page source.
pub struct Refetcher<S, C = SystemClock> {
    db: DatabaseConnection,
    source: S,
    clock: C,
    options: RefetchOptions,
}

impl<S: PageSource> Refetcher<S, SystemClock> {
    pub fn new(db: DatabaseConnection, source: S) -> Self {
        Self {
            db,
            source,
            clock: SystemClock,
            options: RefetchOptions::default(),
        }
    }
}

impl<S: PageSource, C: Clock> Refetcher<S, C> {
    /// Replace the clock used for timestamps and page pacing.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> Refetcher<S, C2> {
        Refetcher {
            db: self.db,
            source: self.source,
            clock,
            options: self.options,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: RefetchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &RefetchOptions {
        &self.options
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// The store this driver writes to.
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// Refetch the stalest pair, if any.
    pub async fn refetch_once(&self) -> Result<RefetchOutcome> {
        let txn = self.db.begin().await.map_err(RepositoryError::from)?;
        let stale_before = self.clock.now() - self.options.stale_after;

        let candidate = match repository::find_refetch_candidate(&txn, stale_before).await {
            Ok(candidate) => candidate,
            Err(e) => return finish(txn, Err(e.into())).await,
        };
        let Some(candidate) = candidate else {
            tracing::debug!(stale_before = %stale_before, "No stale repositories");
            return finish(txn, Ok(RefetchOutcome::Idle)).await;
        };

        tracing::debug!(
            participant = candidate.participant,
            platform = %candidate.platform,
            oldest_fetched_at = %candidate.oldest_fetched_at,
            "Selected refetch candidate"
        );

        let outcome = self
            .run_pair(&txn, candidate.participant, candidate.platform, Some(stale_before))
            .await;
        finish(txn, outcome).await
    }

    /// Refetch one pair now, whether or not it is stale.
    pub async fn refetch_pair(
        &self,
        participant: i64,
        platform: Platform,
    ) -> Result<RefetchOutcome> {
        let txn = self.db.begin().await.map_err(RepositoryError::from)?;
        let outcome = self.run_pair(&txn, participant, platform, None).await;
        finish(txn, outcome).await
    }

    /// [`refetch_once`](Self::refetch_once) with a deadline. On expiry the
    /// in-flight transaction is dropped, which rolls it back.
    pub async fn refetch_with_timeout(&self, timeout: Duration) -> Result<RefetchOutcome> {
        match tokio::time::timeout(timeout, self.refetch_once()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Refetch timed out");
                Err(RefetchError::TimedOut { after: timeout })
            }
        }
    }

    async fn run_pair(
        &self,
        txn: &DatabaseTransaction,
        participant: i64,
        platform: Platform,
        recheck_stale_before: Option<DateTime<Utc>>,
    ) -> Result<RefetchOutcome> {
        if !lock::try_acquire(txn, participant, platform, self.clock.now()).await? {
            tracing::info!(participant, platform = %platform, "Pair is being refetched elsewhere");
            return Ok(RefetchOutcome::Busy {
                participant,
                platform,
            });
        }

        // Another run may have refreshed the pair between selection and locking.
        if let Some(stale_before) = recheck_stale_before
            && !repository::is_pair_stale(txn, participant, platform, stale_before).await?
        {
            lock::release(txn, participant, platform).await?;
            return Ok(RefetchOutcome::Idle);
        }

        let account = accounts::find_for_participant(txn, participant, platform)
            .await?
            .ok_or(RefetchError::AccountNotFound {
                participant,
                platform,
            })?;
        let session = self.source.open_session(&account).await?;
        let started_at = self.clock.now();

        let max_pages = self.options.max_pages.max(1);
        let mut cursor: Option<String> = None;
        let mut pages_fetched = 0;
        let mut records_received = 0;
        let mut records_kept = 0;

        loop {
            let page = self
                .source
                .fetch_page(&account, &session, cursor.as_deref())
                .await?;
            pages_fetched += 1;
            records_received += page.records.len();

            let saved = upsert_repos(txn, page.records, participant, self.clock.now()).await?;
            records_kept += saved.len();
            cursor = page.next;

            tracing::debug!(
                participant,
                platform = %platform,
                page = pages_fetched,
                saved = saved.len(),
                has_next = cursor.is_some(),
                "Reconciled listing page"
            );

            if cursor.is_none() || pages_fetched >= max_pages {
                break;
            }
            self.clock.sleep(self.options.page_interval).await;
        }

        let partial_list = cursor.is_some();
        let deleted_count = if partial_list && self.options.skip_cleanup_on_partial {
            tracing::warn!(
                participant,
                platform = %platform,
                pages_fetched,
                "Listing cut short by page cap; keeping unseen repositories"
            );
            0
        } else {
            if partial_list {
                tracing::warn!(
                    participant,
                    platform = %platform,
                    pages_fetched,
                    "Listing cut short by page cap; removing repositories not seen in fetched pages"
                );
            }
            repository::delete_stale(txn, participant, platform, started_at).await?
        };

        events::add_event(
            txn,
            participant,
            &events::fetch_repos_event_type(account.id),
            &FetchReposPayload {
                partial_list,
                deleted_count,
            },
            self.clock.now(),
        )
        .await?;

        lock::release(txn, participant, platform).await?;

        let report = RefetchReport {
            participant,
            platform,
            account_id: account.id,
            started_at,
            pages_fetched,
            records_received,
            records_kept,
            partial_list,
            deleted_count,
        };
        tracing::info!(
            participant,
            platform = %platform,
            pages = report.pages_fetched,
            kept = report.records_kept,
            deleted = report.deleted_count,
            partial_list,
            "Refetch completed"
        );
        Ok(RefetchOutcome::Completed(report))
    }
}

/// Commit completed runs, roll back everything else.
async fn finish(
    txn: DatabaseTransaction,
    outcome: Result<RefetchOutcome>,
) -> Result<RefetchOutcome> {
    match outcome {
        Ok(outcome @ RefetchOutcome::Completed(_)) => {
            txn.commit().await.map_err(RepositoryError::from)?;
            Ok(outcome)
        }
        Ok(outcome) => {
            txn.rollback().await.map_err(RepositoryError::from)?;
            Ok(outcome)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Refetch failed, rolling back");
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback failed");
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use async_trait::async_trait;
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    use super::*;
    use crate::entity::elsewhere;
    use crate::platform::{AuthSession, PlatformError, RepoPage};

    struct UnusedSource;

    #[async_trait]
    impl PageSource for UnusedSource {
        async fn open_session(
            &self,
            _account: &elsewhere::Model,
        ) -> crate::platform::Result<AuthSession> {
            Err(PlatformError::internal("not expected"))
        }

        async fn fetch_page(
            &self,
            _account: &elsewhere::Model,
            _session: &AuthSession,
            _cursor: Option<&str>,
        ) -> crate::platform::Result<RepoPage> {
            Err(PlatformError::internal("not expected"))
        }
    }

    #[test]
    fn default_options() {
        let options = RefetchOptions::default();
        assert_eq!(options.stale_after, chrono::Duration::days(6));
        assert_eq!(options.max_pages, 10);
        assert_eq!(options.page_interval, Duration::from_secs(1));
        assert!(!options.skip_cleanup_on_partial);
    }

    #[test]
    fn transient_classification() {
        assert!(
            RefetchError::TimedOut {
                after: Duration::from_secs(1)
            }
            .is_transient()
        );
        assert!(
            !RefetchError::AccountNotFound {
                participant: 1,
                platform: Platform::GitHub
            }
            .is_transient()
        );
        assert!(RefetchError::from(PlatformError::network("reset")).is_transient());
        assert!(!RefetchError::from(PlatformError::AuthRequired).is_transient());
    }

    #[test]
    fn payload_serializes_to_event_shape() {
        let payload = FetchReposPayload {
            partial_list: true,
            deleted_count: 3,
        };
        assert_eq!(
            serde_json::to_value(payload).unwrap(),
            serde_json::json!({"partial_list": true, "deleted_count": 3})
        );
    }

    #[tokio::test]
    async fn nothing_stale_is_idle() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
            .into_connection();
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap());
        let refetcher = Refetcher::new(db, UnusedSource).with_clock(clock);

        let outcome = refetcher.refetch_once().await.unwrap();
        assert_eq!(outcome, RefetchOutcome::Idle);
    }
}
