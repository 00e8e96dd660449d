//! Merge one batch of listing records into the repository table.
//!
//! Rows are identified by `(platform, remote_id)`. Slugs are unique per
//! platform as well, and the incoming record wins any slug dispute: a row
//! holding the same slug under another remote id is deleted before the
//! upsert. Records missing an owner or a last-update time are dropped.

use chrono::{DateTime, Utc};
use sea_orm::ConnectionTrait;

use crate::entity::repository::Model;
use crate::platform::RemoteRepo;
use crate::repository::{self, Result};

/// Upsert `repos` for `participant`, in input order, stamping each row with
/// `fetched_at`. Returns the stored rows for the records that were kept.
///
/// Any store error aborts the batch; callers run this inside a transaction.
pub async fn upsert_repos<C: ConnectionTrait>(
    db: &C,
    repos: Vec<RemoteRepo>,
    participant: i64,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Model>> {
    let mut saved = Vec::with_capacity(repos.len());

    for repo in repos {
        let platform = repo.platform;
        let slug = repo.slug.clone();
        let remote_id = repo.remote_id.clone();

        let Some(model) = repo.into_active_model(participant, fetched_at)? else {
            tracing::debug!(
                platform = %platform,
                slug = %slug,
                remote_id = %remote_id,
                "Dropping incomplete repository record"
            );
            continue;
        };

        let displaced =
            repository::delete_slug_collisions(db, platform, &slug, &remote_id).await?;
        if displaced > 0 {
            tracing::debug!(
                platform = %platform,
                slug = %slug,
                remote_id = %remote_id,
                displaced,
                "Removed row previously holding this slug"
            );
        }

        saved.push(repository::upsert_by_remote_id(db, model).await?);
    }

    Ok(saved)
}
