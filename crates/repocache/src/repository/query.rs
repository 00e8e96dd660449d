use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, prelude::DateTimeWithTimeZone,
};

use crate::entity::platform::Platform;
use crate::entity::repository::{Column, Entity as Repository, Model};

use super::errors::{RepositoryError, Result};

/// The `(participant, platform)` pair whose cached listing is oldest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefetchCandidate {
    pub participant: i64,
    pub platform: Platform,
    /// `info_fetched_at` of the pair's oldest row.
    pub oldest_fetched_at: DateTimeWithTimeZone,
}

// ─── Query Operations ────────────────────────────────────────────────────────

/// Pick the pair owning the row with the oldest `info_fetched_at` that is
/// older than `older_than`. Rows without a participant are never picked.
pub async fn find_refetch_candidate<C: ConnectionTrait>(
    db: &C,
    older_than: DateTime<Utc>,
) -> Result<Option<RefetchCandidate>> {
    let row: Option<(Option<i64>, Platform, DateTimeWithTimeZone)> = Repository::find()
        .select_only()
        .column(Column::Participant)
        .column(Column::Platform)
        .column(Column::InfoFetchedAt)
        .filter(Column::Participant.is_not_null())
        .filter(Column::InfoFetchedAt.lt(older_than.fixed_offset()))
        .order_by_asc(Column::InfoFetchedAt)
        .limit(1)
        .into_tuple()
        .one(db)
        .await?;

    Ok(row.and_then(|(participant, platform, oldest_fetched_at)| {
        participant.map(|participant| RefetchCandidate {
            participant,
            platform,
            oldest_fetched_at,
        })
    }))
}

/// Whether the pair still has at least one row older than `older_than`.
pub async fn is_pair_stale<C: ConnectionTrait>(
    db: &C,
    participant: i64,
    platform: Platform,
    older_than: DateTime<Utc>,
) -> Result<bool> {
    let stale = Repository::find()
        .filter(Column::Participant.eq(participant))
        .filter(Column::Platform.eq(platform))
        .filter(Column::InfoFetchedAt.lt(older_than.fixed_offset()))
        .count(db)
        .await?;
    Ok(stale > 0)
}

/// List a participant's repositories, optionally restricted to one platform.
pub async fn find_by_participant<C: ConnectionTrait>(
    db: &C,
    participant: i64,
    platform: Option<Platform>,
) -> Result<Vec<Model>> {
    let mut query = Repository::find().filter(Column::Participant.eq(participant));
    if let Some(platform) = platform {
        query = query.filter(Column::Platform.eq(platform));
    }
    query
        .order_by_asc(Column::Platform)
        .order_by_asc(Column::Slug)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Count a participant's repositories on one platform.
pub async fn count_by_participant<C: ConnectionTrait>(
    db: &C,
    participant: i64,
    platform: Platform,
) -> Result<u64> {
    Repository::find()
        .filter(Column::Participant.eq(participant))
        .filter(Column::Platform.eq(platform))
        .count(db)
        .await
        .map_err(RepositoryError::from)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DatabaseBackend, MockDatabase, Value};

    use super::*;

    #[tokio::test]
    async fn find_refetch_candidate_skips_unowned_rows_and_orders_oldest_first() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_query_results([Vec::<BTreeMap<&'static str, Value>>::new()])
            .into_connection();

        let candidate = find_refetch_candidate(&db, Utc::now()).await.unwrap();
        assert!(candidate.is_none());

        let log = db.into_transaction_log();
        let sql = log[0].statements()[0].sql.clone();
        assert!(sql.contains(r#""participant" IS NOT NULL"#), "unexpected SQL: {sql}");
        assert!(
            sql.contains(r#"ORDER BY "repositories"."info_fetched_at" ASC"#),
            "unexpected SQL: {sql}"
        );
        assert!(sql.contains("LIMIT"), "unexpected SQL: {sql}");
    }
}
