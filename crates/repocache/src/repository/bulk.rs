use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entity::platform::Platform;
use crate::entity::repository::{Column, Entity as Repository};

use super::errors::Result;

// ─── Bulk Operations ─────────────────────────────────────────────────────────

/// Delete rows that hold `slug` on `platform` under a different remote
/// identity. Such a row belongs to a repository that was renamed away or
/// deleted and replaced remotely.
///
/// Returns the number of rows deleted.
pub async fn delete_slug_collisions<C: ConnectionTrait>(
    db: &C,
    platform: Platform,
    slug: &str,
    remote_id: &str,
) -> Result<u64> {
    let result = Repository::delete_many()
        .filter(Column::Platform.eq(platform))
        .filter(Column::Slug.eq(slug))
        .filter(Column::RemoteId.ne(remote_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Delete a participant's rows on `platform` that were last refreshed
/// strictly before `before`.
///
/// Returns the number of rows deleted.
pub async fn delete_stale<C: ConnectionTrait>(
    db: &C,
    participant: i64,
    platform: Platform,
    before: DateTime<Utc>,
) -> Result<u64> {
    let result = Repository::delete_many()
        .filter(Column::Participant.eq(participant))
        .filter(Column::Platform.eq(platform))
        .filter(Column::InfoFetchedAt.lt(before.fixed_offset()))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase, MockExecResult, RuntimeErr};

    use super::*;
    use crate::repository::RepositoryError;

    #[tokio::test]
    async fn delete_slug_collisions_excludes_same_identity() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        let deleted = delete_slug_collisions(&db, Platform::GitHub, "alice/tool", "2")
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let log = db.into_transaction_log();
        let sql = log[0].statements()[0].sql.clone();
        assert!(sql.contains(r#""remote_id" <> "#), "unexpected SQL: {sql}");
    }

    #[tokio::test]
    async fn delete_stale_counts_rows() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 4,
                last_insert_id: 0,
            }])
            .into_connection();

        let before = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let deleted = delete_stale(&db, 42, Platform::GitLab, before).await.unwrap();
        assert_eq!(deleted, 4);
    }

    #[tokio::test]
    async fn delete_stale_classifies_busy_database_as_transient() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Exec(RuntimeErr::Internal(
                "database is locked".to_string(),
            ))])
            .into_connection();

        let err = delete_stale(&db, 42, Platform::GitHub, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_transient(), "got {err:?}");
        assert!(matches!(err, RepositoryError::Transient { .. }));
    }
}
