//! Per-pair exclusivity for refetch runs.
//!
//! PostgreSQL takes a transaction-scoped advisory lock. Other backends insert
//! a `refetch_locks` row inside the run's transaction; a conflicting insert
//! means another run holds the pair.

use chrono::{DateTime, Utc};
use sea_orm::{ConnectionTrait, DatabaseBackend, DbErr, EntityTrait, Set, SqlErr, Statement};

use crate::entity::platform::Platform;
use crate::entity::refetch_lock::{ActiveModel, Entity as RefetchLock};
use crate::repository::Result;

/// Key identifying a `(participant, platform)` pair.
pub fn lock_key(participant: i64, platform: Platform) -> i64 {
    let code = match platform {
        Platform::GitHub => 1,
        Platform::GitLab => 2,
        Platform::Gitea => 3,
    };
    participant.wrapping_shl(3) | code
}

/// Try to take the pair's lock for the lifetime of the transaction.
///
/// Returns `false` when another run holds it.
pub async fn try_acquire<C: ConnectionTrait>(
    txn: &C,
    participant: i64,
    platform: Platform,
    now: DateTime<Utc>,
) -> Result<bool> {
    let key = lock_key(participant, platform);

    if txn.get_database_backend() == DatabaseBackend::Postgres {
        let row = txn
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Postgres,
                "SELECT pg_try_advisory_xact_lock($1) AS locked",
                [key.into()],
            ))
            .await?;
        return match row {
            Some(row) => Ok(row.try_get::<bool>("", "locked")?),
            None => Ok(false),
        };
    }

    let row = ActiveModel {
        lock_key: Set(key),
        participant: Set(participant),
        platform: Set(platform),
        acquired_at: Set(now.fixed_offset()),
    };
    match RefetchLock::insert(row).exec_without_returning(txn).await {
        Ok(_) => Ok(true),
        Err(err) if is_contention(&err) => {
            tracing::debug!(
                participant,
                platform = %platform,
                error = %err,
                "Refetch lock held elsewhere"
            );
            Ok(false)
        }
        Err(err) => Err(err.into()),
    }
}

/// A duplicate lock row, or SQLite's "database is locked" / "busy" from a
/// concurrent writer. Connection failures are not contention.
fn is_contention(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    match err {
        DbErr::Exec(_) | DbErr::Query(_) => {
            let message = err.to_string().to_lowercase();
            message.contains("unique constraint")
                || message.contains("duplicate key")
                || message.contains("locked")
                || message.contains("busy")
        }
        _ => false,
    }
}

/// Release the pair's lock ahead of commit.
pub async fn release<C: ConnectionTrait>(
    txn: &C,
    participant: i64,
    platform: Platform,
) -> Result<()> {
    if txn.get_database_backend() == DatabaseBackend::Postgres {
        return Ok(());
    }
    RefetchLock::delete_by_id(lock_key(participant, platform))
        .exec(txn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::{DbErr, MockDatabase, MockExecResult, RuntimeErr, Value};

    use super::*;

    #[test]
    fn keys_are_distinct_per_platform() {
        let keys: Vec<i64> = [Platform::GitHub, Platform::GitLab, Platform::Gitea]
            .into_iter()
            .map(|p| lock_key(42, p))
            .collect();
        assert_eq!(keys, vec![337, 338, 339]);
        assert_ne!(lock_key(1, Platform::GitLab), lock_key(2, Platform::GitLab));
    }

    #[tokio::test]
    async fn sqlite_lock_conflict_means_busy() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Exec(RuntimeErr::Internal(
                "UNIQUE constraint failed: refetch_locks.lock_key".to_string(),
            ))])
            .into_connection();

        let acquired = try_acquire(&db, 42, Platform::GitHub, Utc::now()).await.unwrap();
        assert!(!acquired);
    }

    #[tokio::test]
    async fn sqlite_database_locked_means_busy() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Exec(RuntimeErr::Internal(
                "database is locked".to_string(),
            ))])
            .into_connection();

        let acquired = try_acquire(&db, 42, Platform::GitHub, Utc::now()).await.unwrap();
        assert!(!acquired);
    }

    #[tokio::test]
    async fn lost_connection_is_an_error_not_busy() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_errors([DbErr::Conn(RuntimeErr::Internal(
                "connection reset by peer".to_string(),
            ))])
            .into_connection();

        let err = try_acquire(&db, 42, Platform::GitHub, Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn sqlite_lock_insert_succeeds() {
        let db = MockDatabase::new(DatabaseBackend::Sqlite)
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 0,
            }])
            .into_connection();

        assert!(try_acquire(&db, 42, Platform::GitHub, Utc::now()).await.unwrap());
    }

    #[tokio::test]
    async fn postgres_uses_advisory_lock() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![BTreeMap::from([(
                "locked",
                Value::Bool(Some(false)),
            )])]])
            .into_connection();

        let acquired = try_acquire(&db, 42, Platform::GitLab, Utc::now()).await.unwrap();
        assert!(!acquired);

        let log = db.into_transaction_log();
        let sql = log[0].statements()[0].sql.clone();
        assert!(sql.contains("pg_try_advisory_xact_lock"), "unexpected SQL: {sql}");
    }
}
