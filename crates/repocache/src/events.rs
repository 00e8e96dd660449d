//! Participant event log.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::Serialize;

use crate::entity::event::{ActiveModel, Column, Entity as Event, Model};
use crate::repository::{RepositoryError, Result};

/// Event type recorded after a refetch of the given linked account.
pub fn fetch_repos_event_type(account_id: i32) -> String {
    format!("fetch_repos:{}", account_id)
}

/// Append an event for `participant`.
pub async fn add_event<C: ConnectionTrait, P: Serialize>(
    db: &C,
    participant: i64,
    event_type: &str,
    payload: &P,
    recorded_at: DateTime<Utc>,
) -> Result<Model> {
    let model = ActiveModel {
        participant: Set(participant),
        event_type: Set(event_type.to_string()),
        payload: Set(serde_json::to_value(payload)?),
        recorded_at: Set(recorded_at.fixed_offset()),
        ..Default::default()
    };
    model.insert(db).await.map_err(RepositoryError::from)
}

/// A participant's events, newest first, optionally filtered by type.
pub async fn find_events<C: ConnectionTrait>(
    db: &C,
    participant: i64,
    event_type: Option<&str>,
) -> Result<Vec<Model>> {
    let mut query = Event::find().filter(Column::Participant.eq(participant));
    if let Some(event_type) = event_type {
        query = query.filter(Column::EventType.eq(event_type));
    }
    query
        .order_by_desc(Column::RecordedAt)
        .order_by_desc(Column::Id)
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use serde_json::json;

    use super::*;

    #[test]
    fn event_type_embeds_account_id() {
        assert_eq!(fetch_repos_event_type(17), "fetch_repos:17");
    }

    #[tokio::test]
    async fn add_event_serializes_payload() {
        let recorded_at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let stored = Model {
            id: 1,
            participant: 42,
            event_type: "fetch_repos:17".to_string(),
            payload: json!({"partial_list": false, "deleted_count": 2}),
            recorded_at: recorded_at.fixed_offset(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![stored.clone()]])
            .append_exec_results([MockExecResult {
                rows_affected: 1,
                last_insert_id: 1,
            }])
            .into_connection();

        let event = add_event(
            &db,
            42,
            "fetch_repos:17",
            &json!({"partial_list": false, "deleted_count": 2}),
            recorded_at,
        )
        .await
        .unwrap();
        assert_eq!(event, stored);

        let log = db.into_transaction_log();
        let sql = log[0].statements()[0].sql.clone();
        assert!(sql.contains(r#"INSERT INTO "events""#), "unexpected SQL: {sql}");
    }
}
