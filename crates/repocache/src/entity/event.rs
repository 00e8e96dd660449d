//! Event entity - audit records attached to a participant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Event model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Participant the event belongs to.
    pub participant: i64,

    /// Event tag, e.g. `fetch_repos:17`.
    pub event_type: String,

    /// Event-specific payload.
    #[sea_orm(column_type = "Json")]
    pub payload: serde_json::Value,

    pub recorded_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
