//! RefetchLock entity - per-pair exclusivity rows for backends without
//! advisory locks.
//!
//! A row only ever exists inside the transaction of the refetch run that
//! inserted it; the run deletes it again before committing.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::platform::Platform;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "refetch_locks")]
pub struct Model {
    /// Key derived from `(participant, platform)`.
    #[sea_orm(primary_key, auto_increment = false)]
    pub lock_key: i64,
    pub participant: i64,
    pub platform: Platform,
    pub acquired_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
