use sea_orm::{
    ActiveValue, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, sea_query::OnConflict,
};

use crate::entity::elsewhere::{self, Entity as Elsewhere};
use crate::entity::platform::Platform;
use crate::entity::repository::{ActiveModel, Column, Entity as Repository, Model};

use super::errors::{RepositoryError, Result};

// ─── Single Record Operations ────────────────────────────────────────────────

/// Columns overwritten when an incoming record matches an existing
/// `(platform, remote_id)`. Every column except the identity and the
/// surrogate key.
pub const UPSERT_COLUMNS: [Column; 10] = [
    Column::Participant,
    Column::Slug,
    Column::OwnerId,
    Column::Name,
    Column::Description,
    Column::IsFork,
    Column::StarsCount,
    Column::LastUpdate,
    Column::InfoFetchedAt,
    Column::ExtraInfo,
];

/// Build the ON CONFLICT clause for identity upserts.
pub(crate) fn build_upsert_on_conflict() -> OnConflict {
    OnConflict::columns([Column::Platform, Column::RemoteId])
        .update_columns(UPSERT_COLUMNS)
        .to_owned()
}

/// Find a repository by its remote identity.
pub async fn find_by_remote_id<C: ConnectionTrait>(
    db: &C,
    platform: Platform,
    remote_id: &str,
) -> Result<Option<Model>> {
    Repository::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::RemoteId.eq(remote_id))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// Find a repository by its current slug.
pub async fn find_by_slug<C: ConnectionTrait>(
    db: &C,
    platform: Platform,
    slug: &str,
) -> Result<Option<Model>> {
    Repository::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::Slug.eq(slug))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// Insert a repository, or overwrite every non-key column of the row with
/// the same `(platform, remote_id)`, then read the canonical row back.
pub async fn upsert_by_remote_id<C: ConnectionTrait>(db: &C, model: ActiveModel) -> Result<Model> {
    let platform = required_active_value("platform", &model.platform)?;
    let remote_id = required_active_value("remote_id", &model.remote_id)?;

    Repository::insert(model)
        .on_conflict(build_upsert_on_conflict())
        .exec_without_returning(db)
        .await?;

    find_by_remote_id(db, platform, &remote_id)
        .await?
        .ok_or_else(|| RepositoryError::not_found_by_remote_id(platform, &remote_id))
}

/// Look up the linked account that owns a repository on its platform.
pub async fn get_owner<C: ConnectionTrait>(
    db: &C,
    repo: &Model,
) -> Result<Option<elsewhere::Model>> {
    Elsewhere::find()
        .filter(elsewhere::Column::Platform.eq(repo.platform))
        .filter(elsewhere::Column::Domain.eq(""))
        .filter(elsewhere::Column::UserId.eq(repo.owner_id.as_str()))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

fn required_active_value<T: Clone + Into<sea_orm::Value>>(
    field: &str,
    value: &ActiveValue<T>,
) -> Result<T> {
    match value {
        ActiveValue::Set(value) | ActiveValue::Unchanged(value) => Ok(value.clone()),
        ActiveValue::NotSet => Err(RepositoryError::InvalidInput {
            message: format!("Missing required field: {}", field),
        }),
    }
}
