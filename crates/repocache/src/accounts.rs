//! Linked-account lookups and registration.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict};

use crate::entity::elsewhere::{ActiveModel, Column, Entity as Elsewhere, Model};
use crate::entity::platform::Platform;
use crate::repository::{RepositoryError, Result};

/// Details of an account to link to a participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub participant: i64,
    pub platform: Platform,
    pub user_id: String,
    pub user_name: Option<String>,
    pub display_name: Option<String>,
}

/// The participant's account on the platform's main instance.
pub async fn find_for_participant<C: ConnectionTrait>(
    db: &C,
    participant: i64,
    platform: Platform,
) -> Result<Option<Model>> {
    Elsewhere::find()
        .filter(Column::Participant.eq(participant))
        .filter(Column::Platform.eq(platform))
        .filter(Column::Domain.eq(""))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// Look up an account on the platform's main instance by remote user id.
pub async fn find_by_user_id<C: ConnectionTrait>(
    db: &C,
    platform: Platform,
    user_id: &str,
) -> Result<Option<Model>> {
    Elsewhere::find()
        .filter(Column::Platform.eq(platform))
        .filter(Column::Domain.eq(""))
        .filter(Column::UserId.eq(user_id))
        .one(db)
        .await
        .map_err(RepositoryError::from)
}

/// All accounts linked to a participant.
pub async fn find_by_participant<C: ConnectionTrait>(db: &C, participant: i64) -> Result<Vec<Model>> {
    Elsewhere::find()
        .filter(Column::Participant.eq(participant))
        .all(db)
        .await
        .map_err(RepositoryError::from)
}

/// Link an account, or move an already-known remote account to `participant`
/// and refresh its names.
///
/// Fails with [`RepositoryError::Constraint`] when the participant already
/// has a different account on the same platform.
pub async fn link_account<C: ConnectionTrait>(db: &C, account: NewAccount) -> Result<Model> {
    let platform = account.platform;
    let user_id = account.user_id.clone();

    let model = ActiveModel {
        participant: Set(account.participant),
        platform: Set(account.platform),
        domain: Set(String::new()),
        user_id: Set(account.user_id),
        user_name: Set(account.user_name),
        display_name: Set(account.display_name),
        ..Default::default()
    };

    Elsewhere::insert(model)
        .on_conflict(
            OnConflict::columns([Column::Platform, Column::Domain, Column::UserId])
                .update_columns([Column::Participant, Column::UserName, Column::DisplayName])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    find_by_user_id(db, platform, &user_id)
        .await?
        .ok_or_else(|| RepositoryError::NotFound {
            context: format!("{} account user_id={}", platform, user_id),
        })
}
