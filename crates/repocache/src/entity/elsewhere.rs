//! Elsewhere entity - a participant's linked account on a remote platform.
//!
//! The refetch driver resolves the account for a `(participant, platform)`
//! pair before listing repositories, and repository owners are looked up
//! here by their remote user id.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::platform::Platform;

/// Linked account model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "elsewhere")]
pub struct Model {
    /// Surrogate key assigned by the store.
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Local participant owning this account.
    pub participant: i64,

    /// Hosting platform.
    pub platform: Platform,

    /// Instance domain. Empty for the platform's main instance.
    #[sea_orm(default_value = "")]
    pub domain: String,

    /// Account id on the platform.
    pub user_id: String,

    /// Login name on the platform, if known.
    pub user_name: Option<String>,

    /// Display name on the platform, if known.
    pub display_name: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Public profile URL, when the login name is known.
    pub fn profile_url(&self) -> Option<String> {
        self.user_name
            .as_deref()
            .map(|user_name| self.platform.info().account_url(user_name))
    }

    /// Best human-readable label for the account.
    pub fn friendly_name(&self) -> &str {
        self.user_name
            .as_deref()
            .or(self.display_name.as_deref())
            .unwrap_or(&self.user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(user_name: Option<&str>) -> Model {
        Model {
            id: 7,
            participant: 42,
            platform: Platform::GitHub,
            domain: String::new(),
            user_id: "583231".to_string(),
            user_name: user_name.map(str::to_string),
            display_name: Some("The Octocat".to_string()),
        }
    }

    #[test]
    fn profile_url_requires_user_name() {
        assert_eq!(
            account(Some("octocat")).profile_url().as_deref(),
            Some("https://github.com/octocat")
        );
        assert!(account(None).profile_url().is_none());
    }

    #[test]
    fn friendly_name_falls_back_to_display_name() {
        assert_eq!(account(Some("octocat")).friendly_name(), "octocat");
        assert_eq!(account(None).friendly_name(), "The Octocat");
    }
}
