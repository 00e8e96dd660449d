//! Repository entity - cached metadata for one remote repository.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::entity::platform::Platform;

/// Repository model - one remote repository as cached locally.
///
/// `(platform, remote_id)` is the identity of a row. `slug` is a mutable
/// label that is also kept unique per platform: when a different remote
/// identity claims a slug, the old row is removed first.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "repositories")]
pub struct Model {
    /// Surrogate key assigned by the store.
    #[sea_orm(primary_key)]
    pub id: i32,

    // ─── Ownership ───────────────────────────────────────────────────────────
    /// Local participant this record is attached to.
    pub participant: Option<i64>,

    // ─── Remote Identity ─────────────────────────────────────────────────────
    /// Hosting platform.
    pub platform: Platform,
    /// Path of the repository on the platform (`owner/name`).
    pub slug: String,
    /// Stable identifier assigned by the platform.
    pub remote_id: String,
    /// Remote account id of the owner.
    pub owner_id: String,

    // ─── Content ─────────────────────────────────────────────────────────────
    /// Short repository name.
    pub name: String,
    /// Repository description.
    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,
    /// Whether this is a fork, when the platform says so.
    pub is_fork: Option<bool>,
    /// Star count, when the platform reports one.
    pub stars_count: Option<i32>,

    // ─── Timestamps ──────────────────────────────────────────────────────────
    /// Last activity on the platform.
    pub last_update: DateTimeWithTimeZone,
    /// When this row was last refreshed from the platform.
    pub info_fetched_at: DateTimeWithTimeZone,

    // ─── Platform-Specific ───────────────────────────────────────────────────
    /// Platform-specific payload, serialized as JSON text.
    #[sea_orm(column_type = "Text")]
    pub extra_info: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Public web URL of the repository, built from the platform's template.
    pub fn url(&self) -> String {
        self.platform.info().repo_url(self)
    }

    /// Parse `extra_info` back into a JSON value.
    pub fn extra_info_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.extra_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn make_test_model(platform: Platform, slug: &str) -> Model {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap().fixed_offset();
        Model {
            id: 1,
            participant: Some(42),
            platform,
            slug: slug.to_string(),
            remote_id: "1296269".to_string(),
            owner_id: "1".to_string(),
            name: slug.rsplit('/').next().unwrap_or(slug).to_string(),
            description: None,
            is_fork: Some(false),
            stars_count: Some(80),
            last_update: ts,
            info_fetched_at: ts,
            extra_info: r#"{"language":"Rust"}"#.to_string(),
        }
    }

    #[test]
    fn test_url_uses_platform_template() {
        let github = make_test_model(Platform::GitHub, "octocat/Hello-World");
        assert_eq!(github.url(), "https://github.com/octocat/Hello-World");

        let gitlab = make_test_model(Platform::GitLab, "group/sub/project");
        assert_eq!(gitlab.url(), "https://gitlab.com/group/sub/project");
    }

    #[test]
    fn test_extra_info_json_round_trips_text() {
        let model = make_test_model(Platform::Gitea, "forgejo/forgejo");
        let value = model.extra_info_json().unwrap();
        assert_eq!(value["language"], "Rust");
    }

    #[test]
    fn test_extra_info_json_rejects_garbage() {
        let mut model = make_test_model(Platform::GitHub, "a/b");
        model.extra_info = "not json".to_string();
        assert!(model.extra_info_json().is_err());
    }
}
