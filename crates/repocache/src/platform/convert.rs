use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue::NotSet, Set};

use crate::entity::repository::ActiveModel as RepositoryActiveModel;

use super::types::RemoteRepo;

/// Strip null values from a JSON value, recursively.
///
/// ```ignore
/// let json = serde_json::json!({"language": "Rust", "homepage": null});
/// let stripped = strip_null_values(json);
/// // {"language": "Rust"}
/// ```
pub fn strip_null_values(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_null_values(v)))
                .collect(),
        ),
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(strip_null_values).collect())
        }
        other => other,
    }
}

impl RemoteRepo {
    /// Build the row to upsert for this record, stamped with the owning
    /// participant and the fetch time.
    ///
    /// Returns `Ok(None)` for incomplete records.
    pub fn into_active_model(
        self,
        participant: i64,
        fetched_at: DateTime<Utc>,
    ) -> serde_json::Result<Option<RepositoryActiveModel>> {
        let owner_id = self.owner_id.filter(|id| !id.is_empty());
        let (Some(owner_id), Some(last_update)) = (owner_id, self.last_update) else {
            return Ok(None);
        };
        let extra_info = serde_json::to_string(&strip_null_values(self.extra_info))?;

        Ok(Some(RepositoryActiveModel {
            id: NotSet,
            participant: Set(Some(participant)),
            platform: Set(self.platform),
            slug: Set(self.slug),
            remote_id: Set(self.remote_id),
            owner_id: Set(owner_id),
            name: Set(self.name),
            description: Set(self.description),
            is_fork: Set(self.is_fork),
            stars_count: Set(self.stars_count),
            last_update: Set(last_update.fixed_offset()),
            info_fetched_at: Set(fetched_at.fixed_offset()),
            extra_info: Set(extra_info),
        }))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;
    use crate::entity::platform::Platform;

    fn remote(owner_id: Option<&str>, last_update: bool) -> RemoteRepo {
        RemoteRepo {
            platform: Platform::GitHub,
            slug: "alice/tool".to_string(),
            remote_id: "1".to_string(),
            owner_id: owner_id.map(str::to_string),
            name: "tool".to_string(),
            description: Some("A tool".to_string()),
            is_fork: Some(false),
            stars_count: Some(3),
            last_update: last_update.then(|| Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            extra_info: json!({"language": "Rust", "homepage": null, "topics": [null, "cli"]}),
        }
    }

    #[test]
    fn strip_null_values_recurses() {
        let stripped = strip_null_values(json!({"a": null, "b": {"c": null, "d": 1}}));
        assert_eq!(stripped, json!({"b": {"d": 1}}));
    }

    #[test]
    fn strip_null_values_keeps_array_positions() {
        let stripped = strip_null_values(json!([null, {"x": null}]));
        assert_eq!(stripped, json!([null, {}]));
    }

    #[test]
    fn complete_record_is_stamped() {
        let fetched_at = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let active = remote(Some("9"), true)
            .into_active_model(42, fetched_at)
            .unwrap()
            .expect("complete record");

        assert!(active.id.is_not_set());
        assert_eq!(active.participant, Set(Some(42)));
        assert_eq!(active.owner_id, Set("9".to_string()));
        assert_eq!(active.info_fetched_at, Set(fetched_at.fixed_offset()));

        let extra_info = match active.extra_info {
            sea_orm::ActiveValue::Set(v) => v,
            other => panic!("extra_info not set: {other:?}"),
        };
        let parsed: serde_json::Value = serde_json::from_str(&extra_info).unwrap();
        assert_eq!(parsed, json!({"language": "Rust", "topics": [null, "cli"]}));
    }

    #[test]
    fn incomplete_records_are_rejected() {
        let now = Utc::now();
        assert!(!remote(None, true).is_complete());
        assert!(!remote(Some(""), true).is_complete());
        assert!(!remote(Some("9"), false).is_complete());
        assert!(remote(Some("9"), true).is_complete());

        assert!(remote(None, true).into_active_model(1, now).unwrap().is_none());
        assert!(remote(Some(""), true).into_active_model(1, now).unwrap().is_none());
        assert!(remote(Some("9"), false).into_active_model(1, now).unwrap().is_none());
    }
}
