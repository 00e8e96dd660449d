//! Per-platform JSON decoding of repository listings.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::entity::platform::Platform;
use crate::platform::{PlatformError, RemoteRepo, Result};

/// Fields kept in `extra_info`, per platform.
const GITHUB_EXTRA: &[&str] = &[
    "html_url",
    "homepage",
    "language",
    "default_branch",
    "archived",
    "private",
    "forks_count",
    "topics",
];
const GITLAB_EXTRA: &[&str] = &[
    "web_url",
    "default_branch",
    "archived",
    "visibility",
    "forks_count",
    "topics",
    "namespace",
];
const GITEA_EXTRA: &[&str] = &[
    "html_url",
    "website",
    "language",
    "default_branch",
    "archived",
    "private",
    "mirror",
    "forks_count",
];

/// Decode a listing body (a JSON array of repository objects).
///
/// Entries without an identity are skipped; the rest of the page is kept.
pub fn decode_listing(platform: Platform, body: &[u8]) -> Result<Vec<RemoteRepo>> {
    let value: Value = serde_json::from_slice(body)?;
    let Value::Array(items) = value else {
        return Err(PlatformError::decode(format!(
            "{} listing is not a JSON array",
            platform
        )));
    };
    let repos = items
        .iter()
        .filter_map(|item| match decode_repo(platform, item) {
            Ok(repo) => Some(repo),
            Err(e) => {
                tracing::debug!(platform = %platform, error = %e, "Skipping listing entry");
                None
            }
        })
        .collect();
    Ok(repos)
}

/// Decode one repository object.
pub fn decode_repo(platform: Platform, item: &Value) -> Result<RemoteRepo> {
    let obj = item
        .as_object()
        .ok_or_else(|| PlatformError::decode("repository entry is not a JSON object"))?;

    match platform {
        Platform::GitHub => decode_github(obj),
        Platform::GitLab => decode_gitlab(obj),
        Platform::Gitea => decode_gitea(obj),
    }
}

fn decode_github(obj: &Map<String, Value>) -> Result<RemoteRepo> {
    let slug = required_str(obj, "full_name")?;
    Ok(RemoteRepo {
        platform: Platform::GitHub,
        remote_id: required_id(obj, "id")?,
        owner_id: obj.get("owner").and_then(|o| id_string(o.get("id"))),
        name: name_or_tail(obj, &slug),
        description: opt_str(obj, "description"),
        is_fork: obj.get("fork").and_then(Value::as_bool),
        stars_count: opt_i32(obj, "stargazers_count"),
        last_update: timestamp(obj, "pushed_at").or_else(|| timestamp(obj, "updated_at")),
        extra_info: pick(obj, GITHUB_EXTRA),
        slug,
    })
}

fn decode_gitlab(obj: &Map<String, Value>) -> Result<RemoteRepo> {
    let slug = required_str(obj, "path_with_namespace")?;
    // Group projects carry no `owner`.
    Ok(RemoteRepo {
        platform: Platform::GitLab,
        remote_id: required_id(obj, "id")?,
        owner_id: obj.get("owner").and_then(|o| id_string(o.get("id"))),
        name: opt_str(obj, "path").unwrap_or_else(|| name_or_tail(obj, &slug)),
        description: opt_str(obj, "description"),
        is_fork: Some(obj.get("forked_from_project").is_some_and(|v| !v.is_null())),
        stars_count: opt_i32(obj, "star_count"),
        last_update: timestamp(obj, "last_activity_at"),
        extra_info: pick(obj, GITLAB_EXTRA),
        slug,
    })
}

fn decode_gitea(obj: &Map<String, Value>) -> Result<RemoteRepo> {
    let slug = required_str(obj, "full_name")?;
    Ok(RemoteRepo {
        platform: Platform::Gitea,
        remote_id: required_id(obj, "id")?,
        owner_id: obj.get("owner").and_then(|o| id_string(o.get("id"))),
        name: name_or_tail(obj, &slug),
        description: opt_str(obj, "description").filter(|d| !d.is_empty()),
        is_fork: obj.get("fork").and_then(Value::as_bool),
        stars_count: opt_i32(obj, "stars_count"),
        last_update: timestamp(obj, "updated_at"),
        extra_info: pick(obj, GITEA_EXTRA),
        slug,
    })
}

// ─── Field Helpers ───────────────────────────────────────────────────────────

fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn required_id(obj: &Map<String, Value>, key: &str) -> Result<String> {
    id_string(obj.get(key)).ok_or_else(|| PlatformError::decode(format!("missing `{}`", key)))
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Result<String> {
    opt_str(obj, key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PlatformError::decode(format!("missing `{}`", key)))
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn opt_i32(obj: &Map<String, Value>, key: &str) -> Option<i32> {
    obj.get(key)
        .and_then(Value::as_i64)
        .and_then(|n| i32::try_from(n).ok())
}

fn name_or_tail(obj: &Map<String, Value>, slug: &str) -> String {
    opt_str(obj, "name").unwrap_or_else(|| slug.rsplit('/').next().unwrap_or(slug).to_string())
}

fn timestamp(obj: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let raw = obj.get(key)?.as_str()?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            tracing::debug!(field = key, value = raw, error = %e, "Unparseable timestamp");
            None
        }
    }
}

fn pick(obj: &Map<String, Value>, keys: &[&str]) -> Value {
    Value::Object(
        keys.iter()
            .filter_map(|k| obj.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect(),
    )
}
