//! Platform enum for type-safe remote forge handling.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Remote hosting platforms repositories are fetched from.
///
/// Each variant maps to a static [`PlatformInfo`](crate::platform::PlatformInfo)
/// through [`Platform::info`], which carries the URL templates and API
/// defaults for that platform.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// github.com
    #[sea_orm(string_value = "github")]
    GitHub,
    /// gitlab.com
    #[sea_orm(string_value = "gitlab")]
    GitLab,
    /// Gitea or Forgejo (Codeberg by default)
    #[sea_orm(string_value = "gitea")]
    Gitea,
}

impl Platform {
    /// Lowercase identifier, as stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::GitHub => "github",
            Platform::GitLab => "gitlab",
            Platform::Gitea => "gitea",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "github" => Ok(Platform::GitHub),
            "gitlab" => Ok(Platform::GitLab),
            "gitea" | "forgejo" | "codeberg" => Ok(Platform::Gitea),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Platform::GitHub.to_string(), "github");
        assert_eq!(Platform::GitLab.to_string(), "gitlab");
        assert_eq!(Platform::Gitea.to_string(), "gitea");
    }

    #[test]
    fn test_from_str() {
        assert_eq!("GitHub".parse::<Platform>().unwrap(), Platform::GitHub);
        assert_eq!("gitlab".parse::<Platform>().unwrap(), Platform::GitLab);
        assert_eq!("forgejo".parse::<Platform>().unwrap(), Platform::Gitea);
        assert_eq!("codeberg".parse::<Platform>().unwrap(), Platform::Gitea);
        assert!("bitbucket".parse::<Platform>().is_err());
    }

    #[test]
    fn test_serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Platform::GitLab).unwrap();
        assert_eq!(json, "\"gitlab\"");
        let back: Platform = serde_json::from_str("\"gitea\"").unwrap();
        assert_eq!(back, Platform::Gitea);
    }
}
