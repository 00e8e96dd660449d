//! Static per-platform facts: URL templates, API defaults and auth scheme.

use crate::entity::platform::Platform;
use crate::entity::repository::Model as RepositoryModel;

use super::rate_limit::rate_limits;

/// Everything the crate needs to know about a hosting platform that does not
/// depend on configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformInfo {
    pub platform: Platform,
    pub display_name: &'static str,
    /// Web URL of a repository. Placeholders: `{slug}`, `{name}`,
    /// `{remote_id}`, `{owner_id}`.
    pub repo_url_template: &'static str,
    /// Web URL of an account. Placeholder: `{user_name}`.
    pub account_url_template: &'static str,
    /// Default REST API base URL.
    pub api_base: &'static str,
    /// Default client-side request rate.
    pub default_rps: u32,
    /// Scheme used in the `Authorization` header.
    pub auth_scheme: &'static str,
}

static GITHUB: PlatformInfo = PlatformInfo {
    platform: Platform::GitHub,
    display_name: "GitHub",
    repo_url_template: "https://github.com/{slug}",
    account_url_template: "https://github.com/{user_name}",
    api_base: "https://api.github.com",
    default_rps: rate_limits::GITHUB_DEFAULT_RPS,
    auth_scheme: "Bearer",
};

static GITLAB: PlatformInfo = PlatformInfo {
    platform: Platform::GitLab,
    display_name: "GitLab",
    repo_url_template: "https://gitlab.com/{slug}",
    account_url_template: "https://gitlab.com/{user_name}",
    api_base: "https://gitlab.com/api/v4",
    default_rps: rate_limits::GITLAB_DEFAULT_RPS,
    auth_scheme: "Bearer",
};

static GITEA: PlatformInfo = PlatformInfo {
    platform: Platform::Gitea,
    display_name: "Codeberg",
    repo_url_template: "https://codeberg.org/{slug}",
    account_url_template: "https://codeberg.org/{user_name}",
    api_base: "https://codeberg.org/api/v1",
    default_rps: rate_limits::GITEA_DEFAULT_RPS,
    auth_scheme: "token",
};

impl Platform {
    /// Static facts about this platform.
    pub fn info(self) -> &'static PlatformInfo {
        match self {
            Platform::GitHub => &GITHUB,
            Platform::GitLab => &GITLAB,
            Platform::Gitea => &GITEA,
        }
    }
}

impl PlatformInfo {
    /// Web URL of a cached repository.
    pub fn repo_url(&self, repo: &RepositoryModel) -> String {
        render_template(
            self.repo_url_template,
            &[
                ("slug", repo.slug.as_str()),
                ("name", repo.name.as_str()),
                ("remote_id", repo.remote_id.as_str()),
                ("owner_id", repo.owner_id.as_str()),
            ],
        )
    }

    /// Web URL of an account.
    pub fn account_url(&self, user_name: &str) -> String {
        render_template(self.account_url_template, &[("user_name", user_name)])
    }
}

/// Substitute `{key}` placeholders. Unknown placeholders are left as-is.
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let key = &after[..close];
                match vars.iter().find(|(k, _)| *k == key) {
                    Some((_, value)) => out.push_str(value),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
