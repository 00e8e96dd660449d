//! HTTP implementation of [`PageSource`] for the GitHub, GitLab and Gitea
//! REST APIs.
//!
//! Pagination follows the `Link: <...>; rel="next"` response header, so the
//! cursor handed back to the refetch driver is simply the next page URL.

mod decode;
mod link;

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use url::Url;

use crate::entity::elsewhere;
use crate::entity::platform::Platform;
use crate::http::{HttpRequest, HttpResponse, HttpTransport};
use crate::platform::{
    ApiRateLimiter, AuthSession, PageSource, PlatformError, RepoPage, Result,
};
use crate::retry::{RetryConfig, with_retry};

pub use decode::{decode_listing, decode_repo};
pub use link::next_link;

/// API location and credentials for one platform.
#[derive(Clone)]
pub struct PlatformEndpoint {
    pub api_base: String,
    pub token: Option<String>,
}

impl PlatformEndpoint {
    /// The platform's public API without credentials.
    pub fn default_for(platform: Platform) -> Self {
        Self {
            api_base: platform.info().api_base.to_string(),
            token: None,
        }
    }
}

impl std::fmt::Debug for PlatformEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlatformEndpoint")
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Lists repositories over HTTP.
pub struct HttpPageSource<T> {
    transport: T,
    endpoints: HashMap<Platform, PlatformEndpoint>,
    limiters: HashMap<Platform, ApiRateLimiter>,
    retry: RetryConfig,
}

impl<T: HttpTransport> HttpPageSource<T> {
    /// A source talking to every platform's public API, anonymously.
    pub fn new(transport: T) -> Self {
        use sea_orm::Iterable;

        let endpoints = Platform::iter()
            .map(|p| (p, PlatformEndpoint::default_for(p)))
            .collect();
        let limiters = Platform::iter()
            .map(|p| (p, ApiRateLimiter::for_platform(p)))
            .collect();

        Self {
            transport,
            endpoints,
            limiters,
            retry: RetryConfig::default(),
        }
    }

    /// Override the API base URL and token for one platform.
    #[must_use]
    pub fn with_endpoint(mut self, platform: Platform, endpoint: PlatformEndpoint) -> Self {
        self.endpoints.insert(platform, endpoint);
        self
    }

    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn endpoint(&self, platform: Platform) -> Result<&PlatformEndpoint> {
        self.endpoints
            .get(&platform)
            .ok_or_else(|| PlatformError::internal(format!("no endpoint for {}", platform)))
    }

    /// URL of the first listing page for `account`.
    fn first_page_url(&self, account: &elsewhere::Model, session: &AuthSession) -> Result<String> {
        let base = self.endpoint(account.platform)?.api_base.trim_end_matches('/');
        let user_name = || {
            account.user_name.as_deref().ok_or_else(|| {
                PlatformError::internal(format!(
                    "{} account {} has no user name",
                    account.platform, account.id
                ))
            })
        };

        let path = match account.platform {
            Platform::GitHub if session.is_authenticated() => {
                "/user/repos?affiliation=owner&per_page=100".to_string()
            }
            Platform::GitHub => format!("/users/{}/repos?type=owner&per_page=100", user_name()?),
            Platform::GitLab => format!(
                "/users/{}/projects?owned=true&per_page=100",
                account.user_id
            ),
            Platform::Gitea => format!("/users/{}/repos?limit=50", user_name()?),
        };
        Ok(format!("{}{}", base, path))
    }

    fn build_request(&self, url: &str, session: &AuthSession) -> HttpRequest {
        let info = session.platform.info();
        let mut request = HttpRequest::get(url)
            .header("User-Agent", concat!("repocache/", env!("CARGO_PKG_VERSION")));
        request = match session.platform {
            Platform::GitHub => request.header("Accept", "application/vnd.github+json"),
            Platform::GitLab | Platform::Gitea => request.header("Accept", "application/json"),
        };
        if let Some(token) = &session.access_token {
            request = request.header("Authorization", format!("{} {}", info.auth_scheme, token));
        }
        request
    }

    async fn send_once(&self, platform: Platform, request: HttpRequest) -> Result<HttpResponse> {
        if let Some(limiter) = self.limiters.get(&platform) {
            limiter.wait().await;
        }
        let url = request.url.clone();
        let response = self
            .transport
            .get(request)
            .await
            .map_err(|e| PlatformError::network(e.to_string()))?;
        check_status(&url, response)
    }
}

/// Map a non-2xx response to a [`PlatformError`].
fn check_status(url: &str, response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }

    let exhausted = response.header("x-ratelimit-remaining") == Some("0");
    match response.status {
        429 => Err(PlatformError::RateLimited {
            reset_at: rate_limit_reset(&response),
        }),
        403 if exhausted => Err(PlatformError::RateLimited {
            reset_at: rate_limit_reset(&response),
        }),
        401 | 403 => Err(PlatformError::AuthRequired),
        404 => Err(PlatformError::not_found(url)),
        status => {
            let body = String::from_utf8_lossy(&response.body);
            let snippet: String = body.chars().take(200).collect();
            Err(PlatformError::api(format!(
                "HTTP {} from {}: {}",
                status, url, snippet
            )))
        }
    }
}

/// Whether `url` shares scheme, host and port with `api_base`. Next-page
/// links are only followed, with credentials, back to the configured API.
fn same_origin(url: &str, api_base: &str) -> bool {
    match (Url::parse(url), Url::parse(api_base)) {
        (Ok(url), Ok(base)) => url.origin() == base.origin(),
        _ => false,
    }
}

fn rate_limit_reset(response: &HttpResponse) -> DateTime<Utc> {
    let epoch = response
        .header("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0));
    let retry_after = response
        .header("retry-after")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(|secs| Utc::now() + Duration::seconds(secs));

    epoch
        .or(retry_after)
        .unwrap_or_else(|| Utc::now() + Duration::seconds(60))
}

#[async_trait]
impl<T: HttpTransport> PageSource for HttpPageSource<T> {
    async fn open_session(&self, account: &elsewhere::Model) -> Result<AuthSession> {
        let endpoint = self.endpoint(account.platform)?;
        let session = match &endpoint.token {
            Some(token) => AuthSession::with_token(account, token.clone()),
            None => AuthSession::anonymous(account),
        };
        tracing::debug!(
            platform = %account.platform,
            account_id = account.id,
            authenticated = session.is_authenticated(),
            "Opened listing session"
        );
        Ok(session)
    }

    async fn fetch_page(
        &self,
        account: &elsewhere::Model,
        session: &AuthSession,
        cursor: Option<&str>,
    ) -> Result<RepoPage> {
        let url = match cursor {
            Some(cursor) => {
                let api_base = &self.endpoint(account.platform)?.api_base;
                if !same_origin(cursor, api_base) {
                    return Err(PlatformError::api(format!(
                        "next page {} is not served by {}",
                        cursor, api_base
                    )));
                }
                cursor.to_string()
            }
            None => self.first_page_url(account, session)?,
        };
        let request = self.build_request(&url, session);

        let response = with_retry(
            || self.send_once(account.platform, request.clone()),
            self.retry.clone(),
            PlatformError::is_transient,
            &url,
        )
        .await?;

        let records = decode_listing(account.platform, &response.body)?;
        let next = response
            .header("link")
            .and_then(|header| next_link(header, &url));

        tracing::debug!(
            platform = %account.platform,
            url = %url,
            records = records.len(),
            has_next = next.is_some(),
            "Fetched listing page"
        );

        Ok(RepoPage { records, next })
    }
}
