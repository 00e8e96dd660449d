/// Default client-side request rates per platform (requests per second).
pub mod rate_limits {
    /// GitHub: 5000 requests/hour; 10/sec leaves room for bursts.
    pub const GITHUB_DEFAULT_RPS: u32 = 10;
    /// GitLab: 2000 requests/minute, 5/sec for safety.
    pub const GITLAB_DEFAULT_RPS: u32 = 5;
    /// Gitea/Codeberg: varies by instance, conservative default.
    pub const GITEA_DEFAULT_RPS: u32 = 5;
}

#[cfg(feature = "http")]
pub use limiter::ApiRateLimiter;

#[cfg(feature = "http")]
mod limiter {
    use std::num::NonZeroU32;
    use std::sync::Arc;

    use governor::clock::DefaultClock;
    use governor::state::{InMemoryState, NotKeyed};
    use governor::{Quota, RateLimiter};

    use crate::entity::platform::Platform;

    type GovernorRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

    /// Proactive request limiter shared by every request to one platform.
    ///
    /// ```ignore
    /// let limiter = ApiRateLimiter::for_platform(Platform::GitHub);
    /// limiter.wait().await;
    /// transport.get(request).await?;
    /// ```
    #[derive(Clone)]
    pub struct ApiRateLimiter {
        inner: Arc<GovernorRateLimiter>,
    }

    impl ApiRateLimiter {
        /// Create a limiter allowing `requests_per_second` (0 is treated as 1).
        pub fn new(requests_per_second: u32) -> Self {
            let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
            Self {
                inner: Arc::new(RateLimiter::direct(Quota::per_second(rps))),
            }
        }

        /// Limiter using the platform's default rate.
        pub fn for_platform(platform: Platform) -> Self {
            Self::new(platform.info().default_rps)
        }

        /// Wait until another request is allowed.
        pub async fn wait(&self) {
            self.inner.until_ready().await;
        }
    }

    impl std::fmt::Debug for ApiRateLimiter {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("ApiRateLimiter").finish_non_exhaustive()
        }
    }

}
