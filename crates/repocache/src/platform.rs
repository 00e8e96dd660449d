//! Platform-facing types: the page source seam, the static registry, and
//! the conversion from listing records to store rows.
//!
//! ```ignore
//! use repocache::platform::{PageSource, RepoPage};
//!
//! async fn first_page<S: PageSource>(source: &S, account: &elsewhere::Model) -> Result<RepoPage> {
//!     let session = source.open_session(account).await?;
//!     source.fetch_page(account, &session, None).await
//! }
//! ```

mod convert;
mod errors;
mod rate_limit;
mod registry;
mod types;

pub use convert::strip_null_values;
pub use errors::{PlatformError, Result};
#[cfg(feature = "http")]
pub use rate_limit::ApiRateLimiter;
pub use rate_limit::rate_limits;
pub use registry::{PlatformInfo, render_template};
pub use types::{AuthSession, PageSource, RemoteRepo, RepoPage};
