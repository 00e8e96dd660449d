//! repocache - a local cache of the repositories participants own on GitHub,
//! GitLab and Gitea-family forges.
//!
//! The [`refetch`] driver periodically re-reads one account's listing through
//! a [`platform::PageSource`] and merges it into the `repositories` table with
//! [`reconcile::upsert_repos`].
//!
//! # Features
//!
//! - `migrate` - Enables database migration support and
//!   [`connect_and_migrate`].
//! - `http` - The reqwest-backed [`source::HttpPageSource`].
//!
//! # Example
//!
//! ```ignore
//! use repocache::{connect_and_migrate, refetch::Refetcher, source::HttpPageSource};
//!
//! let db = connect_and_migrate("sqlite://repocache.db?mode=rwc").await?;
//! let refetcher = Refetcher::new(db, HttpPageSource::new(transport));
//! let outcome = refetcher.refetch_once().await?;
//! ```

pub mod accounts;
pub mod db;
pub mod entity;
pub mod events;
pub mod http;
pub mod platform;
pub mod reconcile;
pub mod refetch;
pub mod repository;

#[cfg(feature = "http")]
pub mod retry;

#[cfg(feature = "http")]
pub mod source;

#[cfg(feature = "migrate")]
pub mod migration;

pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use entity::prelude::*;
pub use platform::{PageSource, PlatformError, RemoteRepo, RepoPage};
pub use reconcile::upsert_repos;
pub use refetch::{RefetchError, RefetchOptions, RefetchOutcome, RefetchReport, Refetcher};
pub use repository::RepositoryError;
