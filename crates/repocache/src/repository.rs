//! Store operations for cached repository rows.
//!
//! Every function is generic over [`sea_orm::ConnectionTrait`] so it can run
//! inside the refetch driver's transaction as well as on a plain connection.

mod bulk;
mod errors;
mod query;
mod single;

pub use bulk::{delete_slug_collisions, delete_stale};
pub use errors::{RepositoryError, Result};
pub use query::{
    RefetchCandidate, count_by_participant, find_by_participant, find_refetch_candidate,
    is_pair_stale,
};
pub use single::{
    UPSERT_COLUMNS, find_by_remote_id, find_by_slug, get_owner, upsert_by_remote_id,
};
