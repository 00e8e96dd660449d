//! SeaORM entity definitions for the repocache database schema.

pub mod elsewhere;
pub mod event;
pub mod platform;
pub mod prelude;
pub mod refetch_lock;
pub mod repository;
