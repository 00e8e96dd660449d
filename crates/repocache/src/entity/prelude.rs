//! Common re-exports for convenient entity usage.

pub use super::elsewhere::{
    ActiveModel as ElsewhereActiveModel, Column as ElsewhereColumn, Entity as Elsewhere,
    Model as ElsewhereModel,
};
pub use super::event::{
    ActiveModel as EventActiveModel, Column as EventColumn, Entity as Event, Model as EventModel,
};
pub use super::platform::Platform;
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
