pub(crate) mod accounts;
pub(crate) mod meta;
pub(crate) mod migrate;
pub(crate) mod refetch;
