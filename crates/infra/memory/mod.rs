//! Process-local repositories for single-instance runs and tests. Each key's entry lock
//! gives the same read-modify-write atomicity the Postgres statements provide.

pub mod avatar_assets;
pub mod credits;
pub mod subscriptions;
pub mod usages;
pub mod visio_sessions;
