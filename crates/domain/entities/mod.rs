pub mod avatar_assets;
pub mod credits;
pub mod subscriptions;
pub mod usages;
pub mod visio_sessions;
