pub mod avatar_assets;
pub mod credits;
pub mod language_models;
pub mod speech;
pub mod storage;
pub mod subscriptions;
pub mod usages;
pub mod visio_sessions;
