pub mod avatars;
pub mod clips;
pub mod credits;
pub mod enums;
pub mod provider_jobs;
pub mod usages;
pub mod visio_sessions;
