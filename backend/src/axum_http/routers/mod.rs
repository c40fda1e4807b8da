pub mod clips;
pub mod credits;
pub mod provider_webhooks;
pub mod visio;
