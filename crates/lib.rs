pub mod domain;
pub mod infra;
pub mod observability;
pub mod providers;
pub mod reconcilers;
