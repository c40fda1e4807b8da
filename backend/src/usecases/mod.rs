pub mod avatars;
pub mod clips;
pub mod credit_ledger;
pub mod plan_resolver;
pub mod rendering;
pub mod speech_pipeline;
pub mod turn_orchestrator;
pub mod usage_ledger;
pub mod visio_sessions;
