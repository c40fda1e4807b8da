pub mod job_statuses;
pub mod plan_tiers;
pub mod subscription_statuses;
pub mod transaction_types;
pub mod video_resolutions;
pub mod visio_states;
