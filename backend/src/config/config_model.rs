use crates::{
    domain::value_objects::enums::video_resolutions::VideoResolution,
    providers::ProviderKind,
};

use super::stage::Stage;

#[derive(Debug, Clone)]
pub struct DotEnvyConfig {
    pub stage: Stage,
    pub backend_server: BackendServer,
    pub storage: Storage,
    pub auth: Auth,
    pub video_provider: VideoProvider,
    pub reconciler: Reconciler,
    pub speech: Speech,
    pub language_model: LanguageModel,
    pub supabase: Supabase,
}

#[derive(Debug, Clone)]
pub struct BackendServer {
    pub port: u16,
    pub body_limit: u64,
    pub timeout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Storage {
    pub backend: StorageBackend,
    /// Required when `backend` is `Postgres`.
    pub database_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Auth {
    pub jwt_secret: String,
}

#[derive(Debug, Clone)]
pub struct VideoProvider {
    pub kind: ProviderKind,
    pub api_key: String,
    pub public_base_url: Option<String>,
    pub use_webhook: bool,
    pub default_resolution: VideoResolution,
}

#[derive(Debug, Clone)]
pub struct Reconciler {
    pub poll_interval_ms: u64,
    pub poll_max_wait_ms: u64,
    pub webhook_poll_interval_ms: u64,
    pub job_registry_ttl_secs: u64,
    pub fallback_clip_seconds: u32,
}

#[derive(Debug, Clone)]
pub struct Speech {
    pub elevenlabs_api_key: String,
    pub default_voice_id: String,
}

#[derive(Debug, Clone)]
pub struct LanguageModel {
    pub anthropic_api_key: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct Supabase {
    pub project_url: String,
    pub service_key: String,
    pub media_bucket: String,
}
