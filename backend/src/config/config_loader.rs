use anyhow::{Context, Result};
use crates::{
    domain::value_objects::enums::video_resolutions::VideoResolution,
    providers::ProviderKind,
};

use super::{
    config_model::{
        Auth, BackendServer, DotEnvyConfig, LanguageModel, Reconciler, Speech, Storage,
        StorageBackend, Supabase, VideoProvider,
    },
    stage::Stage,
};

const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-5";
/// Budget for transcription, reply and speech synthesis on top of the render wait.
pub const TURN_HEADROOM_SECS: u64 = 60;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let storage_backend = match optional("STORAGE_BACKEND").as_deref() {
        None | Some("postgres") => StorageBackend::Postgres,
        Some("memory") => StorageBackend::Memory,
        Some(other) => anyhow::bail!("STORAGE_BACKEND is invalid: {}", other),
    };
    let storage = Storage {
        backend: storage_backend,
        database_url: match storage_backend {
            StorageBackend::Postgres => Some(required("DATABASE_URL")?),
            StorageBackend::Memory => optional("DATABASE_URL"),
        },
    };

    let auth = Auth {
        jwt_secret: get_jwt_secret()?,
    };

    let kind = ProviderKind::from_str(&required("VIDEO_PROVIDER")?)
        .context("VIDEO_PROVIDER is invalid (heygen | lipsync_studio | kie_ai)")?;
    let api_key_var = match kind {
        ProviderKind::HeyGen => "HEYGEN_API_KEY",
        ProviderKind::LipsyncStudio => "LIPSYNC_API_KEY",
        ProviderKind::KieAi => "KIE_API_KEY",
    };
    let video_provider = VideoProvider {
        kind,
        api_key: required(api_key_var)?,
        public_base_url: optional("PUBLIC_BASE_URL"),
        use_webhook: parse_bool("LIPSYNC_USE_WEBHOOK", false)?,
        default_resolution: match optional("VIDEO_RESOLUTION") {
            None => VideoResolution::default(),
            Some(raw) => VideoResolution::from_str(&raw)
                .with_context(|| format!("VIDEO_RESOLUTION is invalid: {}", raw))?,
        },
    };

    let reconciler = Reconciler {
        poll_interval_ms: parse_or("POLL_INTERVAL_MS", 5_000)?,
        poll_max_wait_ms: parse_or("POLL_MAX_WAIT_MS", 300_000)?,
        webhook_poll_interval_ms: parse_or("WEBHOOK_POLL_INTERVAL_MS", 1_500)?,
        job_registry_ttl_secs: parse_or("JOB_REGISTRY_TTL_SECS", 900)?,
        fallback_clip_seconds: parse_or("FALLBACK_CLIP_SECONDS", 5)?,
    };

    ensure_timeout_covers_turn(backend_server.timeout, reconciler.poll_max_wait_ms)?;

    let speech = Speech {
        elevenlabs_api_key: required("ELEVENLABS_API_KEY")?,
        default_voice_id: optional("DEFAULT_VOICE_ID")
            .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string()),
    };

    let language_model = LanguageModel {
        anthropic_api_key: required("ANTHROPIC_API_KEY")?,
        model: optional("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_ANTHROPIC_MODEL.to_string()),
    };

    let supabase = Supabase {
        project_url: required("SUPABASE_PROJECT_URL")?,
        service_key: required("SUPABASE_SERVICE_KEY")?,
        media_bucket: optional("SUPABASE_MEDIA_BUCKET").unwrap_or_else(|| "avatar-visio".to_string()),
    };

    Ok(DotEnvyConfig {
        stage: get_stage(),
        backend_server,
        storage,
        auth,
        video_provider,
        reconciler,
        speech,
        language_model,
        supabase,
    })
}

/// A request timeout shorter than a full turn would cut the response off mid-render.
fn ensure_timeout_covers_turn(server_timeout_secs: u64, poll_max_wait_ms: u64) -> Result<()> {
    let turn_secs = poll_max_wait_ms.div_ceil(1000) + TURN_HEADROOM_SECS;
    if server_timeout_secs <= turn_secs {
        anyhow::bail!(
            "SERVER_TIMEOUT ({}s) must exceed POLL_MAX_WAIT_MS plus {}s ({}s)",
            server_timeout_secs,
            TURN_HEADROOM_SECS,
            turn_secs
        );
    }
    Ok(())
}

pub fn get_stage() -> Stage {
    dotenvy::dotenv().ok();

    let stage_str = std::env::var("STAGE").unwrap_or_default();
    Stage::try_from(&stage_str).unwrap_or_default()
}

pub fn get_jwt_secret() -> Result<String> {
    dotenvy::dotenv().ok();

    required("JWT_SECRET")
}

fn required(key: &str) -> Result<String> {
    optional(key).with_context(|| format!("{} is invalid", key))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{} is invalid", key)),
    }
}

fn parse_bool(key: &str, default: bool) -> Result<bool> {
    match optional(key).map(|raw| raw.to_ascii_lowercase()).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("{} is invalid: {}", key, other),
    }
}
