//! Video avatar backends behind one contract. The orchestrator only ever branches on
//! [`CompletionMode`], never on which backend it is talking to.

pub mod heygen;
pub mod kie_ai;
pub mod lipsync_studio;

use std::sync::Arc;

use async_trait::async_trait;
use mockall::automock;
use serde::de::DeserializeOwned;
use tracing::info;

use crate::{
    domain::{
        errors::VisioError,
        value_objects::{
            avatars::AvatarHandle,
            enums::video_resolutions::VideoResolution,
            provider_jobs::{CallbackUpdate, CompletionMode, ProviderJob},
        },
    },
    reconcilers::job_registry::JobRegistry,
};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider misconfigured: {0}")]
    Config(String),
    #[error("source asset rejected: {0}")]
    Upload(String),
    #[error("generation rejected: {0}")]
    Generate(String),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("malformed callback: {0}")]
    InvalidCallback(String),
    #[error("provider answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
}

impl ProviderError {
    /// Worth retrying on the next poll tick.
    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::Status { .. } | ProviderError::Transport(_))
    }
}

impl From<ProviderError> for VisioError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::Config(message) => VisioError::Config(message),
            ProviderError::Upload(message) => VisioError::Upload(message),
            ProviderError::NotSupported(message) => VisioError::NotSupported(message),
            ProviderError::InvalidCallback(message) => VisioError::InvalidInput(message),
            other => VisioError::Generate(other.to_string()),
        }
    }
}

#[automock]
#[async_trait]
pub trait VideoAvatarProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn completion_mode(&self) -> CompletionMode;

    fn supports_resolution(&self, _resolution: VideoResolution) -> bool {
        true
    }

    async fn create_avatar(&self, source_url: &str) -> Result<AvatarHandle, ProviderError>;

    /// Pure read.
    async fn get_avatar_status(&self, avatar_id: &str) -> Result<AvatarHandle, ProviderError>;

    /// Submits a render and returns at once with a pending job.
    async fn generate_talking_video(
        &self,
        avatar_id: &str,
        audio_url: &str,
        resolution: VideoResolution,
    ) -> Result<ProviderJob, ProviderError>;

    /// Pure read. Webhook backends answer from the local job registry.
    async fn get_video_status(&self, job_id: &str) -> Result<ProviderJob, ProviderError>;

    async fn generate_idle_video(
        &self,
        avatar_id: &str,
        duration_seconds: u32,
    ) -> Result<ProviderJob, ProviderError>;

    /// Turns this backend's callback body into a job update.
    fn parse_callback(&self, _payload: &serde_json::Value) -> Result<CallbackUpdate, ProviderError> {
        Err(ProviderError::NotSupported(format!(
            "{} does not send callbacks",
            self.name()
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    HeyGen,
    LipsyncStudio,
    KieAi,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::HeyGen => "heygen",
            ProviderKind::LipsyncStudio => "lipsync_studio",
            ProviderKind::KieAi => "kie_ai",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "heygen" => Some(ProviderKind::HeyGen),
            "lipsync_studio" | "lipsync" => Some(ProviderKind::LipsyncStudio),
            "kie_ai" | "kie" => Some(ProviderKind::KieAi),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    pub api_key: String,
    /// Public base of this service, used to build callback URLs.
    pub public_base_url: Option<String>,
    pub use_webhook: bool,
}

impl ProviderSettings {
    pub fn callback_url(&self) -> Option<String> {
        self.public_base_url.as_ref().map(|base| {
            format!(
                "{}/api/v1/webhooks/{}",
                base.trim_end_matches('/'),
                self.kind.as_str()
            )
        })
    }
}

pub fn build_provider(
    settings: &ProviderSettings,
    registry: Arc<JobRegistry>,
) -> Result<Arc<dyn VideoAvatarProvider>, ProviderError> {
    let provider: Arc<dyn VideoAvatarProvider> = match settings.kind {
        ProviderKind::HeyGen => Arc::new(heygen::HeyGenProvider::new(settings.api_key.clone())?),
        ProviderKind::LipsyncStudio => {
            let callback_url = if settings.use_webhook {
                Some(settings.callback_url().ok_or_else(|| {
                    ProviderError::Config(
                        "LIPSYNC_USE_WEBHOOK needs PUBLIC_BASE_URL to build a callback URL".into(),
                    )
                })?)
            } else {
                None
            };
            Arc::new(lipsync_studio::LipsyncStudioProvider::new(
                settings.api_key.clone(),
                callback_url,
                registry,
            )?)
        }
        ProviderKind::KieAi => Arc::new(kie_ai::KieAiProvider::new(
            settings.api_key.clone(),
            settings.callback_url(),
            registry,
        )?),
    };

    info!(
        provider = provider.name(),
        mode = ?provider.completion_mode(),
        "providers: video provider ready"
    );
    Ok(provider)
}

pub(crate) fn require_api_key(provider: &str, api_key: String) -> Result<String, ProviderError> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::Config(format!("{provider}: API key not configured")));
    }
    Ok(api_key)
}

/// Fails with `Status` on any non-2xx answer, keeping a short body preview.
pub(crate) async fn read_json<T: DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp
            .text()
            .await
            .map(|text| text.chars().take(512).collect::<String>())
            .unwrap_or_default();
        return Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        });
    }

    Ok(resp.json::<T>().await?)
}

/// Confirms a source asset URL answers before a render is built on top of it.
pub(crate) async fn verify_reachable(
    http: &reqwest::Client,
    url: &str,
) -> Result<(), ProviderError> {
    let parsed = url::Url::parse(url)
        .map_err(|err| ProviderError::Upload(format!("invalid source url {url}: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ProviderError::Upload(format!(
            "source url must be http(s): {url}"
        )));
    }

    let resp = http
        .head(parsed)
        .send()
        .await
        .map_err(|err| ProviderError::Upload(format!("source {url} unreachable: {err}")))?;
    if !resp.status().is_success() {
        return Err(ProviderError::Upload(format!(
            "source {url} answered {}",
            resp.status()
        )));
    }
    Ok(())
}
