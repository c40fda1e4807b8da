use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    domain::value_objects::{
        avatars::AvatarHandle,
        enums::{job_statuses::JobStatus, video_resolutions::VideoResolution},
        provider_jobs::{CallbackUpdate, CompletionMode, JobState, ProviderJob},
    },
    providers::{ProviderError, VideoAvatarProvider, read_json, require_api_key, verify_reachable},
    reconcilers::job_registry::JobRegistry,
};

const LIPSYNC_API_BASE: &str = "https://lipsync.studio/api/v1";

/// lipsync.studio re-syncs the lips of an existing clip, so the "avatar" is a reachable
/// source video URL. Delivery is by webhook when a callback URL is configured and by
/// polling `/jobs/{id}` otherwise.
pub struct LipsyncStudioProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    callback_url: Option<String>,
    registry: Arc<JobRegistry>,
}

/// Shape shared by the job endpoint and the callback body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LipsyncJob {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl LipsyncJob {
    /// The id comes back under a different key depending on the endpoint.
    fn correlation_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or(self.request_id.as_deref())
            .or(self.job_id.as_deref())
            .filter(|id| !id.is_empty())
    }

    fn state(&self) -> JobState {
        match self.status.as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("completed") => match &self.output {
                Some(output) => JobState::Ready {
                    result_url: output.clone(),
                    duration_seconds: None,
                },
                None => JobState::Failed {
                    error_message: "lipsync.studio completed without output".into(),
                },
            },
            Some("failed") => JobState::Failed {
                error_message: self
                    .error
                    .clone()
                    .unwrap_or_else(|| "lipsync.studio job failed".into()),
            },
            Some("processing") => JobState::Processing,
            _ => JobState::Pending,
        }
    }
}

impl LipsyncStudioProvider {
    pub fn new(
        api_key: String,
        callback_url: Option<String>,
        registry: Arc<JobRegistry>,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, callback_url, registry, LIPSYNC_API_BASE.to_string())
    }

    pub fn with_base_url(
        api_key: String,
        callback_url: Option<String>,
        registry: Arc<JobRegistry>,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: require_api_key("lipsync_studio", api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            callback_url,
            registry,
        })
    }
}

#[async_trait]
impl VideoAvatarProvider for LipsyncStudioProvider {
    fn name(&self) -> &'static str {
        "lipsync_studio"
    }

    fn completion_mode(&self) -> CompletionMode {
        if self.callback_url.is_some() {
            CompletionMode::Webhook
        } else {
            CompletionMode::Polling
        }
    }

    fn supports_resolution(&self, resolution: VideoResolution) -> bool {
        resolution != VideoResolution::FullHd1080
    }

    async fn create_avatar(&self, source_url: &str) -> Result<AvatarHandle, ProviderError> {
        verify_reachable(&self.http, source_url).await?;
        Ok(AvatarHandle {
            avatar_id: source_url.to_string(),
            status: JobStatus::Ready,
        })
    }

    async fn get_avatar_status(&self, avatar_id: &str) -> Result<AvatarHandle, ProviderError> {
        Ok(AvatarHandle {
            avatar_id: avatar_id.to_string(),
            status: JobStatus::Ready,
        })
    }

    async fn generate_talking_video(
        &self,
        avatar_id: &str,
        audio_url: &str,
        resolution: VideoResolution,
    ) -> Result<ProviderJob, ProviderError> {
        if !self.supports_resolution(resolution) {
            return Err(ProviderError::NotSupported(format!(
                "lipsync_studio cannot render {}",
                resolution
            )));
        }

        let mut body = json!({
            "formState": {
                "video": avatar_id,
                "audio": audio_url,
                "resolution": resolution.as_str(),
            },
        });
        if let Some(callback_url) = &self.callback_url {
            body["webhook"] = json!(callback_url);
        }

        let resp = self
            .http
            .post(format!("{}/lipsync-video", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let created: LipsyncJob = match read_json(resp).await {
            Err(ProviderError::Status { status, body }) if (400..500).contains(&status) => {
                return Err(ProviderError::Generate(format!("{status}: {body}")));
            }
            other => other?,
        };

        let job_id = created
            .correlation_id()
            .ok_or_else(|| ProviderError::Generate("lipsync.studio returned no job id".into()))?
            .to_string();

        info!(%job_id, mode = ?self.completion_mode(), "lipsync_studio: job submitted");
        if self.callback_url.is_some() {
            return Ok(self.registry.register_pending(&job_id));
        }
        Ok(ProviderJob::submitted(job_id))
    }

    async fn get_video_status(&self, job_id: &str) -> Result<ProviderJob, ProviderError> {
        if self.callback_url.is_some() {
            return self
                .registry
                .get_result(job_id)
                .map_err(|_| ProviderError::Generate(format!("job {job_id} is not registered")));
        }

        let resp = self
            .http
            .get(format!("{}/jobs/{}", self.base_url, job_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        let job: LipsyncJob = read_json(resp).await?;

        debug!(%job_id, status = ?job.status, "lipsync_studio: job status");
        Ok(ProviderJob::observed(job_id, job.state()))
    }

    async fn generate_idle_video(
        &self,
        _avatar_id: &str,
        _duration_seconds: u32,
    ) -> Result<ProviderJob, ProviderError> {
        Err(ProviderError::NotSupported(
            "lipsync_studio only re-syncs speech over a source clip".into(),
        ))
    }

    fn parse_callback(&self, payload: &serde_json::Value) -> Result<CallbackUpdate, ProviderError> {
        let job = LipsyncJob::deserialize(payload)
            .map_err(|err| ProviderError::InvalidCallback(err.to_string()))?;
        let job_id = job
            .correlation_id()
            .ok_or_else(|| ProviderError::InvalidCallback("missing id".into()))?
            .to_string();

        Ok(CallbackUpdate {
            job_id,
            state: job.state(),
        })
    }
}
