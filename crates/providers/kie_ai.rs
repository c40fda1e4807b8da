use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::{
    domain::value_objects::{
        avatars::AvatarHandle,
        enums::{job_statuses::JobStatus, video_resolutions::VideoResolution},
        provider_jobs::{CallbackUpdate, CompletionMode, JobState, ProviderJob},
    },
    providers::{ProviderError, VideoAvatarProvider, read_json, require_api_key, verify_reachable},
    reconcilers::job_registry::JobRegistry,
};

const KIE_API_BASE: &str = "https://api.kie.ai/api/v1";
const KIE_OK: i64 = 200;
const KIE_MODEL: &str = "infinitalk/from-audio";
const KIE_PROMPT: &str = "A person speaking naturally";

/// kie.ai InfiniteTalk: animates a still image from an audio track. Results only ever
/// arrive by callback, so status reads go to the job registry.
pub struct KieAiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    callback_url: String,
    registry: Arc<JobRegistry>,
}

#[derive(Debug, Deserialize)]
struct KieEnvelope<T> {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreated {
    task_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskRecord {
    #[serde(default)]
    task_id: Option<String>,
    #[serde(default)]
    state: Option<String>,
    /// JSON encoded as a string: `{"resultUrls":["..."]}`.
    #[serde(default)]
    result_json: Option<String>,
    #[serde(default)]
    fail_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskResult {
    #[serde(default)]
    result_urls: Vec<String>,
}

impl TaskRecord {
    fn state(&self) -> JobState {
        match self.state.as_deref() {
            Some("success") => {
                let first_url = self
                    .result_json
                    .as_deref()
                    .and_then(|raw| serde_json::from_str::<TaskResult>(raw).ok())
                    .and_then(|result| result.result_urls.into_iter().next());
                match first_url {
                    Some(result_url) => JobState::Ready {
                        result_url,
                        duration_seconds: None,
                    },
                    None => JobState::Failed {
                        error_message: "kie.ai succeeded without a result url".into(),
                    },
                }
            }
            Some("fail") => JobState::Failed {
                error_message: self
                    .fail_msg
                    .clone()
                    .filter(|msg| !msg.is_empty())
                    .unwrap_or_else(|| "kie.ai generation failed".into()),
            },
            Some("running") | Some("generating") => JobState::Processing,
            _ => JobState::Pending,
        }
    }
}

fn resolution_param(resolution: VideoResolution) -> Option<&'static str> {
    match resolution {
        VideoResolution::Sd480 => Some("480p"),
        VideoResolution::Hd720 => Some("720p"),
        VideoResolution::FullHd1080 => None,
    }
}

impl KieAiProvider {
    pub fn new(
        api_key: String,
        callback_url: Option<String>,
        registry: Arc<JobRegistry>,
    ) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, callback_url, registry, KIE_API_BASE.to_string())
    }

    pub fn with_base_url(
        api_key: String,
        callback_url: Option<String>,
        registry: Arc<JobRegistry>,
        base_url: String,
    ) -> Result<Self, ProviderError> {
        let callback_url = callback_url.filter(|url| !url.is_empty()).ok_or_else(|| {
            ProviderError::Config("kie_ai delivers results by callback only; PUBLIC_BASE_URL is required".into())
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            api_key: require_api_key("kie_ai", api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            callback_url,
            registry,
        })
    }
}

#[async_trait]
impl VideoAvatarProvider for KieAiProvider {
    fn name(&self) -> &'static str {
        "kie_ai"
    }

    fn completion_mode(&self) -> CompletionMode {
        CompletionMode::Webhook
    }

    fn supports_resolution(&self, resolution: VideoResolution) -> bool {
        resolution_param(resolution).is_some()
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
        let resolution = resolution_param(resolution).ok_or_else(|| {
            ProviderError::NotSupported(format!("kie_ai cannot render {}", resolution))
        })?;

        let resp = self
            .http
            .post(format!("{}/jobs/createTask", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": KIE_MODEL,
                "callBackUrl": self.callback_url,
                "input": {
                    "image_url": avatar_id,
                    "audio_url": audio_url,
                    "prompt": KIE_PROMPT,
                    "resolution": resolution,
                },
            }))
            .send()
            .await?;
        let envelope: KieEnvelope<TaskCreated> = read_json(resp).await?;

        if envelope.code != KIE_OK {
            return Err(ProviderError::Generate(envelope.msg.unwrap_or_else(|| {
                format!("kie.ai returned code {}", envelope.code)
            })));
        }
        let task = envelope
            .data
            .ok_or_else(|| ProviderError::Generate("kie.ai returned no task id".into()))?;

        info!(job_id = %task.task_id, "kie_ai: task submitted");
        Ok(self.registry.register_pending(&task.task_id))
    }

    async fn get_video_status(&self, job_id: &str) -> Result<ProviderJob, ProviderError> {
        self.registry
            .get_result(job_id)
            .map_err(|_| ProviderError::Generate(format!("task {job_id} is not registered")))
    }

    async fn generate_idle_video(
        &self,
        _avatar_id: &str,
        _duration_seconds: u32,
    ) -> Result<ProviderJob, ProviderError> {
        Err(ProviderError::NotSupported(
            "kie_ai renders speech only, no idle loop".into(),
        ))
    }

    fn parse_callback(&self, payload: &serde_json::Value) -> Result<CallbackUpdate, ProviderError> {
        // The callback reuses the record envelope; some deliveries omit it.
        let record_value = payload.get("data").unwrap_or(payload);
        let record = TaskRecord::deserialize(record_value)
            .map_err(|err| ProviderError::InvalidCallback(err.to_string()))?;

        let job_id = record
            .task_id
            .clone()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProviderError::InvalidCallback("missing taskId".into()))?;

        let state = record.state();
        if let JobState::Failed { error_message } = &state {
            warn!(%job_id, %error_message, "kie_ai: task failed");
        }
        Ok(CallbackUpdate { job_id, state })
    }
}
