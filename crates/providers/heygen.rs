use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::{
    domain::value_objects::{
        avatars::AvatarHandle,
        enums::{job_statuses::JobStatus, video_resolutions::VideoResolution},
        provider_jobs::{CompletionMode, JobState, ProviderJob},
    },
    providers::{ProviderError, VideoAvatarProvider, read_json, require_api_key},
};

const HEYGEN_API_BASE: &str = "https://api.heygen.com";
const HEYGEN_OK: i64 = 100;
/// HeyGen has no silent mode; the idle loop reads a near-empty script.
const IDLE_SCRIPT: &str = "...";
const IDLE_VOICE_ID: &str = "1bd001e7e50f421d891986aad5158bc8";

/// Polling-only backend: photo avatars and talking-photo renders.
pub struct HeyGenProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: i64,
    #[serde(default)]
    message: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct AvatarData {
    avatar_id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct VideoCreated {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoStatusData {
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

impl HeyGenProvider {
    pub fn new(api_key: String) -> Result<Self, ProviderError> {
        Self::with_base_url(api_key, HEYGEN_API_BASE.to_string())
    }

    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self, ProviderError> {
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: require_api_key("heygen", api_key)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn submit_video(&self, body: serde_json::Value) -> Result<ProviderJob, ProviderError> {
        let resp = self
            .http
            .post(self.url("/v2/video/generate"))
            .header("X-Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let envelope: Envelope<VideoCreated> = read_json(resp).await?;

        let created = accepted(envelope, ProviderError::Generate)?;
        info!(job_id = %created.video_id, "heygen: video submitted");
        Ok(ProviderJob::submitted(created.video_id))
    }
}

/// Unwraps `data` when HeyGen reports success, otherwise builds the error with `kind`.
fn accepted<T>(
    envelope: Envelope<T>,
    kind: fn(String) -> ProviderError,
) -> Result<T, ProviderError> {
    if envelope.code != HEYGEN_OK {
        return Err(kind(envelope.message.unwrap_or_else(|| {
            format!("heygen returned code {}", envelope.code)
        })));
    }
    envelope
        .data
        .ok_or_else(|| kind("heygen response without data".into()))
}

fn map_avatar_status(status: &str) -> JobStatus {
    match status.to_ascii_lowercase().as_str() {
        "completed" | "ready" | "success" => JobStatus::Ready,
        "processing" | "in_progress" => JobStatus::Processing,
        "failed" | "error" => JobStatus::Failed,
        _ => JobStatus::Pending,
    }
}

fn dimension(resolution: VideoResolution) -> serde_json::Value {
    let (width, height) = match resolution {
        VideoResolution::Sd480 => (854, 480),
        VideoResolution::Hd720 => (1280, 720),
        VideoResolution::FullHd1080 => (1920, 1080),
    };
    json!({ "width": width, "height": height })
}

fn video_state(data: VideoStatusData) -> JobState {
    match data.status.to_ascii_lowercase().as_str() {
        "completed" => match data.video_url {
            Some(result_url) => JobState::Ready {
                result_url,
                duration_seconds: data.duration,
            },
            None => JobState::Failed {
                error_message: "heygen reported completion without a video url".into(),
            },
        },
        "failed" => JobState::Failed {
            error_message: data
                .error
                .map(|err| match err {
                    serde_json::Value::String(message) => message,
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "heygen render failed".into()),
        },
        "processing" | "pending" | "waiting" => JobState::Processing,
        _ => JobState::Pending,
    }
}

#[async_trait]
impl VideoAvatarProvider for HeyGenProvider {
    fn name(&self) -> &'static str {
        "heygen"
    }

    fn completion_mode(&self) -> CompletionMode {
        CompletionMode::Polling
    }

    async fn create_avatar(&self, source_url: &str) -> Result<AvatarHandle, ProviderError> {
        let resp = self
            .http
            .post(self.url("/v2/photo_avatar"))
            .header("X-Api-Key", &self.api_key)
            .json(&json!({ "image_url": source_url }))
            .send()
            .await?;
        let envelope: Envelope<AvatarData> = match read_json(resp).await {
            Err(ProviderError::Status { status, body }) if (400..500).contains(&status) => {
                return Err(ProviderError::Upload(format!("{status}: {body}")));
            }
            other => other?,
        };

        let data = accepted(envelope, ProviderError::Upload)?;
        info!(avatar_id = %data.avatar_id, status = %data.status, "heygen: avatar created");
        Ok(AvatarHandle {
            avatar_id: data.avatar_id,
            status: map_avatar_status(&data.status),
        })
    }

    async fn get_avatar_status(&self, avatar_id: &str) -> Result<AvatarHandle, ProviderError> {
        let resp = self
            .http
            .get(self.url(&format!("/v2/photo_avatar/{}", avatar_id)))
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let envelope: Envelope<AvatarData> = read_json(resp).await?;
        let data = accepted(envelope, ProviderError::Generate)?;

        Ok(AvatarHandle {
            avatar_id: data.avatar_id,
            status: map_avatar_status(&data.status),
        })
    }

    async fn generate_talking_video(
        &self,
        avatar_id: &str,
        audio_url: &str,
        resolution: VideoResolution,
    ) -> Result<ProviderJob, ProviderError> {
        self.submit_video(json!({
            "video_inputs": [{
                "character": { "type": "talking_photo", "talking_photo_id": avatar_id },
                "voice": { "type": "audio", "audio_url": audio_url },
            }],
            "dimension": dimension(resolution),
        }))
        .await
    }

    async fn get_video_status(&self, job_id: &str) -> Result<ProviderJob, ProviderError> {
        let resp = self
            .http
            .get(self.url("/v1/video_status.get"))
            .query(&[("video_id", job_id)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;
        let envelope: Envelope<VideoStatusData> = read_json(resp).await?;
        let data = accepted(envelope, ProviderError::Generate)?;

        debug!(%job_id, status = %data.status, "heygen: video status");
        Ok(ProviderJob::observed(job_id, video_state(data)))
    }

    async fn generate_idle_video(
        &self,
        avatar_id: &str,
        duration_seconds: u32,
    ) -> Result<ProviderJob, ProviderError> {
        // One pause marker per second keeps the clip roughly the requested length.
        let script = vec![IDLE_SCRIPT; duration_seconds.max(1) as usize].join(" ");
        self.submit_video(json!({
            "video_inputs": [{
                "character": { "type": "talking_photo", "talking_photo_id": avatar_id },
                "voice": { "type": "text", "input_text": script, "voice_id": IDLE_VOICE_ID, "speed": 0.5 },
            }],
            "dimension": { "width": 512, "height": 512 },
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn provider(server: &MockServer) -> HeyGenProvider {
        HeyGenProvider::with_base_url("key".into(), server.uri()).unwrap()
    }

    #[tokio::test]
    async fn talking_video_is_submitted_pending() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/video/generate"))
            .and(header("X-Api-Key", "key"))
            .and(body_partial_json(json!({ "dimension": { "width": 1280, "height": 720 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 100,
                "data": { "video_id": "vid-1" }
            })))
            .mount(&server)
            .await;

        let job = provider(&server)
            .await
            .generate_talking_video("tp-1", "https://cdn/a.mp3", VideoResolution::Hd720)
            .await
            .unwrap();

        assert_eq!(job.job_id, "vid-1");
        assert_eq!(job.status(), JobStatus::Pending);
        assert!(job.submitted_at.is_some());
    }

    #[tokio::test]
    async fn rejected_generation_is_a_generate_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/video/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 400,
                "message": "invalid talking_photo_id"
            })))
            .mount(&server)
            .await;

        let result = provider(&server)
            .await
            .generate_talking_video("nope", "https://cdn/a.mp3", VideoResolution::Sd480)
            .await;

        assert!(matches!(result, Err(ProviderError::Generate(message)) if message.contains("talking_photo_id")));
    }

    #[tokio::test]
    async fn completed_status_carries_url_and_duration() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .and(query_param("video_id", "vid-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "code": 100,
                "data": {
                    "video_id": "vid-1",
                    "status": "completed",
                    "video_url": "https://cdn/vid-1.mp4",
                    "duration": 6.4
                }
            })))
            .mount(&server)
            .await;

        let job = provider(&server).await.get_video_status("vid-1").await.unwrap();

        assert_eq!(job.result_url(), Some("https://cdn/vid-1.mp4"));
        assert_eq!(job.duration_seconds(), Some(6.4));
        assert!(job.completed_at.is_some());
    }

    #[tokio::test]
    async fn server_errors_during_status_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/video_status.get"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .await
            .get_video_status("vid-1")
            .await
            .unwrap_err();

        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn rejected_photo_is_an_upload_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v2/photo_avatar"))
            .respond_with(ResponseTemplate::new(400).set_body_string("no face found"))
            .mount(&server)
            .await;

        let result = provider(&server).await.create_avatar("https://cdn/me.jpg").await;

        assert!(matches!(result, Err(ProviderError::Upload(_))));
    }

    #[test]
    fn failed_status_keeps_the_provider_message() {
        let state = video_state(VideoStatusData {
            status: "failed".into(),
            video_url: None,
            duration: None,
            error: Some(json!({ "code": 40001, "message": "audio too long" })),
        });

        assert!(matches!(state, JobState::Failed { error_message } if error_message.contains("audio too long")));
    }

    #[test]
    fn avatar_status_vocabulary() {
        assert_eq!(map_avatar_status("COMPLETED"), JobStatus::Ready);
        assert_eq!(map_avatar_status("in_progress"), JobStatus::Processing);
        assert_eq!(map_avatar_status("error"), JobStatus::Failed);
        assert_eq!(map_avatar_status("queued"), JobStatus::Pending);
    }

    #[tokio::test]
    async fn callbacks_are_not_supported() {
        let provider = HeyGenProvider::with_base_url("key".into(), "http://localhost".into()).unwrap();

        assert!(matches!(
            provider.parse_callback(&json!({ "id": "x" })),
            Err(ProviderError::NotSupported(_))
        ));
    }
}
