use crates::domain::{
    errors::{VisioError, VisioResult},
    repositories::avatar_assets::AvatarAssetRepository,
    value_objects::{
        enums::{video_resolutions::VideoResolution, visio_states::VisioState},
        visio_sessions::TurnResult,
    },
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::usecases::{
    rendering::VideoRenderer, speech_pipeline::SpeechPipeline, usage_ledger::UsageLedger,
    visio_sessions::VisioSessionUseCase,
};

/// A turn never starts with less than this much quota left.
pub const MIN_TURN_SECONDS: i32 = 1;

#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub resolution: VideoResolution,
    /// Billed when the provider does not report a duration.
    pub fallback_clip_seconds: u32,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            resolution: VideoResolution::default(),
            fallback_clip_seconds: 5,
        }
    }
}

/// One uploaded utterance.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub audio: Vec<u8>,
    pub file_name: String,
}

/// Runs one conversational turn: speech in, lip-synced avatar video out.
///
/// The session moves `recording -> processing` before any paid call and only reaches
/// `talking` once the video is ready. Quota is charged with the rendered duration after
/// that point and never for a failed or timed-out render.
#[derive(Clone)]
pub struct TurnOrchestrator {
    sessions: Arc<VisioSessionUseCase>,
    usage: Arc<UsageLedger>,
    avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
    speech: Arc<SpeechPipeline>,
    renderer: Arc<VideoRenderer>,
    settings: TurnSettings,
}

impl TurnOrchestrator {
    pub fn new(
        sessions: Arc<VisioSessionUseCase>,
        usage: Arc<UsageLedger>,
        avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
        speech: Arc<SpeechPipeline>,
        renderer: Arc<VideoRenderer>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            sessions,
            usage,
            avatar_repo,
            speech,
            renderer,
            settings,
        }
    }

    pub async fn run_turn(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        input: TurnInput,
    ) -> VisioResult<TurnResult> {
        let session = self.sessions.find_live(user_id, session_id).await?;
        let current = VisioState::from_str(&session.state);
        if current != VisioState::Recording {
            return Err(VisioError::InvalidTransition {
                from: current,
                to: VisioState::Processing,
            });
        }
        self.sessions
            .advance(session_id, VisioState::Recording, VisioState::Processing)
            .await?;

        info!(%user_id, %session_id, bytes = input.audio.len(), "turn_orchestrator: turn started");

        // Detached so a dropped request still drives the session out of `processing`.
        let this = self.clone();
        tokio::spawn(async move { this.finish_turn(user_id, session_id, input).await })
            .await
            .map_err(|err| {
                error!(%session_id, error = %err, "turn_orchestrator: turn task aborted");
                VisioError::Internal(anyhow::anyhow!("turn task aborted: {}", err))
            })?
    }

    async fn finish_turn(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        input: TurnInput,
    ) -> VisioResult<TurnResult> {
        match self.process(user_id, session_id, input).await {
            Ok(result) => Ok(result),
            Err(err) => {
                let fallback = if is_refusal(&err) {
                    VisioState::Idle
                } else {
                    VisioState::Error
                };
                warn!(
                    %user_id,
                    %session_id,
                    error = %err,
                    next_state = %fallback,
                    "turn_orchestrator: turn aborted"
                );

                if let Err(state_err) = self
                    .sessions
                    .advance(session_id, VisioState::Processing, fallback)
                    .await
                {
                    error!(
                        %session_id,
                        error = %state_err,
                        "turn_orchestrator: failed to leave processing"
                    );
                }
                Err(err)
            }
        }
    }

    async fn process(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        input: TurnInput,
    ) -> VisioResult<TurnResult> {
        let avatar = self
            .avatar_repo
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| VisioError::NotFound("avatar".to_string()))?;

        if !self.usage.check_quota(user_id, MIN_TURN_SECONDS).await? {
            let usage = self.usage.get_or_create(user_id).await?;
            return Err(VisioError::QuotaExceeded {
                remaining_seconds: usage.remaining_seconds,
            });
        }

        let user_text = self.speech.transcribe(input.audio, input.file_name).await?;
        let ai_response = self
            .speech
            .reply(avatar.personality_prompt.as_deref(), &user_text)
            .await?;

        let object_name = format!("visio/{}/{}/{}.mp3", user_id, session_id, Uuid::new_v4());
        let audio_url = self
            .speech
            .speak(&ai_response, avatar.voice_id.as_deref(), object_name)
            .await?;

        let rendered = self
            .renderer
            .render_talking(&avatar.avatar_id, &audio_url, self.settings.resolution)
            .await?;

        let duration_seconds = rendered
            .duration_seconds
            .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
            .unwrap_or_else(|| f64::from(self.settings.fallback_clip_seconds));

        let usage = self.usage.consume(user_id, duration_seconds).await?;
        let session = self
            .sessions
            .complete_turn(session_id, duration_seconds.ceil() as i32)
            .await?;

        info!(
            %user_id,
            %session_id,
            job_id = %rendered.job_id,
            duration_seconds,
            usage_remaining = usage.remaining_seconds,
            "turn_orchestrator: turn completed"
        );

        Ok(TurnResult {
            session: session.into(),
            user_text,
            ai_response,
            video_url: rendered.video_url,
            audio_url,
            duration_seconds,
            usage_remaining: usage.remaining_seconds,
        })
    }
}

/// Refusals happen before anything billable and send the session back to `idle`.
fn is_refusal(err: &VisioError) -> bool {
    matches!(
        err,
        VisioError::QuotaExceeded { .. }
            | VisioError::InsufficientCredits { .. }
            | VisioError::InvalidInput(_)
    )
}

#[cfg(test)]
mod tests;
