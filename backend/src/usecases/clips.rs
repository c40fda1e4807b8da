use crates::domain::{
    errors::{VisioError, VisioResult},
    repositories::avatar_assets::AvatarAssetRepository,
    value_objects::{
        clips::{ClipResult, GenerateClipModel},
        enums::{job_statuses::JobStatus, transaction_types::TransactionType},
    },
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::usecases::{
    credit_ledger::CreditLedger, rendering::VideoRenderer, speech_pipeline::SpeechPipeline,
};

const MAX_CLIP_TEXT_CHARS: usize = 1_000;

/// One-off avatar clips paid with credits rather than visio seconds.
pub struct ClipUseCase {
    credits: Arc<CreditLedger>,
    avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
    speech: Arc<SpeechPipeline>,
    renderer: Arc<VideoRenderer>,
}

impl ClipUseCase {
    pub fn new(
        credits: Arc<CreditLedger>,
        avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
        speech: Arc<SpeechPipeline>,
        renderer: Arc<VideoRenderer>,
    ) -> Self {
        Self {
            credits,
            avatar_repo,
            speech,
            renderer,
        }
    }

    pub async fn generate_clip(
        &self,
        user_id: Uuid,
        model: GenerateClipModel,
    ) -> VisioResult<ClipResult> {
        let text = model.text.trim();
        if text.is_empty() || text.chars().count() > MAX_CLIP_TEXT_CHARS {
            return Err(VisioError::InvalidInput(format!(
                "text must be between 1 and {} characters",
                MAX_CLIP_TEXT_CHARS
            )));
        }

        let resolution = model.resolution;
        let cost = resolution.credit_cost();
        let provider = self.renderer.provider();
        if !provider.supports_resolution(resolution) {
            return Err(VisioError::NotSupported(format!(
                "{} cannot render {}",
                provider.name(),
                resolution
            )));
        }

        let balance = self.credits.get_balance(user_id).await?;
        if balance < cost {
            warn!(%user_id, balance, cost, "clips: not enough credits");
            return Err(VisioError::InsufficientCredits {
                balance,
                required: cost,
            });
        }

        let avatar = self
            .avatar_repo
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| VisioError::NotFound("avatar".to_string()))?;
        if JobStatus::from_str(&avatar.avatar_status) != JobStatus::Ready {
            return Err(VisioError::InvalidInput(format!(
                "avatar is not ready (status {})",
                avatar.avatar_status
            )));
        }

        let object_name = format!("clips/{}/{}.mp3", user_id, Uuid::new_v4());
        let audio_url = self
            .speech
            .speak(text, avatar.voice_id.as_deref(), object_name)
            .await?;

        let rendered = self
            .renderer
            .render_talking(&avatar.avatar_id, &audio_url, resolution)
            .await?;

        let (credits_charged, new_balance) = match self
            .credits
            .deduct(
                user_id,
                cost,
                TransactionType::VideoGeneration,
                Some(format!("Video generation {}", resolution)),
            )
            .await
        {
            Ok(change) => (cost, change.new_balance),
            Err(VisioError::InsufficientCredits { balance, .. }) => {
                warn!(
                    %user_id,
                    job_id = %rendered.job_id,
                    balance,
                    cost,
                    "clips: balance spent during render, delivering uncharged"
                );
                (0, balance)
            }
            Err(err) => return Err(err),
        };

        info!(
            %user_id,
            job_id = %rendered.job_id,
            %resolution,
            credits_charged,
            new_balance,
            "clips: clip delivered"
        );

        Ok(ClipResult {
            video_url: rendered.video_url,
            audio_url,
            resolution,
            credits_charged,
            new_balance,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crates::{
        domain::{
            entities::avatar_assets::UpsertAvatarAssetEntity,
            repositories::{
                language_models::MockReplyGenerator,
                speech::{MockSpeechSynthesizer, MockTranscriber},
                storage::MockMediaStorage,
            },
            value_objects::{
                enums::video_resolutions::VideoResolution,
                provider_jobs::{CompletionMode, JobState, ProviderJob},
            },
        },
        infra::memory::{
            avatar_assets::AvatarAssetMemory, credits::CreditMemory,
            subscriptions::SubscriptionMemory,
        },
        providers::MockVideoAvatarProvider,
        reconcilers::{ReconcilePolicies, job_registry::JobRegistry},
    };

    use crate::usecases::plan_resolver::PlanResolver;

    struct Harness {
        clips: ClipUseCase,
        credits: Arc<CreditLedger>,
        user_id: Uuid,
    }

    fn provider(final_state: JobState, renders: usize) -> MockVideoAvatarProvider {
        let mut provider = MockVideoAvatarProvider::new();
        provider.expect_name().return_const("heygen");
        provider
            .expect_completion_mode()
            .return_const(CompletionMode::Polling);
        provider
            .expect_supports_resolution()
            .returning(|resolution| resolution != VideoResolution::FullHd1080);
        provider
            .expect_generate_talking_video()
            .times(renders)
            .returning(|_, _, _| Ok(ProviderJob::submitted("clip-1")));
        provider
            .expect_get_video_status()
            .returning(move |job_id| Ok(ProviderJob::observed(job_id, final_state.clone())));
        provider
    }

    fn speech() -> SpeechPipeline {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_, _| Ok(vec![9, 9, 9]));
        let mut storage = MockMediaStorage::new();
        storage
            .expect_store()
            .returning(|_, name| Ok(format!("https://cdn.test/{}", name)));

        SpeechPipeline::new(
            Arc::new(MockTranscriber::new()),
            Arc::new(MockReplyGenerator::new()),
            Arc::new(synthesizer),
            Arc::new(storage),
            "default-voice".to_string(),
        )
    }

    async fn harness(provider: MockVideoAvatarProvider, starting_credits: i32) -> Harness {
        let user_id = Uuid::new_v4();

        let subscriptions: Arc<SubscriptionMemory> = Arc::new(SubscriptionMemory::new());
        let plan_resolver = Arc::new(PlanResolver::new(subscriptions.clone()));
        let credits = Arc::new(CreditLedger::new(
            Arc::new(CreditMemory::new()),
            subscriptions,
            plan_resolver,
        ));
        if starting_credits > 0 {
            credits
                .add(user_id, starting_credits, TransactionType::Purchase, None)
                .await
                .unwrap();
        }

        let avatars = Arc::new(AvatarAssetMemory::new());
        avatars
            .upsert(UpsertAvatarAssetEntity {
                user_id,
                provider: "heygen".to_string(),
                avatar_id: "avatar-1".to_string(),
                avatar_status: JobStatus::Ready.to_string(),
                voice_id: None,
                personality_prompt: None,
                idle_video_url: None,
                idle_video_status: None,
                updated_at: Utc::now(),
            })
            .await
            .unwrap();

        let renderer = VideoRenderer::new(
            Arc::new(provider),
            Arc::new(JobRegistry::new()),
            ReconcilePolicies::default(),
        );

        Harness {
            clips: ClipUseCase::new(credits.clone(), avatars, Arc::new(speech()), Arc::new(renderer)),
            credits,
            user_id,
        }
    }

    fn clip(resolution: VideoResolution) -> GenerateClipModel {
        GenerateClipModel {
            text: "Welcome to the show".to_string(),
            resolution,
        }
    }

    fn ready() -> JobState {
        JobState::Ready {
            result_url: "https://cdn.test/clip-1.mp4".to_string(),
            duration_seconds: Some(3.0),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn charges_resolution_cost_after_render() {
        let h = harness(provider(ready(), 1), 5).await;

        let result = h
            .clips
            .generate_clip(h.user_id, clip(VideoResolution::Hd720))
            .await
            .unwrap();

        assert_eq!(result.video_url, "https://cdn.test/clip-1.mp4");
        assert_eq!(result.credits_charged, 2);
        assert_eq!(result.new_balance, 3);

        let history = h.credits.history(h.user_id, None).await.unwrap();
        assert_eq!(history[0].type_, "video_generation");
        assert_eq!(history[0].amount, -2);
    }

    #[tokio::test]
    async fn refuses_before_any_external_call_when_balance_is_short() {
        let h = harness(provider(ready(), 0), 1).await;

        let err = h
            .clips
            .generate_clip(h.user_id, clip(VideoResolution::Hd720))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            VisioError::InsufficientCredits {
                balance: 1,
                required: 2
            }
        ));
        assert_eq!(h.credits.get_balance(h.user_id).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_render_is_not_charged() {
        let h = harness(
            provider(
                JobState::Failed {
                    error_message: "audio too short".to_string(),
                },
                1,
            ),
            3,
        )
        .await;

        let err = h
            .clips
            .generate_clip(h.user_id, clip(VideoResolution::Sd480))
            .await
            .unwrap_err();

        assert!(matches!(err, VisioError::Generate(_)));
        assert_eq!(h.credits.get_balance(h.user_id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unsupported_resolution_is_rejected() {
        let h = harness(provider(ready(), 0), 10).await;

        let err = h
            .clips
            .generate_clip(h.user_id, clip(VideoResolution::FullHd1080))
            .await
            .unwrap_err();

        assert!(matches!(err, VisioError::NotSupported(_)));
        assert_eq!(h.credits.get_balance(h.user_id).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn blank_text_is_invalid() {
        let h = harness(provider(ready(), 0), 10).await;
        let mut model = clip(VideoResolution::Sd480);
        model.text = "  ".to_string();

        let err = h.clips.generate_clip(h.user_id, model).await.unwrap_err();

        assert!(matches!(err, VisioError::InvalidInput(_)));
    }
}
