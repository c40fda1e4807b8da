use chrono::Utc;
use crates::{
    domain::{
        entities::avatar_assets::{AvatarAssetEntity, UpsertAvatarAssetEntity},
        errors::{VisioError, VisioResult},
        repositories::avatar_assets::AvatarAssetRepository,
        value_objects::{
            avatars::{AvatarDto, CreateAvatarModel},
            enums::job_statuses::JobStatus,
        },
    },
};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::usecases::rendering::VideoRenderer;

pub const DEFAULT_IDLE_SECONDS: u32 = 10;
const MAX_IDLE_SECONDS: u32 = 30;

pub struct AvatarUseCase {
    avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
    renderer: Arc<VideoRenderer>,
}

impl AvatarUseCase {
    pub fn new(
        avatar_repo: Arc<dyn AvatarAssetRepository + Send + Sync>,
        renderer: Arc<VideoRenderer>,
    ) -> Self {
        Self {
            avatar_repo,
            renderer,
        }
    }

    pub async fn create_avatar(
        &self,
        user_id: Uuid,
        model: CreateAvatarModel,
    ) -> VisioResult<AvatarDto> {
        let source_url = model.source_image_url.trim();
        if source_url.is_empty() {
            return Err(VisioError::InvalidInput(
                "source_image_url is required".to_string(),
            ));
        }

        let provider = self.renderer.provider();
        let handle = provider.create_avatar(source_url).await?;
        info!(
            %user_id,
            provider = provider.name(),
            avatar_id = %handle.avatar_id,
            status = %handle.status,
            "avatars: avatar created"
        );

        let avatar = self
            .avatar_repo
            .upsert(UpsertAvatarAssetEntity {
                user_id,
                provider: provider.name().to_string(),
                avatar_id: handle.avatar_id,
                avatar_status: handle.status.to_string(),
                voice_id: model.voice_id.filter(|voice| !voice.trim().is_empty()),
                personality_prompt: model
                    .personality_prompt
                    .filter(|prompt| !prompt.trim().is_empty()),
                idle_video_url: None,
                idle_video_status: None,
                updated_at: Utc::now(),
            })
            .await?;

        Ok(avatar.into())
    }

    /// Returns the stored avatar, refreshing a status that is still in flight.
    pub async fn get_avatar(&self, user_id: Uuid) -> VisioResult<AvatarDto> {
        let mut avatar = self.find(user_id).await?;
        let stored_status = JobStatus::from_str(&avatar.avatar_status);

        if !stored_status.is_terminal() {
            match self.renderer.provider().get_avatar_status(&avatar.avatar_id).await {
                Ok(handle) if handle.status != stored_status => {
                    self.avatar_repo.update_status(user_id, handle.status).await?;
                    info!(
                        %user_id,
                        avatar_id = %avatar.avatar_id,
                        status = %handle.status,
                        "avatars: status refreshed"
                    );
                    avatar.avatar_status = handle.status.to_string();
                }
                Ok(_) => {}
                Err(err) if err.is_transient() => {
                    warn!(
                        %user_id,
                        avatar_id = %avatar.avatar_id,
                        error = %err,
                        "avatars: status refresh failed, returning stored status"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        Ok(avatar.into())
    }

    /// Renders the silent loop shown between turns, or returns it if it already exists.
    pub async fn generate_idle(
        &self,
        user_id: Uuid,
        duration_seconds: Option<u32>,
    ) -> VisioResult<AvatarDto> {
        let avatar = self.find(user_id).await?;

        let idle_ready = avatar.idle_video_status.as_deref().map(JobStatus::from_str)
            == Some(JobStatus::Ready);
        if idle_ready && avatar.idle_video_url.is_some() {
            return Ok(avatar.into());
        }

        if JobStatus::from_str(&avatar.avatar_status) != JobStatus::Ready {
            return Err(VisioError::InvalidInput(format!(
                "avatar is not ready (status {})",
                avatar.avatar_status
            )));
        }

        let duration = duration_seconds
            .unwrap_or(DEFAULT_IDLE_SECONDS)
            .clamp(1, MAX_IDLE_SECONDS);
        let job = self
            .renderer
            .provider()
            .generate_idle_video(&avatar.avatar_id, duration)
            .await?;

        self.avatar_repo
            .update_idle_video(user_id, None, JobStatus::Processing)
            .await?;

        match self.renderer.wait(job).await {
            Ok(rendered) => {
                self.avatar_repo
                    .update_idle_video(user_id, Some(rendered.video_url), JobStatus::Ready)
                    .await?;
                info!(%user_id, job_id = %rendered.job_id, "avatars: idle loop ready");
            }
            Err(err) => {
                self.avatar_repo
                    .update_idle_video(user_id, None, JobStatus::Failed)
                    .await?;
                return Err(err);
            }
        }

        Ok(self.find(user_id).await?.into())
    }

    async fn find(&self, user_id: Uuid) -> VisioResult<AvatarAssetEntity> {
        self.avatar_repo
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| VisioError::NotFound("avatar".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crates::{
        domain::value_objects::{
            avatars::AvatarHandle,
            provider_jobs::{CompletionMode, JobState, ProviderJob},
        },
        infra::memory::avatar_assets::AvatarAssetMemory,
        providers::{MockVideoAvatarProvider, ProviderError},
        reconcilers::{ReconcilePolicies, job_registry::JobRegistry},
    };

    fn mock_provider() -> MockVideoAvatarProvider {
        let mut provider = MockVideoAvatarProvider::new();
        provider.expect_name().return_const("heygen");
        provider
            .expect_completion_mode()
            .return_const(CompletionMode::Polling);
        provider
    }

    fn usecase(
        provider: MockVideoAvatarProvider,
        avatars: Arc<AvatarAssetMemory>,
    ) -> AvatarUseCase {
        let renderer = VideoRenderer::new(
            Arc::new(provider),
            Arc::new(JobRegistry::new()),
            ReconcilePolicies::default(),
        );
        AvatarUseCase::new(avatars, Arc::new(renderer))
    }

    fn create_model() -> CreateAvatarModel {
        CreateAvatarModel {
            source_image_url: "https://cdn.test/face.jpg".to_string(),
            voice_id: Some("voice-1".to_string()),
            personality_prompt: Some("Cheerful".to_string()),
        }
    }

    #[tokio::test]
    async fn create_persists_the_provider_handle() {
        let mut provider = mock_provider();
        provider.expect_create_avatar().times(1).returning(|_| {
            Ok(AvatarHandle {
                avatar_id: "photo-1".to_string(),
                status: JobStatus::Processing,
            })
        });
        let avatars = Arc::new(AvatarAssetMemory::new());
        let usecase = usecase(provider, avatars.clone());
        let user_id = Uuid::new_v4();

        let avatar = usecase.create_avatar(user_id, create_model()).await.unwrap();

        assert_eq!(avatar.avatar_id, "photo-1");
        assert_eq!(avatar.status, JobStatus::Processing);
        assert_eq!(avatar.provider, "heygen");
        let stored = avatars.find_by_user(user_id).await.unwrap().unwrap();
        assert_eq!(stored.voice_id.as_deref(), Some("voice-1"));
    }

    #[tokio::test]
    async fn create_rejects_blank_source() {
        let usecase = usecase(mock_provider(), Arc::new(AvatarAssetMemory::new()));
        let mut model = create_model();
        model.source_image_url = "   ".to_string();

        let err = usecase
            .create_avatar(Uuid::new_v4(), model)
            .await
            .unwrap_err();

        assert!(matches!(err, VisioError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn get_refreshes_pending_status() {
        let mut provider = mock_provider();
        provider.expect_create_avatar().returning(|_| {
            Ok(AvatarHandle {
                avatar_id: "photo-1".to_string(),
                status: JobStatus::Pending,
            })
        });
        provider.expect_get_avatar_status().times(1).returning(|id| {
            Ok(AvatarHandle {
                avatar_id: id.to_string(),
                status: JobStatus::Ready,
            })
        });
        let usecase = usecase(provider, Arc::new(AvatarAssetMemory::new()));
        let user_id = Uuid::new_v4();
        usecase.create_avatar(user_id, create_model()).await.unwrap();

        let first = usecase.get_avatar(user_id).await.unwrap();
        let second = usecase.get_avatar(user_id).await.unwrap();

        assert_eq!(first.status, JobStatus::Ready);
        assert_eq!(second.status, JobStatus::Ready);
    }

    #[tokio::test]
    async fn missing_avatar_is_not_found() {
        let usecase = usecase(mock_provider(), Arc::new(AvatarAssetMemory::new()));

        let err = usecase.get_avatar(Uuid::new_v4()).await.unwrap_err();

        assert!(matches!(err, VisioError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_loop_is_rendered_once() {
        let mut provider = mock_provider();
        provider.expect_create_avatar().returning(|_| {
            Ok(AvatarHandle {
                avatar_id: "photo-1".to_string(),
                status: JobStatus::Ready,
            })
        });
        provider
            .expect_generate_idle_video()
            .withf(|avatar_id, duration| avatar_id.to_string() == "photo-1" && *duration == DEFAULT_IDLE_SECONDS)
            .times(1)
            .returning(|_, _| Ok(ProviderJob::submitted("idle-1")));
        provider.expect_get_video_status().returning(|job_id| {
            Ok(ProviderJob::observed(
                job_id,
                JobState::Ready {
                    result_url: "https://cdn.test/idle.mp4".to_string(),
                    duration_seconds: Some(10.0),
                },
            ))
        });
        let usecase = usecase(provider, Arc::new(AvatarAssetMemory::new()));
        let user_id = Uuid::new_v4();
        usecase.create_avatar(user_id, create_model()).await.unwrap();

        let first = usecase.generate_idle(user_id, None).await.unwrap();
        let second = usecase.generate_idle(user_id, None).await.unwrap();

        assert_eq!(first.idle_video_url.as_deref(), Some("https://cdn.test/idle.mp4"));
        assert_eq!(first.idle_video_status, Some(JobStatus::Ready));
        assert_eq!(second.idle_video_url, first.idle_video_url);
    }

    #[tokio::test]
    async fn idle_loop_not_supported_is_surfaced() {
        let mut provider = mock_provider();
        provider.expect_create_avatar().returning(|_| {
            Ok(AvatarHandle {
                avatar_id: "https://cdn.test/source.mp4".to_string(),
                status: JobStatus::Ready,
            })
        });
        provider
            .expect_generate_idle_video()
            .returning(|_, _| Err(ProviderError::NotSupported("idle loop".to_string())));
        let usecase = usecase(provider, Arc::new(AvatarAssetMemory::new()));
        let user_id = Uuid::new_v4();
        usecase.create_avatar(user_id, create_model()).await.unwrap();

        let err = usecase.generate_idle(user_id, Some(5)).await.unwrap_err();

        assert!(matches!(err, VisioError::NotSupported(_)));
    }
}
