use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::avatar_assets::{AvatarAssetEntity, UpsertAvatarAssetEntity},
    value_objects::enums::job_statuses::JobStatus,
};

#[automock]
#[async_trait]
pub trait AvatarAssetRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<AvatarAssetEntity>>;

    async fn upsert(&self, avatar: UpsertAvatarAssetEntity) -> Result<AvatarAssetEntity>;

    async fn update_status(&self, user_id: Uuid, avatar_status: JobStatus) -> Result<()>;

    async fn update_idle_video(
        &self,
        user_id: Uuid,
        idle_video_url: Option<String>,
        idle_video_status: JobStatus,
    ) -> Result<()>;
}
