use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{
    entities::avatar_assets::{AvatarAssetEntity, UpsertAvatarAssetEntity},
    repositories::avatar_assets::AvatarAssetRepository,
    value_objects::enums::job_statuses::JobStatus,
};

#[derive(Default)]
pub struct AvatarAssetMemory {
    avatars: DashMap<Uuid, AvatarAssetEntity>,
}

impl AvatarAssetMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvatarAssetRepository for AvatarAssetMemory {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<AvatarAssetEntity>> {
        Ok(self.avatars.get(&user_id).map(|row| row.clone()))
    }

    async fn upsert(&self, avatar: UpsertAvatarAssetEntity) -> Result<AvatarAssetEntity> {
        let created_at = self
            .avatars
            .get(&avatar.user_id)
            .map(|row| row.created_at)
            .unwrap_or(avatar.updated_at);

        let entity = AvatarAssetEntity {
            user_id: avatar.user_id,
            provider: avatar.provider,
            avatar_id: avatar.avatar_id,
            avatar_status: avatar.avatar_status,
            voice_id: avatar.voice_id,
            personality_prompt: avatar.personality_prompt,
            idle_video_url: avatar.idle_video_url,
            idle_video_status: avatar.idle_video_status,
            created_at,
            updated_at: avatar.updated_at,
        };
        self.avatars.insert(entity.user_id, entity.clone());

        Ok(entity)
    }

    async fn update_status(&self, user_id: Uuid, avatar_status: JobStatus) -> Result<()> {
        if let Some(mut avatar) = self.avatars.get_mut(&user_id) {
            avatar.avatar_status = avatar_status.to_string();
            avatar.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_idle_video(
        &self,
        user_id: Uuid,
        idle_video_url: Option<String>,
        idle_video_status: JobStatus,
    ) -> Result<()> {
        if let Some(mut avatar) = self.avatars.get_mut(&user_id) {
            avatar.idle_video_url = idle_video_url;
            avatar.idle_video_status = Some(idle_video_status.to_string());
            avatar.updated_at = Utc::now();
        }
        Ok(())
    }
}
