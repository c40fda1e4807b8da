use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    entities::avatar_assets::AvatarAssetEntity,
    value_objects::enums::job_statuses::JobStatus,
};

/// What a provider hands back when asked to build an avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvatarHandle {
    pub avatar_id: String,
    pub status: JobStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAvatarModel {
    pub source_image_url: String,
    pub voice_id: Option<String>,
    pub personality_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateIdleModel {
    pub duration_seconds: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvatarDto {
    pub provider: String,
    pub avatar_id: String,
    pub status: JobStatus,
    pub voice_id: Option<String>,
    pub idle_video_url: Option<String>,
    pub idle_video_status: Option<JobStatus>,
    pub updated_at: DateTime<Utc>,
}

impl From<AvatarAssetEntity> for AvatarDto {
    fn from(value: AvatarAssetEntity) -> Self {
        Self {
            provider: value.provider,
            avatar_id: value.avatar_id,
            status: JobStatus::from_str(&value.avatar_status),
            voice_id: value.voice_id,
            idle_video_url: value.idle_video_url,
            idle_video_status: value.idle_video_status.as_deref().map(JobStatus::from_str),
            updated_at: value.updated_at,
        }
    }
}
