use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::avatar_assets;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = avatar_assets, primary_key(user_id))]
pub struct AvatarAssetEntity {
    pub user_id: Uuid,
    pub provider: String,
    pub avatar_id: String,
    pub avatar_status: String,
    pub voice_id: Option<String>,
    pub personality_prompt: Option<String>,
    pub idle_video_url: Option<String>,
    pub idle_video_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Re-creating an avatar resets the idle loop, which belonged to the previous source image.
#[derive(Debug, Clone, Insertable, AsChangeset)]
#[diesel(table_name = avatar_assets, treat_none_as_null = true)]
pub struct UpsertAvatarAssetEntity {
    pub user_id: Uuid,
    pub provider: String,
    pub avatar_id: String,
    pub avatar_status: String,
    pub voice_id: Option<String>,
    pub personality_prompt: Option<String>,
    pub idle_video_url: Option<String>,
    pub idle_video_status: Option<String>,
    pub updated_at: DateTime<Utc>,
}
