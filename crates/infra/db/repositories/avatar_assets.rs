use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::avatar_assets},
};
use domain::{
    entities::avatar_assets::{AvatarAssetEntity, UpsertAvatarAssetEntity},
    repositories::avatar_assets::AvatarAssetRepository,
    value_objects::enums::job_statuses::JobStatus,
};

pub struct AvatarAssetPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl AvatarAssetPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl AvatarAssetRepository for AvatarAssetPostgres {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<AvatarAssetEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = avatar_assets::table
            .find(user_id)
            .select(AvatarAssetEntity::as_select())
            .first::<AvatarAssetEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn upsert(&self, avatar: UpsertAvatarAssetEntity) -> Result<AvatarAssetEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(avatar_assets::table)
            .values(&avatar)
            .on_conflict(avatar_assets::user_id)
            .do_update()
            .set(&avatar)
            .returning(AvatarAssetEntity::as_returning())
            .get_result::<AvatarAssetEntity>(&mut conn)?;

        Ok(result)
    }

    async fn update_status(&self, user_id: Uuid, avatar_status: JobStatus) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(avatar_assets::table.find(user_id))
            .set((
                avatar_assets::avatar_status.eq(avatar_status.to_string()),
                avatar_assets::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_idle_video(
        &self,
        user_id: Uuid,
        idle_video_url: Option<String>,
        idle_video_status: JobStatus,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(avatar_assets::table.find(user_id))
            .set((
                avatar_assets::idle_video_url.eq(idle_video_url),
                avatar_assets::idle_video_status.eq(Some(idle_video_status.to_string())),
                avatar_assets::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }
}
