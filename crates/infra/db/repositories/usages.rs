use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::visio_usage},
};
use domain::{
    entities::usages::{InsertUsageEntity, UsageEntity},
    repositories::usages::UsageRepository,
};

pub struct UsagePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UsagePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UsageRepository for UsagePostgres {
    async fn find_or_create(
        &self,
        user_id: Uuid,
        month_year: String,
        quota_seconds: i32,
    ) -> Result<UsageEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        // The quota follows the user's current plan, so an upgrade applies to this month.
        let result = insert_into(visio_usage::table)
            .values(&InsertUsageEntity {
                user_id,
                month_year,
                used_seconds: 0,
                quota_seconds,
                created_at: now,
                updated_at: now,
            })
            .on_conflict((visio_usage::user_id, visio_usage::month_year))
            .do_update()
            .set(visio_usage::quota_seconds.eq(quota_seconds))
            .returning(UsageEntity::as_returning())
            .get_result::<UsageEntity>(&mut conn)?;

        Ok(result)
    }

    async fn increment_used(
        &self,
        user_id: Uuid,
        month_year: String,
        seconds: i32,
        quota_seconds: i32,
    ) -> Result<UsageEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;
        let now = Utc::now();

        // One statement: concurrent turns for the same user cannot lose an increment.
        let result = insert_into(visio_usage::table)
            .values(&InsertUsageEntity {
                user_id,
                month_year,
                used_seconds: seconds,
                quota_seconds,
                created_at: now,
                updated_at: now,
            })
            .on_conflict((visio_usage::user_id, visio_usage::month_year))
            .do_update()
            .set((
                visio_usage::used_seconds.eq(visio_usage::used_seconds + seconds),
                visio_usage::quota_seconds.eq(quota_seconds),
                visio_usage::updated_at.eq(now),
            ))
            .returning(UsageEntity::as_returning())
            .get_result::<UsageEntity>(&mut conn)?;

        Ok(result)
    }
}
