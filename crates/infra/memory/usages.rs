use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{entities::usages::UsageEntity, repositories::usages::UsageRepository};

#[derive(Default)]
pub struct UsageMemory {
    rows: DashMap<(Uuid, String), UsageEntity>,
}

impl UsageMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn empty_month(user_id: Uuid, month_year: String, quota_seconds: i32) -> UsageEntity {
    let now = Utc::now();
    UsageEntity {
        user_id,
        month_year,
        used_seconds: 0,
        quota_seconds,
        created_at: now,
        updated_at: now,
    }
}

#[async_trait]
impl UsageRepository for UsageMemory {
    async fn find_or_create(
        &self,
        user_id: Uuid,
        month_year: String,
        quota_seconds: i32,
    ) -> Result<UsageEntity> {
        let mut row = self
            .rows
            .entry((user_id, month_year.clone()))
            .or_insert_with(|| empty_month(user_id, month_year, quota_seconds));
        row.quota_seconds = quota_seconds;

        Ok(row.clone())
    }

    async fn increment_used(
        &self,
        user_id: Uuid,
        month_year: String,
        seconds: i32,
        quota_seconds: i32,
    ) -> Result<UsageEntity> {
        let mut row = self
            .rows
            .entry((user_id, month_year.clone()))
            .or_insert_with(|| empty_month(user_id, month_year, quota_seconds));

        row.used_seconds += seconds;
        row.quota_seconds = quota_seconds;
        row.updated_at = Utc::now();

        Ok(row.clone())
    }
}
