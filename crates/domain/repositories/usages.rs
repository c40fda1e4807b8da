use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::usages::UsageEntity;

#[automock]
#[async_trait]
pub trait UsageRepository {
    /// Returns the month's row, creating it with `used_seconds = 0` when absent.
    async fn find_or_create(
        &self,
        user_id: Uuid,
        month_year: String,
        quota_seconds: i32,
    ) -> Result<UsageEntity>;

    /// Single atomic increment; creates the row first if the month is new.
    async fn increment_used(
        &self,
        user_id: Uuid,
        month_year: String,
        seconds: i32,
        quota_seconds: i32,
    ) -> Result<UsageEntity>;
}
