use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity};

#[automock]
#[async_trait]
pub trait SubscriptionRepository {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>>;

    async fn upsert(&self, subscription: UpsertSubscriptionEntity) -> Result<SubscriptionEntity>;

    async fn insert_if_absent(&self, subscription: UpsertSubscriptionEntity) -> Result<bool>;
}
