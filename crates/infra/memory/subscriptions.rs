use anyhow::Result;
use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::domain::{
    entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
    repositories::subscriptions::SubscriptionRepository,
};

#[derive(Default)]
pub struct SubscriptionMemory {
    rows: DashMap<Uuid, SubscriptionEntity>,
}

impl SubscriptionMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_entity(
    subscription: UpsertSubscriptionEntity,
    created_at: chrono::DateTime<chrono::Utc>,
) -> SubscriptionEntity {
    SubscriptionEntity {
        user_id: subscription.user_id,
        plan: subscription.plan,
        status: subscription.status,
        monthly_credits: subscription.monthly_credits,
        current_period_start: subscription.current_period_start,
        current_period_end: subscription.current_period_end,
        created_at,
        updated_at: subscription.updated_at,
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionMemory {
    async fn find_by_user(&self, user_id: Uuid) -> Result<Option<SubscriptionEntity>> {
        Ok(self.rows.get(&user_id).map(|row| row.clone()))
    }

    async fn upsert(&self, subscription: UpsertSubscriptionEntity) -> Result<SubscriptionEntity> {
        let user_id = subscription.user_id;
        let created_at = self
            .rows
            .get(&user_id)
            .map(|row| row.created_at)
            .unwrap_or(subscription.updated_at);

        let entity = to_entity(subscription, created_at);
        self.rows.insert(user_id, entity.clone());

        Ok(entity)
    }

    async fn insert_if_absent(&self, subscription: UpsertSubscriptionEntity) -> Result<bool> {
        match self.rows.entry(subscription.user_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                let created_at = subscription.updated_at;
                vacant.insert(to_entity(subscription, created_at));
                Ok(true)
            }
        }
    }
}
