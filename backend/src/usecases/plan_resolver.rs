use chrono::Utc;
use crates::domain::{
    errors::VisioResult,
    repositories::subscriptions::SubscriptionRepository,
    value_objects::enums::{plan_tiers::PlanTier, subscription_statuses::SubscriptionStatus},
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Resolves the effective plan for a user: active subscription or free plan fallback.
pub struct PlanResolver {
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
}

impl PlanResolver {
    pub fn new(subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>) -> Self {
        Self { subscription_repo }
    }

    pub async fn resolve_plan_for_user(&self, user_id: Uuid) -> VisioResult<PlanTier> {
        let Some(subscription) = self.subscription_repo.find_by_user(user_id).await? else {
            debug!(%user_id, "plan_resolver: no subscription, using free plan");
            return Ok(PlanTier::Free);
        };

        let active = SubscriptionStatus::from_str(&subscription.status) == SubscriptionStatus::Active;
        let in_period = subscription
            .current_period_end
            .is_none_or(|period_end| period_end > Utc::now());

        if active && in_period {
            let plan = PlanTier::from_str(&subscription.plan);
            debug!(%user_id, %plan, "plan_resolver: using active subscription plan");
            return Ok(plan);
        }

        debug!(
            %user_id,
            status = %subscription.status,
            "plan_resolver: subscription not current, falling back to free plan"
        );
        Ok(PlanTier::Free)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crates::domain::{
        entities::subscriptions::SubscriptionEntity,
        repositories::subscriptions::MockSubscriptionRepository,
    };
    use mockall::predicate::eq;

    fn sample_subscription(user_id: Uuid, plan: &str, status: &str, days_left: i64) -> SubscriptionEntity {
        let now = Utc::now();
        SubscriptionEntity {
            user_id,
            plan: plan.to_string(),
            status: status.to_string(),
            monthly_credits: PlanTier::from_str(plan).monthly_credits(),
            current_period_start: Some(now - Duration::days(1)),
            current_period_end: Some(now + Duration::days(days_left)),
            created_at: now,
            updated_at: now,
        }
    }

    fn resolver_with(subscription: Option<SubscriptionEntity>, user_id: Uuid) -> PlanResolver {
        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_find_by_user()
            .with(eq(user_id))
            .returning(move |_| Ok(subscription.clone()));
        PlanResolver::new(Arc::new(subscription_repo))
    }

    #[tokio::test]
    async fn returns_paid_plan_when_subscription_is_active() {
        let user_id = Uuid::new_v4();
        let resolver = resolver_with(Some(sample_subscription(user_id, "pro", "active", 10)), user_id);

        let plan = resolver.resolve_plan_for_user(user_id).await.unwrap();

        assert_eq!(plan, PlanTier::Pro);
    }

    #[tokio::test]
    async fn falls_back_to_free_plan_when_no_subscription() {
        let user_id = Uuid::new_v4();
        let resolver = resolver_with(None, user_id);

        let plan = resolver.resolve_plan_for_user(user_id).await.unwrap();

        assert_eq!(plan, PlanTier::Free);
    }

    #[tokio::test]
    async fn falls_back_to_free_plan_when_canceled_or_lapsed() {
        let user_id = Uuid::new_v4();

        let canceled = resolver_with(Some(sample_subscription(user_id, "premium", "canceled", 10)), user_id);
        assert_eq!(canceled.resolve_plan_for_user(user_id).await.unwrap(), PlanTier::Free);

        let lapsed = resolver_with(Some(sample_subscription(user_id, "premium", "active", -2)), user_id);
        assert_eq!(lapsed.resolve_plan_for_user(user_id).await.unwrap(), PlanTier::Free);
    }
}
