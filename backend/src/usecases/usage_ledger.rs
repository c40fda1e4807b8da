use chrono::Utc;
use crates::domain::{
    errors::VisioResult,
    repositories::usages::UsageRepository,
    value_objects::usages::UsageRecord,
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::usecases::plan_resolver::PlanResolver;

/// Calendar month key in UTC, e.g. `2026-03`.
pub fn current_month_year() -> String {
    Utc::now().format("%Y-%m").to_string()
}

/// Per-user, per-month meter of visio seconds. It records consumption but never refuses
/// it; callers gate on `check_quota` before starting paid work.
pub struct UsageLedger {
    usage_repo: Arc<dyn UsageRepository + Send + Sync>,
    plan_resolver: Arc<PlanResolver>,
}

impl UsageLedger {
    pub fn new(
        usage_repo: Arc<dyn UsageRepository + Send + Sync>,
        plan_resolver: Arc<PlanResolver>,
    ) -> Self {
        Self {
            usage_repo,
            plan_resolver,
        }
    }

    pub async fn get_or_create(&self, user_id: Uuid) -> VisioResult<UsageRecord> {
        let quota_seconds = self.quota_for(user_id).await?;
        let usage = self
            .usage_repo
            .find_or_create(user_id, current_month_year(), quota_seconds)
            .await?;

        Ok(usage.into())
    }

    /// Adds `ceil(seconds)` to this month's usage.
    pub async fn consume(&self, user_id: Uuid, seconds: f64) -> VisioResult<UsageRecord> {
        if !seconds.is_finite() || seconds <= 0.0 {
            warn!(%user_id, seconds, "usage_ledger: ignoring non-positive consumption");
            return self.get_or_create(user_id).await;
        }

        let whole_seconds = seconds.ceil() as i32;
        let quota_seconds = self.quota_for(user_id).await?;
        let usage = self
            .usage_repo
            .increment_used(user_id, current_month_year(), whole_seconds, quota_seconds)
            .await?;

        info!(
            %user_id,
            consumed = whole_seconds,
            used_seconds = usage.used_seconds,
            quota_seconds = usage.quota_seconds,
            "usage_ledger: consumed seconds"
        );

        Ok(usage.into())
    }

    pub async fn check_quota(&self, user_id: Uuid, required_seconds: i32) -> VisioResult<bool> {
        let usage = self.get_or_create(user_id).await?;
        let allowed = usage.remaining_seconds >= required_seconds;

        debug!(
            %user_id,
            required_seconds,
            remaining_seconds = usage.remaining_seconds,
            allowed,
            "usage_ledger: quota checked"
        );

        Ok(allowed)
    }

    async fn quota_for(&self, user_id: Uuid) -> VisioResult<i32> {
        let plan = self.plan_resolver.resolve_plan_for_user(user_id).await?;
        Ok(plan.visio_quota_seconds())
    }
}
