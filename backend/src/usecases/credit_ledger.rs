use chrono::{DateTime, Months, Utc};
use crates::domain::{
    entities::subscriptions::{SubscriptionEntity, UpsertSubscriptionEntity},
    errors::{VisioError, VisioResult},
    repositories::{credits::CreditRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        credits::{BalanceChangeDto, CreditInfoDto, CreditTransactionDto, DeductOutcome, RefillDto},
        enums::{
            plan_tiers::PlanTier, subscription_statuses::SubscriptionStatus,
            transaction_types::TransactionType,
        },
    },
};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::usecases::plan_resolver::PlanResolver;

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

/// Discrete credit balance. Every change goes through the repository as one atomic
/// account + transaction write.
pub struct CreditLedger {
    credit_repo: Arc<dyn CreditRepository + Send + Sync>,
    subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
    plan_resolver: Arc<PlanResolver>,
}

impl CreditLedger {
    pub fn new(
        credit_repo: Arc<dyn CreditRepository + Send + Sync>,
        subscription_repo: Arc<dyn SubscriptionRepository + Send + Sync>,
        plan_resolver: Arc<PlanResolver>,
    ) -> Self {
        Self {
            credit_repo,
            subscription_repo,
            plan_resolver,
        }
    }

    pub async fn get_balance(&self, user_id: Uuid) -> VisioResult<i32> {
        let account = self.credit_repo.find_account(user_id).await?;
        Ok(account.map(|account| account.balance).unwrap_or(0))
    }

    pub async fn has_enough(&self, user_id: Uuid, amount: i32) -> VisioResult<bool> {
        Ok(self.get_balance(user_id).await? >= amount)
    }

    pub async fn deduct(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> VisioResult<BalanceChangeDto> {
        ensure_positive(amount)?;
        let description = description.unwrap_or_else(|| format!("Used {} credit(s)", amount));

        match self
            .credit_repo
            .deduct(user_id, amount, transaction_type, description)
            .await?
        {
            DeductOutcome::Deducted(mutation) => {
                info!(
                    %user_id,
                    amount,
                    %transaction_type,
                    new_balance = mutation.account.balance,
                    "credit_ledger: deducted"
                );
                Ok(BalanceChangeDto {
                    success: true,
                    new_balance: mutation.account.balance,
                })
            }
            DeductOutcome::Insufficient { balance } => {
                warn!(%user_id, amount, balance, "credit_ledger: deduct refused");
                Err(VisioError::InsufficientCredits {
                    balance,
                    required: amount,
                })
            }
        }
    }

    pub async fn add(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> VisioResult<BalanceChangeDto> {
        ensure_positive(amount)?;
        let description = description.unwrap_or_else(|| format!("Added {} credit(s)", amount));

        let mutation = self
            .credit_repo
            .add(user_id, amount, transaction_type, description)
            .await?;

        info!(
            %user_id,
            amount,
            %transaction_type,
            new_balance = mutation.account.balance,
            "credit_ledger: added"
        );

        Ok(BalanceChangeDto {
            success: true,
            new_balance: mutation.account.balance,
        })
    }

    /// Opens the account with the free signup bonus and a free subscription. Safe to
    /// call on every login.
    pub async fn initialize(&self, user_id: Uuid) -> VisioResult<CreditInfoDto> {
        let free = PlanTier::Free;
        let created = self
            .credit_repo
            .initialize_account(
                user_id,
                free.signup_bonus(),
                format!("Signup bonus: {} free credit(s)", free.signup_bonus()),
            )
            .await?;

        if created {
            info!(%user_id, bonus = free.signup_bonus(), "credit_ledger: account initialized");
        } else {
            debug!(%user_id, "credit_ledger: account already initialized");
        }

        let now = Utc::now();
        self.subscription_repo
            .insert_if_absent(UpsertSubscriptionEntity {
                user_id,
                plan: free.to_string(),
                status: SubscriptionStatus::Active.to_string(),
                monthly_credits: free.monthly_credits(),
                current_period_start: Some(now),
                current_period_end: now.checked_add_months(Months::new(1)),
                updated_at: now,
            })
            .await?;

        self.get_credit_info(user_id).await
    }

    pub async fn get_credit_info(&self, user_id: Uuid) -> VisioResult<CreditInfoDto> {
        let account = self.credit_repo.find_account(user_id).await?;
        let subscription = self.subscription_repo.find_by_user(user_id).await?;
        let plan = self.plan_resolver.resolve_plan_for_user(user_id).await?;

        Ok(CreditInfoDto {
            balance: account.as_ref().map(|a| a.balance).unwrap_or(0),
            total_earned: account.as_ref().map(|a| a.total_earned).unwrap_or(0),
            total_used: account.as_ref().map(|a| a.total_used).unwrap_or(0),
            last_refill_at: account.as_ref().and_then(|a| a.last_refill_at),
            plan,
            plan_name: plan.display_name().to_string(),
            monthly_credits: plan.monthly_credits(),
            next_refill_at: subscription.and_then(|s| s.current_period_end),
        })
    }

    /// Credits the plan's monthly allotment at most once per billing period. An elapsed
    /// period is rolled forward first.
    pub async fn refill_monthly(&self, user_id: Uuid) -> VisioResult<RefillDto> {
        let subscription = self
            .subscription_repo
            .find_by_user(user_id)
            .await?
            .filter(|s| SubscriptionStatus::from_str(&s.status) == SubscriptionStatus::Active);

        let Some(subscription) = subscription else {
            debug!(%user_id, "credit_ledger: no active subscription, refill skipped");
            return self.refill_skipped(user_id).await;
        };

        let plan = PlanTier::from_str(&subscription.plan);
        let monthly_credits = plan.monthly_credits();
        let period_start = self.roll_billing_period(&subscription).await?;

        let refill = self
            .credit_repo
            .refill_once(
                user_id,
                monthly_credits,
                period_start,
                format!(
                    "Monthly refill {}: +{} credit(s)",
                    plan.display_name(),
                    monthly_credits
                ),
            )
            .await?;

        match refill {
            Some(mutation) => {
                info!(
                    %user_id,
                    %plan,
                    credits_added = monthly_credits,
                    new_balance = mutation.account.balance,
                    "credit_ledger: monthly refill"
                );
                Ok(RefillDto {
                    success: true,
                    credits_added: monthly_credits,
                    new_balance: mutation.account.balance,
                })
            }
            None => {
                debug!(%user_id, %period_start, "credit_ledger: already refilled this period");
                self.refill_skipped(user_id).await
            }
        }
    }

    /// Activates `plan` for one month from now and credits its allotment. Re-activating the
    /// plan that is already running is a no-op.
    pub async fn update_subscription(&self, user_id: Uuid, plan: PlanTier) -> VisioResult<CreditInfoDto> {
        let now = Utc::now();
        let current = self.subscription_repo.find_by_user(user_id).await?;
        let already_running = current.as_ref().is_some_and(|s| {
            PlanTier::from_str(&s.plan) == plan
                && SubscriptionStatus::from_str(&s.status) == SubscriptionStatus::Active
                && s.current_period_end.is_none_or(|end| end > now)
        });
        if already_running {
            debug!(%user_id, %plan, "credit_ledger: plan already active");
            return self.get_credit_info(user_id).await;
        }

        self.subscription_repo
            .upsert(UpsertSubscriptionEntity {
                user_id,
                plan: plan.to_string(),
                status: SubscriptionStatus::Active.to_string(),
                monthly_credits: plan.monthly_credits(),
                current_period_start: Some(now),
                current_period_end: now.checked_add_months(Months::new(1)),
                updated_at: now,
            })
            .await?;

        info!(%user_id, %plan, "credit_ledger: subscription activated");

        if plan.monthly_credits() > 0 {
            self.credit_repo
                .refill_once(
                    user_id,
                    plan.monthly_credits(),
                    now,
                    format!(
                        "Activation {}: +{} credit(s)",
                        plan.display_name(),
                        plan.monthly_credits()
                    ),
                )
                .await?;
        }

        self.get_credit_info(user_id).await
    }

    async fn refill_skipped(&self, user_id: Uuid) -> VisioResult<RefillDto> {
        Ok(RefillDto {
            success: false,
            credits_added: 0,
            new_balance: self.get_balance(user_id).await?,
        })
    }

    /// Start of the subscription's current billing period, advancing it in whole months
    /// when the stored one has ended.
    async fn roll_billing_period(
        &self,
        subscription: &SubscriptionEntity,
    ) -> VisioResult<DateTime<Utc>> {
        let now = Utc::now();
        let mut start = subscription
            .current_period_start
            .unwrap_or(subscription.created_at);
        let Some(mut end) = subscription.current_period_end else {
            return Ok(start);
        };
        if end > now {
            return Ok(start);
        }

        while end <= now {
            start = end;
            end = end
                .checked_add_months(Months::new(1))
                .ok_or_else(|| anyhow::anyhow!("billing period out of range for {}", end))?;
        }

        self.subscription_repo
            .upsert(UpsertSubscriptionEntity {
                user_id: subscription.user_id,
                plan: subscription.plan.clone(),
                status: subscription.status.clone(),
                monthly_credits: subscription.monthly_credits,
                current_period_start: Some(start),
                current_period_end: Some(end),
                updated_at: now,
            })
            .await?;
        info!(
            user_id = %subscription.user_id,
            period_start = %start,
            period_end = %end,
            "credit_ledger: billing period rolled over"
        );

        Ok(start)
    }

    pub async fn history(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
    ) -> VisioResult<Vec<CreditTransactionDto>> {
        let limit = limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT);

        let transactions = self.credit_repo.list_transactions(user_id, limit).await?;
        Ok(transactions.into_iter().map(CreditTransactionDto::from).collect())
    }
}

fn ensure_positive(amount: i32) -> VisioResult<()> {
    if amount <= 0 {
        return Err(VisioError::InvalidInput(format!(
            "credit amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}
