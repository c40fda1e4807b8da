use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    entities::credits::{CreditAccountEntity, CreditTransactionEntity},
    value_objects::enums::plan_tiers::PlanTier,
};

/// Account row after a mutation together with the transaction that recorded it.
#[derive(Debug, Clone)]
pub struct CreditMutation {
    pub account: CreditAccountEntity,
    pub transaction: CreditTransactionEntity,
}

#[derive(Debug, Clone)]
pub enum DeductOutcome {
    Deducted(CreditMutation),
    Insufficient { balance: i32 },
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditInfoDto {
    pub balance: i32,
    pub total_earned: i32,
    pub total_used: i32,
    pub last_refill_at: Option<DateTime<Utc>>,
    pub plan: PlanTier,
    pub plan_name: String,
    pub monthly_credits: i32,
    pub next_refill_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditTransactionDto {
    pub id: Uuid,
    pub amount: i32,
    #[serde(rename = "type")]
    pub type_: String,
    pub description: String,
    pub balance_before: i32,
    pub balance_after: i32,
    pub created_at: DateTime<Utc>,
}

impl From<CreditTransactionEntity> for CreditTransactionDto {
    fn from(value: CreditTransactionEntity) -> Self {
        Self {
            id: value.id,
            amount: value.amount,
            type_: value.type_,
            description: value.description,
            balance_before: value.balance_before,
            balance_after: value.balance_after,
            created_at: value.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceChangeDto {
    pub success: bool,
    pub new_balance: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditAmountModel {
    pub amount: i32,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefillDto {
    pub success: bool,
    pub credits_added: i32,
    pub new_balance: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreditCheckDto {
    pub has_enough: bool,
    pub balance: i32,
    pub required: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}
