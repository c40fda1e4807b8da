use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::credits::{CreditAccountEntity, CreditTransactionEntity},
    value_objects::{
        credits::{CreditMutation, DeductOutcome},
        enums::transaction_types::TransactionType,
    },
};

/// Every mutating call writes the account row and its transaction row together.
#[automock]
#[async_trait]
pub trait CreditRepository {
    async fn find_account(&self, user_id: Uuid) -> Result<Option<CreditAccountEntity>>;

    /// Creates the account with an opening `signup_bonus`; `false` if it already existed.
    async fn initialize_account(
        &self,
        user_id: Uuid,
        opening_balance: i32,
        description: String,
    ) -> Result<bool>;

    async fn deduct(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> Result<DeductOutcome>;

    async fn add(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> Result<CreditMutation>;

    /// Credits a `subscription_refill` unless the account was already refilled at or
    /// after `period_start`. `None` means this period's refill has been taken.
    async fn refill_once(
        &self,
        user_id: Uuid,
        amount: i32,
        period_start: DateTime<Utc>,
        description: String,
    ) -> Result<Option<CreditMutation>>;

    /// Newest first.
    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CreditTransactionEntity>>;
}
