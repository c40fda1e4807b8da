use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::{credit_accounts, credit_transactions};

/// `balance == total_earned - total_used` holds for every persisted row.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, PartialEq)]
#[diesel(table_name = credit_accounts, primary_key(user_id))]
pub struct CreditAccountEntity {
    pub user_id: Uuid,
    pub balance: i32,
    pub total_earned: i32,
    pub total_used: i32,
    pub last_refill_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = credit_accounts)]
pub struct InsertCreditAccountEntity {
    pub user_id: Uuid,
    pub balance: i32,
    pub total_earned: i32,
    pub total_used: i32,
    pub last_refill_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only. `balance_after - balance_before == amount` for every row.
#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable, PartialEq)]
#[diesel(table_name = credit_transactions)]
pub struct CreditTransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: i32,
    pub type_: String,
    pub description: String,
    pub balance_before: i32,
    pub balance_after: i32,
    pub created_at: DateTime<Utc>,
}
