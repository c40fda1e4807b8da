use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{credit_accounts, credit_transactions},
    },
};
use domain::{
    entities::credits::{CreditAccountEntity, CreditTransactionEntity, InsertCreditAccountEntity},
    repositories::credits::CreditRepository,
    value_objects::{
        credits::{CreditMutation, DeductOutcome},
        enums::transaction_types::TransactionType,
    },
};

pub struct CreditPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CreditPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

fn lock_account(
    conn: &mut PgConnection,
    user_id: Uuid,
) -> QueryResult<Option<CreditAccountEntity>> {
    credit_accounts::table
        .find(user_id)
        .select(CreditAccountEntity::as_select())
        .for_update()
        .first::<CreditAccountEntity>(conn)
        .optional()
}

#[async_trait]
impl CreditRepository for CreditPostgres {
    async fn find_account(&self, user_id: Uuid) -> Result<Option<CreditAccountEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = credit_accounts::table
            .find(user_id)
            .select(CreditAccountEntity::as_select())
            .first::<CreditAccountEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn initialize_account(
        &self,
        user_id: Uuid,
        opening_balance: i32,
        description: String,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let created = conn.transaction::<bool, anyhow::Error, _>(|conn| {
            let now = Utc::now();
            let inserted = insert_into(credit_accounts::table)
                .values(&InsertCreditAccountEntity {
                    user_id,
                    balance: opening_balance,
                    total_earned: opening_balance,
                    total_used: 0,
                    last_refill_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict(credit_accounts::user_id)
                .do_nothing()
                .execute(conn)?;

            if inserted == 0 {
                return Ok(false);
            }

            if opening_balance > 0 {
                insert_into(credit_transactions::table)
                    .values(&CreditTransactionEntity {
                        id: Uuid::new_v4(),
                        user_id,
                        amount: opening_balance,
                        type_: TransactionType::SignupBonus.to_string(),
                        description,
                        balance_before: 0,
                        balance_after: opening_balance,
                        created_at: now,
                    })
                    .execute(conn)?;
            }

            Ok(true)
        })?;

        Ok(created)
    }

    async fn deduct(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> Result<DeductOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let outcome = conn.transaction::<DeductOutcome, anyhow::Error, _>(|conn| {
            let Some(account) = lock_account(conn, user_id)? else {
                return Ok(DeductOutcome::Insufficient { balance: 0 });
            };

            if account.balance < amount {
                return Ok(DeductOutcome::Insufficient {
                    balance: account.balance,
                });
            }

            let now = Utc::now();
            let updated = update(credit_accounts::table.find(user_id))
                .set((
                    credit_accounts::balance.eq(credit_accounts::balance - amount),
                    credit_accounts::total_used.eq(credit_accounts::total_used + amount),
                    credit_accounts::updated_at.eq(now),
                ))
                .returning(CreditAccountEntity::as_returning())
                .get_result::<CreditAccountEntity>(conn)?;

            let transaction = CreditTransactionEntity {
                id: Uuid::new_v4(),
                user_id,
                amount: -amount,
                type_: transaction_type.to_string(),
                description,
                balance_before: account.balance,
                balance_after: updated.balance,
                created_at: now,
            };
            insert_into(credit_transactions::table)
                .values(&transaction)
                .execute(conn)?;

            Ok(DeductOutcome::Deducted(CreditMutation {
                account: updated,
                transaction,
            }))
        })?;

        Ok(outcome)
    }

    async fn add(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> Result<CreditMutation> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mutation = conn.transaction::<CreditMutation, anyhow::Error, _>(|conn| {
            let now = Utc::now();
            insert_into(credit_accounts::table)
                .values(&InsertCreditAccountEntity {
                    user_id,
                    balance: 0,
                    total_earned: 0,
                    total_used: 0,
                    last_refill_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict(credit_accounts::user_id)
                .do_nothing()
                .execute(conn)?;

            let account = lock_account(conn, user_id)?
                .ok_or_else(|| anyhow::anyhow!("credit account {} vanished", user_id))?;

            let target = credit_accounts::table.find(user_id);
            let updated = if transaction_type == TransactionType::SubscriptionRefill {
                update(target)
                    .set((
                        credit_accounts::balance.eq(credit_accounts::balance + amount),
                        credit_accounts::total_earned.eq(credit_accounts::total_earned + amount),
                        credit_accounts::last_refill_at.eq(Some(now)),
                        credit_accounts::updated_at.eq(now),
                    ))
                    .returning(CreditAccountEntity::as_returning())
                    .get_result::<CreditAccountEntity>(conn)?
            } else {
                update(target)
                    .set((
                        credit_accounts::balance.eq(credit_accounts::balance + amount),
                        credit_accounts::total_earned.eq(credit_accounts::total_earned + amount),
                        credit_accounts::updated_at.eq(now),
                    ))
                    .returning(CreditAccountEntity::as_returning())
                    .get_result::<CreditAccountEntity>(conn)?
            };

            let transaction = CreditTransactionEntity {
                id: Uuid::new_v4(),
                user_id,
                amount,
                type_: transaction_type.to_string(),
                description,
                balance_before: account.balance,
                balance_after: updated.balance,
                created_at: now,
            };
            insert_into(credit_transactions::table)
                .values(&transaction)
                .execute(conn)?;

            Ok(CreditMutation {
                account: updated,
                transaction,
            })
        })?;

        Ok(mutation)
    }

    async fn refill_once(
        &self,
        user_id: Uuid,
        amount: i32,
        period_start: DateTime<Utc>,
        description: String,
    ) -> Result<Option<CreditMutation>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let refill = conn.transaction::<Option<CreditMutation>, anyhow::Error, _>(|conn| {
            let now = Utc::now();
            insert_into(credit_accounts::table)
                .values(&InsertCreditAccountEntity {
                    user_id,
                    balance: 0,
                    total_earned: 0,
                    total_used: 0,
                    last_refill_at: None,
                    created_at: now,
                    updated_at: now,
                })
                .on_conflict(credit_accounts::user_id)
                .do_nothing()
                .execute(conn)?;

            // Row lock serializes concurrent refills for the same period.
            let account = lock_account(conn, user_id)?
                .ok_or_else(|| anyhow::anyhow!("credit account {} vanished", user_id))?;
            if account
                .last_refill_at
                .is_some_and(|refilled_at| refilled_at >= period_start)
            {
                return Ok(None);
            }

            let updated = update(credit_accounts::table.find(user_id))
                .set((
                    credit_accounts::balance.eq(credit_accounts::balance + amount),
                    credit_accounts::total_earned.eq(credit_accounts::total_earned + amount),
                    credit_accounts::last_refill_at.eq(Some(now)),
                    credit_accounts::updated_at.eq(now),
                ))
                .returning(CreditAccountEntity::as_returning())
                .get_result::<CreditAccountEntity>(conn)?;

            let transaction = CreditTransactionEntity {
                id: Uuid::new_v4(),
                user_id,
                amount,
                type_: TransactionType::SubscriptionRefill.to_string(),
                description,
                balance_before: account.balance,
                balance_after: updated.balance,
                created_at: now,
            };
            insert_into(credit_transactions::table)
                .values(&transaction)
                .execute(conn)?;

            Ok(Some(CreditMutation {
                account: updated,
                transaction,
            }))
        })?;

        Ok(refill)
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CreditTransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = credit_transactions::table
            .filter(credit_transactions::user_id.eq(user_id))
            .order(credit_transactions::created_at.desc())
            .limit(limit)
            .select(CreditTransactionEntity::as_select())
            .load::<CreditTransactionEntity>(&mut conn)?;

        Ok(results)
    }
}
