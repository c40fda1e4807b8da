use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use uuid::Uuid;

use crate::domain::{
    entities::credits::{CreditAccountEntity, CreditTransactionEntity},
    repositories::credits::CreditRepository,
    value_objects::{
        credits::{CreditMutation, DeductOutcome},
        enums::transaction_types::TransactionType,
    },
};

/// Account and its log live under one key so a mutation updates both under one lock.
struct CreditLedgerEntry {
    account: CreditAccountEntity,
    transactions: Vec<CreditTransactionEntity>,
}

impl CreditLedgerEntry {
    fn empty(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            account: CreditAccountEntity {
                user_id,
                balance: 0,
                total_earned: 0,
                total_used: 0,
                last_refill_at: None,
                created_at: now,
                updated_at: now,
            },
            transactions: Vec::new(),
        }
    }

    fn append(
        &mut self,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> CreditMutation {
        let now = Utc::now();
        let balance_before = self.account.balance;

        self.account.balance += amount;
        if amount >= 0 {
            self.account.total_earned += amount;
        } else {
            self.account.total_used -= amount;
        }
        if transaction_type == TransactionType::SubscriptionRefill {
            self.account.last_refill_at = Some(now);
        }
        self.account.updated_at = now;

        let transaction = CreditTransactionEntity {
            id: Uuid::new_v4(),
            user_id: self.account.user_id,
            amount,
            type_: transaction_type.to_string(),
            description,
            balance_before,
            balance_after: self.account.balance,
            created_at: now,
        };
        self.transactions.push(transaction.clone());

        CreditMutation {
            account: self.account.clone(),
            transaction,
        }
    }
}

#[derive(Default)]
pub struct CreditMemory {
    ledgers: DashMap<Uuid, CreditLedgerEntry>,
}

impl CreditMemory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CreditRepository for CreditMemory {
    async fn find_account(&self, user_id: Uuid) -> Result<Option<CreditAccountEntity>> {
        Ok(self
            .ledgers
            .get(&user_id)
            .map(|entry| entry.account.clone()))
    }

    async fn initialize_account(
        &self,
        user_id: Uuid,
        opening_balance: i32,
        description: String,
    ) -> Result<bool> {
        match self.ledgers.entry(user_id) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(vacant) => {
                let mut entry = CreditLedgerEntry::empty(user_id);
                if opening_balance > 0 {
                    entry.append(opening_balance, TransactionType::SignupBonus, description);
                }
                vacant.insert(entry);
                Ok(true)
            }
        }
    }

    async fn deduct(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> Result<DeductOutcome> {
        let Some(mut entry) = self.ledgers.get_mut(&user_id) else {
            return Ok(DeductOutcome::Insufficient { balance: 0 });
        };

        if entry.account.balance < amount {
            return Ok(DeductOutcome::Insufficient {
                balance: entry.account.balance,
            });
        }

        Ok(DeductOutcome::Deducted(entry.append(
            -amount,
            transaction_type,
            description,
        )))
    }

    async fn add(
        &self,
        user_id: Uuid,
        amount: i32,
        transaction_type: TransactionType,
        description: String,
    ) -> Result<CreditMutation> {
        let mut entry = self
            .ledgers
            .entry(user_id)
            .or_insert_with(|| CreditLedgerEntry::empty(user_id));

        Ok(entry.append(amount, transaction_type, description))
    }

    async fn refill_once(
        &self,
        user_id: Uuid,
        amount: i32,
        period_start: DateTime<Utc>,
        description: String,
    ) -> Result<Option<CreditMutation>> {
        let mut entry = self
            .ledgers
            .entry(user_id)
            .or_insert_with(|| CreditLedgerEntry::empty(user_id));

        if entry
            .account
            .last_refill_at
            .is_some_and(|refilled_at| refilled_at >= period_start)
        {
            return Ok(None);
        }

        Ok(Some(entry.append(
            amount,
            TransactionType::SubscriptionRefill,
            description,
        )))
    }

    async fn list_transactions(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<CreditTransactionEntity>> {
        let limit = usize::try_from(limit).unwrap_or(0);

        Ok(self
            .ledgers
            .get(&user_id)
            .map(|entry| {
                entry
                    .transactions
                    .iter()
                    .rev()
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn assert_ledger_consistent(account: &CreditAccountEntity, log: &[CreditTransactionEntity]) {
        assert_eq!(account.balance, account.total_earned - account.total_used);
        for tx in log {
            assert_eq!(tx.balance_after - tx.balance_before, tx.amount);
        }
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let repo = CreditMemory::new();
        let user_id = Uuid::new_v4();

        assert!(repo.initialize_account(user_id, 3, "bonus".into()).await.unwrap());
        assert!(!repo.initialize_account(user_id, 3, "bonus".into()).await.unwrap());

        let account = repo.find_account(user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 3);
        assert_eq!(repo.list_transactions(user_id, 20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deduct_never_goes_below_zero() {
        let repo = CreditMemory::new();
        let user_id = Uuid::new_v4();
        repo.add(user_id, 2, TransactionType::Purchase, "pack".into())
            .await
            .unwrap();

        let outcome = repo
            .deduct(user_id, 3, TransactionType::VideoGeneration, "clip".into())
            .await
            .unwrap();

        assert!(matches!(outcome, DeductOutcome::Insufficient { balance: 2 }));
        let account = repo.find_account(user_id).await.unwrap().unwrap();
        assert_eq!(account.balance, 2);
        assert_eq!(repo.list_transactions(user_id, 20).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn mixed_operations_keep_the_ledger_balanced() {
        let repo = CreditMemory::new();
        let user_id = Uuid::new_v4();
        repo.initialize_account(user_id, 3, "bonus".into()).await.unwrap();
        repo.add(user_id, 50, TransactionType::SubscriptionRefill, "refill".into())
            .await
            .unwrap();
        for _ in 0..4 {
            repo.deduct(user_id, 2, TransactionType::VideoGeneration, "clip".into())
                .await
                .unwrap();
        }
        repo.add(user_id, 10, TransactionType::PromoCode, "promo".into())
            .await
            .unwrap();

        let account = repo.find_account(user_id).await.unwrap().unwrap();
        let log = repo.list_transactions(user_id, 100).await.unwrap();

        assert_eq!(account.balance, 55);
        assert_eq!(account.total_used, 8);
        assert!(account.last_refill_at.is_some());
        assert_eq!(log.len(), 7);
        assert_eq!(log[0].type_, "promo_code");
        assert_ledger_consistent(&account, &log);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_deducts_cannot_overspend() {
        let repo = Arc::new(CreditMemory::new());
        let user_id = Uuid::new_v4();
        repo.add(user_id, 10, TransactionType::Purchase, "pack".into())
            .await
            .unwrap();

        let handles = (0..25)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.deduct(user_id, 1, TransactionType::VideoGeneration, "clip".into())
                        .await
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        let mut deducted = 0;
        for handle in handles {
            if let DeductOutcome::Deducted(_) = handle.await.unwrap() {
                deducted += 1;
            }
        }

        let account = repo.find_account(user_id).await.unwrap().unwrap();
        assert_eq!(deducted, 10);
        assert_eq!(account.balance, 0);
        assert_ledger_consistent(&account, &repo.list_transactions(user_id, 100).await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn refill_is_granted_once_per_period() {
        let repo = Arc::new(CreditMemory::new());
        let user_id = Uuid::new_v4();
        let period_start = Utc::now();

        let handles = (0..10)
            .map(|_| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    repo.refill_once(user_id, 5, period_start, "refill".into())
                        .await
                        .unwrap()
                })
            })
            .collect::<Vec<_>>();

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_some() {
                granted += 1;
            }
        }

        let account = repo.find_account(user_id).await.unwrap().unwrap();
        assert_eq!(granted, 1);
        assert_eq!(account.balance, 5);

        let next_period = Utc::now() + chrono::Duration::seconds(1);
        let refilled = repo
            .refill_once(user_id, 5, next_period, "refill".into())
            .await
            .unwrap();
        assert_eq!(refilled.map(|mutation| mutation.account.balance), Some(10));
    }
}
