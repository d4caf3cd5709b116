use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use async_trait::async_trait;

use super::LedgerStore;
use crate::models::user::{UserAccount, Verification};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserAccount>,
    referrals: HashMap<i64, i64>,
}

impl Tables {
    fn set_verified(&mut self, user_id: i64) -> bool {
        let account = self
            .users
            .entry(user_id)
            .or_insert_with(|| UserAccount::new(user_id));
        std::mem::replace(&mut account.verified, true)
    }

    fn credit(&mut self, referrer_id: i64) -> Option<UserAccount> {
        self.users.get_mut(&referrer_id).map(|account| {
            account.points += 1;
            account.invites += 1;
            account.clone()
        })
    }
}

/// Process-local ledger. Nothing survives a restart.
#[derive(Clone, Default)]
pub struct MemoryLedger {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow::anyhow!("memory ledger lock poisoned"))
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>> {
        Ok(self.lock()?.users.get(&user_id).cloned())
    }

    async fn ensure_user(&self, user_id: i64) -> Result<UserAccount> {
        let mut tables = self.lock()?;
        Ok(tables
            .users
            .entry(user_id)
            .or_insert_with(|| UserAccount::new(user_id))
            .clone())
    }

    async fn mark_verified(&self, user_id: i64) -> Result<bool> {
        Ok(self.lock()?.set_verified(user_id))
    }

    async fn verify_with_referral(&self, user_id: i64) -> Result<Verification> {
        let mut tables = self.lock()?;
        let was_verified = tables.set_verified(user_id);
        let credited_referrer = if was_verified {
            None
        } else {
            tables.referrals.get(&user_id).copied().and_then(|ref_id| tables.credit(ref_id))
        };
        Ok(Verification {
            was_verified,
            credited_referrer,
        })
    }

    async fn debit_points(&self, user_id: i64, amount: i64) -> Result<Option<i64>> {
        let mut tables = self.lock()?;
        Ok(match tables.users.get_mut(&user_id) {
            Some(account) if account.points >= amount => {
                account.points -= amount;
                Some(account.points)
            }
            _ => None,
        })
    }

    async fn credit_referral(&self, referrer_id: i64) -> Result<Option<UserAccount>> {
        Ok(self.lock()?.credit(referrer_id))
    }

    async fn add_points(&self, user_id: i64, amount: i64) -> Result<i64> {
        let mut tables = self.lock()?;
        let account = tables
            .users
            .entry(user_id)
            .or_insert_with(|| UserAccount::new(user_id));
        account.points = account.points.saturating_add(amount).max(0);
        Ok(account.points)
    }

    async fn record_referral(&self, user_id: i64, ref_id: i64) -> Result<bool> {
        if user_id == ref_id {
            return Ok(false);
        }
        let mut tables = self.lock()?;
        if tables.referrals.contains_key(&user_id) {
            return Ok(false);
        }
        tables.referrals.insert(user_id, ref_id);
        Ok(true)
    }

    async fn find_referrer(&self, user_id: i64) -> Result<Option<i64>> {
        Ok(self.lock()?.referrals.get(&user_id).copied())
    }

    async fn count_users(&self) -> Result<i64> {
        Ok(self.lock()?.users.len() as i64)
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>> {
        Ok(self.lock()?.users.keys().copied().collect())
    }
}
