use anyhow::Result;
use async_trait::async_trait;

use crate::models::user::{UserAccount, Verification};

pub mod memory;
pub mod referral_repo;
pub mod user_repo;

pub use memory::MemoryLedger;

use referral_repo::ReferralRepository;
use user_repo::UserRepository;

/// Persistent per-user points/verified/invites record plus referral links.
///
/// Every mutation is a single statement (or a single transaction) so that
/// `points` never drops below zero, even under concurrent updates.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>>;

    /// Inserts a default account if none exists, then returns the stored one.
    async fn ensure_user(&self, user_id: i64) -> Result<UserAccount>;

    /// Sets `verified`, creating the account if needed. Returns the flag's
    /// value from immediately before the update.
    async fn mark_verified(&self, user_id: i64) -> Result<bool>;

    /// `mark_verified` plus, on the unverified -> verified transition, +1
    /// point and +1 invite for the user's referrer when that account exists.
    /// Both happen or neither does, so a failed credit leaves the user
    /// unverified and the award is paid on the next attempt.
    async fn verify_with_referral(&self, user_id: i64) -> Result<Verification>;

    /// Debits `amount` only when the balance covers it. `None` means the
    /// balance was insufficient or the account does not exist.
    async fn debit_points(&self, user_id: i64, amount: i64) -> Result<Option<i64>>;

    /// +1 point and +1 invite for an existing referrer.
    async fn credit_referral(&self, referrer_id: i64) -> Result<Option<UserAccount>>;

    /// Adds (possibly negative) points, floored at zero. Creates the account
    /// when absent and returns the new balance.
    async fn add_points(&self, user_id: i64, amount: i64) -> Result<i64>;

    /// Insert-or-ignore. Returns whether a new link was stored.
    async fn record_referral(&self, user_id: i64, ref_id: i64) -> Result<bool>;

    async fn find_referrer(&self, user_id: i64) -> Result<Option<i64>>;

    async fn count_users(&self) -> Result<i64>;

    async fn list_user_ids(&self) -> Result<Vec<i64>>;
}

/// Postgres-backed ledger built from the two table repositories.
#[derive(Debug, Clone)]
pub struct PgLedger {
    users: UserRepository,
    referrals: ReferralRepository,
}

impl PgLedger {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self {
            users: UserRepository::new(pool.clone()),
            referrals: ReferralRepository::new(pool),
        }
    }
}

#[async_trait]
impl LedgerStore for PgLedger {
    async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>> {
        self.users.get(user_id).await
    }

    async fn ensure_user(&self, user_id: i64) -> Result<UserAccount> {
        self.users.ensure(user_id).await
    }

    async fn mark_verified(&self, user_id: i64) -> Result<bool> {
        self.users.mark_verified(user_id).await
    }

    async fn verify_with_referral(&self, user_id: i64) -> Result<Verification> {
        self.users.verify_with_referral(user_id).await
    }

    async fn debit_points(&self, user_id: i64, amount: i64) -> Result<Option<i64>> {
        self.users.debit_points(user_id, amount).await
    }

    async fn credit_referral(&self, referrer_id: i64) -> Result<Option<UserAccount>> {
        self.users.credit_referral(referrer_id).await
    }

    async fn add_points(&self, user_id: i64, amount: i64) -> Result<i64> {
        self.users.add_points(user_id, amount).await
    }

    async fn record_referral(&self, user_id: i64, ref_id: i64) -> Result<bool> {
        if user_id == ref_id {
            return Ok(false);
        }
        self.referrals.insert_if_absent(user_id, ref_id).await
    }

    async fn find_referrer(&self, user_id: i64) -> Result<Option<i64>> {
        self.referrals.get_referrer(user_id).await
    }

    async fn count_users(&self) -> Result<i64> {
        self.users.count().await
    }

    async fn list_user_ids(&self) -> Result<Vec<i64>> {
        self.users.list_ids().await
    }
}
