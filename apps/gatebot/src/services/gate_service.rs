use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::referral_service::{ReferralAward, ReferralService};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Other,
}

impl MemberStatus {
    pub fn is_joined(self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

/// Asks the chat platform about a user's membership in a channel.
#[async_trait]
pub trait MembershipProbe: Send + Sync {
    async fn status(&self, channel: &str, user_id: i64) -> Result<MemberStatus>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    NotJoined,
    Verified {
        first_time: bool,
        award: Option<ReferralAward>,
    },
}

/// Channel-membership gate. Only the first configured channel is checked;
/// the others are shown to users but never verified.
#[derive(Clone)]
pub struct GateService {
    referrals: ReferralService,
    probe: Arc<dyn MembershipProbe>,
    channel: String,
}

impl GateService {
    pub fn new(referrals: ReferralService, probe: Arc<dyn MembershipProbe>, channel: String) -> Self {
        Self {
            referrals,
            probe,
            channel,
        }
    }

    pub async fn check(&self, user_id: i64) -> Result<GateOutcome> {
        let status = match self.probe.status(&self.channel, user_id).await {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!("Failed to check channel membership for user {}: {}", user_id, e);
                MemberStatus::Other
            }
        };

        if !status.is_joined() {
            tracing::debug!("User {} is NOT a member of {} ({:?})", user_id, self.channel, status);
            return Ok(GateOutcome::NotJoined);
        }

        let (first_time, award) = self.referrals.verify_and_award(user_id).await?;
        if first_time {
            tracing::info!("User {} verified membership of {}", user_id, self.channel);
        }
        Ok(GateOutcome::Verified { first_time, award })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatebot_db::{LedgerStore, MemoryLedger, UserAccount, Verification};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    /// Answers from a fixed table; unknown users have left the channel.
    #[derive(Default)]
    struct FakeProbe {
        statuses: Mutex<HashMap<i64, MemberStatus>>,
        asked: Mutex<Vec<String>>,
        broken: bool,
    }

    impl FakeProbe {
        fn with(user_id: i64, status: MemberStatus) -> Self {
            let probe = Self::default();
            probe.statuses.lock().unwrap().insert(user_id, status);
            probe
        }
    }

    #[async_trait]
    impl MembershipProbe for FakeProbe {
        async fn status(&self, channel: &str, user_id: i64) -> Result<MemberStatus> {
            self.asked.lock().unwrap().push(channel.to_string());
            if self.broken {
                anyhow::bail!("Bad Request: chat not found");
            }
            Ok(self
                .statuses
                .lock()
                .unwrap()
                .get(&user_id)
                .copied()
                .unwrap_or(MemberStatus::Other))
        }
    }

    fn gate(ledger: &MemoryLedger, probe: Arc<FakeProbe>) -> GateService {
        let ledger: Arc<dyn LedgerStore> = Arc::new(ledger.clone());
        GateService::new(ReferralService::new(ledger), probe, "@first".to_string())
    }

    #[test]
    fn joined_statuses() {
        assert!(MemberStatus::Creator.is_joined());
        assert!(MemberStatus::Administrator.is_joined());
        assert!(MemberStatus::Member.is_joined());
        assert!(!MemberStatus::Other.is_joined());
    }

    #[tokio::test]
    async fn non_member_is_rejected_without_state_change() {
        let ledger = MemoryLedger::new();
        let probe = Arc::new(FakeProbe::default());
        let outcome = gate(&ledger, probe.clone()).check(1).await.unwrap();

        assert_eq!(outcome, GateOutcome::NotJoined);
        assert_eq!(ledger.find_user(1).await.unwrap(), None);
        assert_eq!(probe.asked.lock().unwrap().as_slice(), ["@first"]);
    }

    #[tokio::test]
    async fn probe_failure_counts_as_not_joined() {
        let ledger = MemoryLedger::new();
        let probe = Arc::new(FakeProbe {
            broken: true,
            ..Default::default()
        });
        let outcome = gate(&ledger, probe).check(1).await.unwrap();
        assert_eq!(outcome, GateOutcome::NotJoined);
    }

    #[tokio::test]
    async fn member_is_created_and_verified() {
        let ledger = MemoryLedger::new();
        let probe = Arc::new(FakeProbe::with(1, MemberStatus::Member));
        let outcome = gate(&ledger, probe).check(1).await.unwrap();

        assert_eq!(
            outcome,
            GateOutcome::Verified {
                first_time: true,
                award: None
            }
        );
        assert!(ledger.find_user(1).await.unwrap().unwrap().verified);
    }

    #[tokio::test]
    async fn referrer_is_credited_exactly_once() {
        let ledger = MemoryLedger::new();
        ledger.ensure_user(100).await.unwrap();
        ledger.record_referral(1, 100).await.unwrap();
        let probe = Arc::new(FakeProbe::with(1, MemberStatus::Creator));
        let gate = gate(&ledger, probe);

        let first = gate.check(1).await.unwrap();
        let GateOutcome::Verified { first_time: true, award: Some(award) } = first else {
            panic!("expected first-time verification with award, got {:?}", first);
        };
        assert_eq!((award.referrer_id, award.points, award.invites), (100, 1, 1));

        let second = gate.check(1).await.unwrap();
        assert_eq!(
            second,
            GateOutcome::Verified {
                first_time: false,
                award: None
            }
        );
        let referrer = ledger.find_user(100).await.unwrap().unwrap();
        assert_eq!((referrer.points, referrer.invites), (1, 1));
    }

    /// Memory ledger whose combined verify-and-credit fails once, the way a
    /// dropped connection aborts the transaction before commit.
    struct FlakyLedger {
        inner: MemoryLedger,
        fail_next: AtomicBool,
    }

    #[async_trait]
    impl LedgerStore for FlakyLedger {
        async fn find_user(&self, user_id: i64) -> Result<Option<UserAccount>> {
            self.inner.find_user(user_id).await
        }
        async fn ensure_user(&self, user_id: i64) -> Result<UserAccount> {
            self.inner.ensure_user(user_id).await
        }
        async fn mark_verified(&self, user_id: i64) -> Result<bool> {
            self.inner.mark_verified(user_id).await
        }
        async fn verify_with_referral(&self, user_id: i64) -> Result<Verification> {
            if self.fail_next.swap(false, Ordering::SeqCst) {
                anyhow::bail!("connection reset");
            }
            self.inner.verify_with_referral(user_id).await
        }
        async fn debit_points(&self, user_id: i64, amount: i64) -> Result<Option<i64>> {
            self.inner.debit_points(user_id, amount).await
        }
        async fn credit_referral(&self, referrer_id: i64) -> Result<Option<UserAccount>> {
            self.inner.credit_referral(referrer_id).await
        }
        async fn add_points(&self, user_id: i64, amount: i64) -> Result<i64> {
            self.inner.add_points(user_id, amount).await
        }
        async fn record_referral(&self, user_id: i64, ref_id: i64) -> Result<bool> {
            self.inner.record_referral(user_id, ref_id).await
        }
        async fn find_referrer(&self, user_id: i64) -> Result<Option<i64>> {
            self.inner.find_referrer(user_id).await
        }
        async fn count_users(&self) -> Result<i64> {
            self.inner.count_users().await
        }
        async fn list_user_ids(&self) -> Result<Vec<i64>> {
            self.inner.list_user_ids().await
        }
    }

    #[tokio::test]
    async fn failed_store_write_keeps_award_for_retry() {
        let ledger = MemoryLedger::new();
        ledger.ensure_user(100).await.unwrap();
        ledger.record_referral(1, 100).await.unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(FlakyLedger {
            inner: ledger.clone(),
            fail_next: AtomicBool::new(true),
        });
        let gate = GateService::new(
            ReferralService::new(store),
            Arc::new(FakeProbe::with(1, MemberStatus::Member)),
            "@first".to_string(),
        );

        assert!(gate.check(1).await.is_err());
        assert!(!ledger.find_user(1).await.unwrap().map_or(false, |u| u.verified));

        let retry = gate.check(1).await.unwrap();
        let GateOutcome::Verified { first_time: true, award: Some(award) } = retry else {
            panic!("retry must still be the first verification, got {:?}", retry);
        };
        assert_eq!((award.points, award.invites), (1, 1));
        let referrer = ledger.find_user(100).await.unwrap().unwrap();
        assert_eq!((referrer.points, referrer.invites), (1, 1));
    }
}
