use std::sync::Arc;

use anyhow::Result;
use gatebot_db::LedgerStore;

/// Totals a referrer ends up with after one successful invite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferralAward {
    pub referrer_id: i64,
    pub points: i64,
    pub invites: i64,
}

impl ReferralAward {
    pub fn notification(&self) -> String {
        format!(
            "🎉 Someone joined using your link!\nTotal invites: {}\nTotal points: {}",
            self.invites, self.points
        )
    }
}

#[derive(Clone)]
pub struct ReferralService {
    ledger: Arc<dyn LedgerStore>,
}

impl ReferralService {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Records the `/start` argument as this user's referrer when it is a
    /// numeric id other than the user's own.
    pub async fn register(&self, user_id: i64, start_arg: &str) -> Result<bool> {
        let Some(ref_id) = parse_referrer(user_id, start_arg) else {
            return Ok(false);
        };
        let stored = self.ledger.record_referral(user_id, ref_id).await?;
        if stored {
            tracing::info!("User {} referred by {}", user_id, ref_id);
        }
        Ok(stored)
    }

    /// Marks the user verified. On the first transition the referrer, when
    /// one is recorded and has an account, is credited in the same ledger
    /// operation. Returns whether this was the first verification and the
    /// referrer's new totals.
    pub async fn verify_and_award(&self, user_id: i64) -> Result<(bool, Option<ReferralAward>)> {
        let verification = self.ledger.verify_with_referral(user_id).await?;
        if verification.was_verified {
            return Ok((false, None));
        }

        let award = verification.credited_referrer.map(|account| ReferralAward {
            referrer_id: account.user_id,
            points: account.points,
            invites: account.invites,
        });
        match &award {
            Some(award) => tracing::info!("User {} credited for inviting {}", award.referrer_id, user_id),
            None => tracing::debug!("No referrer to credit for user {}", user_id),
        }
        Ok((true, award))
    }
}

fn parse_referrer(user_id: i64, arg: &str) -> Option<i64> {
    let arg = arg.trim();
    if arg.is_empty() || !arg.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    arg.parse::<i64>().ok().filter(|&ref_id| ref_id != user_id)
}
