use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use gatebot_db::LedgerStore;
use tokio::sync::RwLock;

pub const ADDPOINTS_USAGE: &str = "Usage: /addpoints <user_id> <points>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddPointsOutcome {
    Usage,
    Invalid,
    Credited { user_id: i64, added: i64, total: i64 },
}

impl AddPointsOutcome {
    pub fn reply(&self) -> String {
        match self {
            Self::Usage => ADDPOINTS_USAGE.to_string(),
            Self::Invalid => format!("Invalid arguments. {}", ADDPOINTS_USAGE),
            Self::Credited { user_id, added, total } => format!(
                "✅ Added {} points to user {}. Total points: {}",
                added, user_id, total
            ),
        }
    }
}

/// Allow-listed maintenance commands. Callers outside the list get nothing.
#[derive(Clone)]
pub struct AdminService {
    ledger: Arc<dyn LedgerStore>,
    admin_ids: Arc<HashSet<i64>>,
    awaiting_broadcast: Arc<RwLock<HashSet<i64>>>,
}

impl AdminService {
    pub fn new(ledger: Arc<dyn LedgerStore>, admin_ids: &[i64]) -> Self {
        Self {
            ledger,
            admin_ids: Arc::new(admin_ids.iter().copied().collect()),
            awaiting_broadcast: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub async fn stats_text(&self) -> Result<String> {
        let total = self.ledger.count_users().await?;
        Ok(format!("👑 <b>Total users in bot:</b> {}", total))
    }

    pub async fn user_list_text(&self) -> Result<String> {
        let ids = self.ledger.list_user_ids().await?;
        let lines: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        Ok(format!("<b>All user IDs:</b>\n{}", lines.join("\n")))
    }

    pub async fn recipients(&self) -> Result<Vec<i64>> {
        self.ledger.list_user_ids().await
    }

    pub async fn arm_broadcast(&self, admin_id: i64) {
        self.awaiting_broadcast.write().await.insert(admin_id);
    }

    /// Consumes the pending flag. True if this admin's next message is the
    /// one to broadcast.
    pub async fn take_broadcast(&self, admin_id: i64) -> bool {
        self.awaiting_broadcast.write().await.remove(&admin_id)
    }

    pub async fn add_points(&self, args: &str) -> Result<AddPointsOutcome> {
        let mut parts = args.split_whitespace();
        let (Some(target), Some(amount)) = (parts.next(), parts.next()) else {
            return Ok(AddPointsOutcome::Usage);
        };
        let (Ok(user_id), Ok(added)) = (target.parse::<i64>(), amount.parse::<i64>()) else {
            return Ok(AddPointsOutcome::Invalid);
        };

        let total = self.ledger.add_points(user_id, added).await?;
        tracing::info!("Admin credited {} points to {}, total {}", added, user_id, total);
        Ok(AddPointsOutcome::Credited {
            user_id,
            added,
            total,
        })
    }
}
