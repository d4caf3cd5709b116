use serde::{Deserialize, Serialize};

/// One row of the `users` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAccount {
    pub user_id: i64,
    pub points: i64,
    pub verified: bool,
    pub invites: i64,
}

impl UserAccount {
    /// Account as it looks right after the first interaction.
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            points: 0,
            verified: false,
            invites: 0,
        }
    }
}

/// What a verification changed: the previous flag and, on the first
/// transition only, the referrer's account after its credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub was_verified: bool,
    pub credited_referrer: Option<UserAccount>,
}
