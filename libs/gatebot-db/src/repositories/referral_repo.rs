use anyhow::{Context, Result};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct ReferralRepository {
    pool: PgPool,
}

impl ReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The first link recorded for a user wins; later ones are dropped.
    pub async fn insert_if_absent(&self, user_id: i64, ref_id: i64) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO referrals (user_id, ref_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .bind(ref_id)
        .execute(&self.pool)
        .await
        .context("Failed to record referral")?;
        Ok(result.rows_affected() == 1)
    }

    pub async fn get_referrer(&self, user_id: i64) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT ref_id FROM referrals WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch referral")
    }
}
