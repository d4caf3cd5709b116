use anyhow::{Context, Result};
use sqlx::{PgPool, Postgres, Transaction};

use crate::models::user::{UserAccount, Verification};

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, user_id: i64) -> Result<Option<UserAccount>> {
        sqlx::query_as::<_, UserAccount>(
            "SELECT user_id, points, verified, invites FROM users WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch user")
    }

    pub async fn ensure(&self, user_id: i64) -> Result<UserAccount> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .context("Failed to insert user")?;

        self.get(user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("User {} vanished right after insert", user_id))
    }

    pub async fn mark_verified(&self, user_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;
        let was_verified = Self::set_verified(&mut tx, user_id).await?;
        tx.commit().await.context("Failed to commit verification")?;
        Ok(was_verified)
    }

    pub async fn verify_with_referral(&self, user_id: i64) -> Result<Verification> {
        let mut tx = self.pool.begin().await.context("Failed to open transaction")?;
        let was_verified = Self::set_verified(&mut tx, user_id).await?;

        let mut credited_referrer = None;
        if !was_verified {
            let ref_id: Option<i64> =
                sqlx::query_scalar("SELECT ref_id FROM referrals WHERE user_id = $1")
                    .bind(user_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .context("Failed to fetch referral")?;

            if let Some(ref_id) = ref_id {
                credited_referrer = sqlx::query_as::<_, UserAccount>(
                    r#"
                    UPDATE users
                    SET points = points + 1, invites = invites + 1
                    WHERE user_id = $1
                    RETURNING user_id, points, verified, invites
                    "#,
                )
                .bind(ref_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to credit referrer")?;
            }
        }

        // Nothing above is visible until this succeeds.
        tx.commit().await.context("Failed to commit verification")?;
        Ok(Verification {
            was_verified,
            credited_referrer,
        })
    }

    /// Creates the row if needed, locks it and sets `verified`. Returns the
    /// flag as it was before.
    async fn set_verified(tx: &mut Transaction<'_, Postgres>, user_id: i64) -> Result<bool> {
        sqlx::query("INSERT INTO users (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
            .bind(user_id)
            .execute(&mut **tx)
            .await
            .context("Failed to insert user")?;

        let was_verified: bool =
            sqlx::query_scalar("SELECT verified FROM users WHERE user_id = $1 FOR UPDATE")
                .bind(user_id)
                .fetch_one(&mut **tx)
                .await
                .context("Failed to lock user row")?;

        if !was_verified {
            sqlx::query("UPDATE users SET verified = TRUE WHERE user_id = $1")
                .bind(user_id)
                .execute(&mut **tx)
                .await
                .context("Failed to mark user verified")?;
        }

        Ok(was_verified)
    }

    pub async fn debit_points(&self, user_id: i64, amount: i64) -> Result<Option<i64>> {
        sqlx::query_scalar(
            "UPDATE users SET points = points - $2 WHERE user_id = $1 AND points >= $2 RETURNING points",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to debit points")
    }

    pub async fn credit_referral(&self, referrer_id: i64) -> Result<Option<UserAccount>> {
        sqlx::query_as::<_, UserAccount>(
            r#"
            UPDATE users
            SET points = points + 1, invites = invites + 1
            WHERE user_id = $1
            RETURNING user_id, points, verified, invites
            "#,
        )
        .bind(referrer_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to credit referrer")
    }

    pub async fn add_points(&self, user_id: i64, amount: i64) -> Result<i64> {
        sqlx::query_scalar(
            r#"
            INSERT INTO users (user_id, points) VALUES ($1, GREATEST($2, 0))
            ON CONFLICT (user_id) DO UPDATE SET points = GREATEST(users.points + $2, 0)
            RETURNING points
            "#,
        )
        .bind(user_id)
        .bind(amount)
        .fetch_one(&self.pool)
        .await
        .context("Failed to add points")
    }

    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count users")
    }

    pub async fn list_ids(&self) -> Result<Vec<i64>> {
        sqlx::query_scalar("SELECT user_id FROM users ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list user ids")
    }
}
