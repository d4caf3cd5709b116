use anyhow::{Context, Result};
use sqlx::{PgPool, postgres::PgPoolOptions};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("DATABASE_URL must start with postgres:// or postgresql://, got {0:?}")]
    InvalidUrl(String),
}

/// Opens the connection pool and brings the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    if !database_url.starts_with("postgres://") && !database_url.starts_with("postgresql://") {
        return Err(DbError::InvalidUrl(redact(database_url)).into());
    }

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run DB migrations")?;

    tracing::info!("Ledger database ready");
    Ok(pool)
}

// Keeps credentials out of error messages.
fn redact(url: &str) -> String {
    match url.split_once('@') {
        Some((_, host)) => format!("***@{}", host),
        None => url.chars().take(16).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_hides_credentials() {
        assert_eq!(redact("mysql://root:hunter2@db:3306/x"), "***@db:3306/x");
        assert_eq!(redact("sqlite://file.db"), "sqlite://file.db");
    }

    #[tokio::test]
    async fn connect_rejects_non_postgres_url() {
        let err = connect("mysql://root:pw@localhost/db", 1).await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("postgres://"));
        assert!(!msg.contains("pw"));
    }
}
