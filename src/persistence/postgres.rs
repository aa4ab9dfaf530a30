//! PostgreSQL implementation of the document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::{Completion, Rejection, StoreError, VerificationStore};
use crate::config::GatewayConfig;
use crate::domain::{PurchaseVerification, User, UserId, VerificationId, VerificationStatus};

type VerificationRow = (
    String,
    String,
    String,
    String,
    Option<String>,
    DateTime<Utc>,
    Option<DateTime<Utc>>,
);

const VERIFICATION_COLUMNS: &str =
    "id, user_id, package_id, status, reason, created_at, completed_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects using the pool settings in `config` and applies pending
    /// migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the connection or a migration fails.
    pub async fn connect(config: &GatewayConfig) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(std::time::Duration::from_secs(
                config.database_connect_timeout_secs,
            ))
            .connect(&config.database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::info!(
            max_connections = config.database_max_connections,
            "connected to postgres"
        );
        Ok(Self::new(pool))
    }
}

/// Maps a unique-key violation to [`StoreError::Duplicate`].
fn map_insert_error(err: sqlx::Error, kind: &'static str, id: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate {
            kind,
            id: id.to_string(),
        },
        _ => StoreError::from(err),
    }
}

fn decode_verification(row: VerificationRow) -> Result<PurchaseVerification, StoreError> {
    let (id, user_id, package_id, status, reason, created_at, completed_at) = row;
    Ok(PurchaseVerification {
        id: VerificationId::parse(&id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        user_id: UserId::parse(&user_id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        package_id,
        status: status.parse().map_err(StoreError::Corrupt)?,
        reason,
        created_at,
        completed_at,
    })
}

fn decode_status(raw: &str) -> Result<VerificationStatus, StoreError> {
    raw.parse().map_err(StoreError::Corrupt)
}

#[async_trait]
impl VerificationStore for PostgresStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO users (id, coin_balance, created_at) VALUES ($1, $2, $3)")
            .bind(user.id.as_str())
            .bind(user.coin_balance)
            .bind(user.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| map_insert_error(e, "user", user.id.as_str()))?;
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, (String, i64, DateTime<Utc>)>(
            "SELECT id, coin_balance, created_at FROM users WHERE id = $1",
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(id, coin_balance, created_at)| {
            Ok(User {
                id: UserId::parse(&id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
                coin_balance,
                created_at,
            })
        })
        .transpose()
    }

    async fn insert_verification(
        &self,
        verification: &PurchaseVerification,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO purchase_verifications \
             (id, user_id, package_id, status, reason, created_at, completed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(verification.id.as_str())
        .bind(verification.user_id.as_str())
        .bind(&verification.package_id)
        .bind(verification.status.as_str())
        .bind(verification.reason.as_deref())
        .bind(verification.created_at)
        .bind(verification.completed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "verification", verification.id.as_str()))?;
        Ok(())
    }

    async fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<Option<PurchaseVerification>, StoreError> {
        let row = sqlx::query_as::<_, VerificationRow>(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM purchase_verifications WHERE id = $1"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_verification).transpose()
    }

    async fn reject_verification(
        &self,
        id: &VerificationId,
        reason: &str,
    ) -> Result<Rejection, StoreError> {
        let updated = sqlx::query_as::<_, VerificationRow>(&format!(
            "UPDATE purchase_verifications SET status = 'rejected', reason = $2 \
             WHERE id = $1 AND status = 'pending' RETURNING {VERIFICATION_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(reason)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = updated {
            return Ok(Rejection::Rejected(decode_verification(row)?));
        }

        let current = sqlx::query_scalar::<_, String>(
            "SELECT status FROM purchase_verifications WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match current {
            Some(status) => Ok(Rejection::NotPending(decode_status(&status)?)),
            None => Ok(Rejection::Missing),
        }
    }

    async fn complete_verification(
        &self,
        id: &VerificationId,
        user_id: &UserId,
        coins: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<Completion, StoreError> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent approvals of the same record.
        let status = sqlx::query_scalar::<_, String>(
            "SELECT status FROM purchase_verifications WHERE id = $1 FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(status) = status else {
            return Ok(Completion::VerificationMissing);
        };
        let status = decode_status(&status)?;
        if status != VerificationStatus::Pending {
            return Ok(Completion::NotPending(status));
        }

        let current_balance = sqlx::query_scalar::<_, i64>(
            "SELECT coin_balance FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(current_balance) = current_balance else {
            return Ok(Completion::UserMissing);
        };
        if current_balance.checked_add(coins).is_none() {
            return Err(StoreError::BalanceOverflow(user_id.clone()));
        }

        let new_balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET coin_balance = coin_balance + $2 WHERE id = $1 \
             RETURNING coin_balance",
        )
        .bind(user_id.as_str())
        .bind(coins)
        .fetch_one(&mut *tx)
        .await?;

        let row = sqlx::query_as::<_, VerificationRow>(&format!(
            "UPDATE purchase_verifications SET status = 'completed', completed_at = $2 \
             WHERE id = $1 AND status = 'pending' RETURNING {VERIFICATION_COLUMNS}"
        ))
        .bind(id.as_str())
        .bind(completed_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Completion::Credited {
            verification: decode_verification(row)?,
            new_balance,
        })
    }
}
