//! Persistence layer: the document store behind the verification flow.
//!
//! [`VerificationStore`] is the only write path to coin balances and
//! verification status. Both conditional transitions are single atomic
//! operations, so two approvals racing on the same record can never both
//! credit the user.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{PurchaseVerification, User, UserId, VerificationId, VerificationStatus};

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors raised by a [`VerificationStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A document with the same id already exists.
    #[error("{kind} {id} already exists")]
    Duplicate {
        /// Document kind (`"user"` or `"verification"`).
        kind: &'static str,
        /// Conflicting id.
        id: String,
    },

    /// Crediting would overflow the user's balance.
    #[error("coin balance overflow for user {0}")]
    BalanceOverflow(UserId),

    /// A stored document could not be decoded.
    #[error("corrupt record: {0}")]
    Corrupt(String),

    /// The backing database failed.
    #[error("database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Result of a conditional `pending → rejected` transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// The record was pending and is now rejected.
    Rejected(PurchaseVerification),
    /// The record had already left `pending`; nothing changed.
    NotPending(VerificationStatus),
    /// No record with that id exists.
    Missing,
}

/// Result of a conditional `pending → completed` transition with credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The record is now completed and the user was credited.
    Credited {
        /// Updated verification record.
        verification: PurchaseVerification,
        /// User balance after the credit.
        new_balance: i64,
    },
    /// The record had already left `pending`; nothing changed.
    NotPending(VerificationStatus),
    /// No verification with that id exists; nothing changed.
    VerificationMissing,
    /// The user to credit does not exist; nothing changed.
    UserMissing,
}

/// Document store for users and purchase verifications.
#[async_trait]
pub trait VerificationStore: std::fmt::Debug + Send + Sync {
    /// Short backend name for diagnostics (`"memory"`, `"postgres"`).
    fn backend_name(&self) -> &'static str;

    /// Inserts a new user.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the user exists, or a backend error.
    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    /// Loads a user by id.
    ///
    /// # Errors
    ///
    /// Returns a backend error on read failure.
    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError>;

    /// Inserts a new verification record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id is taken, or a backend error.
    async fn insert_verification(
        &self,
        verification: &PurchaseVerification,
    ) -> Result<(), StoreError>;

    /// Loads a verification record by id.
    ///
    /// # Errors
    ///
    /// Returns a backend error on read failure.
    async fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<Option<PurchaseVerification>, StoreError>;

    /// Marks a pending verification as rejected with `reason`.
    ///
    /// # Errors
    ///
    /// Returns a backend error on write failure.
    async fn reject_verification(
        &self,
        id: &VerificationId,
        reason: &str,
    ) -> Result<Rejection, StoreError>;

    /// Marks a pending verification as completed at `completed_at` and
    /// increments `user_id`'s balance by `coins`, as one atomic step.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BalanceOverflow`] or a backend error.
    async fn complete_verification(
        &self,
        id: &VerificationId,
        user_id: &UserId,
        coins: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<Completion, StoreError>;
}
