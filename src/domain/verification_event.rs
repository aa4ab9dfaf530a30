//! Domain events reflecting verification state changes.
//!
//! Every transition emits a [`VerificationEvent`] through the
//! [`super::EventBus`]. Events are forwarded to WebSocket subscribers so the
//! purchaser and the approver see the outcome of an approval.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{UserId, VerificationId};

/// Domain event emitted after every verification mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum VerificationEvent {
    /// A purchase was initiated and is awaiting approval.
    VerificationCreated {
        /// Verification identifier.
        verification_id: VerificationId,
        /// Purchasing user.
        user_id: UserId,
        /// Purchased package.
        package_id: String,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An approval credited coins to the user.
    VerificationCompleted {
        /// Verification identifier.
        verification_id: VerificationId,
        /// Credited user.
        user_id: UserId,
        /// Coins credited.
        coins: i64,
        /// User balance after the credit.
        new_balance: i64,
        /// Completion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The verification was closed without a credit.
    VerificationRejected {
        /// Verification identifier.
        verification_id: VerificationId,
        /// Owning user.
        user_id: UserId,
        /// Rejection reason.
        reason: String,
        /// Rejection timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl VerificationEvent {
    /// Returns the verification this event refers to.
    #[must_use]
    pub fn verification_id(&self) -> &VerificationId {
        match self {
            Self::VerificationCreated {
                verification_id, ..
            }
            | Self::VerificationCompleted {
                verification_id, ..
            }
            | Self::VerificationRejected {
                verification_id, ..
            } => verification_id,
        }
    }

    /// Returns the user this event refers to.
    #[must_use]
    pub fn user_id(&self) -> &UserId {
        match self {
            Self::VerificationCreated { user_id, .. }
            | Self::VerificationCompleted { user_id, .. }
            | Self::VerificationRejected { user_id, .. } => user_id,
        }
    }

    /// Returns the `snake_case` event type tag.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::VerificationCreated { .. } => "verification_created",
            Self::VerificationCompleted { .. } => "verification_completed",
            Self::VerificationRejected { .. } => "verification_rejected",
        }
    }
}
