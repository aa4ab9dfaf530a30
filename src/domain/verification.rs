//! Purchase verification and user records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{UserId, VerificationId};

/// Lifecycle state of a purchase verification.
///
/// Only `Pending` can transition; `Completed` and `Rejected` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// Awaiting administrator approval.
    Pending,
    /// Approved; coins were credited.
    Completed,
    /// Closed without crediting coins.
    Rejected,
}

impl VerificationStatus {
    /// Returns the lowercase wire name (`"pending"`, `"completed"`, `"rejected"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        }
    }

    /// Returns `true` for `Completed` and `Rejected`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VerificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("unknown verification status: {other}")),
        }
    }
}

/// One purchase approval attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseVerification {
    /// Token the administrator echoes back in `ok <id>`.
    #[schema(value_type = String)]
    pub id: VerificationId,
    /// Purchasing user.
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Catalog package being purchased.
    pub package_id: String,
    /// Current lifecycle state.
    pub status: VerificationStatus,
    /// Why the verification was rejected. Set only when `status` is `rejected`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When coins were credited. Set only when `status` is `completed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PurchaseVerification {
    /// Creates a new `pending` verification.
    #[must_use]
    pub fn pending(id: VerificationId, user_id: UserId, package_id: impl Into<String>) -> Self {
        Self {
            id,
            user_id,
            package_id: package_id.into(),
            status: VerificationStatus::Pending,
            reason: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }
}

/// A user as seen by the purchase flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Authentication identity.
    #[schema(value_type = String)]
    pub id: UserId,
    /// Spendable coins. Only ever changed by atomic increments.
    pub coin_balance: i64,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Creates a user with a zero balance.
    #[must_use]
    pub fn new(id: UserId) -> Self {
        Self {
            id,
            coin_balance: 0,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn ids() -> (VerificationId, UserId) {
        let Ok(vid) = VerificationId::parse("abc123") else {
            panic!("valid verification id");
        };
        let Ok(uid) = UserId::parse("user1") else {
            panic!("valid user id");
        };
        (vid, uid)
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!VerificationStatus::Pending.is_terminal());
        assert!(VerificationStatus::Completed.is_terminal());
        assert!(VerificationStatus::Rejected.is_terminal());
    }

    #[test]
    fn status_parses_wire_names() {
        for status in [
            VerificationStatus::Pending,
            VerificationStatus::Completed,
            VerificationStatus::Rejected,
        ] {
            assert_eq!(status.as_str().parse::<VerificationStatus>(), Ok(status));
        }
        assert!("approved".parse::<VerificationStatus>().is_err());
    }

    #[test]
    fn pending_record_serializes_camel_case_without_optional_fields() {
        let (vid, uid) = ids();
        let record = PurchaseVerification::pending(vid, uid, "standard");
        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(json["userId"], "user1");
        assert_eq!(json["packageId"], "standard");
        assert_eq!(json["status"], "pending");
        assert!(json.get("reason").is_none());
        assert!(json.get("completedAt").is_none());
    }

    #[test]
    fn new_user_starts_at_zero() {
        let (_, uid) = ids();
        assert_eq!(User::new(uid).coin_balance, 0);
    }
}
