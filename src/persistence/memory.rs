//! In-memory document store.
//!
//! Users and verifications live in two `HashMap`s behind one
//! [`tokio::sync::RwLock`]. Conditional transitions take the write lock
//! once, so the status check and the credit cannot interleave with another
//! approval.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{Completion, Rejection, StoreError, VerificationStore};
use crate::domain::{PurchaseVerification, User, UserId, VerificationId, VerificationStatus};

#[derive(Debug, Default)]
struct Documents {
    users: HashMap<UserId, User>,
    verifications: HashMap<VerificationId, PurchaseVerification>,
}

/// Process-local [`VerificationStore`] used when persistence is disabled
/// and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<Documents>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored verifications.
    pub async fn verification_count(&self) -> usize {
        self.docs.read().await.verifications.len()
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        match docs.users.entry(user.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                kind: "user",
                id: user.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn get_user(&self, user_id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.docs.read().await.users.get(user_id).cloned())
    }

    async fn insert_verification(
        &self,
        verification: &PurchaseVerification,
    ) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        match docs.verifications.entry(verification.id.clone()) {
            Entry::Occupied(_) => Err(StoreError::Duplicate {
                kind: "verification",
                id: verification.id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(verification.clone());
                Ok(())
            }
        }
    }

    async fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<Option<PurchaseVerification>, StoreError> {
        Ok(self.docs.read().await.verifications.get(id).cloned())
    }

    async fn reject_verification(
        &self,
        id: &VerificationId,
        reason: &str,
    ) -> Result<Rejection, StoreError> {
        let mut docs = self.docs.write().await;
        let Some(record) = docs.verifications.get_mut(id) else {
            return Ok(Rejection::Missing);
        };
        if record.status != VerificationStatus::Pending {
            return Ok(Rejection::NotPending(record.status));
        }
        record.status = VerificationStatus::Rejected;
        record.reason = Some(reason.to_string());
        Ok(Rejection::Rejected(record.clone()))
    }

    async fn complete_verification(
        &self,
        id: &VerificationId,
        user_id: &UserId,
        coins: i64,
        completed_at: DateTime<Utc>,
    ) -> Result<Completion, StoreError> {
        let mut guard = self.docs.write().await;
        let docs = &mut *guard;

        let Some(record) = docs.verifications.get_mut(id) else {
            return Ok(Completion::VerificationMissing);
        };
        if record.status != VerificationStatus::Pending {
            return Ok(Completion::NotPending(record.status));
        }
        let Some(user) = docs.users.get_mut(user_id) else {
            return Ok(Completion::UserMissing);
        };
        let new_balance = user
            .coin_balance
            .checked_add(coins)
            .ok_or_else(|| StoreError::BalanceOverflow(user_id.clone()))?;

        user.coin_balance = new_balance;
        record.status = VerificationStatus::Completed;
        record.completed_at = Some(completed_at);

        Ok(Completion::Credited {
            verification: record.clone(),
            new_balance,
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    fn ids(vid: &str, uid: &str) -> (VerificationId, UserId) {
        let (Ok(v), Ok(u)) = (VerificationId::parse(vid), UserId::parse(uid)) else {
            panic!("valid ids");
        };
        (v, u)
    }

    async fn seeded(balance: i64) -> (MemoryStore, VerificationId, UserId) {
        let store = MemoryStore::new();
        let (vid, uid) = ids("abc123", "user1");
        let mut user = User::new(uid.clone());
        user.coin_balance = balance;
        assert!(store.insert_user(&user).await.is_ok());
        let record = PurchaseVerification::pending(vid.clone(), uid.clone(), "standard");
        assert!(store.insert_verification(&record).await.is_ok());
        (store, vid, uid)
    }

    #[tokio::test]
    async fn duplicate_inserts_are_rejected() {
        let (store, vid, uid) = seeded(0).await;
        let dup_user = store.insert_user(&User::new(uid.clone())).await;
        assert!(matches!(dup_user, Err(StoreError::Duplicate { kind: "user", .. })));
        let dup = PurchaseVerification::pending(vid, uid, "basic");
        let dup_ver = store.insert_verification(&dup).await;
        assert!(matches!(
            dup_ver,
            Err(StoreError::Duplicate {
                kind: "verification",
                ..
            })
        ));
        assert_eq!(store.verification_count().await, 1);
    }

    #[tokio::test]
    async fn complete_credits_and_closes() {
        let (store, vid, uid) = seeded(100).await;
        let now = Utc::now();
        let Ok(Completion::Credited {
            verification,
            new_balance,
        }) = store.complete_verification(&vid, &uid, 80, now).await
        else {
            panic!("expected credit");
        };
        assert_eq!(new_balance, 180);
        assert_eq!(verification.status, VerificationStatus::Completed);
        assert_eq!(verification.completed_at, Some(now));

        let again = store.complete_verification(&vid, &uid, 80, now).await;
        assert!(matches!(
            again,
            Ok(Completion::NotPending(VerificationStatus::Completed))
        ));
        let Ok(Some(user)) = store.get_user(&uid).await else {
            panic!("user exists");
        };
        assert_eq!(user.coin_balance, 180);
    }

    #[tokio::test]
    async fn complete_without_user_changes_nothing() {
        let (store, vid, _) = seeded(0).await;
        let (_, ghost) = ids("x", "ghost");
        let result = store
            .complete_verification(&vid, &ghost, 40, Utc::now())
            .await;
        assert!(matches!(result, Ok(Completion::UserMissing)));
        let Ok(Some(record)) = store.get_verification(&vid).await else {
            panic!("record exists");
        };
        assert_eq!(record.status, VerificationStatus::Pending);
    }

    #[tokio::test]
    async fn complete_overflow_is_an_error() {
        let (store, vid, uid) = seeded(i64::MAX).await;
        let result = store.complete_verification(&vid, &uid, 1, Utc::now()).await;
        assert!(matches!(result, Err(StoreError::BalanceOverflow(_))));
        let Ok(Some(record)) = store.get_verification(&vid).await else {
            panic!("record exists");
        };
        assert_eq!(record.status, VerificationStatus::Pending);
    }

    #[tokio::test]
    async fn reject_is_final() {
        let (store, vid, uid) = seeded(0).await;
        let Ok(Rejection::Rejected(record)) =
            store.reject_verification(&vid, "Package not found").await
        else {
            panic!("expected rejection");
        };
        assert_eq!(record.reason.as_deref(), Some("Package not found"));

        let second = store.reject_verification(&vid, "other").await;
        assert!(matches!(
            second,
            Ok(Rejection::NotPending(VerificationStatus::Rejected))
        ));
        let credit = store.complete_verification(&vid, &uid, 40, Utc::now()).await;
        assert!(matches!(
            credit,
            Ok(Completion::NotPending(VerificationStatus::Rejected))
        ));
    }

    #[tokio::test]
    async fn missing_records() {
        let store = MemoryStore::new();
        let (vid, uid) = ids("nope", "nobody");
        assert!(matches!(store.get_verification(&vid).await, Ok(None)));
        assert!(matches!(
            store.reject_verification(&vid, "r").await,
            Ok(Rejection::Missing)
        ));
        assert!(matches!(
            store.complete_verification(&vid, &uid, 1, Utc::now()).await,
            Ok(Completion::VerificationMissing)
        ));
    }
}
