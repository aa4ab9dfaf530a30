//! Verification service: purchase initiation and approval processing.

use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    ApprovalCommand, CoinCatalog, EventBus, PurchaseVerification, User, UserId, VerificationEvent,
    VerificationId, VerificationStatus,
};
use crate::error::GatewayError;
use crate::persistence::{Completion, Rejection, StoreError, VerificationStore};

/// Rejection reason recorded when the purchasing user does not exist.
pub const USER_NOT_FOUND_REASON: &str = "User not found";

/// Rejection reason recorded when the package is not in the catalog.
pub const PACKAGE_NOT_FOUND_REASON: &str = "Package not found";

/// Why an approval message did not credit any coins.
#[derive(Debug, thiserror::Error)]
pub enum ApprovalError {
    /// The message holds no `ok <id>` command.
    #[error("No approval command found in message; expected \"ok <verification id>\"")]
    NoCommand,

    /// No verification with this id exists.
    #[error("Verification {0} not found")]
    NotFound(VerificationId),

    /// The verification was already approved.
    #[error("Verification {0} already completed")]
    AlreadyCompleted(VerificationId),

    /// The verification was already rejected.
    #[error("Verification {0} already rejected")]
    AlreadyRejected(VerificationId),

    /// The purchasing user does not exist; the verification was rejected.
    #[error("User {user_id} not found; verification {verification_id} rejected")]
    UserNotFound {
        /// Rejected verification.
        verification_id: VerificationId,
        /// Missing user.
        user_id: UserId,
    },

    /// The package is not in the catalog; the verification was rejected.
    #[error("Package {package_id} not found; verification {verification_id} rejected")]
    PackageNotFound {
        /// Rejected verification.
        verification_id: VerificationId,
        /// Unknown package.
        package_id: String,
    },

    /// The store failed mid-approval; the outcome is unknown.
    #[error("Error processing verification {verification_id}: {source}")]
    Store {
        /// Verification being processed.
        verification_id: VerificationId,
        /// Underlying fault.
        source: StoreError,
    },
}

impl ApprovalError {
    fn terminal(id: &VerificationId, status: VerificationStatus) -> Self {
        match status {
            VerificationStatus::Rejected => Self::AlreadyRejected(id.clone()),
            VerificationStatus::Completed | VerificationStatus::Pending => {
                Self::AlreadyCompleted(id.clone())
            }
        }
    }
}

/// A successful approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalReceipt {
    /// The verification, now `completed`.
    pub verification: PurchaseVerification,
    /// Coins credited.
    pub coins: i64,
    /// User balance after the credit.
    pub new_balance: i64,
}

impl fmt::Display for ApprovalReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Verification {} approved: {} coins credited to user {}",
            self.verification.id, self.coins, self.verification.user_id
        )
    }
}

/// Value-level result of processing an approval message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProcessOutcome {
    /// `true` only when coins were credited.
    pub success: bool,
    /// Human-readable description of what happened.
    pub message: String,
}

/// A newly initiated purchase awaiting administrator approval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseTicket {
    /// The pending verification record.
    pub verification: PurchaseVerification,
    /// Coins the package grants.
    pub coins: i64,
    /// Exact reply the administrator sends to approve.
    pub approval_command: String,
    /// Text sent to the administrator.
    pub request_text: String,
    /// `wa.me` deep link carrying `request_text`, if an admin number is configured.
    pub whatsapp_url: Option<String>,
}

/// The trusted service boundary for coin purchases.
///
/// All writes to coin balances and verification status go through here.
/// Each approval ends in exactly one of: no mutation, one rejection, or
/// one completion with one credit.
#[derive(Debug, Clone)]
pub struct VerificationService {
    store: Arc<dyn VerificationStore>,
    catalog: Arc<CoinCatalog>,
    event_bus: EventBus,
    whatsapp_admin_number: Option<String>,
}

impl VerificationService {
    /// Creates a new `VerificationService`.
    #[must_use]
    pub fn new(
        store: Arc<dyn VerificationStore>,
        catalog: Arc<CoinCatalog>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            store,
            catalog,
            event_bus,
            whatsapp_admin_number: None,
        }
    }

    /// Sets the administrator number used for WhatsApp deep links.
    #[must_use]
    pub fn with_whatsapp_admin_number(mut self, number: Option<String>) -> Self {
        self.whatsapp_admin_number = number;
        self
    }

    /// Returns the shared coin catalog.
    #[must_use]
    pub fn catalog(&self) -> &CoinCatalog {
        &self.catalog
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Returns the store backend name.
    #[must_use]
    pub fn store_backend(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Processes an administrator reply and reports the outcome as a value.
    ///
    /// Never fails: every error, including store faults, is folded into a
    /// `success = false` outcome.
    pub async fn process_approval_message(&self, message: &str) -> ProcessOutcome {
        match self.approve(message).await {
            Ok(receipt) => ProcessOutcome {
                success: true,
                message: receipt.to_string(),
            },
            Err(err) => {
                match &err {
                    ApprovalError::Store {
                        verification_id,
                        source,
                    } => {
                        tracing::error!(
                            %verification_id,
                            error = %source,
                            "approval aborted by store fault"
                        );
                    }
                    other => tracing::info!(reason = %other, "approval not applied"),
                }
                ProcessOutcome {
                    success: false,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Parses `message` for an `ok <id>` command and approves that verification.
    ///
    /// # Errors
    ///
    /// Returns an [`ApprovalError`] describing why no coins were credited.
    pub async fn approve(&self, message: &str) -> Result<ApprovalReceipt, ApprovalError> {
        let command = ApprovalCommand::parse(message).ok_or(ApprovalError::NoCommand)?;
        self.approve_verification(&command.verification_id).await
    }

    /// Approves a verification by id.
    ///
    /// # Errors
    ///
    /// Returns an [`ApprovalError`] describing why no coins were credited.
    pub async fn approve_verification(
        &self,
        id: &VerificationId,
    ) -> Result<ApprovalReceipt, ApprovalError> {
        let store_fault = |source: StoreError| ApprovalError::Store {
            verification_id: id.clone(),
            source,
        };

        let verification = self
            .store
            .get_verification(id)
            .await
            .map_err(store_fault)?
            .ok_or_else(|| ApprovalError::NotFound(id.clone()))?;

        if verification.status.is_terminal() {
            return Err(ApprovalError::terminal(id, verification.status));
        }

        let user = self
            .store
            .get_user(&verification.user_id)
            .await
            .map_err(store_fault)?;
        if user.is_none() {
            return Err(self.reject_missing_user(&verification).await);
        }

        let Some(package) = self.catalog.get(&verification.package_id) else {
            self.reject(&verification, PACKAGE_NOT_FOUND_REASON).await?;
            return Err(ApprovalError::PackageNotFound {
                verification_id: id.clone(),
                package_id: verification.package_id.clone(),
            });
        };
        let coins = package.coins;

        let completion = self
            .store
            .complete_verification(id, &verification.user_id, coins, Utc::now())
            .await
            .map_err(store_fault)?;

        match completion {
            Completion::Credited {
                verification,
                new_balance,
            } => {
                tracing::info!(
                    verification_id = %verification.id,
                    user_id = %verification.user_id,
                    coins,
                    new_balance,
                    "purchase approved"
                );
                let _ = self.event_bus.publish(VerificationEvent::VerificationCompleted {
                    verification_id: verification.id.clone(),
                    user_id: verification.user_id.clone(),
                    coins,
                    new_balance,
                    timestamp: verification.completed_at.unwrap_or_else(Utc::now),
                });
                Ok(ApprovalReceipt {
                    verification,
                    coins,
                    new_balance,
                })
            }
            Completion::NotPending(status) => Err(ApprovalError::terminal(id, status)),
            Completion::VerificationMissing => Err(ApprovalError::NotFound(id.clone())),
            // The user vanished between the lookup and the credit.
            Completion::UserMissing => Err(self.reject_missing_user(&verification).await),
        }
    }

    async fn reject_missing_user(&self, verification: &PurchaseVerification) -> ApprovalError {
        match self.reject(verification, USER_NOT_FOUND_REASON).await {
            Ok(()) => ApprovalError::UserNotFound {
                verification_id: verification.id.clone(),
                user_id: verification.user_id.clone(),
            },
            Err(err) => err,
        }
    }

    /// Conditionally moves `verification` from `pending` to `rejected`.
    async fn reject(
        &self,
        verification: &PurchaseVerification,
        reason: &str,
    ) -> Result<(), ApprovalError> {
        let id = &verification.id;
        let rejection = self
            .store
            .reject_verification(id, reason)
            .await
            .map_err(|source| ApprovalError::Store {
                verification_id: id.clone(),
                source,
            })?;

        match rejection {
            Rejection::Rejected(record) => {
                tracing::warn!(verification_id = %id, reason, "verification rejected");
                let _ = self.event_bus.publish(VerificationEvent::VerificationRejected {
                    verification_id: record.id,
                    user_id: record.user_id,
                    reason: reason.to_string(),
                    timestamp: Utc::now(),
                });
                Ok(())
            }
            Rejection::NotPending(status) => Err(ApprovalError::terminal(id, status)),
            Rejection::Missing => Err(ApprovalError::NotFound(id.clone())),
        }
    }

    /// Starts a purchase: records a `pending` verification and returns the
    /// text the administrator needs to approve it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownPackage`] for a package outside the
    /// catalog, [`GatewayError::UserNotFound`] for an unknown user, or a
    /// persistence error.
    pub async fn initiate_purchase(
        &self,
        user_id: UserId,
        package_id: &str,
    ) -> Result<PurchaseTicket, GatewayError> {
        let package = self
            .catalog
            .get(package_id)
            .ok_or_else(|| GatewayError::UnknownPackage(package_id.to_string()))?;
        let coins = package.coins;

        if self.store.get_user(&user_id).await?.is_none() {
            return Err(GatewayError::UserNotFound(user_id.to_string()));
        }

        let verification = PurchaseVerification::pending(
            VerificationId::generate(),
            user_id,
            package.id.clone(),
        );
        self.store.insert_verification(&verification).await?;

        tracing::info!(
            verification_id = %verification.id,
            user_id = %verification.user_id,
            package_id,
            "purchase initiated"
        );
        let _ = self.event_bus.publish(VerificationEvent::VerificationCreated {
            verification_id: verification.id.clone(),
            user_id: verification.user_id.clone(),
            package_id: verification.package_id.clone(),
            timestamp: verification.created_at,
        });

        let approval_command = format!("ok {}", verification.id);
        let request_text = format!(
            "VORTEX coin purchase\nUser: {}\nPackage: {} ({coins} coins)\nReply \"{approval_command}\" to approve.",
            verification.user_id, verification.package_id
        );
        let whatsapp_url = self.whatsapp_admin_number.as_ref().map(|number| {
            format!(
                "https://wa.me/{number}?text={}",
                urlencoding::encode(&request_text)
            )
        });

        Ok(PurchaseTicket {
            verification,
            coins,
            approval_command,
            request_text,
            whatsapp_url,
        })
    }

    /// Registers a user with a zero balance.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Conflict`] if the user exists, or a
    /// persistence error.
    pub async fn register_user(&self, user_id: UserId) -> Result<User, GatewayError> {
        let user = User::new(user_id);
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Loads a user.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UserNotFound`] or a persistence error.
    pub async fn get_user(&self, user_id: &UserId) -> Result<User, GatewayError> {
        self.store
            .get_user(user_id)
            .await?
            .ok_or_else(|| GatewayError::UserNotFound(user_id.to_string()))
    }

    /// Loads a verification record.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::VerificationNotFound`] or a persistence error.
    pub async fn get_verification(
        &self,
        id: &VerificationId,
    ) -> Result<PurchaseVerification, GatewayError> {
        self.store
            .get_verification(id)
            .await?
            .ok_or_else(|| GatewayError::VerificationNotFound(id.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        service: VerificationService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let dyn_store: Arc<dyn VerificationStore> = Arc::clone(&store) as _;
        let service = VerificationService::new(
            dyn_store,
            Arc::new(CoinCatalog::default()),
            EventBus::new(64),
        );
        Fixture { store, service }
    }

    fn uid(raw: &str) -> UserId {
        let Ok(id) = UserId::parse(raw) else {
            panic!("valid user id");
        };
        id
    }

    fn vid(raw: &str) -> VerificationId {
        let Ok(id) = VerificationId::parse(raw) else {
            panic!("valid verification id");
        };
        id
    }

    async fn seed_user(fx: &Fixture, id: &str, balance: i64) {
        let mut user = User::new(uid(id));
        user.coin_balance = balance;
        assert!(fx.store.insert_user(&user).await.is_ok());
    }

    async fn seed_verification(fx: &Fixture, id: &str, user: &str, package: &str) {
        let record = PurchaseVerification::pending(vid(id), uid(user), package);
        assert!(fx.store.insert_verification(&record).await.is_ok());
    }

    async fn balance(fx: &Fixture, user: &str) -> i64 {
        let Ok(Some(user)) = fx.store.get_user(&uid(user)).await else {
            panic!("user should exist");
        };
        user.coin_balance
    }

    async fn record(fx: &Fixture, id: &str) -> PurchaseVerification {
        let Ok(Some(record)) = fx.store.get_verification(&vid(id)).await else {
            panic!("verification should exist");
        };
        record
    }

    #[tokio::test]
    async fn standard_package_credits_eighty() {
        let fx = fixture();
        seed_user(&fx, "user1", 100).await;
        seed_verification(&fx, "abc123", "user1", "standard").await;

        let outcome = fx.service.process_approval_message("ok abc123").await;
        assert!(outcome.success, "{}", outcome.message);
        assert!(outcome.message.contains("abc123"));
        assert!(outcome.message.contains("80"));
        assert!(outcome.message.contains("user1"));

        assert_eq!(balance(&fx, "user1").await, 180);
        let record = record(&fx, "abc123").await;
        assert_eq!(record.status, VerificationStatus::Completed);
        assert!(record.completed_at.is_some());
    }

    #[tokio::test]
    async fn replay_never_credits_twice() {
        let fx = fixture();
        seed_user(&fx, "user1", 0).await;
        seed_verification(&fx, "abc123", "user1", "pro").await;

        assert!(fx.service.process_approval_message("ok abc123").await.success);
        for _ in 0..3 {
            let outcome = fx.service.process_approval_message("OK abc123").await;
            assert!(!outcome.success);
            assert!(outcome.message.contains("already completed"));
        }
        assert_eq!(balance(&fx, "user1").await, 300);
    }

    #[tokio::test]
    async fn no_command_touches_nothing() {
        let fx = fixture();
        seed_user(&fx, "user1", 5).await;
        seed_verification(&fx, "abc123", "user1", "basic").await;

        for message in ["", "hello", "okabc123", "approve abc123", "ok"] {
            let outcome = fx.service.process_approval_message(message).await;
            assert!(!outcome.success);
        }
        assert_eq!(balance(&fx, "user1").await, 5);
        assert_eq!(
            record(&fx, "abc123").await.status,
            VerificationStatus::Pending
        );
    }

    #[tokio::test]
    async fn unknown_verification_is_reported() {
        let fx = fixture();
        let result = fx.service.approve("ok missing1").await;
        assert!(matches!(result, Err(ApprovalError::NotFound(id)) if id.as_str() == "missing1"));
        assert_eq!(fx.store.verification_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_package_rejects() {
        let fx = fixture();
        seed_user(&fx, "user1", 100).await;
        seed_verification(&fx, "abc123", "user1", "doesnotexist").await;

        let outcome = fx.service.process_approval_message("ok abc123").await;
        assert!(!outcome.success);
        assert_eq!(balance(&fx, "user1").await, 100);
        let record = record(&fx, "abc123").await;
        assert_eq!(record.status, VerificationStatus::Rejected);
        assert_eq!(record.reason.as_deref(), Some(PACKAGE_NOT_FOUND_REASON));
    }

    #[tokio::test]
    async fn unknown_user_rejects() {
        let fx = fixture();
        seed_verification(&fx, "abc123", "ghost", "basic").await;

        let result = fx.service.approve("ok abc123").await;
        assert!(matches!(result, Err(ApprovalError::UserNotFound { .. })));
        let record = record(&fx, "abc123").await;
        assert_eq!(record.status, VerificationStatus::Rejected);
        assert_eq!(record.reason.as_deref(), Some(USER_NOT_FOUND_REASON));
    }

    #[tokio::test]
    async fn missing_user_takes_precedence_over_missing_package() {
        let fx = fixture();
        seed_verification(&fx, "abc123", "ghost", "doesnotexist").await;

        let _ = fx.service.approve("ok abc123").await;
        assert_eq!(
            record(&fx, "abc123").await.reason.as_deref(),
            Some(USER_NOT_FOUND_REASON)
        );
    }

    #[tokio::test]
    async fn rejected_verification_stays_rejected() {
        let fx = fixture();
        seed_verification(&fx, "abc123", "user1", "basic").await;
        let _ = fx.service.approve("ok abc123").await;

        // The user shows up later; the rejection is still final.
        seed_user(&fx, "user1", 0).await;
        let result = fx.service.approve("ok abc123").await;
        assert!(matches!(result, Err(ApprovalError::AlreadyRejected(_))));
        assert_eq!(balance(&fx, "user1").await, 0);
    }

    #[tokio::test]
    async fn concurrent_approvals_credit_once() {
        let fx = fixture();
        seed_user(&fx, "user1", 0).await;
        seed_verification(&fx, "abc123", "user1", "premium").await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = fx.service.clone();
            handles.push(tokio::spawn(async move {
                service.process_approval_message("ok abc123").await
            }));
        }
        let mut successes = 0;
        for handle in handles {
            let Ok(outcome) = handle.await else {
                panic!("task panicked");
            };
            if outcome.success {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        assert_eq!(balance(&fx, "user1").await, 120);
    }

    #[tokio::test]
    async fn approval_publishes_completion_event() {
        let fx = fixture();
        let mut rx = fx.service.event_bus().subscribe();
        seed_user(&fx, "user1", 10).await;
        seed_verification(&fx, "abc123", "user1", "basic").await;

        assert!(fx.service.approve("ok abc123").await.is_ok());
        let Ok(VerificationEvent::VerificationCompleted {
            coins, new_balance, ..
        }) = rx.recv().await
        else {
            panic!("expected completion event");
        };
        assert_eq!((coins, new_balance), (40, 50));
    }

    #[tokio::test]
    async fn initiate_purchase_creates_pending_record() {
        let fx = fixture();
        seed_user(&fx, "user1", 0).await;
        let service = fx
            .service
            .clone()
            .with_whatsapp_admin_number(Some("15551234567".to_string()));

        let Ok(ticket) = service.initiate_purchase(uid("user1"), "premium").await else {
            panic!("purchase should start");
        };
        assert_eq!(ticket.coins, 120);
        assert_eq!(ticket.verification.status, VerificationStatus::Pending);
        assert_eq!(
            ticket.approval_command,
            format!("ok {}", ticket.verification.id)
        );
        assert!(ticket.request_text.contains(&ticket.approval_command));
        let Some(url) = ticket.whatsapp_url else {
            panic!("admin number configured");
        };
        assert!(url.starts_with("https://wa.me/15551234567?text="));
        assert!(!url.contains(' '));

        // The ticket's command approves the purchase it created.
        let outcome = fx
            .service
            .process_approval_message(&ticket.approval_command)
            .await;
        assert!(outcome.success);
        assert_eq!(balance(&fx, "user1").await, 120);
    }

    #[tokio::test]
    async fn initiate_purchase_validates_inputs() {
        let fx = fixture();
        seed_user(&fx, "user1", 0).await;

        let bad_package = fx.service.initiate_purchase(uid("user1"), "gold").await;
        assert!(matches!(bad_package, Err(GatewayError::UnknownPackage(_))));

        let bad_user = fx.service.initiate_purchase(uid("nobody"), "basic").await;
        assert!(matches!(bad_user, Err(GatewayError::UserNotFound(_))));

        assert_eq!(fx.store.verification_count().await, 0);
    }

    #[tokio::test]
    async fn register_user_twice_conflicts() {
        let fx = fixture();
        assert!(fx.service.register_user(uid("user1")).await.is_ok());
        let again = fx.service.register_user(uid("user1")).await;
        assert!(matches!(again, Err(GatewayError::Conflict(_))));
    }
}
