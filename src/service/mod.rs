//! Service layer: business logic orchestration.
//!
//! [`VerificationService`] is the only component that mutates coin balances
//! and verification status. It delegates storage to a
//! [`crate::persistence::VerificationStore`] and emits events through the
//! [`crate::domain::EventBus`].

pub mod verification_service;

pub use verification_service::{
    ApprovalError, ApprovalReceipt, PACKAGE_NOT_FOUND_REASON, ProcessOutcome, PurchaseTicket,
    USER_NOT_FOUND_REASON, VerificationService,
};
