//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::service::VerificationService;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Verification service for all business logic.
    pub verification_service: Arc<VerificationService>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Builds the state around a service, sharing its event bus.
    #[must_use]
    pub fn new(verification_service: VerificationService) -> Self {
        let event_bus = verification_service.event_bus().clone();
        Self {
            verification_service: Arc::new(verification_service),
            event_bus,
        }
    }
}
