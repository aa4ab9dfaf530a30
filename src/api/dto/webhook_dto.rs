//! WhatsApp webhook DTOs.
//!
//! The webhook answers with one of four bodies. Only a missing `message`
//! is a 400; every processing outcome is acknowledged with 200 so the
//! messaging provider neither disables the hook nor retries.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Request body for `POST /api/whatsapp`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct WhatsAppWebhookRequest {
    /// Text of the administrator's reply.
    #[serde(default)]
    pub message: Option<String>,
}

/// Acknowledgement returned by the webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(untagged)]
pub enum WebhookAck {
    /// Coins were credited. Body: `{"success": true}`.
    Approved {
        /// Always `true`.
        success: bool,
    },
    /// The processor ran but did not credit. Body: `{"processed": true, "details": ...}`.
    NotApplied {
        /// Always `true`.
        processed: bool,
        /// Processor message.
        details: String,
    },
    /// The processor crashed. Body: `{"processed": false, "message": ...}`.
    Failed {
        /// Always `false`.
        processed: bool,
        /// Failure description.
        message: String,
    },
    /// The request carried no message. Body: `{"success": false, "message": ...}`.
    Invalid {
        /// Always `false`.
        success: bool,
        /// What was wrong with the request.
        message: String,
    },
}

impl WebhookAck {
    /// `{"success": true}`.
    #[must_use]
    pub const fn approved() -> Self {
        Self::Approved { success: true }
    }

    /// `{"processed": true, "details": details}`.
    #[must_use]
    pub fn not_applied(details: impl Into<String>) -> Self {
        Self::NotApplied {
            processed: true,
            details: details.into(),
        }
    }

    /// `{"processed": false, "message": message}`.
    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed {
            processed: false,
            message: message.into(),
        }
    }

    /// `{"success": false, "message": message}`.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            success: false,
            message: message.into(),
        }
    }
}
