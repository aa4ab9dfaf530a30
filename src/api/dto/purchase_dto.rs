//! Purchase and catalog DTOs.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{CoinPackage, PurchaseVerification};
use crate::service::PurchaseTicket;

/// Request body for `POST /api/v1/purchases`.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseRequest {
    /// Purchasing user.
    pub user_id: String,
    /// Catalog package id (e.g. `"standard"`).
    pub package_id: String,
}

/// Response body for `POST /api/v1/purchases`.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseResponse {
    /// The pending verification record.
    pub verification: PurchaseVerification,
    /// Coins granted on approval.
    pub coins: i64,
    /// Reply the administrator sends to approve (`ok <id>`).
    pub approval_command: String,
    /// Purchase request text for the administrator.
    pub request_text: String,
    /// WhatsApp deep link to the administrator, when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_url: Option<String>,
}

impl From<PurchaseTicket> for PurchaseResponse {
    fn from(ticket: PurchaseTicket) -> Self {
        Self {
            verification: ticket.verification,
            coins: ticket.coins,
            approval_command: ticket.approval_command,
            request_text: ticket.request_text,
            whatsapp_url: ticket.whatsapp_url,
        }
    }
}

/// Response body for `GET /api/v1/packages`.
#[derive(Debug, Serialize, ToSchema)]
pub struct PackageListResponse {
    /// Packages in catalog order.
    pub data: Vec<CoinPackage>,
}
