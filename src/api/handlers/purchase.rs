//! Purchase handlers: catalog, initiation, status.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{CreatePurchaseRequest, PackageListResponse, PurchaseResponse};
use crate::app_state::AppState;
use crate::domain::{PurchaseVerification, UserId, VerificationId};
use crate::error::{ErrorResponse, GatewayError};

/// `GET /packages`: List coin packages.
#[utoipa::path(
    get,
    path = "/api/v1/packages",
    tag = "Purchases",
    summary = "List coin packages",
    description = "Returns the coin catalog used to price and credit purchases.",
    responses(
        (status = 200, description = "Coin catalog", body = PackageListResponse),
    )
)]
pub async fn list_packages(State(state): State<AppState>) -> impl IntoResponse {
    Json(PackageListResponse {
        data: state.verification_service.catalog().list().to_vec(),
    })
}

/// `POST /purchases`: Start a coin purchase.
///
/// # Errors
///
/// Returns [`GatewayError`] on an unknown package or user.
#[utoipa::path(
    post,
    path = "/api/v1/purchases",
    tag = "Purchases",
    summary = "Start a coin purchase",
    description = "Records a pending verification and returns the `ok <id>` command the administrator replies with to approve it.",
    request_body = CreatePurchaseRequest,
    responses(
        (status = 201, description = "Purchase pending approval", body = PurchaseResponse),
        (status = 400, description = "Invalid user or package", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
    )
)]
pub async fn create_purchase(
    State(state): State<AppState>,
    Json(req): Json<CreatePurchaseRequest>,
) -> Result<impl IntoResponse, GatewayError> {
    let user_id = UserId::parse(&req.user_id)?;
    let ticket = state
        .verification_service
        .initiate_purchase(user_id, &req.package_id)
        .await?;

    Ok((StatusCode::CREATED, Json(PurchaseResponse::from(ticket))))
}

/// `GET /purchases/{id}`: Get a verification record.
///
/// # Errors
///
/// Returns [`GatewayError::VerificationNotFound`] if the record does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/purchases/{id}",
    tag = "Purchases",
    summary = "Get purchase status",
    params(
        ("id" = String, Path, description = "Verification id"),
    ),
    responses(
        (status = 200, description = "Verification record", body = PurchaseVerification),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Verification not found", body = ErrorResponse),
    )
)]
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PurchaseVerification>, GatewayError> {
    let id = VerificationId::parse(&id)?;
    let verification = state.verification_service.get_verification(&id).await?;
    Ok(Json(verification))
}

/// Purchase routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/packages", get(list_packages))
        .route("/purchases", post(create_purchase))
        .route("/purchases/{id}", get(get_purchase))
}
