//! REST API layer: route handlers, DTOs, router composition and the
//! OpenAPI document.
//!
//! Resource endpoints are mounted under `/api/v1`; the WhatsApp webhook
//! lives at `/api/whatsapp` and system endpoints at the root.

pub mod dto;
pub mod handlers;

use std::time::Duration;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::app_state::AppState;
use crate::ws::handler::ws_handler;

/// OpenAPI description of every HTTP endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "vortex-gateway",
        description = "Coin purchase verification gateway for the VORTEX app"
    ),
    paths(
        handlers::system::health_handler,
        handlers::whatsapp::whatsapp_webhook,
        handlers::purchase::list_packages,
        handlers::purchase::create_purchase,
        handlers::purchase::get_purchase,
        handlers::user::create_user,
        handlers::user::get_user,
    ),
    tags(
        (name = "Webhooks", description = "Inbound messaging webhooks"),
        (name = "Purchases", description = "Coin packages and purchase verifications"),
        (name = "Users", description = "Users and coin balances"),
        (name = "System", description = "Operational endpoints"),
    )
)]
pub struct ApiDoc;

/// Builds the REST router: `/api/v1` resources and system endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api/v1", handlers::routes())
        .merge(handlers::system::routes())
}

/// Builds the full application: REST, webhook, WebSocket, API docs and
/// the HTTP middleware stack.
///
/// `request_timeout` bounds the REST router only; the webhook waits for the
/// processor to finish.
pub fn build_app(state: AppState, request_timeout: Duration) -> Router {
    let router = build_router()
        .layer(TimeoutLayer::new(request_timeout))
        .merge(handlers::whatsapp::routes())
        .route("/ws", get(ws_handler));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui")
            .url("/api-docs/openapi.json", ApiDoc::openapi()),
    );

    #[cfg(not(feature = "swagger-ui"))]
    let router = router.route(
        "/api-docs/openapi.json",
        get(|| async { axum::Json(ApiDoc::openapi()) }),
    );

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
