//! REST endpoint handlers organized by resource.

pub mod purchase;
pub mod system;
pub mod user;
pub mod whatsapp;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new().merge(purchase::routes()).merge(user::routes())
}
