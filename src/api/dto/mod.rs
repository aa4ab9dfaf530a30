//! Data Transfer Objects for REST request/response serialization.

pub mod purchase_dto;
pub mod user_dto;
pub mod webhook_dto;

pub use purchase_dto::*;
pub use user_dto::*;
pub use webhook_dto::*;
