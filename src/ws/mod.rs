//! WebSocket layer: live feed of verification events.
//!
//! The endpoint at `/ws` streams [`crate::domain::VerificationEvent`]s to
//! clients that subscribe to one or more user ids (or `"*"`), so both the
//! purchaser and the approving administrator see approval outcomes.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
