//! # vortex-gateway
//!
//! Coin purchase verification gateway for the VORTEX social growth app.
//!
//! Users buy coin packages out of band and the administrator approves each
//! purchase by replying `ok <verification id>` on WhatsApp. The messaging
//! webhook forwards that reply here; the gateway resolves the pending
//! verification, credits the user exactly once and closes the record.
//!
//! ## Architecture
//!
//! ```text
//! WhatsApp webhook, REST clients, WebSocket clients
//!     │
//!     ├── Handlers (api/, ws/)
//!     │
//!     ├── VerificationService (service/)
//!     ├── CoinCatalog, ApprovalCommand, EventBus (domain/)
//!     │
//!     └── VerificationStore (persistence/): memory or PostgreSQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
