//! Domain layer: identifiers, records, the coin catalog, approval command
//! parsing and the event system.

pub mod approval_command;
pub mod coin_catalog;
pub mod event_bus;
pub mod ids;
pub mod verification;
pub mod verification_event;

pub use approval_command::ApprovalCommand;
pub use coin_catalog::{CatalogError, CoinCatalog, CoinPackage};
pub use event_bus::EventBus;
pub use ids::{UserId, VerificationId};
pub use verification::{PurchaseVerification, User, VerificationStatus};
pub use verification_event::VerificationEvent;
