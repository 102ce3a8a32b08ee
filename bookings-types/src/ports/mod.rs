//! Port traits (interfaces for adapters).
//!
//! These are the contracts that adapters must implement.
//! The application layer depends on these traits, not concrete implementations.

pub mod gateway;
mod ledger;

pub use gateway::{CreateGatewayOrder, GatewayError, GatewayOrder, PaymentGateway};
pub use ledger::BookingLedger;
