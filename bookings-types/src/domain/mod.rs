//! Domain models for the booking service.

pub mod api_key;
pub mod booking;
pub mod money;

pub use api_key::{ApiKey, ApiKeyId};
pub use booking::{Booking, BookingId, GatewayOrderId, OwnerId, PaymentStatus};
pub use money::{Currency, Money};
