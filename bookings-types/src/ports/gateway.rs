//! Payment gateway port.
//!
//! This trait defines the interface to the remote payment provider.
//! Implementations can be HTTP clients or mock providers for tests.

use crate::domain::{BookingId, Currency, GatewayOrderId, Money};

/// Error type for gateway operations.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Payment gateway unreachable: {0}")]
    Unreachable(String),

    #[error("Order rejected by gateway: {code}: {description}")]
    Rejected { code: String, description: String },

    #[error("Unexpected gateway response: {0}")]
    InvalidResponse(String),
}

/// Request to open a checkout order with the gateway.
#[derive(Debug, Clone)]
pub struct CreateGatewayOrder {
    /// Amount to collect, in minor units.
    pub amount: Money,
    /// Merchant-side receipt reference.
    pub receipt: String,
    /// Booking the order pays for; travels as opaque order notes so the
    /// remote order is auditable back to its booking.
    pub booking_id: BookingId,
}

/// The gateway's view of a freshly opened order.
#[derive(Debug, Clone)]
pub struct GatewayOrder {
    pub id: GatewayOrderId,
    /// Amount echoed back by the gateway, in minor units.
    pub amount: i64,
    pub currency: Currency,
}

/// Port trait for the remote payment provider.
///
/// One call, no retries: retry policy for failed gateway calls belongs to
/// the caller, never to this subsystem.
#[async_trait::async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    /// Opens a remote checkout order for a booking.
    async fn create_order(&self, req: CreateGatewayOrder) -> Result<GatewayOrder, GatewayError>;
}
