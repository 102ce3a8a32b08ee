//! Data Transfer Objects (DTOs) for requests and responses.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Booking, BookingId, Currency, GatewayOrderId, OwnerId, PaymentStatus};

// ─────────────────────────────────────────────────────────────────────────────
// Order creation DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Request to book a service and open a payment order for it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    /// Requested service descriptor
    #[schema(example = "Deep Cleaning")]
    pub service: String,
    /// Visit address
    #[schema(example = "42 Lake View Road, Pune")]
    pub address: String,
    /// Scheduled date
    #[schema(example = "2025-09-14")]
    pub date: String,
    /// Scheduled time
    #[schema(example = "10:30")]
    pub time: String,
    /// Contact phone number
    #[schema(example = "9876543210")]
    pub mobile: String,
    /// Price in whole major units (rupees)
    #[schema(example = 500)]
    pub amount: i64,
    /// Currency; defaults to INR
    #[serde(default)]
    pub currency: Currency,
}

/// Response after a booking was created and its gateway order opened.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderResponse {
    /// Gateway order id the client checkout must reference
    pub order_id: GatewayOrderId,
    /// Amount in minor units, as registered with the gateway
    #[schema(example = 50000)]
    pub amount: i64,
    pub currency: Currency,
    /// The booking awaiting payment
    pub booking_id: BookingId,
}

/// Fields for inserting a new booking record.
///
/// Carries the authenticated owner alongside the opaque payload fields;
/// the ledger sets status and timestamps.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub owner_id: OwnerId,
    pub service: String,
    pub address: String,
    pub scheduled_date: String,
    pub scheduled_time: String,
    pub contact_number: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Booking listing DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// A user's booking history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BookingListResponse {
    pub bookings: Vec<Booking>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Webhook DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// The provider's webhook event envelope.
///
/// Decoded from the raw (already signature-verified) body. Decoding fails
/// closed: any missing field or unknown payment status is a malformed
/// payload, never a partially-applied event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEnvelope {
    /// Provider event name, e.g. `payment.captured`
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub payment: WebhookPayment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayment {
    pub entity: PaymentEntity,
}

/// The payment entity nested inside the provider envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEntity {
    /// Gateway order the payment settles
    pub order_id: String,
    pub status: PaymentEventStatus,
}

/// Payment outcome reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventStatus {
    Captured,
    Failed,
}

impl PaymentEventStatus {
    /// The booking status this outcome transitions to.
    pub fn target_status(&self) -> PaymentStatus {
        match self {
            PaymentEventStatus::Captured => PaymentStatus::Paid,
            PaymentEventStatus::Failed => PaymentStatus::Failed,
        }
    }
}

/// Result of reconciling one webhook delivery with the ledger.
///
/// Only `InvalidSignature` and `MalformedPayload` are reported to the
/// gateway as errors; every other outcome acknowledges the delivery so
/// redelivery of an already-handled event stays a cheap no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The transition was applied by this delivery.
    Reconciled {
        booking_id: BookingId,
        status: PaymentStatus,
    },
    /// A previous delivery already applied the transition.
    AlreadyReconciled,
    /// No booking references the order id.
    UnknownOrder,
    /// Signature missing or not computed with the shared secret.
    InvalidSignature,
    /// Body verified but not decodable as a provider event.
    MalformedPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_envelope_decodes_captured_event() {
        let body = br#"{
            "event": "payment.captured",
            "payload": {
                "payment": {
                    "entity": {
                        "id": "pay_29QQoUBi66xm2f",
                        "order_id": "order_abc",
                        "status": "captured",
                        "amount": 50000
                    }
                }
            }
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_slice(body).unwrap();
        let entity = envelope.payload.payment.entity;

        assert_eq!(entity.order_id, "order_abc");
        assert_eq!(entity.status, PaymentEventStatus::Captured);
        assert_eq!(entity.status.target_status(), PaymentStatus::Paid);
    }

    #[test]
    fn test_webhook_envelope_decodes_failed_event() {
        let body = br#"{
            "event": "payment.failed",
            "payload": {"payment": {"entity": {"order_id": "order_x", "status": "failed"}}}
        }"#;

        let envelope: WebhookEnvelope = serde_json::from_slice(body).unwrap();
        let entity = envelope.payload.payment.entity;

        assert_eq!(entity.status.target_status(), PaymentStatus::Failed);
    }

    #[test]
    fn test_webhook_envelope_rejects_unknown_status() {
        let body = br#"{
            "event": "payment.authorized",
            "payload": {"payment": {"entity": {"order_id": "order_x", "status": "authorized"}}}
        }"#;

        assert!(serde_json::from_slice::<WebhookEnvelope>(body).is_err());
    }

    #[test]
    fn test_webhook_envelope_rejects_missing_order_id() {
        let body = br#"{
            "event": "payment.captured",
            "payload": {"payment": {"entity": {"status": "captured"}}}
        }"#;

        assert!(serde_json::from_slice::<WebhookEnvelope>(body).is_err());
    }

    #[test]
    fn test_create_order_request_defaults_currency() {
        let body = br#"{
            "service": "Plumbing",
            "address": "7 Hill Street",
            "date": "2025-10-01",
            "time": "09:00",
            "mobile": "9000000001",
            "amount": 750
        }"#;

        let req: CreateOrderRequest = serde_json::from_slice(body).unwrap();
        assert_eq!(req.currency, Currency::INR);
    }
}
