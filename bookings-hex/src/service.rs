//! Booking Application Service
//!
//! Orchestrates the create-order and webhook reconciliation flows through
//! the ledger and gateway ports. Contains NO infrastructure logic - pure
//! business orchestration.

use bookings_types::{
    AppError, Booking, BookingId, BookingLedger, CreateGatewayOrder, CreateOrderRequest,
    CreateOrderResponse, GatewayOrderId, Money, NewBooking, OwnerId, PaymentGateway, PaymentStatus,
    ReconciliationOutcome, RepoError, WebhookEnvelope,
};

use bookings_repo::security;

/// Application service for booking and payment reconciliation.
///
/// Generic over `L: BookingLedger` and `G: PaymentGateway` - the adapters
/// are injected at compile time. This enables:
/// - Swapping the store or the payment provider without code changes
/// - Testing with in-memory ledger and gateway mocks
/// - Compile-time checks for port implementation
pub struct BookingService<L: BookingLedger, G: PaymentGateway> {
    ledger: L,
    gateway: G,
    /// Shared secret the gateway signs webhook bodies with; loaded once at
    /// startup, read-only thereafter.
    webhook_secret: String,
}

impl<L: BookingLedger, G: PaymentGateway> BookingService<L, G> {
    /// Creates a new booking service with the given adapters.
    pub fn new(ledger: L, gateway: G, webhook_secret: impl Into<String>) -> Self {
        Self {
            ledger,
            gateway,
            webhook_secret: webhook_secret.into(),
        }
    }

    /// Returns a reference to the underlying ledger.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Returns a reference to the underlying gateway.
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Create-order flow
    // ─────────────────────────────────────────────────────────────────────────────

    /// Books a service and opens a gateway order for it.
    ///
    /// The pending booking is persisted before the gateway is contacted, so
    /// a store failure never leaves orphaned remote state. A gateway failure
    /// leaves the booking pending with no order attached; the caller may
    /// retry, which creates a new booking (abandoned pendings are accepted,
    /// not deduplicated).
    pub async fn request_booking(
        &self,
        owner_id: OwnerId,
        req: CreateOrderRequest,
    ) -> Result<CreateOrderResponse, AppError> {
        for (field, value) in [
            ("service", &req.service),
            ("address", &req.address),
            ("date", &req.date),
            ("time", &req.time),
            ("mobile", &req.mobile),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::BadRequest(format!("Field '{field}' is required")));
            }
        }
        if req.amount <= 0 {
            return Err(AppError::BadRequest("Amount must be positive".into()));
        }
        let amount = Money::from_major(req.amount, req.currency)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let booking = self
            .ledger
            .create_booking(NewBooking {
                owner_id,
                service: req.service,
                address: req.address,
                scheduled_date: req.date,
                scheduled_time: req.time,
                contact_number: req.mobile,
            })
            .await?;

        let order = match self
            .gateway
            .create_order(CreateGatewayOrder {
                amount,
                receipt: format!("receipt_order_{}", booking.id),
                booking_id: booking.id,
            })
            .await
        {
            Ok(order) => order,
            Err(e) => {
                // Recoverable: the booking stays pending with no order
                // attached and a retry creates a fresh booking.
                tracing::warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "Gateway order creation failed; booking left pending without an order"
                );
                return Err(e.into());
            }
        };

        if let Err(e) = self.ledger.attach_gateway_order(booking.id, &order.id).await {
            // The remote order now has no referencing booking; an
            // operator-side reconciliation job is assumed external.
            tracing::error!(
                booking_id = %booking.id,
                gateway_order_id = %order.id,
                error = %e,
                "Failed to attach gateway order; remote order is unreferenced"
            );
            return Err(e.into());
        }

        tracing::info!(
            booking_id = %booking.id,
            gateway_order_id = %order.id,
            "Booking created and gateway order attached"
        );

        Ok(CreateOrderResponse {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
            booking_id: booking.id,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Webhook reconciliation flow
    // ─────────────────────────────────────────────────────────────────────────────

    /// Reconciles one gateway webhook delivery with the ledger.
    ///
    /// The signature is verified over the untouched raw body before
    /// anything else happens; verification or decode failures terminate the
    /// flow with zero store access. Everything downstream of the decode is
    /// safe under redelivery: the conditional status transition applies at
    /// most once per booking, so racing or repeated deliveries observe
    /// `AlreadyReconciled` instead of double-applying.
    pub async fn reconcile_payment(
        &self,
        raw_body: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconciliationOutcome, AppError> {
        let Some(signature) = signature else {
            return Ok(ReconciliationOutcome::InvalidSignature);
        };
        if !security::verify_webhook_signature(raw_body, signature, &self.webhook_secret) {
            return Ok(ReconciliationOutcome::InvalidSignature);
        }

        let envelope: WebhookEnvelope = match serde_json::from_slice(raw_body) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(error = %e, "Verified webhook body is not a decodable event");
                return Ok(ReconciliationOutcome::MalformedPayload);
            }
        };
        let entity = envelope.payload.payment.entity;
        if entity.order_id.is_empty() {
            return Ok(ReconciliationOutcome::MalformedPayload);
        }
        let order_id = GatewayOrderId::from(entity.order_id);

        let booking = match self.ledger.find_by_gateway_order(&order_id).await? {
            Some(booking) => booking,
            None => {
                tracing::warn!(
                    gateway_order_id = %order_id,
                    event = %envelope.event,
                    "Webhook references an order with no matching booking"
                );
                return Ok(ReconciliationOutcome::UnknownOrder);
            }
        };

        let target = entity.status.target_status();
        let applied = match self
            .ledger
            .transition_status(booking.id, PaymentStatus::Pending, target)
            .await
        {
            Ok(applied) => applied,
            Err(RepoError::NotFound) => {
                // Booking vanished between lookup and update; redelivery
                // cannot help, so acknowledge and log the anomaly.
                tracing::warn!(
                    booking_id = %booking.id,
                    gateway_order_id = %order_id,
                    "Booking disappeared before the status transition"
                );
                return Ok(ReconciliationOutcome::UnknownOrder);
            }
            Err(e) => return Err(e.into()),
        };

        if applied {
            tracing::info!(
                booking_id = %booking.id,
                gateway_order_id = %order_id,
                status = %target,
                "Payment reconciled"
            );
            Ok(ReconciliationOutcome::Reconciled {
                booking_id: booking.id,
                status: target,
            })
        } else {
            tracing::debug!(
                booking_id = %booking.id,
                gateway_order_id = %order_id,
                "Webhook redelivery for an already reconciled booking"
            );
            Ok(ReconciliationOutcome::AlreadyReconciled)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Booking history
    // ─────────────────────────────────────────────────────────────────────────────

    /// Lists the caller's bookings, newest first.
    pub async fn list_bookings(&self, owner_id: OwnerId) -> Result<Vec<Booking>, AppError> {
        self.ledger.list_for_owner(owner_id).await.map_err(Into::into)
    }

    /// Gets one booking, scoped to its owner.
    pub async fn get_booking(
        &self,
        owner_id: OwnerId,
        id: BookingId,
    ) -> Result<Booking, AppError> {
        self.ledger
            .get_booking(id)
            .await
            .map_err(AppError::from)
            .and_then(|opt| match opt {
                Some(booking) if booking.owner_id == owner_id => Ok(booking),
                // Cross-tenant probes look identical to missing bookings.
                _ => Err(AppError::NotFound(format!("Booking {}", id))),
            })
    }
}
