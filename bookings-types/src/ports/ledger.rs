//! Booking ledger port trait.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite) will implement this trait.

use crate::domain::{ApiKey, ApiKeyId, Booking, BookingId, GatewayOrderId, OwnerId, PaymentStatus};
use crate::dto::NewBooking;
use crate::error::RepoError;

/// The main ledger port for booking records.
///
/// Single-record updates MUST be atomic: `transition_status` and
/// `attach_gateway_order` are conditional updates whose precondition is
/// evaluated at the moment of the write, which is what makes webhook
/// replays and racing deliveries safe without external locks.
#[async_trait::async_trait]
pub trait BookingLedger: Send + Sync + 'static {
    // ─────────────────────────────────────────────────────────────────────────────
    // Booking Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Creates a new booking with `Pending` status and no gateway order.
    async fn create_booking(&self, req: NewBooking) -> Result<Booking, RepoError>;

    /// Attaches the gateway order id to a booking, exactly once.
    ///
    /// Fails with `NotFound` if the booking no longer exists and
    /// `Conflict` if an order id was already attached.
    async fn attach_gateway_order(
        &self,
        booking_id: BookingId,
        order_id: &GatewayOrderId,
    ) -> Result<(), RepoError>;

    /// Point lookup by gateway order id.
    ///
    /// Backed by a uniqueness-enforcing index, so at most one booking can
    /// ever match.
    async fn find_by_gateway_order(
        &self,
        order_id: &GatewayOrderId,
    ) -> Result<Option<Booking>, RepoError>;

    /// Conditionally moves a booking's payment status from `from` to `to`.
    ///
    /// Returns `Ok(true)` if the transition was applied, `Ok(false)` if the
    /// booking was already in a different status (the idempotency guarantee
    /// for redelivered webhooks), and `NotFound` if no such booking exists.
    async fn transition_status(
        &self,
        booking_id: BookingId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, RepoError>;

    /// Gets a booking by ID.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, RepoError>;

    /// Lists all bookings for an owner, newest first.
    async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>, RepoError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // API Keys (authentication collaborator)
    // ─────────────────────────────────────────────────────────────────────────────

    /// Looks up an active API key by its SHA-256 hash.
    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError>;

    /// Creates a new API key for an owner, returning the raw key once.
    async fn create_api_key(
        &self,
        name: &str,
        owner_id: OwnerId,
    ) -> Result<(ApiKey, String), RepoError>;

    /// Counts active API keys.
    async fn count_api_keys(&self) -> Result<i64, RepoError>;

    /// Lists all active API keys.
    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError>;

    /// Deactivates an API key. Returns false if it did not exist.
    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError>;
}
