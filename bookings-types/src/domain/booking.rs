//! Booking domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Unique identifier for a Booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct BookingId(Uuid);

impl BookingId {
    /// Creates a new random BookingId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a BookingId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BookingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BookingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for BookingId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier of the user a booking belongs to.
///
/// Supplied by the authentication layer; the booking subsystem never
/// creates or interprets it beyond ownership scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct OwnerId(Uuid);

impl OwnerId {
    /// Creates a new random OwnerId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an OwnerId from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for OwnerId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// The payment gateway's identifier for a checkout order.
///
/// Provider-assigned and opaque; stored verbatim and used as the lookup
/// key when a webhook refers back to the order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
pub struct GatewayOrderId(String);

impl GatewayOrderId {
    /// Wraps a provider-assigned order id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw order id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for GatewayOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for GatewayOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment state of a booking.
///
/// Starts at `Pending`; moves to `Paid` or `Failed` exactly once via the
/// reconciliation path. No other writer may change it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    /// Returns true once the status can no longer change.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }

    /// Parses the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "FAILED" => Some(PaymentStatus::Failed),
            _ => None,
        }
    }
}

impl AsRef<str> for PaymentStatus {
    fn as_ref(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

/// A requested home-service visit and its payment state.
///
/// The service payload fields are opaque to this subsystem and immutable
/// after creation. Reconciliation only ever touches `gateway_order_id`
/// (set once, right after the gateway order is opened) and
/// `payment_status` (one transition out of `Pending`).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Booking {
    /// Unique identifier
    pub id: BookingId,
    /// The requesting user
    pub owner_id: OwnerId,
    /// Requested service descriptor
    pub service: String,
    /// Visit address
    pub address: String,
    /// Scheduled date, as supplied by the caller
    pub scheduled_date: String,
    /// Scheduled time, as supplied by the caller
    pub scheduled_time: String,
    /// Contact phone number
    pub contact_number: String,
    /// Gateway order attached by the create flow; lookup key for webhooks
    pub gateway_order_id: Option<GatewayOrderId>,
    /// Current payment state
    pub payment_status: PaymentStatus,
    /// When the booking was created
    pub created_at: DateTime<Utc>,
}

impl Booking {
    /// Creates a new pending booking with no gateway order attached.
    pub fn new(
        owner_id: OwnerId,
        service: String,
        address: String,
        scheduled_date: String,
        scheduled_time: String,
        contact_number: String,
    ) -> Self {
        Self {
            id: BookingId::new(),
            owner_id,
            service,
            address,
            scheduled_date,
            scheduled_time,
            contact_number,
            gateway_order_id: None,
            payment_status: PaymentStatus::Pending,
            created_at: Utc::now(),
        }
    }

    /// Reconstructs a booking from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: BookingId,
        owner_id: OwnerId,
        service: String,
        address: String,
        scheduled_date: String,
        scheduled_time: String,
        contact_number: String,
        gateway_order_id: Option<GatewayOrderId>,
        payment_status: PaymentStatus,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            service,
            address,
            scheduled_date,
            scheduled_time,
            contact_number,
            gateway_order_id,
            payment_status,
            created_at,
        }
    }
}
