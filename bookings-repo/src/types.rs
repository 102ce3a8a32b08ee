//! Shared database types with feature-gated fields for SQLite and PostgreSQL.

use sqlx::FromRow;

use bookings_types::{
    ApiKey, ApiKeyId, Booking, BookingId, GatewayOrderId, OwnerId, PaymentStatus, RepoError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Feature-gated imports
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(not(feature = "sqlite"))]
use chrono::{DateTime, Utc};
#[cfg(not(feature = "sqlite"))]
use uuid::Uuid;

#[cfg(feature = "sqlite")]
fn parse_timestamp(raw: &str) -> Result<chrono::DateTime<chrono::Utc>, RepoError> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| RepoError::Database(format!("Invalid timestamp '{raw}': {e}")))
}

#[cfg(feature = "sqlite")]
fn parse_uuid(raw: &str) -> Result<uuid::Uuid, RepoError> {
    uuid::Uuid::parse_str(raw).map_err(|e| RepoError::Database(format!("Invalid uuid '{raw}': {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Booking row from database.
#[derive(FromRow)]
pub struct DbBooking {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    #[cfg(not(feature = "sqlite"))]
    pub owner_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub owner_id: String,

    pub service: String,
    pub address: String,
    pub scheduled_date: String,
    pub scheduled_time: String,
    pub contact_number: String,
    pub gateway_order_id: Option<String>,
    pub payment_status: String,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,
}

impl DbBooking {
    pub fn into_domain(self) -> Result<Booking, RepoError> {
        let payment_status = PaymentStatus::parse(&self.payment_status).ok_or_else(|| {
            RepoError::Database(format!("Invalid payment status '{}'", self.payment_status))
        })?;

        #[cfg(not(feature = "sqlite"))]
        let (id, owner_id, created_at) = (self.id, self.owner_id, self.created_at);

        #[cfg(feature = "sqlite")]
        let (id, owner_id, created_at) = (
            parse_uuid(&self.id)?,
            parse_uuid(&self.owner_id)?,
            parse_timestamp(&self.created_at)?,
        );

        Ok(Booking::from_parts(
            BookingId::from_uuid(id),
            OwnerId::from_uuid(owner_id),
            self.service,
            self.address,
            self.scheduled_date,
            self.scheduled_time,
            self.contact_number,
            self.gateway_order_id.map(GatewayOrderId::from),
            payment_status,
            created_at,
        ))
    }
}

/// API key row from database.
#[derive(FromRow)]
pub struct DbApiKey {
    #[cfg(not(feature = "sqlite"))]
    pub id: Uuid,
    #[cfg(feature = "sqlite")]
    pub id: String,

    pub name: String,
    pub key_hash: String,

    #[cfg(not(feature = "sqlite"))]
    pub owner_id: Uuid,
    #[cfg(feature = "sqlite")]
    pub owner_id: String,

    pub is_active: bool,

    #[cfg(not(feature = "sqlite"))]
    pub created_at: DateTime<Utc>,
    #[cfg(feature = "sqlite")]
    pub created_at: String,

    #[cfg(not(feature = "sqlite"))]
    pub last_used_at: Option<DateTime<Utc>>,
    #[cfg(feature = "sqlite")]
    pub last_used_at: Option<String>,
}

impl DbApiKey {
    pub fn into_domain(self) -> Result<ApiKey, RepoError> {
        #[cfg(not(feature = "sqlite"))]
        let (id, owner_id, created_at, last_used_at) =
            (self.id, self.owner_id, self.created_at, self.last_used_at);

        #[cfg(feature = "sqlite")]
        let (id, owner_id, created_at, last_used_at) = (
            parse_uuid(&self.id)?,
            parse_uuid(&self.owner_id)?,
            parse_timestamp(&self.created_at)?,
            self.last_used_at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?,
        );

        Ok(ApiKey {
            id: ApiKeyId::from_uuid(id),
            name: self.name,
            key_hash: self.key_hash,
            owner_id: OwnerId::from_uuid(owner_id),
            is_active: self.is_active,
            created_at,
            last_used_at,
        })
    }
}
