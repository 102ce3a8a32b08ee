//! SQLite ledger adapter.

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::str::FromStr;
use uuid::Uuid;

use bookings_types::{
    ApiKey, ApiKeyId, Booking, BookingId, BookingLedger, GatewayOrderId, NewBooking, OwnerId,
    PaymentStatus, RepoError,
};

use crate::types::{DbApiKey, DbBooking};

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Ledger
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite ledger implementation.
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite ledger with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            // Remove query parameters
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;

        // Run migration from migration files
        let ddl = include_str!("../migrations/0001_create_bookings.sql");
        sqlx::query(ddl).execute(&pool).await?;

        let ddl_keys = include_str!("../migrations/0002_create_api_keys.sql");
        sqlx::query(ddl_keys).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn map_db_err(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => RepoError::Conflict(
            "Gateway order id is already referenced by another booking".into(),
        ),
        _ => RepoError::Database(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Ledger implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl BookingLedger for SqliteRepo {
    async fn create_booking(&self, req: NewBooking) -> Result<Booking, RepoError> {
        let booking = Booking::new(
            req.owner_id,
            req.service,
            req.address,
            req.scheduled_date,
            req.scheduled_time,
            req.contact_number,
        );

        sqlx::query(
            r#"INSERT INTO bookings
               (id, owner_id, service, address, scheduled_date, scheduled_time, contact_number, gateway_order_id, payment_status, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, NULL, 'PENDING', ?)"#,
        )
        .bind(booking.id.to_string())
        .bind(booking.owner_id.to_string())
        .bind(&booking.service)
        .bind(&booking.address)
        .bind(&booking.scheduled_date)
        .bind(&booking.scheduled_time)
        .bind(&booking.contact_number)
        .bind(booking.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(booking)
    }

    async fn attach_gateway_order(
        &self,
        booking_id: BookingId,
        order_id: &GatewayOrderId,
    ) -> Result<(), RepoError> {
        let booking_id_str = booking_id.to_string();

        // Set-once: the update only matches while no order is attached.
        let result = sqlx::query(
            r#"UPDATE bookings SET gateway_order_id = ? WHERE id = ? AND gateway_order_id IS NULL"#,
        )
        .bind(order_id.as_str())
        .bind(&booking_id_str)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: Option<(i64,)> = sqlx::query_as(r#"SELECT 1 FROM bookings WHERE id = ?"#)
            .bind(&booking_id_str)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        match exists {
            Some(_) => Err(RepoError::Conflict(format!(
                "Booking {booking_id} already has a gateway order attached"
            ))),
            None => Err(RepoError::NotFound),
        }
    }

    async fn find_by_gateway_order(
        &self,
        order_id: &GatewayOrderId,
    ) -> Result<Option<Booking>, RepoError> {
        let row: Option<DbBooking> = sqlx::query_as(
            r#"SELECT id, owner_id, service, address, scheduled_date, scheduled_time, contact_number, gateway_order_id, payment_status, created_at
               FROM bookings WHERE gateway_order_id = ?"#,
        )
        .bind(order_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBooking::into_domain).transpose()
    }

    async fn transition_status(
        &self,
        booking_id: BookingId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<bool, RepoError> {
        let booking_id_str = booking_id.to_string();

        // The from-state precondition is evaluated atomically with the
        // write; of two racing deliveries exactly one sees rows_affected=1.
        let result = sqlx::query(
            r#"UPDATE bookings SET payment_status = ? WHERE id = ? AND payment_status = ?"#,
        )
        .bind(to.as_ref())
        .bind(&booking_id_str)
        .bind(from.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: Option<(i64,)> = sqlx::query_as(r#"SELECT 1 FROM bookings WHERE id = ?"#)
            .bind(&booking_id_str)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        match exists {
            Some(_) => Ok(false),
            None => Err(RepoError::NotFound),
        }
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, RepoError> {
        let row: Option<DbBooking> = sqlx::query_as(
            r#"SELECT id, owner_id, service, address, scheduled_date, scheduled_time, contact_number, gateway_order_id, payment_status, created_at
               FROM bookings WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbBooking::into_domain).transpose()
    }

    async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>, RepoError> {
        let rows: Vec<DbBooking> = sqlx::query_as(
            r#"SELECT id, owner_id, service, address, scheduled_date, scheduled_time, contact_number, gateway_order_id, payment_status, created_at
               FROM bookings WHERE owner_id = ? ORDER BY created_at DESC"#,
        )
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbBooking::into_domain).collect()
    }

    async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
        let row: Option<DbApiKey> = sqlx::query_as(
            r#"
            SELECT id, name, key_hash, owner_id, is_active, created_at, last_used_at
            FROM api_keys
            WHERE key_hash = ? AND is_active = 1
            "#,
        )
        .bind(key_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        row.map(DbApiKey::into_domain).transpose()
    }

    async fn create_api_key(
        &self,
        name: &str,
        owner_id: OwnerId,
    ) -> Result<(ApiKey, String), RepoError> {
        use rand::Rng;
        use rand::distr::Alphanumeric;

        // Generate a secure random API key
        let raw_key: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let prefixed_key = format!("sk_{}", raw_key);

        let key_hash = crate::security::hash_api_key(&prefixed_key);
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            INSERT INTO api_keys (id, name, key_hash, owner_id, is_active, created_at)
            VALUES (?, ?, ?, ?, 1, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(name)
        .bind(&key_hash)
        .bind(owner_id.to_string())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        let api_key = ApiKey {
            id: ApiKeyId::from_uuid(id),
            name: name.to_string(),
            key_hash,
            owner_id,
            is_active: true,
            created_at: now,
            last_used_at: None,
        };

        Ok((api_key, prefixed_key))
    }

    async fn count_api_keys(&self) -> Result<i64, RepoError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM api_keys WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(row.0)
    }

    async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
        let rows: Vec<DbApiKey> = sqlx::query_as(
            r#"
            SELECT id, name, key_hash, owner_id, is_active, created_at, last_used_at
            FROM api_keys
            WHERE is_active = 1
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepoError::Database(e.to_string()))?;

        rows.into_iter().map(DbApiKey::into_domain).collect()
    }

    async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError> {
        let result = sqlx::query(r#"UPDATE api_keys SET is_active = 0 WHERE id = ?"#)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
