//! HTTP request handlers.

use std::sync::Arc;

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use bookings_types::{
    AppError, BookingId, BookingLedger, BookingListResponse, CreateOrderRequest, OwnerId,
    PaymentGateway, ReconciliationOutcome,
};

use crate::BookingService;

/// Header the gateway carries its HMAC signature in.
pub const SIGNATURE_HEADER: &str = "x-razorpay-signature";

/// Application state shared across handlers.
pub struct AppState<L: BookingLedger, G: PaymentGateway> {
    pub service: BookingService<L, G>,
}

/// Wrapper to implement IntoResponse for AppError (orphan rule workaround).
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Gateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = serde_json::json!({
            "error": message,
            "code": status.as_u16()
        });

        (status, Json(body)).into_response()
    }
}

/// Health check endpoint.
pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ─────────────────────────────────────────────────────────────────────────────
// Orders & bookings
// ─────────────────────────────────────────────────────────────────────────────

/// Create a booking and open a gateway order for it.
#[tracing::instrument(skip(state, req), fields(service = %req.service, amount = req.amount))]
pub async fn create_order<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    Extension(owner_id): Extension<OwnerId>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let response = state.service.request_booking(owner_id, req).await?;
    Ok(Json(response))
}

/// Gateway webhook notifying a payment outcome.
///
/// Takes the raw body bytes: the signature was computed over exactly these
/// bytes, so no extractor may parse the payload first. Every outcome other
/// than a signature or decode failure acknowledges with 200 - the gateway
/// redelivers on anything else, and redelivery of a handled event must stay
/// a cheap no-op.
#[tracing::instrument(skip(state, headers, body))]
pub async fn razorpay_webhook<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let signature = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok());

    let outcome = state.service.reconcile_payment(&body, signature).await?;

    let response = match &outcome {
        ReconciliationOutcome::InvalidSignature => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "invalid signature" })),
        ),
        ReconciliationOutcome::MalformedPayload => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "malformed payload" })),
        ),
        _ => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ok" })),
        ),
    };

    Ok(response.into_response())
}

/// List the caller's bookings, newest first.
#[tracing::instrument(skip(state))]
pub async fn list_bookings<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    Extension(owner_id): Extension<OwnerId>,
) -> Result<impl IntoResponse, ApiError> {
    let bookings = state.service.list_bookings(owner_id).await?;
    Ok(Json(BookingListResponse { bookings }))
}

/// Get one booking by ID, scoped to the caller.
#[tracing::instrument(skip(state), fields(booking_id = %id))]
pub async fn get_booking<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    Extension(owner_id): Extension<OwnerId>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let booking_id: BookingId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid booking ID".into()))?;

    let booking = state.service.get_booking(owner_id, booking_id).await?;
    Ok(Json(booking))
}

// ─────────────────────────────────────────────────────────────────────────────
// Bootstrap & API Key Management
// ─────────────────────────────────────────────────────────────────────────────

/// Bootstrap endpoint - creates the first API key.
///
/// This endpoint only works when there are NO existing API keys in the
/// system. It returns the raw API key (only shown once) together with the
/// owner identity the key authenticates as.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct BootstrapRequest {
    /// Name for the API key
    #[schema(example = "my-api-key")]
    pub name: String,
}

#[derive(serde::Serialize, utoipa::ToSchema)]
pub struct BootstrapResponse {
    /// The generated API key (shown only once)
    #[schema(example = "sk_abc123xyz...")]
    pub api_key: String,
    /// The owner identity the key authenticates as
    pub owner_id: OwnerId,
    /// Informational message
    pub message: String,
}

#[tracing::instrument(skip(state), fields(key_name = %req.name))]
pub async fn bootstrap<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    Json(req): Json<BootstrapRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Check if there are any existing API keys
    let key_count = state
        .service
        .ledger()
        .count_api_keys()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if key_count > 0 {
        return Err(AppError::BadRequest(
            "Bootstrap not allowed: API keys already exist. Use an existing key to create new ones.".into()
        ).into());
    }

    // Create the first API key for a fresh owner identity
    let owner_id = OwnerId::new();
    let (_api_key, raw_key) = state
        .service
        .ledger()
        .create_api_key(&req.name, owner_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            api_key: raw_key,
            owner_id,
            message: "First API key created. Save this key securely - it won't be shown again!"
                .into(),
        }),
    ))
}

/// Request to create a new API key.
#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct CreateApiKeyRequest {
    /// Name for the API key
    #[schema(example = "production-key")]
    pub name: String,
}

/// Response containing API key info (without the raw key).
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ApiKeyInfo {
    /// API key ID
    #[schema(value_type = String, example = "123e4567-e89b-12d3-a456-426614174000")]
    pub id: bookings_types::ApiKeyId,
    /// Name of the API key
    pub name: String,
    /// Owner the key authenticates as
    pub owner_id: OwnerId,
    /// Whether the key is active
    pub is_active: bool,
    /// When the key was created (ISO 8601)
    #[schema(value_type = String, example = "2024-01-01T00:00:00Z")]
    pub created_at: String,
    /// When the key was last used (ISO 8601)
    #[schema(value_type = Option<String>)]
    pub last_used_at: Option<String>,
}

/// Create a new API key for the calling owner (requires authentication).
#[tracing::instrument(skip(state), fields(key_name = %req.name))]
pub async fn create_api_key<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    Extension(owner_id): Extension<OwnerId>,
    Json(req): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (_api_key, raw_key) = state
        .service
        .ledger()
        .create_api_key(&req.name, owner_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(BootstrapResponse {
            api_key: raw_key,
            owner_id,
            message: "API key created. Save this key securely - it won't be shown again!".into(),
        }),
    ))
}

/// List all active API keys (without exposing raw keys).
#[tracing::instrument(skip(state))]
pub async fn list_api_keys<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
) -> Result<impl IntoResponse, ApiError> {
    let keys = state
        .service
        .ledger()
        .list_api_keys()
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let response: Vec<ApiKeyInfo> = keys
        .into_iter()
        .map(|k| ApiKeyInfo {
            id: k.id,
            name: k.name,
            owner_id: k.owner_id,
            is_active: k.is_active,
            created_at: k.created_at.to_rfc3339(),
            last_used_at: k.last_used_at.map(|dt| dt.to_rfc3339()),
        })
        .collect();

    Ok(Json(response))
}

/// Delete (deactivate) an API key.
#[tracing::instrument(skip(state), fields(key_id = %id))]
pub async fn delete_api_key<L: BookingLedger, G: PaymentGateway>(
    State(state): State<Arc<AppState<L, G>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let key_id: bookings_types::ApiKeyId = id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid API key ID".into()))?;

    let deleted = state
        .service
        .ledger()
        .delete_api_key(key_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if deleted {
        Ok(StatusCode::NO_CONTENT.into_response())
    } else {
        Err(AppError::NotFound("API key not found".into()).into())
    }
}
