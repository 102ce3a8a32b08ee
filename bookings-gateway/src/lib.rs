//! # Bookings Gateway
//!
//! Outbound adapter for the Razorpay orders API, implementing the
//! `PaymentGateway` port. One HTTP call per order, no retries: retry
//! policy for failed gateway calls belongs to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use bookings_types::{
    CreateGatewayOrder, Currency, GatewayError, GatewayOrder, GatewayOrderId, PaymentGateway,
};

/// Razorpay connection settings, loaded once at startup.
#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for RazorpayConfig {
    fn default() -> Self {
        Self {
            key_id: String::new(),
            key_secret: String::new(),
            base_url: "https://api.razorpay.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl RazorpayConfig {
    /// Loads gateway credentials from the environment.
    pub fn from_env() -> anyhow::Result<Self> {
        let key_id = std::env::var("RAZORPAY_KEY_ID")
            .map_err(|_| anyhow::anyhow!("RAZORPAY_KEY_ID environment variable is required"))?;
        let key_secret = std::env::var("RAZORPAY_KEY_SECRET")
            .map_err(|_| anyhow::anyhow!("RAZORPAY_KEY_SECRET environment variable is required"))?;

        Ok(Self {
            key_id,
            key_secret,
            base_url: std::env::var("RAZORPAY_BASE_URL")
                .unwrap_or_else(|_| "https://api.razorpay.com".to_string()),
            timeout_secs: std::env::var("RAZORPAY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30),
        })
    }
}

/// HTTP adapter for the Razorpay orders API.
pub struct RazorpayGateway {
    config: RazorpayConfig,
    http: reqwest::Client,
}

impl RazorpayGateway {
    /// Creates a new gateway adapter.
    pub fn new(config: RazorpayConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { config, http })
    }

    /// Creates a gateway adapter from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(RazorpayConfig::from_env()?)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct OrderRequestBody<'a> {
    /// Amount in minor units (paise)
    amount: i64,
    currency: Currency,
    receipt: &'a str,
    notes: OrderNotes,
}

#[derive(Serialize)]
struct OrderNotes {
    booking_id: String,
}

#[derive(Deserialize)]
struct OrderResponseBody {
    id: String,
    amount: i64,
    currency: Currency,
}

#[derive(Deserialize)]
struct ErrorResponseBody {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    description: String,
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[tracing::instrument(skip(self), fields(booking_id = %req.booking_id, amount = req.amount.amount()))]
    async fn create_order(&self, req: CreateGatewayOrder) -> Result<GatewayOrder, GatewayError> {
        let body = OrderRequestBody {
            amount: req.amount.amount(),
            currency: req.amount.currency(),
            receipt: &req.receipt,
            notes: OrderNotes {
                booking_id: req.booking_id.to_string(),
            },
        };

        let response = self
            .http
            .post(self.endpoint("/v1/orders"))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let err = response
                .json::<ErrorResponseBody>()
                .await
                .map_err(|e| GatewayError::InvalidResponse(format!("HTTP {status}: {e}")))?;
            return Err(GatewayError::Rejected {
                code: err.error.code,
                description: err.error.description,
            });
        }

        let order = response
            .json::<OrderResponseBody>()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        tracing::info!(order_id = %order.id, "Gateway order opened");

        Ok(GatewayOrder {
            id: GatewayOrderId::new(order.id),
            amount: order.amount,
            currency: order.currency,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookings_types::{BookingId, Money};

    #[test]
    fn test_order_request_body_shape() {
        let booking_id = BookingId::new();
        let body = OrderRequestBody {
            amount: Money::from_major(500, Currency::INR).unwrap().amount(),
            currency: Currency::INR,
            receipt: "receipt_order_1",
            notes: OrderNotes {
                booking_id: booking_id.to_string(),
            },
        };

        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["amount"], 50000);
        assert_eq!(json["currency"], "INR");
        assert_eq!(json["receipt"], "receipt_order_1");
        assert_eq!(json["notes"]["booking_id"], booking_id.to_string());
    }

    #[test]
    fn test_order_response_decodes() {
        let body = br#"{
            "id": "order_IluGWxBm9U8zJ8",
            "entity": "order",
            "amount": 50000,
            "amount_paid": 0,
            "currency": "INR",
            "receipt": "receipt_order_1",
            "status": "created"
        }"#;

        let order: OrderResponseBody = serde_json::from_slice(body).unwrap();

        assert_eq!(order.id, "order_IluGWxBm9U8zJ8");
        assert_eq!(order.amount, 50000);
        assert_eq!(order.currency, Currency::INR);
    }

    #[test]
    fn test_error_response_decodes() {
        let body = br#"{
            "error": {
                "code": "BAD_REQUEST_ERROR",
                "description": "The amount must be atleast INR 1.00"
            }
        }"#;

        let err: ErrorResponseBody = serde_json::from_slice(body).unwrap();

        assert_eq!(err.error.code, "BAD_REQUEST_ERROR");
    }

    #[test]
    fn test_config_defaults() {
        let config = RazorpayConfig::default();

        assert_eq!(config.base_url, "https://api.razorpay.com");
        assert_eq!(config.timeout_secs, 30);
    }
}
