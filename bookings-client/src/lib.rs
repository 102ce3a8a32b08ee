//! # Bookings Client SDK
//!
//! A typed Rust client for the Bookings API.

use bookings_types::{
    Booking, BookingId, BookingListResponse, CreateOrderRequest, CreateOrderResponse, Currency,
};
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Bookings API client.
pub struct BookingsClient {
    base_url: String,
    api_key: Option<String>,
    http: Client,
}

impl BookingsClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            http: Client::new(),
        }
    }

    /// Sets the API key for authentication.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(resp.status().is_success())
    }

    /// Bootstraps the first API key, returning the raw key.
    pub async fn bootstrap(&self, name: &str) -> Result<String, ClientError> {
        let body: serde_json::Value = self
            .post("/api/bootstrap", &serde_json::json!({ "name": name }))
            .await?;
        body["api_key"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ClientError::Api {
                status: 200,
                message: "Bootstrap response missing api_key".into(),
            })
    }

    /// Books a service and opens a payment order for it.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_order(
        &self,
        service: &str,
        address: &str,
        date: &str,
        time: &str,
        mobile: &str,
        amount: i64,
        currency: Currency,
    ) -> Result<CreateOrderResponse, ClientError> {
        let req = CreateOrderRequest {
            service: service.to_string(),
            address: address.to_string(),
            date: date.to_string(),
            time: time.to_string(),
            mobile: mobile.to_string(),
            amount,
            currency,
        };
        self.post("/api/orders", &req).await
    }

    /// Lists the caller's bookings, newest first.
    pub async fn list_bookings(&self) -> Result<Vec<Booking>, ClientError> {
        let response: BookingListResponse = self.get("/api/bookings").await?;
        Ok(response.bookings)
    }

    /// Gets one booking by ID.
    pub async fn get_booking(&self, id: BookingId) -> Result<Booking, ClientError> {
        self.get(&format!("/api/bookings/{}", id)).await
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Internal helpers
    // ─────────────────────────────────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let mut req = self.http.get(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        Self::handle_response(req.send().await?).await
    }

    async fn post<B: serde::Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let mut req = self.http.post(format!("{}{}", self.base_url, path));
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }
        Self::handle_response(req.json(body).send().await?).await
    }

    async fn handle_response<T: DeserializeOwned>(
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json::<T>().await?)
        } else {
            let message = resp
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|v| v["error"].as_str().map(|s| s.to_string()))
                .unwrap_or_else(|| status.to_string());
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
