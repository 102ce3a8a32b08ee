//! Client example demonstrating the full booking flow against a running server,
//! including a simulated gateway webhook.
//!
//! Run with: cargo run -p bookings-app --example booking_demo --no-default-features --features sqlite

use async_trait::async_trait;
use std::net::SocketAddr;
use tempfile::tempdir;
use tokio::net::TcpListener;

use bookings_client::BookingsClient;
use bookings_hex::{BookingService, inbound::HttpServer};
use bookings_repo::{build_repo, security};
use bookings_types::{
    CreateGatewayOrder, Currency, GatewayError, GatewayOrder, GatewayOrderId, PaymentGateway,
};

const WEBHOOK_SECRET: &str = "whsec_demo";

/// Stand-in for Razorpay so the demo runs without credentials.
struct DemoGateway;

#[async_trait]
impl PaymentGateway for DemoGateway {
    async fn create_order(&self, req: CreateGatewayOrder) -> Result<GatewayOrder, GatewayError> {
        Ok(GatewayOrder {
            id: GatewayOrderId::new(format!("order_demo_{}", req.booking_id)),
            amount: req.amount.amount(),
            currency: req.amount.currency(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr: SocketAddr = listener.local_addr()?;
    let port = addr.port();
    drop(listener);

    // Use a temp file-backed SQLite DB
    let tmp = tempdir()?;
    let db_path = tmp.path().join("bookings.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    println!("🚀 Starting server on port {port}...");
    println!("   Database: {db_url}");

    // Build ledger (handles connection and migration)
    let repo = build_repo(&db_url).await?;

    // Start server in background
    let service = BookingService::new(repo, DemoGateway, WEBHOOK_SECRET);
    let server = HttpServer::new(service);
    let router = server.router();

    let server_addr = format!("127.0.0.1:{port}");
    tokio::spawn(async move {
        axum::serve(
            TcpListener::bind(&server_addr).await.unwrap(),
            router.into_make_service(),
        )
        .await
        .unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(std::time::Duration::from_millis(500)).await;

    // Create client
    let base_url = format!("http://127.0.0.1:{port}");
    let client = BookingsClient::new(&base_url);

    // ─────────────────────────────────────────────────────────────────────────
    // Demo: Full booking + reconciliation flow
    // ─────────────────────────────────────────────────────────────────────────

    // Health check
    let health = client.health().await?;
    println!("✅ Server health: {health}");

    // Unauthenticated requests are refused
    let response = client.list_bookings().await;
    assert!(response.is_err());
    println!("✅ Unauthorized without key: {}", response.unwrap_err());

    // key
    let key = client.bootstrap("demo").await?;
    println!("✅ Server key generated: {key}");

    let client = client.with_api_key(key);

    // Book a service; this opens the gateway order
    let order = client
        .create_order(
            "Deep Cleaning",
            "42 Lake View Road, Pune",
            "2025-09-14",
            "10:30",
            "9876543210",
            500,
            Currency::INR,
        )
        .await?;
    println!(
        "✅ Booking {} awaiting payment via gateway order {} ({} {:?} minor units)",
        order.booking_id, order.order_id, order.amount, order.currency
    );

    let bookings = client.list_bookings().await?;
    println!(
        "✅ Booking history: {} entry, status {:?}",
        bookings.len(),
        bookings[0].payment_status
    );

    // Simulate the gateway's asynchronous capture notification
    let body = format!(
        r#"{{"event":"payment.captured","payload":{{"payment":{{"entity":{{"order_id":"{}","status":"captured"}}}}}}}}"#,
        order.order_id
    );
    let signature = security::sign_webhook(body.as_bytes(), WEBHOOK_SECRET);
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/webhooks/razorpay"))
        .header("X-Razorpay-Signature", signature.clone())
        .header("Content-Type", "application/json")
        .body(body.clone())
        .send()
        .await?;
    println!("✅ Webhook delivered: HTTP {}", response.status());

    let booking = client.get_booking(order.booking_id).await?;
    println!("✅ Booking reconciled: status {:?}", booking.payment_status);

    // Redeliver the identical event; the server absorbs it
    let response = reqwest::Client::new()
        .post(format!("{base_url}/api/webhooks/razorpay"))
        .header("X-Razorpay-Signature", signature)
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await?;
    println!(
        "✅ Redelivery acknowledged without a second transition: HTTP {}",
        response.status()
    );

    Ok(())
}
