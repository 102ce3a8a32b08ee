//! BookingService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};

    use bookings_types::{
        ApiKey, ApiKeyId, AppError, Booking, BookingId, BookingLedger, CreateGatewayOrder,
        CreateOrderRequest, Currency, GatewayError, GatewayOrder, GatewayOrderId, NewBooking,
        OwnerId, PaymentGateway, PaymentStatus, ReconciliationOutcome, RepoError,
    };

    use bookings_repo::security;

    use crate::BookingService;

    const SECRET: &str = "whsec_test";

    type BookingMap = Arc<Mutex<HashMap<BookingId, Booking>>>;

    /// Simple in-memory ledger for testing the service layer.
    pub struct MockLedger {
        bookings: BookingMap,
        api_keys: Mutex<Vec<ApiKey>>,
    }

    impl MockLedger {
        pub fn new() -> Self {
            Self {
                bookings: Arc::new(Mutex::new(HashMap::new())),
                api_keys: Mutex::new(Vec::new()),
            }
        }

        /// Shared handle to the booking map, for mocks that need to observe
        /// ledger state mid-flow.
        pub fn bookings_handle(&self) -> BookingMap {
            self.bookings.clone()
        }

        pub fn booking(&self, id: BookingId) -> Option<Booking> {
            self.bookings.lock().unwrap().get(&id).cloned()
        }

        pub fn booking_count(&self) -> usize {
            self.bookings.lock().unwrap().len()
        }

        pub fn insert_booking(&self, booking: Booking) {
            self.bookings.lock().unwrap().insert(booking.id, booking);
        }
    }

    #[async_trait]
    impl BookingLedger for MockLedger {
        async fn create_booking(&self, req: NewBooking) -> Result<Booking, RepoError> {
            let booking = Booking::new(
                req.owner_id,
                req.service,
                req.address,
                req.scheduled_date,
                req.scheduled_time,
                req.contact_number,
            );
            self.bookings
                .lock()
                .unwrap()
                .insert(booking.id, booking.clone());
            Ok(booking)
        }

        async fn attach_gateway_order(
            &self,
            booking_id: BookingId,
            order_id: &GatewayOrderId,
        ) -> Result<(), RepoError> {
            let mut bookings = self.bookings.lock().unwrap();
            if bookings
                .values()
                .any(|b| b.gateway_order_id.as_ref() == Some(order_id))
            {
                return Err(RepoError::Conflict(
                    "Gateway order id is already referenced by another booking".into(),
                ));
            }
            let booking = bookings.get_mut(&booking_id).ok_or(RepoError::NotFound)?;
            if booking.gateway_order_id.is_some() {
                return Err(RepoError::Conflict(format!(
                    "Booking {booking_id} already has a gateway order attached"
                )));
            }
            booking.gateway_order_id = Some(order_id.clone());
            Ok(())
        }

        async fn find_by_gateway_order(
            &self,
            order_id: &GatewayOrderId,
        ) -> Result<Option<Booking>, RepoError> {
            Ok(self
                .bookings
                .lock()
                .unwrap()
                .values()
                .find(|b| b.gateway_order_id.as_ref() == Some(order_id))
                .cloned())
        }

        async fn transition_status(
            &self,
            booking_id: BookingId,
            from: PaymentStatus,
            to: PaymentStatus,
        ) -> Result<bool, RepoError> {
            let mut bookings = self.bookings.lock().unwrap();
            let booking = bookings.get_mut(&booking_id).ok_or(RepoError::NotFound)?;
            if booking.payment_status == from {
                booking.payment_status = to;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>, RepoError> {
            Ok(self.bookings.lock().unwrap().get(&id).cloned())
        }

        async fn list_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Booking>, RepoError> {
            let mut bookings: Vec<Booking> = self
                .bookings
                .lock()
                .unwrap()
                .values()
                .filter(|b| b.owner_id == owner_id)
                .cloned()
                .collect();
            bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(bookings)
        }

        async fn verify_api_key_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, RepoError> {
            Ok(self
                .api_keys
                .lock()
                .unwrap()
                .iter()
                .find(|k| k.key_hash == key_hash && k.is_active)
                .cloned())
        }

        async fn create_api_key(
            &self,
            name: &str,
            owner_id: OwnerId,
        ) -> Result<(ApiKey, String), RepoError> {
            let raw_key = format!("sk_test_{name}");
            let api_key = ApiKey::new(
                name.to_string(),
                security::hash_api_key(&raw_key),
                owner_id,
            );
            self.api_keys.lock().unwrap().push(api_key.clone());
            Ok((api_key, raw_key))
        }

        async fn count_api_keys(&self) -> Result<i64, RepoError> {
            Ok(self
                .api_keys
                .lock()
                .unwrap()
                .iter()
                .filter(|k| k.is_active)
                .count() as i64)
        }

        async fn list_api_keys(&self) -> Result<Vec<ApiKey>, RepoError> {
            Ok(self.api_keys.lock().unwrap().clone())
        }

        async fn delete_api_key(&self, id: ApiKeyId) -> Result<bool, RepoError> {
            let mut keys = self.api_keys.lock().unwrap();
            match keys.iter_mut().find(|k| k.id == id) {
                Some(key) => {
                    key.is_active = false;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }

    /// Scriptable gateway for testing the create-order flow.
    pub struct MockGateway {
        order_id: String,
        fail: bool,
        calls: AtomicUsize,
        /// Ledger sizes observed at each call, when given a handle.
        observed: Mutex<Vec<usize>>,
        bookings: Option<BookingMap>,
    }

    impl MockGateway {
        pub fn returning(order_id: &str) -> Self {
            Self {
                order_id: order_id.to_string(),
                fail: false,
                calls: AtomicUsize::new(0),
                observed: Mutex::new(Vec::new()),
                bookings: None,
            }
        }

        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::returning("order_unused")
            }
        }

        pub fn observing(order_id: &str, bookings: BookingMap) -> Self {
            Self {
                bookings: Some(bookings),
                ..Self::returning(order_id)
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn observed(&self) -> Vec<usize> {
            self.observed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn create_order(
            &self,
            req: CreateGatewayOrder,
        ) -> Result<GatewayOrder, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(bookings) = &self.bookings {
                self.observed
                    .lock()
                    .unwrap()
                    .push(bookings.lock().unwrap().len());
            }
            if self.fail {
                return Err(GatewayError::Unreachable("connection refused".into()));
            }
            Ok(GatewayOrder {
                id: GatewayOrderId::new(self.order_id.clone()),
                amount: req.amount.amount(),
                currency: req.amount.currency(),
            })
        }
    }

    fn order_request(amount: i64) -> CreateOrderRequest {
        CreateOrderRequest {
            service: "Deep Cleaning".to_string(),
            address: "42 Lake View Road".to_string(),
            date: "2025-09-14".to_string(),
            time: "10:30".to_string(),
            mobile: "9876543210".to_string(),
            amount,
            currency: Currency::INR,
        }
    }

    fn captured_webhook(order_id: &str) -> Vec<u8> {
        format!(
            r#"{{"event":"payment.captured","payload":{{"payment":{{"entity":{{"order_id":"{order_id}","status":"captured"}}}}}}}}"#
        )
        .into_bytes()
    }

    fn failed_webhook(order_id: &str) -> Vec<u8> {
        format!(
            r#"{{"event":"payment.failed","payload":{{"payment":{{"entity":{{"order_id":"{order_id}","status":"failed"}}}}}}}}"#
        )
        .into_bytes()
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Create-order flow
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_request_booking_creates_pending_then_attaches() {
        let service = BookingService::new(
            MockLedger::new(),
            MockGateway::returning("order_abc"),
            SECRET,
        );
        let owner = OwnerId::new();

        let response = service
            .request_booking(owner, order_request(500))
            .await
            .unwrap();

        assert_eq!(response.order_id, GatewayOrderId::new("order_abc"));
        assert_eq!(response.amount, 50000);
        assert_eq!(response.currency, Currency::INR);

        let booking = service.ledger().booking(response.booking_id).unwrap();
        assert_eq!(booking.owner_id, owner);
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert_eq!(
            booking.gateway_order_id,
            Some(GatewayOrderId::new("order_abc"))
        );
    }

    #[tokio::test]
    async fn test_booking_is_persisted_before_gateway_call() {
        let ledger = MockLedger::new();
        let gateway = MockGateway::observing("order_abc", ledger.bookings_handle());
        let service = BookingService::new(ledger, gateway, SECRET);

        service
            .request_booking(OwnerId::new(), order_request(500))
            .await
            .unwrap();

        // Exactly one pending booking existed when the gateway was called.
        assert_eq!(service.gateway().observed(), vec![1]);
    }

    #[tokio::test]
    async fn test_request_booking_rejects_blank_fields() {
        let service = BookingService::new(
            MockLedger::new(),
            MockGateway::returning("order_abc"),
            SECRET,
        );

        let mut req = order_request(500);
        req.address = "  ".to_string();

        let result = service.request_booking(OwnerId::new(), req).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(service.ledger().booking_count(), 0);
        assert_eq!(service.gateway().calls(), 0);
    }

    #[tokio::test]
    async fn test_request_booking_rejects_non_positive_amount() {
        let service = BookingService::new(
            MockLedger::new(),
            MockGateway::returning("order_abc"),
            SECRET,
        );

        for amount in [0, -500] {
            let result = service
                .request_booking(OwnerId::new(), order_request(amount))
                .await;
            assert!(matches!(result, Err(AppError::BadRequest(_))));
        }
        assert_eq!(service.ledger().booking_count(), 0);
    }

    #[tokio::test]
    async fn test_gateway_failure_leaves_booking_pending_without_order() {
        let service = BookingService::new(MockLedger::new(), MockGateway::failing(), SECRET);

        let result = service
            .request_booking(OwnerId::new(), order_request(500))
            .await;

        assert!(matches!(result, Err(AppError::Gateway(_))));

        // The pending booking survives with no order attached.
        assert_eq!(service.ledger().booking_count(), 1);
        let bookings = service.ledger().bookings_handle();
        let bookings = bookings.lock().unwrap();
        let booking = bookings.values().next().unwrap();
        assert_eq!(booking.payment_status, PaymentStatus::Pending);
        assert!(booking.gateway_order_id.is_none());
    }

    #[tokio::test]
    async fn test_retry_after_gateway_failure_creates_new_booking() {
        let service = BookingService::new(MockLedger::new(), MockGateway::failing(), SECRET);
        let owner = OwnerId::new();

        let _ = service.request_booking(owner, order_request(500)).await;
        let _ = service.request_booking(owner, order_request(500)).await;

        // Abandoned pendings accumulate; they are not deduplicated.
        assert_eq!(service.ledger().booking_count(), 2);
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Webhook reconciliation flow
    // ─────────────────────────────────────────────────────────────────────────────

    async fn booked_service() -> (
        BookingService<MockLedger, MockGateway>,
        BookingId,
    ) {
        let service = BookingService::new(
            MockLedger::new(),
            MockGateway::returning("order_abc"),
            SECRET,
        );
        let response = service
            .request_booking(OwnerId::new(), order_request(500))
            .await
            .unwrap();
        (service, response.booking_id)
    }

    #[tokio::test]
    async fn test_reconcile_captured_marks_paid() {
        let (service, booking_id) = booked_service().await;
        let body = captured_webhook("order_abc");
        let signature = security::sign_webhook(&body, SECRET);

        let outcome = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconciliationOutcome::Reconciled {
                booking_id,
                status: PaymentStatus::Paid,
            }
        );
        assert_eq!(
            service.ledger().booking(booking_id).unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_reconcile_failed_event_marks_failed() {
        let (service, booking_id) = booked_service().await;
        let body = failed_webhook("order_abc");
        let signature = security::sign_webhook(&body, SECRET);

        let outcome = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ReconciliationOutcome::Reconciled {
                booking_id,
                status: PaymentStatus::Failed,
            }
        );
    }

    #[tokio::test]
    async fn test_reconcile_is_idempotent_under_redelivery() {
        let (service, booking_id) = booked_service().await;
        let body = captured_webhook("order_abc");
        let signature = security::sign_webhook(&body, SECRET);

        let first = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();
        let second = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();

        assert!(matches!(first, ReconciliationOutcome::Reconciled { .. }));
        assert_eq!(second, ReconciliationOutcome::AlreadyReconciled);
        assert_eq!(
            service.ledger().booking(booking_id).unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_reconcile_conflicting_redelivery_keeps_first_outcome() {
        let (service, booking_id) = booked_service().await;

        let captured = captured_webhook("order_abc");
        let captured_sig = security::sign_webhook(&captured, SECRET);
        let failed = failed_webhook("order_abc");
        let failed_sig = security::sign_webhook(&failed, SECRET);

        service
            .reconcile_payment(&captured, Some(&captured_sig))
            .await
            .unwrap();
        let late = service
            .reconcile_payment(&failed, Some(&failed_sig))
            .await
            .unwrap();

        assert_eq!(late, ReconciliationOutcome::AlreadyReconciled);
        assert_eq!(
            service.ledger().booking(booking_id).unwrap().payment_status,
            PaymentStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_reconcile_rejects_wrong_secret_without_store_writes() {
        let (service, booking_id) = booked_service().await;
        let body = captured_webhook("order_abc");
        let signature = security::sign_webhook(&body, "some_other_secret");

        let outcome = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(outcome, ReconciliationOutcome::InvalidSignature);
        assert_eq!(
            service.ledger().booking(booking_id).unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_reconcile_rejects_missing_signature() {
        let (service, _) = booked_service().await;
        let body = captured_webhook("order_abc");

        let outcome = service.reconcile_payment(&body, None).await.unwrap();

        assert_eq!(outcome, ReconciliationOutcome::InvalidSignature);
    }

    #[tokio::test]
    async fn test_reconcile_rejects_tampered_body() {
        let (service, _) = booked_service().await;
        let body = captured_webhook("order_abc");
        let signature = security::sign_webhook(&body, SECRET);
        let tampered = captured_webhook("order_evil");

        let outcome = service
            .reconcile_payment(&tampered, Some(&signature))
            .await
            .unwrap();

        assert_eq!(outcome, ReconciliationOutcome::InvalidSignature);
    }

    #[tokio::test]
    async fn test_reconcile_malformed_payload_after_valid_signature() {
        let (service, booking_id) = booked_service().await;
        let body = br#"{"event":"payment.captured","payload":{}}"#;
        let signature = security::sign_webhook(body, SECRET);

        let outcome = service
            .reconcile_payment(body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(outcome, ReconciliationOutcome::MalformedPayload);
        assert_eq!(
            service.ledger().booking(booking_id).unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_reconcile_rejects_empty_order_id() {
        let (service, _) = booked_service().await;
        let body = captured_webhook("");
        let signature = security::sign_webhook(&body, SECRET);

        let outcome = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(outcome, ReconciliationOutcome::MalformedPayload);
    }

    #[tokio::test]
    async fn test_reconcile_unknown_order() {
        let (service, booking_id) = booked_service().await;
        let body = captured_webhook("order_unknown");
        let signature = security::sign_webhook(&body, SECRET);

        let outcome = service
            .reconcile_payment(&body, Some(&signature))
            .await
            .unwrap();

        assert_eq!(outcome, ReconciliationOutcome::UnknownOrder);
        assert_eq!(
            service.ledger().booking(booking_id).unwrap().payment_status,
            PaymentStatus::Pending
        );
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Booking history
    // ─────────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_list_bookings_newest_first() {
        let service = BookingService::new(
            MockLedger::new(),
            MockGateway::returning("order_abc"),
            SECRET,
        );
        let owner = OwnerId::new();

        let older = Booking::from_parts(
            BookingId::new(),
            owner,
            "Plumbing".into(),
            "7 Hill Street".into(),
            "2025-09-01".into(),
            "09:00".into(),
            "9000000001".into(),
            None,
            PaymentStatus::Pending,
            Utc.with_ymd_and_hms(2025, 9, 1, 8, 0, 0).unwrap(),
        );
        let newer = Booking::from_parts(
            BookingId::new(),
            owner,
            "Deep Cleaning".into(),
            "42 Lake View Road".into(),
            "2025-09-14".into(),
            "10:30".into(),
            "9876543210".into(),
            None,
            PaymentStatus::Pending,
            Utc.with_ymd_and_hms(2025, 9, 2, 8, 0, 0).unwrap(),
        );
        service.ledger().insert_booking(older.clone());
        service.ledger().insert_booking(newer.clone());

        let bookings = service.list_bookings(owner).await.unwrap();

        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[0].id, newer.id);
        assert_eq!(bookings[1].id, older.id);
    }

    #[tokio::test]
    async fn test_list_bookings_empty_for_new_owner() {
        let service = BookingService::new(
            MockLedger::new(),
            MockGateway::returning("order_abc"),
            SECRET,
        );

        let bookings = service.list_bookings(OwnerId::new()).await.unwrap();

        assert!(bookings.is_empty());
    }

    #[tokio::test]
    async fn test_get_booking_is_owner_scoped() {
        let (service, booking_id) = booked_service().await;

        let result = service.get_booking(OwnerId::new(), booking_id).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
