use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use detailbook::app::build_router;
use detailbook::config::AppConfig;
use detailbook::db::{self, queries};
use detailbook::models::{BookingStatus, NewBooking, PaymentStatus};
use detailbook::services::admin_auth;
use detailbook::services::email::{EmailMessage, EmailProvider};
use detailbook::services::messaging::{MessagingProvider, PhoneVerifier};
use detailbook::services::payments::webhook::signature_header;
use detailbook::services::payments::{CheckoutRequest, CheckoutSession, PaymentGateway};
use detailbook::state::{AppState, Providers};

// ── Mock Providers ──

#[derive(Default)]
struct MockMessaging {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl MessagingProvider for MockMessaging {
    async fn send_message(&self, to: &str, body: &str) -> anyhow::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), body.to_string()));
        Ok(())
    }
}

/// Records every send; with `fail` set, every send errors.
#[derive(Default)]
struct MockEmail {
    attempts: Arc<Mutex<Vec<EmailMessage>>>,
    fail: bool,
}

#[async_trait]
impl EmailProvider for MockEmail {
    async fn send_email(&self, message: &EmailMessage) -> anyhow::Result<()> {
        self.attempts.lock().unwrap().push(message.clone());
        anyhow::ensure!(!self.fail, "email provider down");
        Ok(())
    }
}

struct MockVerifier;

#[async_trait]
impl PhoneVerifier for MockVerifier {
    async fn send_code(&self, _phone: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn check_code(&self, _phone: &str, code: &str) -> anyhow::Result<bool> {
        Ok(code == "123456")
    }
}

#[derive(Default)]
struct MockPayments {
    requests: Arc<Mutex<Vec<CheckoutRequest>>>,
}

#[async_trait]
impl PaymentGateway for MockPayments {
    async fn create_checkout_session(&self, request: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(CheckoutSession {
            id: "cs_test_1".to_string(),
            url: Some("https://checkout.example.com/cs_test_1".to_string()),
        })
    }
}

// ── Helpers ──

struct Harness {
    state: Arc<AppState>,
    sms: Arc<Mutex<Vec<(String, String)>>>,
    emails: Arc<Mutex<Vec<EmailMessage>>>,
    checkouts: Arc<Mutex<Vec<CheckoutRequest>>>,
}

impl Harness {
    fn new() -> Self {
        Self::build(AppConfig::for_tests(), false)
    }

    fn with_email_failing(fail: bool) -> Self {
        Self::build(AppConfig::for_tests(), fail)
    }

    fn build(config: AppConfig, fail: bool) -> Self {
        let messaging = MockMessaging::default();
        let email = MockEmail {
            fail,
            ..Default::default()
        };
        let payments = MockPayments::default();
        let (sms, emails, checkouts) = (
            Arc::clone(&messaging.sent),
            Arc::clone(&email.attempts),
            Arc::clone(&payments.requests),
        );

        let state = Arc::new(AppState::new(
            config,
            db::init_db(":memory:").unwrap(),
            Providers {
                messaging: Arc::new(messaging),
                email: Arc::new(email),
                verifier: Arc::new(MockVerifier),
                payments: Arc::new(payments),
            },
        ));
        Self {
            state,
            sms,
            emails,
            checkouts,
        }
    }

    fn app(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    fn brand(&self) -> String {
        self.state.config.brand_id.clone()
    }

    fn seed_booking(&self, id: &str, date: &str, contact: &str) {
        let conn = self.state.db.lock().unwrap();
        queries::insert_booking(
            &conn,
            &self.state.config.brand_id,
            &NewBooking {
                id: id.to_string(),
                client_name: "Alice".to_string(),
                service_name: "The \"Showroom\"".to_string(),
                price: 285,
                date: chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
                time: Some("10:00".to_string()),
                contact: contact.to_string(),
                transaction_id: None,
                payment_method: None,
                notes: None,
                status: BookingStatus::Confirmed,
                payment_status: PaymentStatus::Paid,
                promo_code: None,
            },
        )
        .unwrap();
    }

    fn booking_count(&self) -> usize {
        let conn = self.state.db.lock().unwrap();
        queries::list_bookings(&conn, &self.state.config.brand_id, &Default::default())
            .unwrap()
            .len()
    }

    fn create_admin(&self) {
        let conn = self.state.db.lock().unwrap();
        admin_auth::create_admin_user_with_cost(
            &conn,
            &self.state.config.brand_id,
            "owner@example.com",
            "correct horse battery",
            4,
        )
        .unwrap();
    }
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn with_cookie(mut req: Request<Body>, cookie: &str) -> Request<Body> {
    req.headers_mut()
        .insert(header::COOKIE, cookie.parse().unwrap());
    req
}

fn with_bearer(mut req: Request<Body>, token: &str) -> Request<Body> {
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );
    req
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_json(res: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// `name=value` of the named Set-Cookie header.
fn cookie_from(res: &axum::response::Response, name: &str) -> Option<String> {
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(&format!("{name}=")))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

/// Notifications are dispatched in the background.
async fn settle<T>(log: &Arc<Mutex<Vec<T>>>, expected: usize) {
    for _ in 0..100 {
        if log.lock().unwrap().len() >= expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn booking_body(service_id: &str, phone: &str) -> Value {
    json!({
        "service": { "id": service_id, "price": 1, "name": "Free Detail" },
        "schedule": { "date": "2099-06-15", "time": "14:00" },
        "address": { "street": "123 Palm Ave", "city": "Weston", "state": "FL", "zip": "33326" },
        "contact": { "name": "Alice Smith", "phone": phone, "email": "alice@example.com" }
    })
}

async fn client_session(app: Router, phone: &str) -> String {
    let res = app
        .oneshot(json_request("POST", "/api/bookings/lookup", json!({ "phone": phone })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    cookie_from(&res, "client_session").expect("session cookie")
}

// ── Health ──

#[tokio::test]
async fn test_health() {
    let h = Harness::new();
    let res = h.app().oneshot(get("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["status"], "ok");
}

// ── Booking Creation ──

#[tokio::test]
async fn test_create_booking_ignores_client_price_and_applies_first_time_promo() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/bookings/create", booking_body("gold", "(954) 555-1234")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["promoApplied"], true);
    assert_eq!(body["price"], 214);

    let id = body["bookingId"].as_str().unwrap().to_string();
    assert!(id.starts_with("BK-20990615-"));

    let stored = {
        let conn = h.state.db.lock().unwrap();
        queries::get_booking_by_id(&conn, &h.brand(), &id).unwrap().unwrap()
    };
    assert_eq!(stored.price, 214);
    assert_eq!(stored.service_name, "The \"Showroom\"");
    assert_eq!(stored.contact, "9545551234");
    assert_eq!(stored.status, BookingStatus::Pending);
    assert_eq!(stored.payment_status, PaymentStatus::Unpaid);
    assert_eq!(stored.promo_code.as_deref(), Some("FIRST25"));

    // Same phone in a different format is no longer a first-time client.
    let res = h
        .app()
        .oneshot(json_request("POST", "/api/bookings/create", booking_body("gold", "+1 954 555 1234")))
        .await
        .unwrap();
    let body = read_json(res).await;
    assert_eq!(body["promoApplied"], false);
    assert_eq!(body["price"], 285);
}

#[tokio::test]
async fn test_create_booking_unknown_service_is_rejected_without_insert() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/bookings/create", booking_body("platinum", "9545551234")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = read_json(res).await;
    assert_eq!(body["message"], "Invalid booking data");
    assert!(body["errors"]["service.id"].is_array());
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_create_booking_reports_field_errors() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/bookings/create",
            json!({ "service": { "id": "gold" }, "schedule": { "date": "tomorrow" } }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let errors = &read_json(res).await["errors"];
    assert!(errors["schedule.date"].is_array());
    assert!(errors["contact.phone"].is_array());
    assert!(errors["address.zip"].is_array());
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_create_booking_rejects_non_json_body() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/bookings/create")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_booking_notifications_survive_email_failure() {
    let h = Harness::with_email_failing(true);

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/bookings/create", booking_body("basic", "9545551234")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(h.booking_count(), 1);

    settle(&h.sms, 2).await;
    settle(&h.emails, 2).await;

    let sms = h.sms.lock().unwrap().clone();
    let recipients: Vec<&str> = sms.iter().map(|(to, _)| to.as_str()).collect();
    assert!(recipients.contains(&"9548044747"));
    assert!(recipients.contains(&"9545551234"));
    assert!(sms.iter().any(|(_, body)| body.starts_with("New booking received!")));
    assert_eq!(h.emails.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_promo_code_booking() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/bookings/promo",
            json!({
                "promo_code": "KORES",
                "name": "Bob",
                "email": "bob@example.com",
                "phone": "3055550000",
                "address": "1 Ocean Dr, Miami, 33139",
                "upgrades": ["wax", "unknown"]
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["price"], 127);

    let conn = h.state.db.lock().unwrap();
    let id = body["bookingId"].as_str().unwrap();
    let stored = queries::get_booking_by_id(&conn, &h.brand(), id).unwrap().unwrap();
    assert_eq!(stored.service_name, "Exterior Wash (KoRes Promo) + Full Wax");
    assert_eq!(stored.payment_status, PaymentStatus::Unpaid);
    assert_eq!(stored.time, None);
    assert_eq!(stored.promo_code.as_deref(), Some("kores"));
}

#[tokio::test]
async fn test_promo_code_booking_rejects_unknown_code() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/bookings/promo",
            json!({
                "promo_code": "free",
                "name": "Bob",
                "email": "bob@example.com",
                "phone": "3055550000",
                "address": "1 Ocean Dr"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["message"], "Invalid promo code");
}

// ── Client Portal ──

#[tokio::test]
async fn test_lookup_without_bookings_sets_no_session() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/bookings/lookup", json!({ "phone": "9545551234" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookie_from(&res, "client_session").is_none());
    assert_eq!(read_json(res).await["bookings"], json!([]));
}

#[tokio::test]
async fn test_lookup_then_list_my_bookings() {
    let h = Harness::new();
    h.seed_booking("BK-20990615-AAAA", "2099-06-15", "9545551234");
    h.seed_booking("BK-20990616-BBBB", "2099-06-16", "3055550000");

    let cookie = client_session(h.app(), "954.555.1234").await;
    let res = h
        .app()
        .oneshot(with_cookie(get("/api/bookings/mine"), &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    let bookings = body["bookings"].as_array().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0]["id"], "BK-20990615-AAAA");
    assert!(bookings[0].get("contact").is_none());
}

#[tokio::test]
async fn test_my_bookings_requires_valid_session() {
    let h = Harness::new();

    let res = h.app().oneshot(get("/api/bookings/mine")).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(res).await["message"], "Not authenticated");

    let forged = r#"client_session={"phone":"9545551234","expires":9999999999}"#;
    let res = h
        .app()
        .oneshot(with_cookie(get("/api/bookings/mine"), forged))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(res).await["message"], "Invalid session");
}

#[tokio::test]
async fn test_reschedule_flow() {
    let h = Harness::new();
    h.seed_booking("BK-20990615-AAAA", "2099-06-15", "9545551234");
    let cookie = client_session(h.app(), "9545551234").await;

    let res = h
        .app()
        .oneshot(with_cookie(
            json_request(
                "POST",
                "/api/bookings/reschedule",
                json!({ "bookingId": "BK-20990615-AAAA", "newDate": "2099-06-17", "newTime": "09:00" }),
            ),
            &cookie,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["booking"]["date"], "2099-06-17");
    assert_eq!(body["booking"]["time"], "09:00");
}

#[tokio::test]
async fn test_reschedule_rejections_leave_booking_unchanged() {
    let h = Harness::new();
    h.seed_booking("BK-20990615-AAAA", "2099-06-15", "9545551234");
    h.seed_booking("BK-20990616-BBBB", "2099-06-16", "3055550000");
    let cookie = client_session(h.app(), "9545551234").await;

    let cases = [
        (json!({ "bookingId": "BK-20990615-AAAA", "newDate": "2020-01-06" }), StatusCode::BAD_REQUEST),
        (json!({ "bookingId": "BK-20990615-AAAA", "newDate": "2099-06-21" }), StatusCode::BAD_REQUEST),
        (json!({ "bookingId": "BK-20990616-BBBB", "newDate": "2099-06-17" }), StatusCode::FORBIDDEN),
        (json!({ "bookingId": "BK-NOPE", "newDate": "2099-06-17" }), StatusCode::NOT_FOUND),
    ];
    for (body, expected) in cases {
        let res = h
            .app()
            .oneshot(with_cookie(json_request("POST", "/api/bookings/reschedule", body), &cookie))
            .await
            .unwrap();
        assert_eq!(res.status(), expected);
    }

    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/bookings/reschedule",
            json!({ "bookingId": "BK-20990615-AAAA", "newDate": "2099-06-17" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let conn = h.state.db.lock().unwrap();
    for (id, date) in [("BK-20990615-AAAA", "2099-06-15"), ("BK-20990616-BBBB", "2099-06-16")] {
        let b = queries::get_booking_by_id(&conn, &h.brand(), id).unwrap().unwrap();
        assert_eq!(b.date.to_string(), date);
    }
}

#[tokio::test]
async fn test_otp_verification_issues_session() {
    let h = Harness::new();
    {
        let conn = h.state.db.lock().unwrap();
        queries::upsert_client_profile(&conn, &h.brand(), "9545551234", "Alice", None).unwrap();
    }

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/otp/send", json!({ "phone": "9545551234" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/otp/verify", json!({ "phone": "9545551234", "code": "000000" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    {
        let conn = h.state.db.lock().unwrap();
        let profile = queries::get_client_profile(&conn, &h.brand(), "9545551234").unwrap().unwrap();
        assert!(!profile.verified);
    }

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/otp/verify", json!({ "phone": "(954) 555-1234", "code": "123456" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = cookie_from(&res, "client_session").expect("session cookie");
    {
        let conn = h.state.db.lock().unwrap();
        let profile = queries::get_client_profile(&conn, &h.brand(), "9545551234").unwrap().unwrap();
        assert!(profile.verified);
        assert_eq!(profile.name, "Alice");
    }

    let res = h
        .app()
        .oneshot(with_cookie(get("/api/bookings/mine"), &cookie))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_otp_verification_creates_verified_profile() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/otp/verify", json!({ "phone": "9545550000", "code": "123456" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let conn = h.state.db.lock().unwrap();
    let profile = queries::get_client_profile(&conn, &h.brand(), "9545550000").unwrap().unwrap();
    assert!(profile.verified);
    assert_eq!(profile.name, "");
}

#[tokio::test]
async fn test_lookup_is_rate_limited() {
    // A long window keeps every request inside one counter bucket.
    let config = AppConfig {
        rate_limit_window_secs: 3600,
        ..AppConfig::for_tests()
    };
    let h = Harness::build(config, false);
    let limit = h.state.config.rate_limit_max;

    for _ in 0..limit {
        let res = h
            .app()
            .oneshot(json_request("POST", "/api/bookings/lookup", json!({ "phone": "9545551234" })))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
    let res = h
        .app()
        .oneshot(json_request("POST", "/api/bookings/lookup", json!({ "phone": "9545551234" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
}

// ── Payments ──

#[tokio::test]
async fn test_create_checkout() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/payments/create-checkout",
            json!({
                "packageId": "gold",
                "customerName": "Alice",
                "customerPhone": "9545551234",
                "bookingData": { "schedule": { "date": "2099-06-15" } }
            }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["sessionId"], "cs_test_1");

    let requests = h.checkouts.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].unit_amount_cents, 21400);
}

#[tokio::test]
async fn test_create_checkout_unknown_package() {
    let h = Harness::new();

    let res = h
        .app()
        .oneshot(json_request("POST", "/api/payments/create-checkout", json!({ "packageId": "nope" })))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["message"], "Invalid package selected");
    assert!(h.checkouts.lock().unwrap().is_empty());
}

fn checkout_completed_event() -> String {
    let booking_data = json!({
        "service": { "packageId": "silver" },
        "vehicle": { "year": 2020, "make": "Honda", "model": "Odyssey" },
        "schedule": { "date": "2099-06-16", "time": "11:00" },
        "address": { "street": "9 Elm St", "city": "Weston", "state": "FL", "zip": "33326" },
        "contact": { "name": "Carol", "phone": "7865550101" }
    });
    json!({
        "type": "checkout.session.completed",
        "data": { "object": {
            "id": "cs_live_42",
            "amount_total": 13100,
            "metadata": {
                "customer_name": "Carol",
                "customer_phone": "7865550101",
                "booking_data": booking_data.to_string()
            }
        }}
    })
    .to_string()
}

fn webhook_request(body: &str, signature: Option<String>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/payments/webhook")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(sig) = signature {
        builder = builder.header("stripe-signature", sig);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_webhook_requires_signature_header() {
    let h = Harness::new();
    let res = h
        .app()
        .oneshot(webhook_request(&checkout_completed_event(), None))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["message"], "Missing stripe-signature header");
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_webhook_rejects_bad_signature() {
    let h = Harness::new();
    let body = checkout_completed_event();
    let now = chrono::Utc::now().timestamp();
    let forged = signature_header("whsec_attacker", now, &body);

    let res = h
        .app()
        .oneshot(webhook_request(&body, Some(forged)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["message"], "Invalid signature");
    assert_eq!(h.booking_count(), 0);
}

#[tokio::test]
async fn test_webhook_records_paid_booking() {
    let h = Harness::new();
    let body = checkout_completed_event();
    let now = chrono::Utc::now().timestamp();
    let signature = signature_header(&h.state.config.stripe_webhook_secret, now, &body);

    let res = h
        .app()
        .oneshot(webhook_request(&body, Some(signature)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["received"], true);

    let conn = h.state.db.lock().unwrap();
    let bookings = queries::list_bookings(&conn, &h.brand(), &Default::default()).unwrap();
    assert_eq!(bookings.len(), 1);
    let b = &bookings[0];
    assert_eq!(b.price, 131);
    assert_eq!(b.contact, "7865550101");
    assert_eq!(b.status, BookingStatus::Confirmed);
    assert_eq!(b.payment_status, PaymentStatus::Paid);
    assert_eq!(b.transaction_id.as_deref(), Some("cs_live_42"));
}

#[tokio::test]
async fn test_webhook_acknowledges_other_events() {
    let h = Harness::new();
    let body = json!({ "type": "customer.created", "data": { "object": {} } }).to_string();
    let now = chrono::Utc::now().timestamp();
    let signature = signature_header(&h.state.config.stripe_webhook_secret, now, &body);

    let res = h
        .app()
        .oneshot(webhook_request(&body, Some(signature)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(h.booking_count(), 0);
}

// ── Admin API ──

async fn admin_token(h: &Harness) -> String {
    h.create_admin();
    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            json!({ "email": "Owner@Example.com", "password": "correct horse battery" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(cookie_from(&res, "admin_session").is_some());
    read_json(res).await["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_requires_auth() {
    let h = Harness::new();

    for uri in ["/api/admin/stats", "/api/admin/bookings", "/api/admin/revenue", "/api/admin/calendar"] {
        let res = h.app().oneshot(get(uri)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/stats"), "not-a-session"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_login_wrong_password() {
    let h = Harness::new();
    h.create_admin();

    let res = h
        .app()
        .oneshot(json_request(
            "POST",
            "/api/admin/login",
            json!({ "email": "owner@example.com", "password": "wrong password" }),
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(res).await["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_admin_booking_management() {
    let h = Harness::new();
    h.seed_booking("BK-20990615-AAAA", "2099-06-15", "9545551234");
    h.seed_booking("BK-20990616-BBBB", "2099-06-16", "3055550000");
    let token = admin_token(&h).await;

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/bookings?status=all&search=305"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["bookings"].as_array().unwrap().len(), 1);
    assert_eq!(body["bookings"][0]["id"], "BK-20990616-BBBB");

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/bookings?status=archived"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = h
        .app()
        .oneshot(with_bearer(
            json_request("PATCH", "/api/admin/bookings/BK-20990615-AAAA", json!({ "status": "completed" })),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(read_json(res).await["booking"]["status"], "completed");

    let res = h
        .app()
        .oneshot(with_bearer(
            json_request("PATCH", "/api/admin/bookings/BK-20990615-AAAA", json!({ "time": "7pm" })),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/bookings/BK-MISSING"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/calendar?month=2099-06"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["currentMonth"], "2099-06");
    assert_eq!(body["bookings"]["2099-06-16"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_reports() {
    let h = Harness::new();
    let token = admin_token(&h).await;

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/stats"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["todaysBookings"], 0);
    assert_eq!(body["weekRevenue"], 0);
    assert_eq!(body["pendingBookings"], 0);

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/revenue?period=week"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = read_json(res).await;
    assert_eq!(body["period"], "week");
    assert_eq!(body["totalRevenue"], 0);
    assert_eq!(body["topService"], Value::Null);
}

#[tokio::test]
async fn test_admin_logout_invalidates_session() {
    let h = Harness::new();
    let token = admin_token(&h).await;

    let res = h
        .app()
        .oneshot(with_bearer(json_request("POST", "/api/admin/logout", json!({})), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = h
        .app()
        .oneshot(with_bearer(get("/api/admin/stats"), &token))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
