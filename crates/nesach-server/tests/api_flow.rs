// SPDX-FileCopyrightText: 2026 Nesach Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end API tests over the full router, with a mock fulfillment bot
//! and a recording mailer.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use hmac::{Hmac, Mac};
use nesach_config::model::FulfillmentConfig;
use nesach_core::{BotStatus, NesachError, OrderId, OrderStatus};
use nesach_dispatch::{Dispatcher, FulfillmentClient};
use nesach_email::{EmailMessage, Mailer};
use nesach_server::{build_router, AppState, AuthConfig};
use nesach_store::queries::orders;
use nesach_store::Database;
use serde_json::{json, Value};
use sha2::Sha256;
use tempfile::TempDir;
use tower::ServiceExt;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_TOKEN: &str = "api-secret";
const ADMIN_TOKEN: &str = "admin-secret";
const WEBHOOK_SECRET: &str = "whsec_test";
const CHECKOUT_BASE: &str = "https://pay.test/checkout/";

struct RecordingMailer {
    sent: Mutex<Vec<(String, EmailMessage)>>,
}

impl RecordingMailer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
        })
    }

    fn sent(&self) -> Vec<(String, EmailMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, message: &EmailMessage) -> Result<(), NesachError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), message.clone()));
        Ok(())
    }
}

struct TestApp {
    app: Router,
    db: Database,
    mailer: Arc<RecordingMailer>,
    documents_dir: PathBuf,
    _dir: TempDir,
}

async fn setup(bot: &MockServer) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let documents_dir = dir.path().join("documents");
    let db = Database::open(db_path.to_str().unwrap()).await.unwrap();

    let client = FulfillmentClient::new(&FulfillmentConfig {
        endpoint: format!("{}/fulfill", bot.uri()),
        max_attempts: 3,
        base_backoff_ms: 10,
        request_timeout_secs: 5,
    })
    .unwrap();
    let dispatcher = Dispatcher::new(client, db.clone());
    let mailer = RecordingMailer::new();

    let state = AppState {
        db: db.clone(),
        dispatcher,
        mailer: mailer.clone(),
        auth: AuthConfig {
            api_token: Some(API_TOKEN.to_string()),
            admin_token: Some(ADMIN_TOKEN.to_string()),
        },
        documents_dir: documents_dir.clone(),
        checkout_base_url: CHECKOUT_BASE.to_string(),
        webhook_secret: Some(WEBHOOK_SECRET.to_string()),
    };

    TestApp {
        app: build_router(state),
        db,
        mailer,
        documents_dir,
        _dir: dir,
    }
}

fn sign(body: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn api_get(uri: &str, user: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header("authorization", format!("Bearer {API_TOKEN}"))
        .header("x-user-id", user)
        .body(Body::empty())
        .unwrap()
}

fn api_post(uri: &str, user: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("authorization", format!("Bearer {API_TOKEN}"))
        .header("x-user-id", user)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn admin_request(method_name: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method_name)
        .uri(uri)
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"));
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn webhook_request(event: &Value) -> Request<Body> {
    let body = event.to_string();
    Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("x-webhook-signature", sign(&body))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap()
}

fn block_draft() -> Value {
    json!({
        "block": "6941",
        "parcel": "198",
        "service_type": "historical",
        "price": 69.0,
        "email": "buyer@example.com",
    })
}

fn paid_event(order_id: &str, payment_id: &str) -> Value {
    json!({
        "id": format!("evt_{payment_id}"),
        "type": "checkout.completed",
        "data": { "order_id": order_id, "payment_id": payment_id },
    })
}

async fn create_order(app: &Router, user: &str, draft: Value) -> Value {
    let (status, body) = send(app, api_post("/v1/orders", user, draft)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

async fn wait_for_bot_status(db: &Database, id: &OrderId, expected: BotStatus) {
    for _ in 0..150 {
        if let Some(order) = orders::get_order(db, id).await.unwrap() {
            if order.bot_status == expected {
                return;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("timed out waiting for bot status {expected}");
}

#[tokio::test]
async fn health_is_public() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let request = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn order_routes_reject_bad_tokens() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    // No token.
    let request = Request::builder()
        .uri("/v1/orders")
        .header("x-user-id", "user-1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Wrong token.
    let request = Request::builder()
        .uri("/v1/orders")
        .header("authorization", "Bearer nope")
        .header("x-user-id", "user-1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Tokens are not interchangeable across route groups.
    let request = Request::builder()
        .uri("/v1/orders")
        .header("authorization", format!("Bearer {ADMIN_TOKEN}"))
        .header("x-user-id", "user-1")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/v1/admin/orders")
        .header("authorization", format!("Bearer {API_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_order_returns_checkout_url() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let body = create_order(&t.app, "user-1", block_draft()).await;
    let id = body["order"]["id"].as_str().unwrap();
    assert_eq!(body["order"]["status"], "pending");
    assert_eq!(body["order"]["bot_status"], "unset");
    assert_eq!(
        body["checkout_url"].as_str().unwrap(),
        format!("{CHECKOUT_BASE}{id}")
    );
}

#[tokio::test]
async fn invalid_draft_is_rejected_with_structured_error() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let draft = json!({ "price": 69.0, "email": "buyer@example.com" });
    let (status, body) = send(&t.app, api_post("/v1/orders", "user-1", draft)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("block"));
}

#[tokio::test]
async fn orders_list_newest_first_and_owner_scoped() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let first = create_order(&t.app, "user-1", block_draft()).await;
    let second = create_order(&t.app, "user-1", block_draft()).await;
    create_order(&t.app, "user-2", block_draft()).await;

    let (status, body) = send(&t.app, api_get("/v1/orders", "user-1")).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], second["order"]["id"]);
    assert_eq!(list[1]["id"], first["order"]["id"]);

    // Another user's order reads as missing.
    let foreign = first["order"]["id"].as_str().unwrap();
    let (status, _) = send(&t.app, api_get(&format!("/v1/orders/{foreign}"), "user-2")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn paid_webhook_marks_paid_emails_and_dispatches() {
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fulfill"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&bot)
        .await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&t.app, webhook_request(&paid_event(&id, "pay_1"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let order_id = OrderId(id.clone());
    wait_for_bot_status(&t.db, &order_id, BotStatus::Sent).await;

    let order = orders::get_order(&t.db, &order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert_eq!(order.payment_id.as_deref(), Some("pay_1"));

    let sent = t.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "buyer@example.com");
    assert!(sent[0].1.subject.contains(&id));
}

#[tokio::test]
async fn replayed_webhook_has_no_side_effects() {
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fulfill"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&bot)
        .await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();

    let event = paid_event(&id, "pay_1");
    let (status, body) = send(&t.app, webhook_request(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&t.app, webhook_request(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "duplicate");

    wait_for_bot_status(&t.db, &OrderId(id), BotStatus::Sent).await;
    assert_eq!(t.mailer.sent().len(), 1);
}

#[tokio::test]
async fn webhook_rejects_bad_signatures() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let body = paid_event("ord-1", "pay_1").to_string();

    // Missing signature.
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("content-type", "application/json")
        .body(Body::from(body.clone()))
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Signature over different bytes.
    let request = Request::builder()
        .method("POST")
        .uri("/webhooks/payment")
        .header("x-webhook-signature", sign("other body"))
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn failed_payment_webhook_marks_order_failed() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();

    let event = json!({
        "id": "evt_f1",
        "type": "payment.failed",
        "data": { "order_id": id, "payment_id": "pay_f1" },
    });
    let (status, body) = send(&t.app, webhook_request(&event)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let order = orders::get_order(&t.db, &OrderId(id)).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
}

#[tokio::test]
async fn exhausted_dispatch_keeps_order_paid() {
    let bot = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/fulfill"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&bot)
        .await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&t.app, webhook_request(&paid_event(&id, "pay_1"))).await;
    assert_eq!(status, StatusCode::OK);

    let order_id = OrderId(id);
    wait_for_bot_status(&t.db, &order_id, BotStatus::Failed).await;
    let order = orders::get_order(&t.db, &order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
}

#[tokio::test]
async fn address_order_dispatch_sends_address_payload() {
    let bot = MockServer::start().await;
    let expected = json!({
        "user_id": "user-1",
        "email": "buyer@example.com",
        "search_type": "address",
        "city": "Tel Aviv",
        "street": "Allenby",
        "house_number": "10",
        "block": "",
        "parcel": "",
        "subparcel": "",
        "service_type": "by-address",
    });
    Mock::given(method("POST"))
        .and(path("/fulfill"))
        .and(body_json(&expected))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&bot)
        .await;
    let t = setup(&bot).await;

    let draft = json!({
        "city": "Tel Aviv",
        "street": "Allenby",
        "house_number": "10",
        "service_type": "by-address",
        "price": 89.0,
        "email": "buyer@example.com",
    });
    let created = create_order(&t.app, "user-1", draft).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(&t.app, webhook_request(&paid_event(&id, "pay_1"))).await;
    assert_eq!(status, StatusCode::OK);
    wait_for_bot_status(&t.db, &OrderId(id), BotStatus::Sent).await;
}

#[tokio::test]
async fn manual_dispatch_rejects_unpaid_orders() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap();

    let (status, body) = send(
        &t.app,
        api_post(&format!("/v1/orders/{id}/dispatch"), "user-1", json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("paid"));
}

#[tokio::test]
async fn admin_document_upload_is_idempotent() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();
    let order_id = OrderId(id.clone());
    assert!(orders::mark_paid(&t.db, &order_id, "pay_1").await.unwrap());

    let upload = json!({
        "filename": "extract.pdf",
        "content_base64": "JVBERi0xLjQ=",
    });
    let (status, body) = send(
        &t.app,
        admin_request(
            "POST",
            &format!("/v1/admin/orders/{id}/document"),
            Some(upload.clone()),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newly_attached"], true);
    let url = body["document_url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("/documents/{id}.pdf"));

    let order = orders::get_order(&t.db, &order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Sent);
    assert!(t.documents_dir.join(format!("{id}.pdf")).exists());

    // Replay returns the original URL, changes nothing, sends no second mail.
    let (status, body) = send(
        &t.app,
        admin_request(
            "POST",
            &format!("/v1/admin/orders/{id}/document"),
            Some(upload),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["newly_attached"], false);
    assert_eq!(body["document_url"].as_str().unwrap(), url);

    let sent = t.mailer.sent();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].1.body.contains(&url));

    // The uploaded document is served back.
    let request = Request::builder()
        .uri(format!("/documents/{id}.pdf"))
        .body(Body::empty())
        .unwrap();
    let response = t.app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "application/pdf"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"%PDF-1.4");
}

#[tokio::test]
async fn admin_upload_to_unknown_order_is_404() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let upload = json!({ "filename": "extract.pdf", "content_base64": "JVBERi0xLjQ=" });
    let (status, _) = send(
        &t.app,
        admin_request("POST", "/v1/admin/orders/missing/document", Some(upload)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No orphaned file: nothing was written, and nothing is served.
    assert!(!t.documents_dir.join("missing.pdf").exists());
    let request = Request::builder()
        .uri("/documents/missing.pdf")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn document_names_cannot_traverse() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let request = Request::builder()
        .uri("/documents/..%2F..%2Fetc%2Fpasswd")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&t.app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_cancel_only_closes_pending_orders() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    let created = create_order(&t.app, "user-1", block_draft()).await;
    let id = created["order"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        admin_request("POST", &format!("/v1/admin/orders/{id}/cancel"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");

    let order = orders::get_order(&t.db, &OrderId(id.clone())).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Cancelled);

    let (status, _) = send(
        &t.app,
        admin_request("POST", &format!("/v1/admin/orders/{id}/cancel"), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_sees_every_order() {
    let bot = MockServer::start().await;
    let t = setup(&bot).await;

    create_order(&t.app, "user-1", block_draft()).await;
    create_order(&t.app, "user-2", block_draft()).await;

    let (status, body) = send(&t.app, admin_request("GET", "/v1/admin/orders", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}
