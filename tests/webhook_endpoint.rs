//! End-to-end tests for the webhook endpoint.
//!
//! Drives the full Axum router with in-memory store adapters: real
//! signatures, real JSON bodies, real status codes. Only the Postgres pool
//! is substituted.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::Router;
use chrono::Utc;
use http::{Request, StatusCode};
use secrecy::SecretString;
use tokio::sync::RwLock;
use tower::ServiceExt;
use uuid::Uuid;

use clubtrack::adapters::http::{api_router, AppState, SIGNATURE_HEADER};
use clubtrack::application::ProcessWebhookHandler;
use clubtrack::domain::account::{Account, AccountStatus, AccountUpdate};
use clubtrack::domain::billing::{compute_test_signature, SignatureVerifier};
use clubtrack::domain::foundation::DomainError;
use clubtrack::ports::{
    AccountStore, InsertOutcome, WebhookEventLog, WebhookEventLogEntry,
};

const TEST_SECRET: &str = "whsec_endpoint_integration";
const WEBHOOK_PATH: &str = "/api/webhooks/revenuecat";

// ════════════════════════════════════════════════════════════════════════════
// In-memory adapters
// ════════════════════════════════════════════════════════════════════════════

struct InMemoryAccountStore {
    accounts: RwLock<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    fn new(accounts: Vec<Account>) -> Self {
        Self {
            accounts: RwLock::new(accounts.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    async fn get(&self, app_user_id: &str) -> Option<Account> {
        self.accounts
            .read()
            .await
            .values()
            .find(|a| a.app_user_id == app_user_id)
            .cloned()
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_app_user_id(
        &self,
        app_user_id: &str,
    ) -> Result<Option<Account>, DomainError> {
        Ok(self.get(app_user_id).await)
    }

    async fn update(&self, account_id: Uuid, update: AccountUpdate) -> Result<(), DomainError> {
        let mut accounts = self.accounts.write().await;
        let account = accounts
            .get_mut(&account_id)
            .ok_or_else(|| DomainError::NotFound {
                entity: "account",
                id: account_id.to_string(),
            })?;
        update.apply_to(account, Utc::now());
        Ok(())
    }
}

struct InMemoryWebhookEventLog {
    entries: RwLock<HashMap<String, WebhookEventLogEntry>>,
}

impl InMemoryWebhookEventLog {
    fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, event_id: &str) -> Option<WebhookEventLogEntry> {
        self.entries.read().await.get(event_id).cloned()
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl WebhookEventLog for InMemoryWebhookEventLog {
    async fn find_by_event_id(
        &self,
        event_id: &str,
    ) -> Result<Option<WebhookEventLogEntry>, DomainError> {
        Ok(self.entries.read().await.get(event_id).cloned())
    }

    async fn record(&self, entry: WebhookEventLogEntry) -> Result<InsertOutcome, DomainError> {
        let mut entries = self.entries.write().await;
        match entries.get(&entry.event_id) {
            Some(existing) if existing.success => Ok(InsertOutcome::AlreadyProcessed),
            _ => {
                entries.insert(entry.event_id.clone(), entry);
                Ok(InsertOutcome::Recorded)
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Fixture
// ════════════════════════════════════════════════════════════════════════════

struct TestApp {
    router: Router,
    accounts: Arc<InMemoryAccountStore>,
    log: Arc<InMemoryWebhookEventLog>,
}

fn account(app_user_id: &str, status: AccountStatus) -> Account {
    let now = Utc::now();
    Account {
        id: Uuid::new_v4(),
        app_user_id: app_user_id.to_string(),
        status,
        subscription_id: None,
        product_id: None,
        last_payment_date: None,
        expiration_date: None,
        auto_resume_date: None,
        grace_period_expires_date: None,
        created_at: now,
        updated_at: now,
    }
}

fn account_with_subscription(
    app_user_id: &str,
    status: AccountStatus,
    subscription_id: &str,
) -> Account {
    Account {
        subscription_id: Some(subscription_id.to_string()),
        ..account(app_user_id, status)
    }
}

fn test_app(accounts: Vec<Account>) -> TestApp {
    let accounts = Arc::new(InMemoryAccountStore::new(accounts));
    let log = Arc::new(InMemoryWebhookEventLog::new());
    let handler = ProcessWebhookHandler::new(
        SignatureVerifier::new(SecretString::new(TEST_SECRET.to_string())),
        accounts.clone(),
        log.clone(),
    );
    let state = AppState {
        webhook_handler: Arc::new(handler),
    };
    TestApp {
        router: api_router(state, Duration::from_secs(5)),
        accounts,
        log,
    }
}

fn signed_request(body: &serde_json::Value) -> Request<Body> {
    let raw = serde_json::to_vec(body).unwrap();
    let signature = compute_test_signature(TEST_SECRET, &raw);
    Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header("content-type", "application/json")
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw))
        .unwrap()
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post_event(app: &TestApp, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    send(app, signed_request(&body)).await
}

// ════════════════════════════════════════════════════════════════════════════
// Lifecycle scenarios
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn initial_purchase_activates_trial_account() {
    let app = test_app(vec![account("U1", AccountStatus::Trial)]);

    let (status, body) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_purchase_1",
            "type": "INITIAL_PURCHASE",
            "app_user_id": "U1",
            "subscription_id": "sub_777",
            "product_id": "clubtrack.monthly"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let updated = app.accounts.get("U1").await.unwrap();
    assert_eq!(updated.status, AccountStatus::Active);
    assert_eq!(updated.subscription_id.as_deref(), Some("sub_777"));

    let paid_at = updated.last_payment_date.expect("payment date set");
    let age = Utc::now().signed_duration_since(paid_at);
    assert!(age.num_seconds() < 5, "last_payment_date should be recent");

    let entry = app.log.entry("evt_purchase_1").await.unwrap();
    assert!(entry.success);
    assert_eq!(app.log.len().await, 1);
}

#[tokio::test]
async fn replayed_event_returns_success_without_remutating() {
    let app = test_app(vec![account("U1", AccountStatus::Trial)]);
    let event = serde_json::json!({
        "id": "evt_replay",
        "type": "INITIAL_PURCHASE",
        "app_user_id": "U1",
        "subscription_id": "sub_777"
    });

    let (first_status, _) = post_event(&app, event.clone()).await;
    assert_eq!(first_status, StatusCode::OK);
    let first_paid_at = app.accounts.get("U1").await.unwrap().last_payment_date;

    tokio::time::sleep(Duration::from_millis(50)).await;
    let (second_status, body) = post_event(&app, event).await;

    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(
        app.accounts.get("U1").await.unwrap().last_payment_date,
        first_paid_at,
        "replay must not refresh the payment date"
    );
    assert_eq!(app.log.len().await, 1);
}

#[tokio::test]
async fn billing_issue_moves_active_account_to_past_due() {
    let app = test_app(vec![account("U1", AccountStatus::Active)]);

    let (status, _) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_billing",
            "type": "BILLING_ISSUE",
            "app_user_id": "U1",
            "grace_period_expiration_at_ms": 1_704_672_000_000i64
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let updated = app.accounts.get("U1").await.unwrap();
    assert_eq!(updated.status, AccountStatus::PastDue);
    assert_eq!(
        updated.grace_period_expires_date.unwrap().timestamp(),
        1_704_672_000
    );
}

#[tokio::test]
async fn transfer_moves_subscription_from_source_to_target() {
    let app = test_app(vec![
        account_with_subscription("U1", AccountStatus::Active, "sub_moved"),
        account("U2", AccountStatus::Frozen),
    ]);

    let (status, _) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_transfer",
            "type": "TRANSFER",
            "app_user_id": "U2",
            "subscription_id": "sub_moved",
            "transferred_from": ["U1"]
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);

    let source = app.accounts.get("U1").await.unwrap();
    assert_eq!(source.status, AccountStatus::Frozen);
    assert_eq!(source.subscription_id, None);

    let target = app.accounts.get("U2").await.unwrap();
    assert_eq!(target.status, AccountStatus::Active);
    assert_eq!(target.subscription_id.as_deref(), Some("sub_moved"));
}

#[tokio::test]
async fn renewal_refreshes_payment_date_only() {
    let app = test_app(vec![account_with_subscription(
        "U1",
        AccountStatus::Active,
        "sub_1",
    )]);

    let (status, _) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_renew",
            "type": "RENEWAL",
            "app_user_id": "U1"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let updated = app.accounts.get("U1").await.unwrap();
    assert_eq!(updated.status, AccountStatus::Active);
    assert!(updated.last_payment_date.is_some());
    assert_eq!(updated.subscription_id.as_deref(), Some("sub_1"));
}

// ════════════════════════════════════════════════════════════════════════════
// Authentication and method handling
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn invalid_signature_rejected_with_401_and_no_audit_entry() {
    let app = test_app(vec![account("U1", AccountStatus::Trial)]);
    let raw = serde_json::to_vec(&serde_json::json!({
        "id": "evt_forged",
        "type": "INITIAL_PURCHASE",
        "app_user_id": "U1"
    }))
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header(SIGNATURE_HEADER, "invalid_signature_12345")
        .body(Body::from(raw))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid signature");
    assert_eq!(app.log.len().await, 0);
    assert_eq!(
        app.accounts.get("U1").await.unwrap().status,
        AccountStatus::Trial
    );
}

#[tokio::test]
async fn missing_signature_header_rejected_with_401() {
    let app = test_app(vec![]);

    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Invalid signature");
}

#[tokio::test]
async fn tampered_body_with_valid_signature_over_original_rejected() {
    let app = test_app(vec![account("U1", AccountStatus::Trial)]);
    let original = serde_json::to_vec(&serde_json::json!({
        "id": "evt_orig",
        "type": "RENEWAL",
        "app_user_id": "U1"
    }))
    .unwrap();
    let signature = compute_test_signature(TEST_SECRET, &original);

    let tampered = serde_json::to_vec(&serde_json::json!({
        "id": "evt_orig",
        "type": "RENEWAL",
        "app_user_id": "attacker"
    }))
    .unwrap();

    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(tampered))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn non_post_method_rejected_with_405() {
    let app = test_app(vec![]);

    let request = Request::builder()
        .method("GET")
        .uri(WEBHOOK_PATH)
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"], "Method not allowed");
}

// ════════════════════════════════════════════════════════════════════════════
// Business rejections
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn empty_app_user_id_rejected_with_500_and_failed_audit_entry() {
    let app = test_app(vec![]);

    let (status, body) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_nouser",
            "type": "INITIAL_PURCHASE",
            "app_user_id": ""
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Missing user_id"));

    let entry = app.log.entry("evt_nouser").await.unwrap();
    assert!(!entry.success);
    assert_eq!(app.log.len().await, 1);
}

#[tokio::test]
async fn unknown_event_type_rejected_with_500() {
    let app = test_app(vec![account("U1", AccountStatus::Active)]);

    let (status, body) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_unknown",
            "type": "FOO_BAR",
            "app_user_id": "U1"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let message = body["error"].as_str().unwrap();
    assert!(message.contains("Unknown event type"));
    assert!(message.contains("FOO_BAR"));
    assert!(!app.log.entry("evt_unknown").await.unwrap().success);
}

#[tokio::test]
async fn unknown_account_rejected_with_500() {
    let app = test_app(vec![]);

    let (status, body) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_noaccount",
            "type": "RENEWAL",
            "app_user_id": "stranger"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("Account not found"));
}

#[tokio::test]
async fn malformed_body_rejected_without_audit_entry() {
    let app = test_app(vec![]);
    let raw = b"{not valid json".to_vec();
    let signature = compute_test_signature(TEST_SECRET, &raw);

    let request = Request::builder()
        .method("POST")
        .uri(WEBHOOK_PATH)
        .header(SIGNATURE_HEADER, signature)
        .body(Body::from(raw))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Malformed payload"));
    assert_eq!(app.log.len().await, 0);
}

// ════════════════════════════════════════════════════════════════════════════
// Idempotency under concurrency, TEST events, health
// ════════════════════════════════════════════════════════════════════════════

#[tokio::test]
async fn concurrent_duplicate_deliveries_apply_exactly_once() {
    let app = test_app(vec![account("U1", AccountStatus::Trial)]);
    let event = serde_json::json!({
        "id": "evt_concurrent",
        "type": "INITIAL_PURCHASE",
        "app_user_id": "U1",
        "subscription_id": "sub_c"
    });

    let (first, second) = tokio::join!(
        send(&app, signed_request(&event)),
        send(&app, signed_request(&event)),
    );

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(app.log.len().await, 1);
    assert!(app.log.entry("evt_concurrent").await.unwrap().success);
    assert_eq!(
        app.accounts.get("U1").await.unwrap().status,
        AccountStatus::Active
    );
}

#[tokio::test]
async fn test_event_acknowledged_and_audited_without_mutation() {
    let app = test_app(vec![account("U1", AccountStatus::Canceled)]);

    let (status, body) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_dashboard_test",
            "type": "TEST",
            "app_user_id": "U1"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert!(app.log.entry("evt_dashboard_test").await.unwrap().success);
    assert_eq!(
        app.accounts.get("U1").await.unwrap().status,
        AccountStatus::Canceled
    );
}

#[tokio::test]
async fn deleted_account_not_resurrected_by_late_event() {
    let app = test_app(vec![account("U1", AccountStatus::Deleted)]);

    let (status, _) = post_event(
        &app,
        serde_json::json!({
            "id": "evt_late",
            "type": "INITIAL_PURCHASE",
            "app_user_id": "U1",
            "subscription_id": "sub_zombie"
        }),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let account = app.accounts.get("U1").await.unwrap();
    assert_eq!(account.status, AccountStatus::Deleted);
    assert_eq!(account.subscription_id, None);
    assert!(app.log.entry("evt_late").await.unwrap().success);
}

#[tokio::test]
async fn healthz_returns_ok() {
    let app = test_app(vec![]);

    let request = Request::builder()
        .method("GET")
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
