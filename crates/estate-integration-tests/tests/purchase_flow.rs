//! End-to-end property purchase: both services on ephemeral ports, the
//! escrow ledger talking to the real loan ledger over HTTP.

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use estate_api::middleware::metrics::ApiMetrics;
use estate_api::state::{DEFAULT_ADMIN_KEY, DEFAULT_AGENT_KEY};
use estate_api::{
    escrow_app, loan_app, EscrowAppState, EscrowServiceConfig, LoanAppState, LoanServiceConfig,
};
use estate_loan_client::LoanClientConfig;
use serde_json::{json, Value};

const BUYER: &str = "0x5555555555555555555555555555555555555555";
const SELLER: &str = "0x6666666666666666666666666666666666666666";
const PRICE: f64 = 300000.0;

async fn spawn(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn spawn_loan_ledger() -> String {
    let app = loan_app(LoanAppState::from_config(&LoanServiceConfig::default()), None);
    format!("http://{}", spawn(app).await)
}

async fn spawn_escrow_ledger(loan_ledger_url: &str, metrics: Option<ApiMetrics>) -> String {
    let config = EscrowServiceConfig {
        port: 0,
        agent_key: DEFAULT_AGENT_KEY.to_string().into(),
        loan_ledger: LoanClientConfig::new(loan_ledger_url)
            .unwrap()
            .with_timeout_secs(2),
        metrics_enabled: metrics.is_some(),
    };
    let state = EscrowAppState::from_config(&config, metrics.as_ref()).unwrap();
    format!("http://{}", spawn(escrow_app(state, metrics)).await)
}

struct Client {
    http: reqwest::Client,
}

impl Client {
    fn new() -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap(),
        }
    }

    async fn post(&self, url: String, header: Option<(&str, &str)>, body: Value) -> (u16, Value) {
        let mut req = self.http.post(url).json(&body);
        if let Some((name, value)) = header {
            req = req.header(name, value);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get(&self, url: String) -> (u16, Value) {
        let resp = self.http.get(url).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

async fn apply_and_approve(client: &Client, loans: &str) {
    let (status, _) = client
        .post(
            format!("{loans}/apply_loan"),
            None,
            json!({
                "buyer_address": BUYER,
                "property_id": 2,
                "amount": 240000,
                "term_in_months": 360
            }),
        )
        .await;
    assert_eq!(status, 200);
    let (status, _) = client
        .post(
            format!("{loans}/approve_loan"),
            Some(("X-Admin-Key", DEFAULT_ADMIN_KEY)),
            json!({"buyer_address": BUYER}),
        )
        .await;
    assert_eq!(status, 200);
}

async fn open_funded_escrow(client: &Client, escrow: &str, property_id: u64) {
    let (status, _) = client
        .post(
            format!("{escrow}/create_escrow"),
            Some(("X-Agent-Key", DEFAULT_AGENT_KEY)),
            json!({"buyer": BUYER, "seller": SELLER, "property_id": property_id, "amount": PRICE}),
        )
        .await;
    assert_eq!(status, 200);
    let (status, _) = client
        .post(
            format!("{escrow}/deposit_funds"),
            Some(("X-Buyer-Address", BUYER)),
            json!({"property_id": property_id, "amount": PRICE}),
        )
        .await;
    assert_eq!(status, 200);
}

async fn release(client: &Client, escrow: &str, property_id: u64) -> (u16, Value) {
    client
        .post(
            format!("{escrow}/release_funds"),
            Some(("X-Agent-Key", DEFAULT_AGENT_KEY)),
            json!({"property_id": property_id}),
        )
        .await
}

#[tokio::test]
async fn approved_purchase_releases_to_seller() {
    let client = Client::new();
    let loans = spawn_loan_ledger().await;
    let escrow = spawn_escrow_ledger(&loans, None).await;

    apply_and_approve(&client, &loans).await;
    open_funded_escrow(&client, &escrow, 2).await;

    let (status, body) = release(&client, &escrow, 2).await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["event"], "ReleaseFunds");
    assert_eq!(body["seller"], SELLER);
    assert_eq!(body["amount"], PRICE);

    let (status, body) = client.get(format!("{escrow}/escrow_status/2")).await;
    assert_eq!(status, 200);
    assert_eq!(body["completed"], true);
}

#[tokio::test]
async fn unapproved_loan_blocks_release_until_approved() {
    let client = Client::new();
    let loans = spawn_loan_ledger().await;
    let escrow = spawn_escrow_ledger(&loans, None).await;

    // No loan at all.
    open_funded_escrow(&client, &escrow, 2).await;
    let (status, body) = release(&client, &escrow, 2).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "LOAN_NOT_APPROVED");

    // Approval makes the same release succeed.
    apply_and_approve(&client, &loans).await;
    let (status, _) = release(&client, &escrow, 2).await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn repaid_loan_no_longer_approves_release() {
    let client = Client::new();
    let loans = spawn_loan_ledger().await;
    let escrow = spawn_escrow_ledger(&loans, None).await;

    apply_and_approve(&client, &loans).await;
    let (status, _) = client
        .post(
            format!("{loans}/repay_loan"),
            Some(("X-Admin-Key", DEFAULT_ADMIN_KEY)),
            json!({"buyer_address": BUYER}),
        )
        .await;
    assert_eq!(status, 200);

    open_funded_escrow(&client, &escrow, 2).await;
    let (status, body) = release(&client, &escrow, 2).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "LOAN_NOT_APPROVED");
}

#[tokio::test]
async fn loan_ledger_down_fails_closed() {
    let client = Client::new();
    let metrics = ApiMetrics::new();
    // Nothing listens on port 1.
    let escrow = spawn_escrow_ledger("http://127.0.0.1:1", Some(metrics.clone())).await;

    open_funded_escrow(&client, &escrow, 2).await;
    let (status, body) = release(&client, &escrow, 2).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "LOAN_NOT_APPROVED");
    assert_eq!(metrics.loan_checks("unavailable"), 1);

    let (_, body) = client.get(format!("{escrow}/escrow_status/2")).await;
    assert_eq!(body["completed"], false);
    assert_eq!(body["funds_deposited"], true);

    // Refund remains available.
    let (status, body) = client
        .post(
            format!("{escrow}/refund_funds"),
            Some(("X-Agent-Key", DEFAULT_AGENT_KEY)),
            json!({"property_id": 2}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["event"], "RefundFunds");
}

#[tokio::test]
async fn buyer_without_loan_is_denied() {
    let client = Client::new();
    let metrics = ApiMetrics::new();
    let loans = spawn_loan_ledger().await;
    let escrow = spawn_escrow_ledger(&loans, Some(metrics.clone())).await;

    open_funded_escrow(&client, &escrow, 2).await;
    let (status, body) = release(&client, &escrow, 2).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "LOAN_NOT_APPROVED");
    assert_eq!(metrics.loan_checks("denied"), 1);
    assert_eq!(metrics.loan_checks("unavailable"), 0);
}

#[tokio::test]
async fn misrouted_loan_ledger_url_is_unavailable_not_denied() {
    let client = Client::new();
    let metrics = ApiMetrics::new();
    // A live service that answers 404 on every path.
    let elsewhere = format!("http://{}", spawn(Router::new()).await);
    let escrow = spawn_escrow_ledger(&elsewhere, Some(metrics.clone())).await;

    open_funded_escrow(&client, &escrow, 2).await;
    let (status, body) = release(&client, &escrow, 2).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "LOAN_NOT_APPROVED");
    assert_eq!(metrics.loan_checks("unavailable"), 1);
    assert_eq!(metrics.loan_checks("denied"), 0);
}

#[tokio::test]
async fn odd_property_fails_ownership_before_loan_check() {
    let client = Client::new();
    let metrics = ApiMetrics::new();
    let loans = spawn_loan_ledger().await;
    let escrow = spawn_escrow_ledger(&loans, Some(metrics.clone())).await;

    apply_and_approve(&client, &loans).await;
    open_funded_escrow(&client, &escrow, 7).await;

    let (status, body) = release(&client, &escrow, 7).await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "OWNERSHIP_MISMATCH");
    assert_eq!(metrics.loan_checks("approved"), 0);
}

#[tokio::test]
async fn concurrent_release_and_refund_settle_once() {
    let client = Client::new();
    let loans = spawn_loan_ledger().await;
    let escrow = spawn_escrow_ledger(&loans, None).await;

    apply_and_approve(&client, &loans).await;
    open_funded_escrow(&client, &escrow, 2).await;

    let releasing = release(&client, &escrow, 2);
    let refunding = client.post(
        format!("{escrow}/refund_funds"),
        Some(("X-Agent-Key", DEFAULT_AGENT_KEY)),
        json!({"property_id": 2}),
    );
    let ((release_status, _), (refund_status, refund_body)) = tokio::join!(releasing, refunding);

    let successes = [release_status, refund_status]
        .iter()
        .filter(|s| **s == 200)
        .count();
    assert_eq!(successes, 1, "release {release_status}, refund {refund_status} {refund_body}");
}
