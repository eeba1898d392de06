use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use castbet_ledger::{routes, AppState, Config, ManualClock, NoFeed, SharedState};

const START: u64 = 1_750_000_000;
const DAY: u64 = 86_400;

fn test_app() -> (Router, SharedState, ManualClock) {
    let clock = ManualClock::new(START);
    let state = AppState::with_sources(Config::default(), Arc::new(clock.clone()), Arc::new(NoFeed))
        .unwrap()
        .shared();
    (routes::router(state.clone()), state, clock)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn fund(app: &Router, account: &str, amount: &str) {
    let (status, _) = send(app, "POST", "/faucet", Some(json!({ "account": account, "amount": amount }))).await;
    assert_eq!(status, StatusCode::OK);
}

async fn create_market(app: &Router) -> u64 {
    let (status, body) = send(
        app,
        "POST",
        "/markets",
        Some(json!({
            "creator": "carol",
            "question": "Will the cast pass 1000 recasts?",
            "resolution_time": START + DAY,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["market_id"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _, _) = test_app();
    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_market_flow_over_http() {
    let (app, state, clock) = test_app();
    fund(&app, "alice", "500").await;
    fund(&app, "bob", "500").await;
    let id = create_market(&app).await;

    let (status, body) = send(&app, "GET", &format!("/markets/{id}/prices"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["price_yes"]["raw"], 500_000);
    assert_eq!(body["price_no"]["value"], "0.5");

    let (status, body) = send(&app, "GET", &format!("/markets/{id}/quote?outcome=yes&amount=100"), None).await;
    assert_eq!(status, StatusCode::OK);
    let quoted = body["quote"]["shares"].as_u64().unwrap();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "alice", "outcome": "yes", "amount": "100" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["receipt"]["shares"].as_u64().unwrap(), quoted);
    assert_eq!(body["new_balance"]["value"], "400");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "bob", "outcome": "no", "amount": "50" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", &format!("/markets/{id}/sell-quote?outcome=yes&shares=10"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let net_return = body["net_return"]["raw"].as_u64().unwrap();
    assert!(net_return > 0);
    assert_eq!(body["quote"]["shares"], 10_000_000);

    let (status, body) = send(&app, "GET", &format!("/markets/{id}/sell-quote?outcome=no&shares=100000"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "insufficient_shares");

    let (status, body) = send(&app, "GET", &format!("/markets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_volume"], 150_000_000);
    assert_eq!(body["status"], "active");
    assert_eq!(body["price_yes"].as_u64().unwrap() + body["price_no"].as_u64().unwrap(), 1_000_000);

    clock.set(START + DAY);
    for account in ["alice", "bob"] {
        let (status, _) = send(
            &app,
            "POST",
            &format!("/markets/{id}/vote"),
            Some(json!({ "account": account, "outcome": "yes" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/vote"),
        Some(json!({ "account": "alice", "outcome": "no" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "already_voted");

    clock.advance(DAY);
    let (status, body) = send(&app, "POST", &format!("/markets/{id}/resolve"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resolution"]["outcome"], "yes");

    let (status, body) = send(&app, "GET", &format!("/markets/{id}/positions/alice"), None).await;
    assert_eq!(status, StatusCode::OK);
    let claimable = body["claimable"]["raw"].as_u64().unwrap();
    assert!(claimable > 0);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/claim"),
        Some(json!({ "account": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["receipt"]["payout"].as_u64().unwrap(), claimable);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/claim"),
        Some(json!({ "account": "bob" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "no_winning_shares");

    let (status, body) = send(&app, "GET", &format!("/events?market_id={id}&since=0"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["events"].as_array().unwrap().len(), 7);
    assert_eq!(body["events"][0]["type"], "market_created");

    let app_state = state.lock().unwrap();
    assert_eq!(
        app_state.ledger.escrow_balance(),
        app_state.engine.total_pooled() + app_state.admin.accrued_fees()
    );
}

#[tokio::test]
async fn test_error_status_codes() {
    let (app, _, _) = test_app();
    fund(&app, "alice", "10").await;
    let id = create_market(&app).await;

    let (status, body) = send(&app, "GET", "/markets/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "alice", "outcome": "yes", "amount": "1", "min_shares": "1000" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "slippage_exceeded");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "dave", "outcome": "yes", "amount": "1" })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["kind"], "ledger_failure");

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "alice", "outcome": "yes", "amount": "0.0000001" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "validation_error");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/markets/{id}/cancel"),
        Some(json!({ "caller": "alice" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_admin_endpoints() {
    let (app, _, _) = test_app();
    fund(&app, "alice", "100").await;
    let id = create_market(&app).await;

    let (status, _) = send(&app, "POST", "/admin/pause", Some(json!({ "caller": "alice" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", "/admin/pause", Some(json!({ "caller": "owner" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "alice", "outcome": "no", "amount": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "paused");

    // Reads keep working while paused
    let (status, _) = send(&app, "GET", &format!("/markets/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/admin/unpause", Some(json!({ "caller": "owner" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "POST", "/admin/fee", Some(json!({ "caller": "owner", "fee_bps": 900 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "fee_too_high");

    let (status, _) = send(
        &app,
        "POST",
        &format!("/markets/{id}/bet"),
        Some(json!({ "account": "alice", "outcome": "no", "amount": "10" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/admin", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accrued_fees"]["value"], "0.3");
    assert_eq!(body["next_market_id"], 2);

    let (status, body) = send(&app, "POST", "/admin/withdraw-fees", Some(json!({ "caller": "owner" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["withdrawn"]["raw"], 300_000);

    let (status, body) = send(&app, "GET", "/balance/owner", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["balance"]["raw"], 300_000);
}
