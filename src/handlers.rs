// HTTP request handlers for the CastBet API

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::{json, Value};
use std::sync::MutexGuard;
use tracing::error;

use crate::app_state::{AppState, SharedState};
use crate::errors::{LedgerError, MarketError};
use crate::market_resolve::markets::{MarketFilter, MarketId};
use crate::market_resolve::escrow::LedgerAdapter;
use crate::models::*;

// ===== ERRORS =====

/// Error response: status code plus a JSON body naming the error kind
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

/// HTTP status for an engine error
pub fn status_for(err: &MarketError) -> StatusCode {
    match err {
        MarketError::Validation(_)
        | MarketError::SlippageExceeded { .. }
        | MarketError::InsufficientShares { .. }
        | MarketError::NoWinningShares(_)
        | MarketError::FeeTooHigh { .. } => StatusCode::BAD_REQUEST,
        MarketError::NotFound(_) => StatusCode::NOT_FOUND,
        MarketError::InvalidState(_)
        | MarketError::MarketNotExpired(_)
        | MarketError::AlreadyVoted(_)
        | MarketError::AlreadyClaimed(_) => StatusCode::CONFLICT,
        MarketError::Unauthorized(_) => StatusCode::FORBIDDEN,
        MarketError::Paused => StatusCode::SERVICE_UNAVAILABLE,
        MarketError::Ledger(LedgerError::InsufficientBalance { .. }) => StatusCode::PAYMENT_REQUIRED,
        MarketError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<MarketError> for ApiError {
    fn from(err: MarketError) -> Self {
        Self {
            status: status_for(&err),
            body: ErrorResponse {
                success: false,
                kind: Some(err.kind()),
                error: err.to_string(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

type ApiResult = Result<Json<Value>, ApiError>;

fn lock(state: &SharedState) -> Result<MutexGuard<'_, AppState>, ApiError> {
    state.lock().map_err(|_| {
        error!("application state lock poisoned");
        ApiError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorResponse {
                success: false,
                kind: None,
                error: "state unavailable".to_string(),
            },
        }
    })
}

// ===== HEALTH =====

pub async fn health_check() -> &'static str {
    "CastBet prediction market ledger - online"
}

// ===== MARKET ENDPOINTS =====

pub async fn list_markets(State(state): State<SharedState>, Query(filter): Query<MarketFilter>) -> ApiResult {
    let app_state = lock(&state)?;
    let now = app_state.now();
    let markets: Vec<MarketView> = app_state
        .engine
        .markets(&filter)
        .into_iter()
        .map(|m| MarketView::new(m, now))
        .collect();
    Ok(Json(json!({ "count": markets.len(), "markets": markets })))
}

pub async fn create_market(State(state): State<SharedState>, Json(payload): Json<CreateMarketRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;
    let (creator, new) = payload.into_parts();
    let market_id = app_state.execute(|engine, ctx| engine.create_market(ctx, &creator, new))?;
    Ok(Json(json!({ "success": true, "market_id": market_id })))
}

pub async fn get_market(State(state): State<SharedState>, Path(id): Path<MarketId>) -> ApiResult {
    let app_state = lock(&state)?;
    let market = app_state.engine.market(id)?;
    Ok(Json(json!(MarketView::new(market, app_state.now()))))
}

pub async fn get_prices(State(state): State<SharedState>, Path(id): Path<MarketId>) -> ApiResult {
    let app_state = lock(&state)?;
    let (price_yes, price_no) = app_state.engine.prices(id)?;
    Ok(Json(json!({
        "market_id": id,
        "price_yes": Amount::from(price_yes),
        "price_no": Amount::from(price_no),
    })))
}

pub async fn get_quote(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Query(query): Query<QuoteQuery>,
) -> ApiResult {
    let app_state = lock(&state)?;
    let amount = decimal_to_units(query.amount)?;
    let quote = app_state.engine.quote_bet(&app_state.admin, id, query.outcome, amount)?;
    Ok(Json(json!({
        "market_id": id,
        "quote": quote,
        "shares": Amount::from(quote.shares),
        "fee": Amount::from(quote.fee),
    })))
}

pub async fn get_sell_quote(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Query(query): Query<SellQuoteQuery>,
) -> ApiResult {
    let app_state = lock(&state)?;
    let shares = decimal_to_units(query.shares)?;
    let quote = app_state.engine.quote_sell(&app_state.admin, id, query.outcome, shares)?;
    Ok(Json(json!({
        "market_id": id,
        "quote": quote,
        "net_return": Amount::from(quote.net_return),
        "fee": Amount::from(quote.fee),
    })))
}

pub async fn get_position(
    State(state): State<SharedState>,
    Path((id, account)): Path<(MarketId, String)>,
) -> ApiResult {
    let app_state = lock(&state)?;
    let position = app_state.engine.position(id, &account)?;
    let value = app_state.engine.position_value(id, &account)?;
    let claimable = app_state.engine.claimable(id, &account)?;
    Ok(Json(json!({
        "market_id": id,
        "account": account,
        "position": position,
        "value": value,
        "claimable": Amount::from(claimable),
    })))
}

// ===== TRADING ENDPOINTS =====

pub async fn place_bet(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(request): Json<BetRequest>,
) -> ApiResult {
    let amount = decimal_to_units(request.amount)?;
    let min_shares = request.min_shares.map(decimal_to_units).transpose()?.unwrap_or(0);

    let mut app_state = lock(&state)?;
    let receipt = app_state.execute(|engine, ctx| {
        engine.place_bet(ctx, &request.account, id, request.outcome, amount, min_shares)
    })?;
    let balance = app_state.ledger.balance(&request.account);
    Ok(Json(json!({
        "success": true,
        "receipt": receipt,
        "shares": Amount::from(receipt.shares),
        "new_balance": Amount::from(balance),
    })))
}

pub async fn sell_shares(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(request): Json<SellRequest>,
) -> ApiResult {
    let shares = decimal_to_units(request.shares)?;
    let min_amount = request.min_amount.map(decimal_to_units).transpose()?.unwrap_or(0);

    let mut app_state = lock(&state)?;
    let receipt = app_state.execute(|engine, ctx| {
        engine.sell_shares(ctx, &request.account, id, request.outcome, shares, min_amount)
    })?;
    let balance = app_state.ledger.balance(&request.account);
    Ok(Json(json!({
        "success": true,
        "receipt": receipt,
        "net_return": Amount::from(receipt.net_return),
        "new_balance": Amount::from(balance),
    })))
}

// ===== RESOLUTION ENDPOINTS =====

pub async fn vote_outcome(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(request): Json<VoteRequest>,
) -> ApiResult {
    let mut app_state = lock(&state)?;
    let receipt = app_state.execute(|engine, ctx| engine.vote_outcome(ctx, &request.account, id, request.outcome))?;
    Ok(Json(json!({ "success": true, "receipt": receipt })))
}

pub async fn resolve_market(State(state): State<SharedState>, Path(id): Path<MarketId>) -> ApiResult {
    let mut app_state = lock(&state)?;
    let resolution = app_state.execute(|engine, ctx| engine.resolve_market(ctx, id))?;
    Ok(Json(json!({ "success": true, "resolution": resolution })))
}

pub async fn claim_winnings(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(request): Json<AccountRequest>,
) -> ApiResult {
    let mut app_state = lock(&state)?;
    let receipt = app_state.execute(|engine, ctx| engine.claim_winnings(ctx, &request.account, id))?;
    let balance = app_state.ledger.balance(&request.account);
    Ok(Json(json!({
        "success": true,
        "receipt": receipt,
        "payout": Amount::from(receipt.payout),
        "new_balance": Amount::from(balance),
    })))
}

pub async fn cancel_market(
    State(state): State<SharedState>,
    Path(id): Path<MarketId>,
    Json(request): Json<CallerRequest>,
) -> ApiResult {
    let mut app_state = lock(&state)?;
    app_state.execute(|engine, ctx| engine.cancel_market(ctx, &request.caller, id))?;
    Ok(Json(json!({ "success": true, "market_id": id })))
}

// ===== EVENT FEED =====

pub async fn get_events(State(state): State<SharedState>, Query(query): Query<EventsQuery>) -> ApiResult {
    let app_state = lock(&state)?;
    let events: Vec<_> = app_state
        .engine
        .events()
        .since(query.since)
        .iter()
        .filter(|r| query.market_id.map_or(true, |id| r.event.market_id() == id))
        .collect();
    let last_seq = app_state.engine.events().last().map_or(0, |r| r.seq);
    Ok(Json(json!({ "last_seq": last_seq, "events": events })))
}

// ===== LEDGER ENDPOINTS =====

pub async fn get_balance(State(state): State<SharedState>, Path(account): Path<String>) -> ApiResult {
    let app_state = lock(&state)?;
    let balance = app_state.ledger.balance(&account);
    Ok(Json(json!({ "account": account, "balance": Amount::from(balance) })))
}

pub async fn faucet(State(state): State<SharedState>, Json(request): Json<FaucetRequest>) -> ApiResult {
    let amount = decimal_to_units(request.amount)?;
    let mut app_state = lock(&state)?;
    let balance = app_state.faucet(&request.account, amount)?;
    Ok(Json(json!({
        "success": true,
        "account": request.account,
        "new_balance": Amount::from(balance),
    })))
}

// ===== ADMIN ENDPOINTS =====

pub async fn get_admin(State(state): State<SharedState>) -> ApiResult {
    let app_state = lock(&state)?;
    let admin = &app_state.admin;
    Ok(Json(json!({
        "owner": admin.owner(),
        "protocol_fee_bps": admin.protocol_fee_bps(),
        "paused": admin.is_paused(),
        "next_market_id": admin.next_market_id(),
        "accrued_fees": Amount::from(admin.accrued_fees()),
        "escrow": Amount::from(app_state.ledger.escrow_balance()),
    })))
}

pub async fn set_fee(State(state): State<SharedState>, Json(request): Json<FeeRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;
    app_state.admin.set_protocol_fee(&request.caller, request.fee_bps)?;
    Ok(Json(json!({ "success": true, "protocol_fee_bps": request.fee_bps })))
}

pub async fn pause(State(state): State<SharedState>, Json(request): Json<CallerRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;
    app_state.admin.pause(&request.caller)?;
    Ok(Json(json!({ "success": true, "paused": true })))
}

pub async fn unpause(State(state): State<SharedState>, Json(request): Json<CallerRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;
    app_state.admin.unpause(&request.caller)?;
    Ok(Json(json!({ "success": true, "paused": false })))
}

pub async fn withdraw_fees(State(state): State<SharedState>, Json(request): Json<CallerRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;
    let AppState { admin, ledger, .. } = &mut *app_state;
    let amount = admin.withdraw_fees(&request.caller, ledger)?;
    Ok(Json(json!({ "success": true, "withdrawn": Amount::from(amount) })))
}

pub async fn transfer_ownership(State(state): State<SharedState>, Json(request): Json<OwnerRequest>) -> ApiResult {
    let mut app_state = lock(&state)?;
    app_state.admin.transfer_ownership(&request.caller, &request.new_owner)?;
    Ok(Json(json!({ "success": true, "owner": request.new_owner })))
}
