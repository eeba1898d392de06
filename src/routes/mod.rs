// Routes module - builds the HTTP router over the shared state

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use crate::app_state::SharedState;
use crate::handlers::*;

pub fn router(state: SharedState) -> Router {
    Router::new()
        // ===== HEALTH CHECK =====
        .route("/", get(health_check))
        .route("/health", get(health_check))

        // ===== MARKET ENDPOINTS =====
        .route("/markets", get(list_markets).post(create_market))
        .route("/markets/:id", get(get_market))
        .route("/markets/:id/prices", get(get_prices))
        .route("/markets/:id/quote", get(get_quote))
        .route("/markets/:id/sell-quote", get(get_sell_quote))
        .route("/markets/:id/positions/:account", get(get_position))

        // ===== TRADING & RESOLUTION =====
        .route("/markets/:id/bet", post(place_bet))
        .route("/markets/:id/sell", post(sell_shares))
        .route("/markets/:id/vote", post(vote_outcome))
        .route("/markets/:id/resolve", post(resolve_market))
        .route("/markets/:id/claim", post(claim_winnings))
        .route("/markets/:id/cancel", post(cancel_market))

        // ===== EVENT FEED =====
        .route("/events", get(get_events))

        // ===== LEDGER ENDPOINTS =====
        .route("/balance/:account", get(get_balance))
        .route("/faucet", post(faucet))

        // ===== ADMIN ENDPOINTS =====
        .route("/admin", get(get_admin))
        .route("/admin/fee", post(set_fee))
        .route("/admin/pause", post(pause))
        .route("/admin/unpause", post(unpause))
        .route("/admin/withdraw-fees", post(withdraw_fees))
        .route("/admin/owner", post(transfer_ownership))

        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
