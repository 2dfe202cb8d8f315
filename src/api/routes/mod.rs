use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::auth::middleware::auth_middleware;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/events", get(handlers::event::list_events))
        .route("/events/:event_id", get(handlers::event::get_event))
        .route("/markets", get(handlers::market::list_markets))
        .route("/markets/:market_id", get(handlers::market::get_market))
        .route(
            "/orders/market/:market_id/book",
            get(handlers::order::get_market_book),
        )
        .route(
            "/wallets/user/:user_id/balance",
            get(handlers::wallet::get_balance),
        )
        .route(
            "/wallets/user/:user_id/transactions",
            get(handlers::wallet::get_transactions),
        );

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/auth/logout", post(handlers::auth::logout))
        // Orders
        .route("/orders", post(handlers::order::create_order))
        .route("/orders/:order_id", get(handlers::order::get_order))
        .route(
            "/orders/:order_id/cancel",
            post(handlers::order::cancel_order),
        )
        // Events & markets
        .route("/events", post(handlers::event::create_event))
        .route("/markets", post(handlers::market::create_market))
        .route(
            "/markets/:market_id/match",
            post(handlers::market::trigger_match),
        )
        .route(
            "/markets/:market_id/settle",
            post(handlers::market::settle_market),
        )
        .route(
            "/markets/:market_id/suspend",
            post(handlers::market::suspend_market),
        )
        .route(
            "/markets/:market_id/resume",
            post(handlers::market::resume_market),
        )
        // Wallets
        .route("/wallets/deposit", post(handlers::wallet::deposit))
        .route("/wallets/withdraw", post(handlers::wallet::withdraw))
        // Account
        .route("/account/orders", get(handlers::account::get_orders))
        .route("/account/positions", get(handlers::account::get_positions))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new().merge(public_routes).merge(protected_routes)
}
