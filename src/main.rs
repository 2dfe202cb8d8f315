use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod config;
mod models;
mod services;
mod store;
mod utils;

use crate::auth::jwt::JwtManager;
use crate::auth::refresh::RefreshTokenStore;
use crate::config::AppConfig;
use crate::services::ledger::Ledger;
use crate::services::matching::MatchingEngine;
use crate::services::positions::PositionStore;
use crate::services::settlement::SettlementService;
use crate::services::txn_log::TxnLog;
use crate::store::EntityStore;

pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<EntityStore>,
    pub ledger: Arc<Ledger>,
    pub positions: Arc<PositionStore>,
    pub txn_log: Arc<TxnLog>,
    pub engine: Arc<MatchingEngine>,
    pub settlement: Arc<SettlementService>,
    pub jwt: JwtManager,
    pub refresh_tokens: RefreshTokenStore,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predix_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = AppConfig::load()?;

    tracing::info!("Starting Predix Backend v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Environment: {}", config.environment);

    // Wire up the trading engine
    let store = Arc::new(EntityStore::new());
    let txn_log = Arc::new(TxnLog::new());
    let ledger = Arc::new(Ledger::new(txn_log.clone()));
    let positions = Arc::new(PositionStore::new());
    let engine = Arc::new(MatchingEngine::new(
        store.clone(),
        ledger.clone(),
        positions.clone(),
        txn_log.clone(),
    ));
    tracing::info!("Matching engine initialized");

    let settlement = Arc::new(SettlementService::new(
        store.clone(),
        ledger.clone(),
        positions.clone(),
        txn_log.clone(),
        engine.clone(),
    ));
    tracing::info!("Settlement service initialized");

    let jwt = JwtManager::new(&config.jwt_secret, config.access_token_ttl_secs);
    let refresh_tokens = RefreshTokenStore::new(config.refresh_token_ttl_secs);
    if config.is_auth_disabled() {
        tracing::warn!("Auth is DISABLED - requests run as the X-Test-User header");
    }

    // Fill audit worker: logs every execution the engine broadcasts
    let mut trade_receiver = engine.subscribe_trades();
    tokio::spawn(async move {
        tracing::info!("Fill audit worker started");

        loop {
            match trade_receiver.recv().await {
                Ok(trade) => {
                    tracing::info!(
                        market = %trade.market_id,
                        price = %trade.price,
                        quantity = trade.quantity,
                        buyer = %trade.buyer_id,
                        seller = %trade.seller_id,
                        "fill"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Fill audit lagged {} trade events", n);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Trade channel closed, stopping fill audit worker");
                    break;
                }
            }
        }
    });

    // Build application state
    let state = Arc::new(AppState {
        config: config.clone(),
        store,
        ledger,
        positions,
        txn_log,
        engine,
        settlement,
        jwt,
        refresh_tokens,
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api::routes::create_router(state.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
