use std::net::SocketAddr;
use std::sync::Arc;

use rasayan_api::{app, AppState};
use rasayan_core::directory::OpenSellerDirectory;
use rasayan_order::SettlementEngine;
use rasayan_store::{BroadcastEventSink, DbClient, PgOrderRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rasayan_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = rasayan_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Rasayan settlement API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Config supplies the fee defaults; business_rules rows override them
    let schedule = db
        .fetch_fee_schedule(config.fees.to_schedule())
        .await
        .expect("Failed to load fee schedule");
    tracing::info!(?schedule, "Fee schedule loaded");

    let repo = Arc::new(PgOrderRepository::new(db.pool.clone()));
    let events = Arc::new(BroadcastEventSink::new(256));
    let sellers = Arc::new(OpenSellerDirectory);

    let engine = Arc::new(SettlementEngine::new(repo, events, sellers, schedule));

    let app = app(AppState { engine });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
