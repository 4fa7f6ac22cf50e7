use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use sqlx::migrate::Migrator;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paygate::config::Config;
use paygate::db::store::{PgTransactionStore, TransactionStore};
use paygate::processor::GatewayClient;
use paygate::services::purchase::PurchaseFlow;
use paygate::services::refund::RefundFlow;
use paygate::{create_app, db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database pool
    let pool = db::create_pool(&config).await?;

    // Run migrations
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(&pool).await?;
    tracing::info!("Database migrations completed");

    // Processor client
    let gateway = GatewayClient::new(config.processor.clone());
    tracing::info!(
        test_mode = gateway.is_test_mode(),
        "Processor client initialized"
    );

    let store: Arc<dyn TransactionStore> = Arc::new(PgTransactionStore::new(pool));
    let purchases = Arc::new(PurchaseFlow::new(
        gateway.clone(),
        config.public_base_url.clone(),
    ));
    let refunds = Arc::new(RefundFlow::new(gateway.clone(), store.clone()));

    let state = AppState {
        store,
        gateway,
        purchases,
        refunds,
    };

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
