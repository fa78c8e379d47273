use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use billing_reconciler::adapters::events::LoggingPaymentEventPublisher;
use billing_reconciler::adapters::memory::InMemoryProcessedEventStore;
use billing_reconciler::adapters::paypal::{PayPalConfig, PayPalWalletAdapter};
use billing_reconciler::adapters::postgres::{run_migrations, PostgresLedger};
use billing_reconciler::adapters::redis::RedisProcessedEventStore;
use billing_reconciler::adapters::stripe::{StripeCardAdapter, StripeConfig};
use billing_reconciler::app::{build_state, router, BillingPorts, BillingSettings};
use billing_reconciler::config::AppConfig;
use billing_reconciler::ports::ProcessedEventStore;

fn exit_with(context: &str, err: impl std::fmt::Display) -> ! {
    eprintln!("{context}: {err}");
    std::process::exit(1);
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn processed_event_store(config: &AppConfig) -> Option<Arc<dyn ProcessedEventStore>> {
    if !config.billing.dedup_enabled {
        return None;
    }
    let Some(redis_config) = &config.redis else {
        return Some(Arc::new(InMemoryProcessedEventStore::new(
            config.billing.local_dedup_ttl(),
        )));
    };

    let client = redis::Client::open(redis_config.url.as_str())
        .unwrap_or_else(|e| exit_with("Redis configuration error", e));
    let conn = tokio::time::timeout(
        redis_config.timeout(),
        client.get_multiplexed_tokio_connection(),
    )
    .await
    .unwrap_or_else(|e| exit_with("Redis connection timed out", e))
    .unwrap_or_else(|e| exit_with("Redis connection error", e));

    Some(Arc::new(RedisProcessedEventStore::new(
        conn,
        redis_config.processed_event_ttl_secs,
        redis_config.timeout(),
    )))
}

#[tokio::main]
async fn main() {
    let config = AppConfig::load().unwrap_or_else(|e| exit_with("Configuration error", e));
    config
        .validate()
        .unwrap_or_else(|e| exit_with("Configuration error", e));
    init_tracing(&config);

    let addr = config
        .server
        .socket_addr()
        .unwrap_or_else(|e| exit_with("Configuration error", e));

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await
        .unwrap_or_else(|e| exit_with("Database connection error", e));
    if config.database.run_migrations {
        run_migrations(&pool)
            .await
            .unwrap_or_else(|e| exit_with("Migration error", e));
        tracing::info!("database migrations applied");
    }

    let ports = BillingPorts {
        ledger: Arc::new(PostgresLedger::new(pool)),
        card_provider: Arc::new(StripeCardAdapter::new(
            StripeConfig::new(config.card.api_key.clone()).with_base_url(&config.card.base_url),
        )),
        wallet_provider: Arc::new(PayPalWalletAdapter::new(
            PayPalConfig::new(&config.wallet.client_id, config.wallet.client_secret.clone())
                .with_base_url(&config.wallet.base_url),
        )),
        publisher: Arc::new(LoggingPaymentEventPublisher::new()),
        processed_events: processed_event_store(&config).await,
    };
    let settings = BillingSettings {
        card_webhook_secret: config.card.webhook_secret.clone(),
        card_webhook_tolerance_secs: config.card.webhook_tolerance_secs,
        wallet_webhook_id: config.wallet.webhook_id.clone(),
        card_plans: config.card.plans(),
        wallet_plans: config.wallet.plans(),
        provider_timeout: config.billing.provider_timeout(),
    };

    let app = router(build_state(ports, settings), config.server.request_timeout());

    tracing::info!(
        %addr,
        environment = ?config.server.environment,
        card_test_mode = config.card.is_test_mode(),
        redis = config.redis.is_some(),
        "starting billing reconciler"
    );

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| exit_with("Bind error", e));
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .unwrap_or_else(|e| exit_with("Server error", e));
}
