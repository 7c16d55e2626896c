//! API server entry point.

use api::Config;
use fulfillment::LoggingNotifier;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{FulfillmentStore, InMemoryFulfillmentStore, PgFulfillmentStore};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

/// Spawns the background TTL sweep and serves the API until shutdown.
async fn serve<S>(store: S, config: Config, metrics_handle: PrometheusHandle)
where
    S: FulfillmentStore + Clone + 'static,
{
    let state = api::create_state(store.clone(), LoggingNotifier::new(), &config);
    let app = api::create_app(state, metrics_handle);

    if config.sweep_interval_secs > 0 {
        let period = std::time::Duration::from_secs(config.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match store.sweep_expired(chrono::Utc::now()).await {
                    Ok(0) => {}
                    Ok(expired) => {
                        metrics::counter!("inventory_swept_total").increment(expired);
                        tracing::info!(expired, "TTL sweep expired assignments");
                    }
                    Err(e) => tracing::error!(error = %e, "TTL sweep failed"),
                }
            }
        });
    }

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("server shut down gracefully");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if config.webhook_secret.is_empty() {
        tracing::warn!("WEBHOOK_SECRET is empty, all webhook deliveries will be rejected");
    }

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the storage backend and run
    match config.database_url.clone() {
        Some(url) => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .connect(&url)
                .await
                .expect("failed to connect to PostgreSQL");
            let store = PgFulfillmentStore::new(pool);
            store.run_migrations().await.expect("migrations failed");
            serve(store, config, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store");
            serve(InMemoryFulfillmentStore::new(), config, metrics_handle).await;
        }
    }
}
