//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use api::{LocalServices, create_app, create_state, start_consumers};
use domain::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use messaging::InMemoryBus;
use metrics_exporter_prometheus::PrometheusHandle;
use projections::InMemorySmsGateway;
use sqlx::postgres::PgPoolOptions;
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

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    let json = config.log_format == LogFormat::Json;
    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Pick the order store
    match config.database_url.clone() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&url)
                .await
                .expect("failed to connect to database");
            let repository = PostgresOrderRepository::new(pool);
            repository
                .run_migrations()
                .await
                .expect("failed to run migrations");
            tracing::info!("using PostgreSQL order repository");
            run(repository, config, metrics_handle).await;
        }
        None => {
            tracing::info!("DATABASE_URL not set, keeping orders in memory");
            run(InMemoryOrderRepository::new(), config, metrics_handle).await;
        }
    }
}

async fn run<R: OrderRepository + Clone + 'static>(
    repository: R,
    config: Config,
    metrics_handle: PrometheusHandle,
) {
    // 4. Wire services, publisher and consumers
    let bus = InMemoryBus::with_retention(config.bus_partitions, config.bus_retention);
    let services = LocalServices::with_sample_data();
    let state = create_state(repository.clone(), &services, Arc::new(bus.clone()), &config);
    let consumers = start_consumers(&bus, repository, Arc::new(InMemorySmsGateway::new()))
        .await
        .expect("failed to start event consumers");

    // 5. Build the application
    let app = create_app(state.clone(), metrics_handle);

    // 6. Start server
    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // 7. Drain queued events, then stop listening
    state.orchestrator.publisher().shutdown().await;
    consumers.shutdown().await;

    tracing::info!("server shut down gracefully");
}
