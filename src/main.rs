use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use lagview::config::Config;
use lagview::dashboard;
use lagview::MonitorEngine;

// ========================================
// MAIN ENTRY POINT
// ========================================

#[tokio::main]
async fn main() {
    let config = Config::global();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&config.server.log_level)
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!(
        brokers = %config.kafka.brokers,
        refresh_ms = config.monitor.refresh_interval_ms,
        "lagview starting"
    );

    let engine = MonitorEngine::new(config);
    engine.scheduler.start();

    let app = dashboard::router(engine, &config.server.cors_origin);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    info!(%addr, "dashboard listening");

    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("server error: {}", e);
        std::process::exit(1);
    }
}
