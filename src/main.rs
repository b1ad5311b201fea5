use anyhow::{Context, Result};
use csvcolumns::{config::Config, server};
use std::{fs, sync::Arc};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) config + logging ─────────────────────────────────────────
    let config = Config::from_env();
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(config.log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();

    info!("Starting csv column aggregation service");

    // ─── 2) staging dir for uploads ──────────────────────────────────
    fs::create_dir_all(&config.staging_dir).with_context(|| {
        format!(
            "creating staging directory {}",
            config.staging_dir.display()
        )
    })?;

    let port = config.port;
    info!(
        staging_dir = %config.staging_dir.display(),
        timeout = ?config.request_timeout,
        field = %config.upload_field,
        "configured"
    );
    info!("Server starting on port {}", port);
    info!("Health check: http://localhost:{}/health", port);
    info!(
        "Aggregate endpoint: POST http://localhost:{}/api/csv/column/{{n}}",
        port
    );

    // ─── 3) serve ────────────────────────────────────────────────────
    let routes = server::routes(Arc::new(config));
    warp::serve(routes).run(([0, 0, 0, 0], port)).await;

    Ok(())
}
