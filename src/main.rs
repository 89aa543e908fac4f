use anyhow::{Context, Result};
use nope::config::Config;
use nope::server::Server;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let config = Config::load();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("nope={},tower_http=debug", config.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting nope service");
    tracing::info!(
        "Configuration: bind_addr={}, excuses_path={}, rate={}/min, burst={}",
        config.bind_addr,
        config.excuses_path.display(),
        config.requests_per_minute,
        config.burst
    );

    // Excuses are loaded before anything is bound; failure exits non-zero.
    let server = Server::bind(config)
        .await
        .context("Failed to start server")?;

    server.run().await.context("Server error")?;

    Ok(())
}
