use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use overtime_sync::{
    config::Config,
    router,
    services::{KvStore, MemoryStore, RedisService},
    AppState,
};

#[derive(Parser)]
#[command(name = "overtime-server")]
#[command(about = "Account and overtime-data API backed by Redis")]
struct Args {
    /// Keep everything in process memory instead of Redis (development only)
    #[arg(long)]
    memory: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize basic tracing subscriber
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let config = Config::load().context("Failed to load configuration")?;

    let kv: Arc<dyn KvStore> = if args.memory {
        tracing::warn!("Using in-memory store; data is lost on exit");
        Arc::new(MemoryStore::new())
    } else {
        let url = config
            .redis_url()
            .context("Sentinel enabled but redis.sentinel_url is not configured")?;
        let client = redis::Client::open(url).context("Failed to connect to Redis")?;
        Arc::new(RedisService::new(Arc::new(client)))
    };

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = router(AppState::new(kv, config));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
