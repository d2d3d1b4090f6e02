use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};

mod app;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "dailybrief_server=info,dailybrief_scheduler=info,tower_http=debug".into()
            }),
        )
        .init();

    // load config: explicit path via DAILYBRIEF_CONFIG > ~/.dailybrief/dailybrief.toml
    let config_path = std::env::var("DAILYBRIEF_CONFIG").ok();
    let config = dailybrief_core::config::DailybriefConfig::load(config_path.as_deref())
        .unwrap_or_else(|e| {
            warn!("Config load failed ({}), using defaults", e);
            dailybrief_core::config::DailybriefConfig::default()
        });

    let bind = config.server.bind.clone();
    let port = config.server.port;

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    let store = dailybrief_store::SqliteUserStore::new(db)?;
    info!("database migrations complete");

    // summary collaborator: external webhook service, or a logging
    // placeholder when nothing is configured
    let generator: Arc<dyn dailybrief_scheduler::SummaryGenerator> =
        match config.summary.endpoint_url.clone() {
            Some(url) => {
                info!(endpoint = %url, "summary generator: webhook");
                Arc::new(dailybrief_scheduler::WebhookSummarizer::new(url))
            }
            None => {
                warn!("no summary endpoint configured, fires will be logged but not delivered");
                Arc::new(dailybrief_scheduler::NullSummarizer)
            }
        };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let scheduler = dailybrief_scheduler::Scheduler::new(
        store,
        generator,
        &config.scheduler,
        shutdown_rx.clone(),
    );

    // catch up missed schedules, arm everyone, keep the sweep running
    scheduler.start().await?;

    // anti-idle self-ping, production deployments only
    if config.heartbeat.enabled {
        match config.server.public_url.clone() {
            Some(public_url) => {
                tokio::spawn(dailybrief_scheduler::heartbeat::run_loop(
                    config.heartbeat.clone(),
                    public_url,
                    shutdown_rx,
                ));
            }
            None => warn!("heartbeat enabled but server.public_url is not set, skipping"),
        }
    }

    let state = Arc::new(app::AppState {
        scheduler: scheduler.clone(),
    });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!(armed_jobs = scheduler.registry().len(), "Dailybrief listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    // signal sweep and heartbeat loops to stop
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
