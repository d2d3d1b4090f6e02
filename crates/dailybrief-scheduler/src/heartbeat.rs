//! Liveness self-ping.
//!
//! Hosting platforms that suspend idle processes would freeze every armed
//! timer with them. Pinging our own public `/ping` endpoint on an interval
//! keeps the process classified as active. Purely an anti-idle measure:
//! failures are logged and never affect scheduling.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use dailybrief_core::config::HeartbeatConfig;

/// Ping loop. Spawn only in deployments where the platform throttles idle
/// processes (config `heartbeat.enabled`). Stops on the shutdown signal.
pub async fn run_loop(config: HeartbeatConfig, public_url: String, mut shutdown: watch::Receiver<bool>) {
    let client = reqwest::Client::new();
    let target = format!("{}/ping", public_url.trim_end_matches('/'));
    let mut interval = tokio::time::interval(Duration::from_secs(config.interval_secs));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(%target, interval_secs = config.interval_secs, "heartbeat pinger started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                let first = ping(&client, &target).await;
                let Err(e) = first else { continue };
                debug!(%target, error = %e, "heartbeat ping failed — retrying once");
                tokio::time::sleep(Duration::from_secs(config.retry_delay_secs)).await;
                if let Err(e) = ping(&client, &target).await {
                    warn!(%target, error = %e, "heartbeat ping failed twice");
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("heartbeat pinger shutting down");
                    break;
                }
            }
        }
    }
}

/// Any HTTP response counts as liveness; only transport failures are errors.
async fn ping(client: &reqwest::Client, url: &str) -> reqwest::Result<()> {
    client.get(url).send().await.map(|_| ())
}
