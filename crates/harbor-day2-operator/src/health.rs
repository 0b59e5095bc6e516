//! Waiting for the instance to come up.

use std::time::Duration;

use harbor_day2_api::RegistryClient;
use tracing::{debug, info};

/// Polls the health endpoint every `interval` until it reports healthy.
///
/// Unreachable or erroring instances count as not yet healthy. There is no
/// upper bound on the wait.
pub async fn wait_until_healthy(client: &dyn RegistryClient, interval: Duration) -> u32 {
    let mut attempts = 0;
    loop {
        attempts += 1;
        match client.health().await {
            Ok(health) if health.is_healthy() => {
                info!(attempts, "Harbor is healthy");
                return attempts;
            }
            Ok(health) => {
                let unhealthy: Vec<&str> = health
                    .components
                    .iter()
                    .filter(|c| !c.status.eq_ignore_ascii_case("healthy"))
                    .map(|c| c.name.as_str())
                    .collect();
                info!(status = %health.status, ?unhealthy, "Waiting for Harbor to become healthy");
            }
            Err(e) => {
                debug!(error = %e, "Health check failed");
                info!("Waiting for Harbor to become reachable");
            }
        }
        tokio::time::sleep(interval).await;
    }
}
