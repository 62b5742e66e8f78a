//! Sampled verification of externally hosted assets
//!
//! Probing every declared asset would be unbounded, so a small fixed-size
//! random subset is checked instead; every sampled probe must succeed.

use rand::seq::IndexedRandom;
use reqwest::Client;
use tracing::{debug, info};

use crate::errors::{HealthPhase, OrchestratorError};
use crate::models::manifest::ArtifactManifest;

/// Probe a random sample of the manifest's declared assets for existence.
pub async fn sampled_asset_check(
    client: &Client,
    manifest: &ArtifactManifest,
    sample_size: usize,
    probe_retries: u32,
) -> Result<(), OrchestratorError> {
    let urls = manifest.asset_urls();
    if urls.is_empty() {
        return Ok(());
    }

    let amount = sample_size.min(urls.len());
    let sample: Vec<&String> = urls.choose_multiple(&mut rand::rng(), amount).collect();
    info!(
        "Asset health check: sampling {} of {} declared assets",
        sample.len(),
        urls.len()
    );

    for url in sample {
        if !probe_exists(client, url, probe_retries).await {
            return Err(OrchestratorError::health(
                HealthPhase::Assets,
                format!("asset not reachable: {}", url),
            ));
        }
    }

    Ok(())
}

/// Existence probe with a small fixed number of retries.
async fn probe_exists(client: &Client, url: &str, retries: u32) -> bool {
    for attempt in 0..=retries {
        match client.head(url).send().await {
            Ok(response) if response.status().is_success() => return true,
            Ok(response) => debug!(
                "Asset probe {} attempt {} returned {}",
                url,
                attempt + 1,
                response.status()
            ),
            Err(e) => debug!("Asset probe {} attempt {} failed: {}", url, attempt + 1, e),
        }
    }
    false
}
