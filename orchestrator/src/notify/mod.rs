//! Outbound deployment notifications
//!
//! Fire-and-forget side effects: a delivery failure is logged and swallowed,
//! never affecting the deployment's own outcome.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::target::DeployTarget;

/// Notification options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyOptions {
    /// Chat webhook receiving deployment outcomes
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Posts deployment outcomes to the configured channel.
pub struct Notifier {
    client: Client,
    options: NotifyOptions,
}

impl Notifier {
    pub fn new(options: NotifyOptions) -> Self {
        Self {
            client: Client::new(),
            options,
        }
    }

    pub async fn deployment_succeeded(&self, target: &DeployTarget, version: &str) {
        self.post(serde_json::json!({
            "text": format!("Deployed {} version {}", target, version),
            "status": "success",
        }))
        .await;
    }

    pub async fn deployment_failed(&self, target: &DeployTarget, error: &str) {
        self.post(serde_json::json!({
            "text": format!("Deployment of {} failed: {}", target, error),
            "status": "failure",
        }))
        .await;
    }

    async fn post(&self, payload: serde_json::Value) {
        let Some(url) = &self.options.webhook_url else {
            debug!("No notification webhook configured, skipping");
            return;
        };

        if let Err(e) = self.client.post(url).json(&payload).send().await {
            warn!("Notification delivery failed: {}", e);
        }
    }
}
