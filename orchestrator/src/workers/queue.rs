//! Automated deployment queue
//!
//! Webhook-triggered requests are serialized through a first-in-first-out
//! queue drained by a single worker loop, so at most one deployment executes
//! at a time across the whole queue. A failed item is reported and never
//! halts processing of subsequent items.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::errors::OrchestratorError;
use crate::models::target::DeployTarget;
use crate::notify::Notifier;
use crate::pipeline::Pipeline;

/// A validated deployment request handed over by the trigger source.
#[derive(Debug, Clone)]
pub struct DeployRequest {
    /// Artifact tarball to promote
    pub artifact: PathBuf,

    /// Target named by the trigger; the artifact's manifest must match
    pub target: Option<DeployTarget>,
}

/// Producer handle for enqueuing deployment requests.
#[derive(Clone)]
pub struct QueueHandle {
    sender: mpsc::UnboundedSender<DeployRequest>,
}

impl QueueHandle {
    /// Enqueue a request; fails only if the worker has stopped.
    pub fn enqueue(&self, request: DeployRequest) -> Result<(), OrchestratorError> {
        self.sender
            .send(request)
            .map_err(|_| OrchestratorError::QueueError("deploy queue worker stopped".to_string()))
    }
}

/// Create the queue: a producer handle and the receiver the worker drains.
pub fn channel() -> (QueueHandle, mpsc::UnboundedReceiver<DeployRequest>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (QueueHandle { sender }, receiver)
}

/// Run the deploy queue worker.
pub async fn run(
    pipeline: Arc<Pipeline>,
    notifier: Arc<Notifier>,
    mut requests: mpsc::UnboundedReceiver<DeployRequest>,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) {
    info!("Deploy queue worker starting...");

    loop {
        let request = tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Deploy queue worker shutting down...");
                return;
            }
            request = requests.recv() => {
                match request {
                    Some(request) => request,
                    None => {
                        info!("Deploy queue closed, worker exiting...");
                        return;
                    }
                }
            }
        };

        info!("Processing queued deployment: {}", request.artifact.display());
        match pipeline
            .promote(&request.artifact, request.target, false)
            .await
        {
            Ok(outcome) => {
                info!("Queued deployment of {} succeeded", outcome.version);
                if let Some(target) = request.target {
                    notifier.deployment_succeeded(&target, &outcome.version).await;
                }
            }
            Err(e) => {
                error!("Queued deployment failed: {}", e);
                if let Some(target) = request.target {
                    notifier.deployment_failed(&target, &e.to_string()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::target::{Environment, Package};

    #[tokio::test]
    async fn test_requests_drain_in_order() {
        let (handle, mut receiver) = channel();

        for n in 0..3 {
            handle
                .enqueue(DeployRequest {
                    artifact: PathBuf::from(format!("/tmp/artifact-{}.tar.gz", n)),
                    target: Some(DeployTarget::new(Environment::Main, Package::Server)),
                })
                .unwrap();
        }

        for n in 0..3 {
            let request = receiver.recv().await.unwrap();
            assert_eq!(
                request.artifact,
                PathBuf::from(format!("/tmp/artifact-{}.tar.gz", n))
            );
        }
    }

    #[tokio::test]
    async fn test_enqueue_after_worker_stop_fails() {
        let (handle, receiver) = channel();
        drop(receiver);

        let result = handle.enqueue(DeployRequest {
            artifact: PathBuf::from("/tmp/a.tar.gz"),
            target: None,
        });
        assert!(matches!(result, Err(OrchestratorError::QueueError(_))));
    }
}
