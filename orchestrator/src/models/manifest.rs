//! Artifact manifest model

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::OrchestratorError;
use crate::models::target::{DeployTarget, Environment, Package};

/// Metadata embedded in a built artifact.
///
/// Read-only input to the deployment pipeline; never mutated after parsing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactManifest {
    /// Environment the artifact was built for
    pub environment: Environment,

    /// Package the artifact was built from
    pub package: Package,

    /// Full commit hash of the build
    pub commit: String,

    /// Build timestamp
    pub timestamp: String,

    /// Base URL for externally hosted static assets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_prefix: Option<String>,

    /// Externally hosted assets, keyed by directory
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub cdn_assets: HashMap<String, Vec<String>>,
}

impl ArtifactManifest {
    /// The target this artifact was built for.
    pub fn target(&self) -> DeployTarget {
        DeployTarget::new(self.environment, self.package)
    }

    /// Guard against deploying an artifact built for a different target.
    pub fn ensure_matches(&self, requested: &DeployTarget) -> Result<(), OrchestratorError> {
        if self.target() != *requested {
            return Err(OrchestratorError::ManifestMismatch(format!(
                "artifact was built for {} but the deployment requested {}",
                self.target(),
                requested
            )));
        }
        Ok(())
    }

    /// Whether the manifest declares externally hosted assets.
    pub fn has_cdn_assets(&self) -> bool {
        self.asset_prefix.is_some() && self.cdn_assets.values().any(|files| !files.is_empty())
    }

    /// Full URLs of all declared assets under the asset prefix.
    pub fn asset_urls(&self) -> Vec<String> {
        let Some(prefix) = &self.asset_prefix else {
            return Vec::new();
        };
        let prefix = prefix.trim_end_matches('/');

        let mut urls = Vec::new();
        for (dir, files) in &self.cdn_assets {
            let dir = dir.trim_matches('/');
            for file in files {
                if dir.is_empty() {
                    urls.push(format!("{}/{}", prefix, file));
                } else {
                    urls.push(format!("{}/{}/{}", prefix, dir, file));
                }
            }
        }
        urls
    }
}
