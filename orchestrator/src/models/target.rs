//! Deployment target identification

use serde::{Deserialize, Serialize};

use crate::errors::OrchestratorError;

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Main,
    Staging,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Main => "main",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }

    /// Stable per-environment offset used for port assignment.
    pub fn port_offset(&self) -> u16 {
        match self {
            Environment::Main => 0,
            Environment::Staging => 1,
            Environment::Prod => 2,
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(Environment::Main),
            "staging" => Ok(Environment::Staging),
            "prod" | "production" => Ok(Environment::Prod),
            _ => Err(OrchestratorError::InvalidTarget(format!(
                "unknown environment: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Deployable package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Package {
    Client,
    Server,
}

impl Package {
    pub fn as_str(&self) -> &'static str {
        match self {
            Package::Client => "client",
            Package::Server => "server",
        }
    }
}

impl std::str::FromStr for Package {
    type Err = OrchestratorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "client" => Ok(Package::Client),
            "server" => Ok(Package::Server),
            _ => Err(OrchestratorError::InvalidTarget(format!(
                "unknown package: {}",
                s
            ))),
        }
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of orchestration: an (environment, package) pair.
///
/// Every release directory, current pointer, and ledger file is scoped under
/// exactly one target; operations on different targets never share state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeployTarget {
    pub environment: Environment,
    pub package: Package,
}

impl DeployTarget {
    pub fn new(environment: Environment, package: Package) -> Self {
        Self {
            environment,
            package,
        }
    }

    /// Supervisor service name for this target.
    pub fn service_name(&self) -> String {
        format!("{}-{}", self.package, self.environment)
    }
}

impl std::fmt::Display for DeployTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.environment, self.package)
    }
}
