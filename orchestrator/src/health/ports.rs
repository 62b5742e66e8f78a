//! Scratch port selection

use tokio::net::TcpListener;

use crate::errors::{HealthPhase, OrchestratorError};

/// Find the first free port in an inclusive range by probing binds.
pub async fn find_free_port(start: u16, end: u16) -> Result<u16, OrchestratorError> {
    for port in start..=end {
        if TcpListener::bind(("127.0.0.1", port)).await.is_ok() {
            return Ok(port);
        }
    }

    Err(OrchestratorError::health(
        HealthPhase::Isolated,
        format!("no free scratch port in {}..={}", start, end),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_returns_port_in_range() {
        let port = find_free_port(42100, 42199).await.unwrap();
        assert!((42100..=42199).contains(&port));
    }

    #[tokio::test]
    async fn test_skips_occupied_port() {
        let listener = TcpListener::bind(("127.0.0.1", 42300)).await.unwrap();
        let port = find_free_port(42300, 42310).await.unwrap();
        assert_ne!(port, 42300);
        drop(listener);
    }
}
