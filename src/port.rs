//! Local TCP port availability.

use std::net::{Ipv4Addr, SocketAddr};

use tokio::net::TcpListener;

/// How many ports [`suggest_free_port`] tries before giving up.
pub const SUGGESTION_RANGE: u16 = 100;

/// Whether nothing is listening on `port` on any local interface.
///
/// The check binds and immediately releases the port, so the answer can be
/// stale by the time the caller uses it.
pub async fn is_port_free(port: u16) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    match TcpListener::bind(addr).await {
        Ok(listener) => {
            drop(listener);
            true
        }
        Err(e) => {
            tracing::debug!(port, error = %e, "port is not available");
            false
        }
    }
}

/// First free port after `start`, trying at most [`SUGGESTION_RANGE`] ports.
pub async fn suggest_free_port(start: u16) -> Option<u16> {
    let first = start.checked_add(1)?;
    let last = start.saturating_add(SUGGESTION_RANGE);
    for port in first..=last {
        if is_port_free(port).await {
            return Some(port);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bound_port_is_not_free() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).await.unwrap();
        let port = listener.local_addr().unwrap().port();

        assert!(!is_port_free(port).await);
        drop(listener);
        assert!(is_port_free(port).await);
    }

    #[tokio::test]
    async fn test_suggestion_skips_taken_port() {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0)).await.unwrap();
        let taken = listener.local_addr().unwrap().port();

        let suggestion = suggest_free_port(taken.saturating_sub(1)).await;
        assert_ne!(suggestion, Some(taken));
    }

    #[tokio::test]
    async fn test_suggestion_at_top_of_range() {
        assert_eq!(suggest_free_port(u16::MAX).await, None);
    }
}
