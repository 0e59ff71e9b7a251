//! Connection to a client during the handshake

use crate::error::PeerError;
use crate::types::Frame;
use async_trait::async_trait;
use std::time::Duration;

/// Handle to the client side of a connection
///
/// The router hands one of these to an authenticator so it can run a
/// challenge-response exchange before the session exists.
#[async_trait]
pub trait Peer: Send + Sync {
    /// Send a frame to the client
    async fn send(&self, frame: Frame) -> Result<(), PeerError>;

    /// Wait for the next frame from the client
    async fn recv(&self) -> Result<Frame, PeerError>;

    /// Wait for the next frame, giving up after `timeout`
    async fn recv_timeout(&self, timeout: Duration) -> Result<Frame, PeerError> {
        match tokio::time::timeout(timeout, self.recv()).await {
            Ok(frame) => frame,
            Err(_) => Err(PeerError::Timeout(timeout)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Dict;

    // Peer that never answers
    struct SilentPeer;

    #[async_trait]
    impl Peer for SilentPeer {
        async fn send(&self, _frame: Frame) -> Result<(), PeerError> {
            Ok(())
        }

        async fn recv(&self) -> Result<Frame, PeerError> {
            std::future::pending().await
        }
    }

    // Peer that answers immediately
    struct EchoPeer;

    #[async_trait]
    impl Peer for EchoPeer {
        async fn send(&self, _frame: Frame) -> Result<(), PeerError> {
            Ok(())
        }

        async fn recv(&self) -> Result<Frame, PeerError> {
            Ok(Frame::authenticate("secret", Dict::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_recv_timeout_expires() {
        let result = SilentPeer.recv_timeout(Duration::from_secs(5)).await;
        assert_eq!(result, Err(PeerError::Timeout(Duration::from_secs(5))));
    }

    #[tokio::test]
    async fn test_recv_timeout_returns_frame() {
        let frame = EchoPeer.recv_timeout(Duration::from_secs(5)).await.unwrap();
        assert_eq!(frame.kind(), "AUTHENTICATE");
    }
}
