//! Connectionless UDP sender for per-cycle payloads

use crate::config::NetworkSettings;
use crate::error::{Result, TrackerError};
use serde::Serialize;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

/// Sends one JSON datagram per call to a fixed destination.
///
/// The socket is bound once. Send failures are returned to the caller and
/// leave the sender usable for the next cycle.
pub struct UdpSender {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpSender {
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let target = (host, port)
            .to_socket_addrs()
            .map_err(|e| TrackerError::transport(format!("cannot resolve {}:{}: {}", host, port, e)))?
            .next()
            .ok_or_else(|| TrackerError::transport(format!("no address for {}:{}", host, port)))?;

        let bind_addr = if target.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };
        let socket = UdpSocket::bind(bind_addr)
            .map_err(|e| TrackerError::transport(format!("cannot bind UDP socket: {}", e)))?;

        log::info!("UDP sender targeting {}", target);
        Ok(Self { socket, target })
    }

    pub fn from_settings(settings: &NetworkSettings) -> Result<Self> {
        Self::new(&settings.host, settings.port)
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }

    /// Serialize `payload` as JSON and send it as a single datagram
    pub fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<usize> {
        let bytes = serde_json::to_vec(payload)?;
        self.socket
            .send_to(&bytes, self.target)
            .map_err(|e| TrackerError::transport(format!("send to {} failed: {}", self.target, e)))
    }
}
