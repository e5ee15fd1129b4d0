//! UDP transport implementation

use crate::error::{DlmsError, DlmsResult};
use crate::media::{EventSink, Media, MediaEventSender, ReceiveParameters, TraceDirection};
use crate::receiver::ReceiveBuffer;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::Instant;

/// Maximum UDP payload size
pub const MAX_UDP_PAYLOAD_SIZE: usize = 65507;

/// UDP transport layer settings
#[derive(Debug, Clone)]
pub struct UdpSettings {
    pub remote_address: SocketAddr,
    /// Local address to bind; an ephemeral port by default
    pub local_address: SocketAddr,
    /// Timeout for each send
    pub timeout: Option<Duration>,
}

impl UdpSettings {
    /// Create new UDP settings
    pub fn new(remote_address: SocketAddr) -> Self {
        let local_address = if remote_address.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        Self {
            remote_address,
            local_address,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create UDP settings with timeout
    pub fn with_timeout(remote_address: SocketAddr, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(remote_address)
        }
    }
}

/// UDP transport layer implementation
///
/// Datagrams from any address other than the configured remote are dropped.
#[derive(Debug)]
pub struct UdpTransport {
    socket: Option<UdpSocket>,
    settings: UdpSettings,
    pending: ReceiveBuffer,
    events: EventSink,
}

impl UdpTransport {
    /// Create a new UDP transport layer
    pub fn new(settings: UdpSettings) -> Self {
        Self {
            socket: None,
            settings,
            pending: ReceiveBuffer::new(),
            events: EventSink::default(),
        }
    }

    /// Create UDP transport from address string
    pub fn from_address(address: &str) -> DlmsResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| DlmsError::InvalidData(format!("Invalid UDP address: {}", e)))?;
        Ok(Self::new(UdpSettings::new(addr)))
    }

    /// Local address of the bound socket
    pub fn local_address(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

#[async_trait]
impl Media for UdpTransport {
    async fn open(&mut self) -> DlmsResult<()> {
        if self.socket.is_some() {
            return Err(DlmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let socket = UdpSocket::bind(self.settings.local_address)
            .await
            .inspect_err(|e| self.events.error(e.to_string()))?;
        self.pending.clear();
        self.socket = Some(socket);
        Ok(())
    }

    async fn close(&mut self) -> DlmsResult<()> {
        self.socket = None;
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        if data.len() > MAX_UDP_PAYLOAD_SIZE {
            return Err(DlmsError::InvalidData(format!(
                "Frame of {} bytes does not fit in one datagram",
                data.len()
            )));
        }
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| DlmsError::not_connected("UDP socket not connected"))?;
        let target = self.settings.remote_address;
        let result = match self.settings.timeout {
            Some(timeout) => tokio::time::timeout(timeout, socket.send_to(data, target))
                .await
                .map_err(|_| DlmsError::Timeout)?,
            None => socket.send_to(data, target).await,
        };
        if let Err(e) = result {
            self.events.error(e.to_string());
            return Err(DlmsError::Connection(e));
        }
        self.events.trace(TraceDirection::Sent, data);
        Ok(())
    }

    async fn receive(&mut self, params: &mut ReceiveParameters) -> DlmsResult<bool> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| DlmsError::not_connected("UDP socket not connected"))?;
        let deadline = Instant::now() + params.wait_time;
        let mut datagram = vec![0u8; MAX_UDP_PAYLOAD_SIZE];
        loop {
            if self.pending.take_ready(params) {
                self.events.trace(TraceDirection::Received, &params.reply);
                return Ok(true);
            }
            match tokio::time::timeout_at(deadline, socket.recv_from(&mut datagram)).await {
                Err(_) => return Ok(false),
                Ok(Ok((len, from))) => {
                    if from == self.settings.remote_address {
                        self.pending.extend(&datagram[..len]);
                    }
                }
                Ok(Err(e)) => {
                    self.events.error(e.to_string());
                    return Err(DlmsError::Connection(e));
                }
            }
        }
    }

    fn set_event_sink(&mut self, sender: Option<MediaEventSender>) {
        self.events.set(sender);
    }
}
