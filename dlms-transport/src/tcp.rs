//! TCP transport implementation

use crate::error::{DlmsError, DlmsResult};
use crate::media::{EventSink, Media, MediaEventSender, ReceiveParameters, TraceDirection};
use crate::receiver::{receive_from_stream, ReceiveBuffer};
use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Default DLMS port (IEC 62056-47)
pub const DEFAULT_DLMS_TCP_PORT: u16 = 4059;

/// Wrapper for TcpStream that implements Debug
struct DebugTcpStream(TcpStream);

impl fmt::Debug for DebugTcpStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpStream").finish()
    }
}

/// TCP transport layer settings
#[derive(Debug, Clone)]
pub struct TcpSettings {
    pub address: SocketAddr,
    /// Timeout for establishing the connection and for each write
    pub timeout: Option<Duration>,
}

impl TcpSettings {
    /// Create new TCP settings
    pub fn new(address: SocketAddr) -> Self {
        Self {
            address,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create TCP settings with timeout
    pub fn with_timeout(address: SocketAddr, timeout: Duration) -> Self {
        Self {
            address,
            timeout: Some(timeout),
        }
    }
}

/// TCP transport layer implementation
#[derive(Debug)]
pub struct TcpTransport {
    stream: Option<DebugTcpStream>,
    settings: TcpSettings,
    pending: ReceiveBuffer,
    events: EventSink,
}

impl TcpTransport {
    /// Create a new TCP transport layer
    pub fn new(settings: TcpSettings) -> Self {
        Self {
            stream: None,
            settings,
            pending: ReceiveBuffer::new(),
            events: EventSink::default(),
        }
    }

    /// Create TCP transport from address string
    pub fn from_address(address: &str) -> DlmsResult<Self> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| DlmsError::InvalidData(format!("Invalid TCP address: {}", e)))?;
        Ok(Self::new(TcpSettings::new(addr)))
    }

    /// Remote address
    pub fn address(&self) -> SocketAddr {
        self.settings.address
    }

    fn stream_mut(&mut self) -> DlmsResult<&mut TcpStream> {
        self.stream
            .as_mut()
            .map(|s| &mut s.0)
            .ok_or_else(|| DlmsError::not_connected("TCP stream not connected"))
    }
}

#[async_trait]
impl Media for TcpTransport {
    async fn open(&mut self) -> DlmsResult<()> {
        if self.stream.is_some() {
            return Err(DlmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let stream = if let Some(timeout) = self.settings.timeout {
            tokio::time::timeout(timeout, TcpStream::connect(self.settings.address))
                .await
                .map_err(|_| DlmsError::Timeout)?
        } else {
            TcpStream::connect(self.settings.address).await
        };
        let stream = stream.inspect_err(|e| self.events.error(e.to_string()))?;

        self.pending.clear();
        self.stream = Some(DebugTcpStream(stream));
        Ok(())
    }

    async fn close(&mut self) -> DlmsResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.0.shutdown().await;
        }
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        let timeout = self.settings.timeout;
        let stream = self.stream_mut()?;
        let result = match timeout {
            Some(timeout) => tokio::time::timeout(timeout, stream.write_all(data))
                .await
                .map_err(|_| DlmsError::Timeout)?,
            None => stream.write_all(data).await,
        };
        if let Err(e) = result {
            self.events.error(e.to_string());
            return Err(DlmsError::Connection(e));
        }
        self.events.trace(TraceDirection::Sent, data);
        Ok(())
    }

    async fn receive(&mut self, params: &mut ReceiveParameters) -> DlmsResult<bool> {
        let stream = self
            .stream
            .as_mut()
            .map(|s| &mut s.0)
            .ok_or_else(|| DlmsError::not_connected("TCP stream not connected"))?;
        match receive_from_stream(stream, &mut self.pending, params).await {
            Ok(true) => {
                self.events.trace(TraceDirection::Received, &params.reply);
                Ok(true)
            }
            Ok(false) => Ok(false),
            Err(e) => {
                self.events.error(e.to_string());
                // The peer is gone; a later open() may reconnect.
                self.stream = None;
                Err(e)
            }
        }
    }

    fn set_event_sink(&mut self, sender: Option<MediaEventSender>) {
        self.events.set(sender);
    }
}
