//! Serial port transport implementation

use crate::error::{DlmsError, DlmsResult};
use crate::media::{EventSink, Media, MediaEventSender, ReceiveParameters, TraceDirection};
use crate::receiver::{receive_from_stream, ReceiveBuffer};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_serial::SerialStream;

/// Wrapper for SerialStream that implements Debug
struct DebugSerialStream(SerialStream);

impl fmt::Debug for DebugSerialStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialStream").finish()
    }
}

/// Serial port transport layer settings
#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub port_name: String,
    pub baud_rate: u32,
    pub data_bits: tokio_serial::DataBits,
    pub stop_bits: tokio_serial::StopBits,
    pub parity: tokio_serial::Parity,
    pub flow_control: tokio_serial::FlowControl,
    /// Timeout for each write
    pub timeout: Option<Duration>,
}

impl SerialSettings {
    /// Create new serial settings with 8N1 framing
    pub fn new(port_name: String, baud_rate: u32) -> Self {
        Self {
            port_name,
            baud_rate,
            data_bits: tokio_serial::DataBits::Eight,
            stop_bits: tokio_serial::StopBits::One,
            parity: tokio_serial::Parity::None,
            flow_control: tokio_serial::FlowControl::None,
            timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Create serial settings with timeout
    pub fn with_timeout(port_name: String, baud_rate: u32, timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::new(port_name, baud_rate)
        }
    }

    /// Settings used by IEC 62056-21 optical heads before mode E switches speed
    pub fn optical_probe(port_name: String) -> Self {
        Self {
            data_bits: tokio_serial::DataBits::Seven,
            parity: tokio_serial::Parity::Even,
            ..Self::new(port_name, 300)
        }
    }
}

/// Serial port transport layer implementation
#[derive(Debug)]
pub struct SerialTransport {
    stream: Option<DebugSerialStream>,
    settings: SerialSettings,
    pending: ReceiveBuffer,
    events: EventSink,
}

impl SerialTransport {
    /// Create a new serial transport layer
    pub fn new(settings: SerialSettings) -> Self {
        Self {
            stream: None,
            settings,
            pending: ReceiveBuffer::new(),
            events: EventSink::default(),
        }
    }

    /// Create serial transport with port name and baud rate
    pub fn new_simple(port_name: String, baud_rate: u32) -> Self {
        Self::new(SerialSettings::new(port_name, baud_rate))
    }

    /// Names of the serial ports present on this machine
    pub fn available_ports() -> Vec<String> {
        tokio_serial::available_ports()
            .map(|ports| ports.into_iter().map(|p| p.port_name).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Media for SerialTransport {
    async fn open(&mut self) -> DlmsResult<()> {
        if self.stream.is_some() {
            return Err(DlmsError::Connection(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Connection has already been opened",
            )));
        }

        let builder = tokio_serial::new(&self.settings.port_name, self.settings.baud_rate)
            .data_bits(self.settings.data_bits)
            .stop_bits(self.settings.stop_bits)
            .parity(self.settings.parity)
            .flow_control(self.settings.flow_control);

        let stream = SerialStream::open(&builder).map_err(|e| {
            self.events.error(e.to_string());
            DlmsError::Connection(std::io::Error::other(format!(
                "Failed to open serial port {}: {}",
                self.settings.port_name, e
            )))
        })?;

        self.pending.clear();
        self.stream = Some(DebugSerialStream(stream));
        Ok(())
    }

    async fn close(&mut self) -> DlmsResult<()> {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.0.flush().await;
        }
        self.pending.clear();
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        let stream = self
            .stream
            .as_mut()
            .map(|s| &mut s.0)
            .ok_or_else(|| DlmsError::not_connected("Serial stream not connected"))?;
        let result = match self.settings.timeout {
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
            .ok_or_else(|| DlmsError::not_connected("Serial stream not connected"))?;
        let received = receive_from_stream(stream, &mut self.pending, params)
            .await
            .inspect_err(|e| self.events.error(e.to_string()))?;
        if received {
            self.events.trace(TraceDirection::Received, &params.reply);
        }
        Ok(received)
    }

    fn set_event_sink(&mut self, sender: Option<MediaEventSender>) {
        self.events.set(sender);
    }
}
