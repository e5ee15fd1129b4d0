//! Media abstraction used by the transaction engine
//!
//! A media is a physical channel to one meter (TCP socket, UDP socket or
//! serial port). The engine only sends whole frames and asks for bytes back
//! with [`Media::receive`]; it never reads from the channel directly.

use crate::error::DlmsResult;
use async_trait::async_trait;
use dlms_core::hex::to_hex;
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;

/// Default time to wait for a reply
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_millis(5000);

/// Parameters of a single receive call
///
/// A receive succeeds once at least `count` bytes (minimum one) are
/// available and, when `eop` is set, the marker byte has been seen at or
/// after offset `count - 1`. The received bytes are stored in `reply`.
#[derive(Debug, Clone)]
pub struct ReceiveParameters {
    /// End-of-packet marker for frame-delimited interfaces
    pub eop: Option<u8>,
    /// Number of bytes expected
    pub count: usize,
    /// Return everything that is buffered instead of stopping at the boundary
    pub all_data: bool,
    /// How long to wait before the receive is reported as not succeeded
    pub wait_time: Duration,
    /// Bytes received by the last successful call
    pub reply: Vec<u8>,
}

impl ReceiveParameters {
    /// Create receive parameters
    pub fn new(eop: Option<u8>, count: usize, wait_time: Duration) -> Self {
        Self {
            eop,
            count,
            all_data: true,
            wait_time,
            reply: Vec::new(),
        }
    }

    /// Take the bytes of the last successful receive
    pub fn take_reply(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.reply)
    }
}

impl Default for ReceiveParameters {
    fn default() -> Self {
        Self::new(None, 0, DEFAULT_WAIT_TIME)
    }
}

/// Direction of a traced frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceDirection {
    Sent,
    Received,
}

/// Event reported by a media outside the request/reply flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// Bytes went over the wire
    Trace {
        direction: TraceDirection,
        data: Vec<u8>,
    },
    /// An I/O failure was seen by the media
    Error(String),
}

impl fmt::Display for MediaEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaEvent::Trace { direction: TraceDirection::Sent, data } => {
                write!(f, "TX: {}", to_hex(data))
            }
            MediaEvent::Trace { direction: TraceDirection::Received, data } => {
                write!(f, "RX: {}", to_hex(data))
            }
            MediaEvent::Error(message) => write!(f, "Error: {}", message),
        }
    }
}

/// Sending half of a media event channel
pub type MediaEventSender = mpsc::UnboundedSender<MediaEvent>;

/// Receiving half of a media event channel
pub type MediaEventReceiver = mpsc::UnboundedReceiver<MediaEvent>;

/// Optional event sink owned by a media implementation
///
/// Emitting never blocks; events are dropped when nobody listens.
#[derive(Debug, Default, Clone)]
pub struct EventSink {
    sender: Option<MediaEventSender>,
}

impl EventSink {
    /// Replace the channel events are delivered to
    pub fn set(&mut self, sender: Option<MediaEventSender>) {
        self.sender = sender;
    }

    /// Check if a listener is installed
    pub fn is_set(&self) -> bool {
        self.sender.is_some()
    }

    pub fn trace(&self, direction: TraceDirection, data: &[u8]) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(MediaEvent::Trace {
                direction,
                data: data.to_vec(),
            });
        }
    }

    pub fn error(&self, message: impl Into<String>) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(MediaEvent::Error(message.into()));
        }
    }
}

/// Physical channel to a meter
#[async_trait]
pub trait Media: Send {
    /// Open the channel
    async fn open(&mut self) -> DlmsResult<()>;

    /// Close the channel. Closing a closed media is not an error.
    async fn close(&mut self) -> DlmsResult<()>;

    /// Check if the channel is open
    fn is_open(&self) -> bool;

    /// Send one frame
    async fn send(&mut self, data: &[u8]) -> DlmsResult<()>;

    /// Wait for bytes as described by `params`
    ///
    /// # Returns
    /// `Ok(true)` with the bytes in `params.reply`, or `Ok(false)` when
    /// `params.wait_time` elapsed first. A timeout is not an error.
    ///
    /// # Errors
    /// Returns error if the channel is closed or fails.
    async fn receive(&mut self, params: &mut ReceiveParameters) -> DlmsResult<bool>;

    /// Install or remove the channel used to report trace and error events
    fn set_event_sink(&mut self, _sender: Option<MediaEventSender>) {}
}
