//! Transport layer module for the DLMS reader
//!
//! This crate provides the [`Media`] abstraction the transaction engine talks
//! to, an exclusive-use handle around it, and media implementations for TCP,
//! UDP and serial communication.

pub mod error;
pub mod media;
mod receiver;
pub mod serial;
pub mod shared;
pub mod tcp;
pub mod udp;

pub use error::{DlmsError, DlmsResult};
pub use media::{
    EventSink, Media, MediaEvent, MediaEventReceiver, MediaEventSender, ReceiveParameters,
    TraceDirection, DEFAULT_WAIT_TIME,
};
pub use serial::{SerialSettings, SerialTransport};
pub use shared::{MediaGuard, SharedMedia};
pub use tcp::{TcpSettings, TcpTransport, DEFAULT_DLMS_TCP_PORT};
pub use udp::{UdpSettings, UdpTransport, MAX_UDP_PAYLOAD_SIZE};
