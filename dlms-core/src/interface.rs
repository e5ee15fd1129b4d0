//! Link and association level enumerations shared by the transport and the
//! client.

use serde::{Deserialize, Serialize};
use std::fmt;

/// HDLC flag byte, used as the end-of-packet marker on HDLC links
pub const HDLC_FRAME_START_END: u8 = 0x7E;

/// Communication interface (framing) used between client and device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterfaceType {
    /// HDLC framing (IEC 62056-46)
    Hdlc,
    /// IEC 62056-47 wrapper over TCP/UDP
    Wrapper,
    /// IEC 62056-21 mode E optical head followed by HDLC
    HdlcWithModeE,
    /// PLC S-FSK
    Plc,
    /// PLC HDLC
    PlcHdlc,
    /// Wireless M-Bus
    WirelessMBus,
}

impl InterfaceType {
    /// End-of-packet marker for frame-delimited interfaces
    ///
    /// Returns `None` when frame boundaries must be found by counting bytes.
    pub fn end_of_packet(&self) -> Option<u8> {
        match self {
            InterfaceType::Hdlc | InterfaceType::HdlcWithModeE => Some(HDLC_FRAME_START_END),
            _ => None,
        }
    }
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InterfaceType::Hdlc => "HDLC",
            InterfaceType::Wrapper => "WRAPPER",
            InterfaceType::HdlcWithModeE => "HDLC with mode E",
            InterfaceType::Plc => "PLC",
            InterfaceType::PlcHdlc => "PLC HDLC",
            InterfaceType::WirelessMBus => "Wireless M-Bus",
        };
        f.write_str(name)
    }
}

/// Connection state as tracked by the protocol codec
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Nothing is established
    #[default]
    None,
    /// IEC 62056-21 optical handshake done
    Iec,
    /// Link layer (SNRM/UA) established
    Hdlc,
    /// Application association (AARQ/AARE) established
    Dlms,
}

impl ConnectionState {
    /// Check if any logical link is active
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::None)
    }
}

/// Authentication level of the association
///
/// Ordered: everything above `Low` needs the extra HLS step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Authentication {
    #[default]
    None,
    Low,
    High,
    HighMd5,
    HighSha1,
    HighGmac,
    HighSha256,
    HighEcdsa,
}

impl Authentication {
    /// Check if the association needs a high level security handshake
    pub fn requires_hls(&self) -> bool {
        *self > Authentication::Low
    }
}

/// Ciphering applied to xDLMS APDUs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Security {
    #[default]
    None,
    Authentication,
    Encryption,
    AuthenticationEncryption,
}
