//! Core types and utilities for the DLMS reader
//!
//! This crate provides the error type, device error codes and the link level
//! enumerations shared by the transport and client crates.

pub mod error;
pub mod error_code;
pub mod hex;
pub mod interface;

pub use error::{DlmsError, DlmsResult};
pub use error_code::ErrorCode;
pub use interface::{
    Authentication, ConnectionState, InterfaceType, Security, HDLC_FRAME_START_END,
};
