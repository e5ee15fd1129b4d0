//! Protocol codec boundary
//!
//! The reader does not know how DLMS frames, APDUs or COSEM data are
//! encoded. Everything protocol specific goes through [`Codec`]: it builds
//! the outbound blocks, parses the bytes coming back into a [`ReplyData`],
//! applies decoded values onto targets and tracks the connection state.

use crate::reply::ReplyData;
use bytes::BytesMut;
use dlms_core::{Authentication, ConnectionState, DlmsResult, InterfaceType, Security};
use std::fmt;
use std::path::Path;

/// Ordered outbound frames of one logical request
pub type Blocks = Vec<Vec<u8>>;

/// Attribute index of the profile generic buffer
pub const PROFILE_GENERIC_BUFFER: u8 = 2;

/// Attribute index of the profile generic capture objects (columns)
pub const PROFILE_GENERIC_CAPTURE_OBJECTS: u8 = 3;

/// Attribute index of the number of captured profile entries
pub const PROFILE_GENERIC_ENTRIES_IN_USE: u8 = 7;

/// Attribute index of the profile generic capacity
pub const PROFILE_GENERIC_PROFILE_ENTRIES: u8 = 8;

/// Compact data attributes read during a full readout, in order:
/// capture objects, template description, buffer
pub const COMPACT_DATA_ATTRIBUTES: [u8; 3] = [3, 5, 2];

/// Catalog objects grouped the way a full readout visits them
#[derive(Debug, Clone, PartialEq)]
pub struct ReadoutPlan<T> {
    /// Register-like objects and the index of their scaler and unit attribute
    pub scalers_and_units: Vec<(T, u8)>,
    pub profiles: Vec<T>,
    pub compact_data: Vec<T>,
    /// Every object except profile generics, read with
    /// [`Codec::attributes_to_read`]
    pub objects: Vec<T>,
}

impl<T> Default for ReadoutPlan<T> {
    fn default() -> Self {
        Self {
            scalers_and_units: Vec::new(),
            profiles: Vec::new(),
            compact_data: Vec::new(),
            objects: Vec::new(),
        }
    }
}

/// Ciphering material of a secured association
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CipheringInfo {
    pub system_title: Vec<u8>,
    pub authentication_key: Vec<u8>,
    pub block_cipher_key: Vec<u8>,
    /// Empty when no dedicated key is in use
    pub dedicated_key: Vec<u8>,
}

/// Encoder/decoder the transaction engine drives
///
/// # Parsing contract
/// [`Codec::parse`] consumes complete units from the front of the rolling
/// buffer and reports:
/// - `Ok(true)` when `reply` holds a complete unit (possibly with
///   `more_data` or `streaming` set, or a nonzero error code),
/// - `Ok(false)` when more bytes are needed; a complete unsolicited
///   notification may have been stored in `notify` meanwhile,
/// - `Err` when the bytes cannot be decoded.
pub trait Codec: Send {
    /// COSEM object as addressed by the caller
    type Target: fmt::Display + Send;
    /// Decoded value
    type Value: fmt::Debug + Send;
    /// Timestamp used for range reads
    type DateTime: Send + Sync;

    // ---- state accessors ----

    fn interface_type(&self) -> InterfaceType;

    fn connection_state(&self) -> ConnectionState;

    /// Check if the device uses a pre-established association (no AARQ)
    fn pre_established(&self) -> bool {
        false
    }

    fn authentication(&self) -> Authentication;

    fn security(&self) -> Security {
        Security::None
    }

    /// Conformance block agreed in the association response
    fn negotiated_conformance(&self) -> u32 {
        0
    }

    /// Keys and system title, when the association is ciphered
    fn ciphering(&self) -> Option<CipheringInfo> {
        None
    }

    // ---- capability checks ----

    fn can_read(&self, target: &Self::Target, index: u8) -> bool;

    fn can_write(&self, target: &Self::Target, index: u8) -> bool;

    fn can_invoke(&self, target: &Self::Target, index: u8) -> bool;

    // ---- request builders ----

    /// Link setup frame (SNRM), if the interface needs one
    fn link_setup_request(&mut self) -> DlmsResult<Option<Vec<u8>>> {
        Ok(None)
    }

    /// Association request (AARQ)
    fn association_request(&mut self) -> DlmsResult<Blocks>;

    /// High level security reply-to-challenge, sent after the AARE
    fn handshake_request(&mut self) -> DlmsResult<Blocks> {
        Ok(Vec::new())
    }

    /// Continuation request asking the device for the next block
    fn receiver_ready(&mut self, reply: &ReplyData<Self::Value>) -> DlmsResult<Vec<u8>>;

    fn release_request(&mut self) -> DlmsResult<Blocks>;

    /// Disconnect frame (DISC), if the interface needs one
    fn disconnect_request(&mut self) -> DlmsResult<Option<Vec<u8>>>;

    fn read_request(&mut self, target: &Self::Target, index: u8) -> DlmsResult<Blocks>;

    fn read_list_request(&mut self, list: &[(Self::Target, u8)]) -> DlmsResult<Blocks>;

    fn write_request(&mut self, target: &Self::Target, index: u8) -> DlmsResult<Blocks>;

    fn method_request(
        &mut self,
        target: &Self::Target,
        index: u8,
        argument: Self::Value,
    ) -> DlmsResult<Blocks>;

    fn read_rows_by_entry_request(
        &mut self,
        target: &Self::Target,
        index: u32,
        count: u32,
    ) -> DlmsResult<Blocks>;

    fn read_rows_by_range_request(
        &mut self,
        target: &Self::Target,
        start: &Self::DateTime,
        end: &Self::DateTime,
    ) -> DlmsResult<Blocks>;

    /// Request for the association view (object list)
    fn objects_request(&mut self) -> DlmsResult<Blocks>;

    // ---- incremental parser ----

    /// Number of bytes to wait for when the interface has no frame marker
    fn frame_size(&self, buffer: &[u8]) -> usize;

    fn parse(
        &mut self,
        buffer: &mut BytesMut,
        reply: &mut ReplyData<Self::Value>,
        notify: &mut ReplyData<Self::Value>,
    ) -> DlmsResult<bool>;

    // ---- response appliers ----

    /// Store a read value on the target and return it in its typed form
    fn apply_value(
        &mut self,
        target: &mut Self::Target,
        index: u8,
        value: Option<Self::Value>,
    ) -> DlmsResult<Self::Value>;

    /// Store list read values on their targets, in order
    fn apply_values(
        &mut self,
        list: &mut [(Self::Target, u8)],
        values: Vec<Self::Value>,
    ) -> DlmsResult<()>;

    /// Split a structured value (array or list reply) into its elements
    fn unpack_list(&self, value: Self::Value) -> DlmsResult<Vec<Self::Value>>;

    fn parse_link_setup_response(&mut self, _data: &[u8]) -> DlmsResult<()> {
        Ok(())
    }

    fn parse_association_response(&mut self, data: &[u8]) -> DlmsResult<()>;

    fn parse_handshake_response(&mut self, _data: &[u8]) -> DlmsResult<()> {
        Ok(())
    }

    // ---- object catalog ----

    /// Replace the object catalog with the one in the association view reply
    ///
    /// # Returns
    /// Number of objects in the catalog
    fn parse_objects(&mut self, data: &[u8]) -> DlmsResult<usize>;

    /// Replace the object catalog with a cached copy
    ///
    /// # Returns
    /// Number of objects loaded
    fn load_objects(&mut self, path: &Path) -> DlmsResult<usize>;

    fn save_objects(&self, path: &Path) -> DlmsResult<()>;

    /// Attribute indexes worth reading during a readout
    fn attributes_to_read(&self, _target: &Self::Target) -> Vec<u8> {
        Vec::new()
    }

    // ---- full readout ----

    /// Group the current catalog for [`DlmsReader::read_all`](crate::DlmsReader::read_all)
    fn readout_plan(&self) -> ReadoutPlan<Self::Target> {
        ReadoutPlan::default()
    }

    /// Check if a profile generic has capture objects and captured rows
    ///
    /// Called after its entries in use and capacity were read.
    fn has_rows(&self, _profile: &Self::Target) -> bool {
        true
    }
}
