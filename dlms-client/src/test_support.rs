//! Scripted media and a toy framing codec for unit tests
//!
//! Toy frame layout: `[0xA5][flags][error as i8][len][payload..len]`.

use crate::codec::{Blocks, CipheringInfo, Codec, ReadoutPlan};
use crate::reply::ReplyData;
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use dlms_core::{
    Authentication, ConnectionState, DlmsError, DlmsResult, InterfaceType, Security,
};
use dlms_transport::{Media, ReceiveParameters};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex};

pub const FRAME_START: u8 = 0xA5;
pub const HEADER_LEN: usize = 4;
pub const FLAG_MORE: u8 = 0x01;
pub const FLAG_NOTIFY: u8 = 0x02;
pub const FLAG_STREAM: u8 = 0x04;
pub const RECEIVER_READY: [u8; 2] = [0x52, 0x52];
pub const LINK_SETUP: [u8; 1] = [0x93];
pub const ASSOCIATE: [u8; 1] = [0x60];
pub const HANDSHAKE: [u8; 1] = [0xC3];
pub const RELEASE: [u8; 1] = [0x62];
pub const DISCONNECT: [u8; 1] = [0x53];
pub const OBJECTS: [u8; 1] = [0x0F];

/// Build a complete, successful toy frame
pub fn frame(payload: &[u8]) -> Vec<u8> {
    frame_with(0, 0, payload)
}

pub fn frame_with(flags: u8, error: i32, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![FRAME_START, flags, error as i8 as u8, payload.len() as u8];
    bytes.extend_from_slice(payload);
    bytes
}

/// Encode values the way [`ToyCodec::unpack_list`] expects them
pub fn list(values: &[&[u8]]) -> Vec<u8> {
    let mut bytes = vec![values.len() as u8];
    for value in values {
        bytes.push(value.len() as u8);
        bytes.extend_from_slice(value);
    }
    bytes
}

/// Catalog id ranges of the toy codec's object kinds
pub const REGISTER_IDS: std::ops::RangeInclusive<u8> = 0x10..=0x1F;
pub const PROFILE_IDS: std::ops::RangeInclusive<u8> = 0x20..=0x2F;
pub const COMPACT_DATA_IDS: std::ops::RangeInclusive<u8> = 0x30..=0x3F;

/// Target of the toy codec: a named object with raw attribute values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestObject {
    pub name: String,
    pub attributes: Vec<u8>,
    pub values: BTreeMap<u8, Vec<u8>>,
}

impl TestObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_attributes(mut self, attributes: &[u8]) -> Self {
        self.attributes = attributes.to_vec();
        self
    }
}

impl fmt::Display for TestObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug)]
pub struct ToyCodec {
    interface: InterfaceType,
    state: ConnectionState,
    pre_established: bool,
    authentication: Authentication,
    security: Security,
    denied: BTreeSet<u8>,
    has_disconnect: bool,
    has_link_setup: bool,
    receiver_ready_count: usize,
    handshakes: usize,
    catalog: Vec<String>,
    requests: Vec<String>,
    ciphering: Option<CipheringInfo>,
}

impl ToyCodec {
    pub fn new() -> Self {
        Self {
            interface: InterfaceType::Wrapper,
            state: ConnectionState::None,
            pre_established: false,
            authentication: Authentication::None,
            security: Security::None,
            denied: BTreeSet::new(),
            has_disconnect: true,
            has_link_setup: true,
            receiver_ready_count: 0,
            handshakes: 0,
            catalog: Vec::new(),
            requests: Vec::new(),
            ciphering: None,
        }
    }

    pub fn with_interface(mut self, interface: InterfaceType) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_state(mut self, state: ConnectionState) -> Self {
        self.state = state;
        self
    }

    pub fn with_pre_established(mut self, pre_established: bool) -> Self {
        self.pre_established = pre_established;
        self
    }

    pub fn with_authentication(mut self, authentication: Authentication) -> Self {
        self.authentication = authentication;
        self
    }

    pub fn with_security(mut self, security: Security) -> Self {
        self.security = security;
        self
    }

    /// Deny every access to an attribute or method index
    pub fn deny(mut self, index: u8) -> Self {
        self.denied.insert(index);
        self
    }

    pub fn without_disconnect(mut self) -> Self {
        self.has_disconnect = false;
        self
    }

    pub fn without_link_setup(mut self) -> Self {
        self.has_link_setup = false;
        self
    }

    pub fn with_ciphering(mut self, ciphering: CipheringInfo) -> Self {
        self.ciphering = Some(ciphering);
        self
    }

    /// Attribute reads and row reads built so far, as `name:index` / `rows name`
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    pub fn receiver_ready_count(&self) -> usize {
        self.receiver_ready_count
    }

    pub fn handshakes(&self) -> usize {
        self.handshakes
    }

    pub fn catalog(&self) -> &[String] {
        &self.catalog
    }

    fn allowed(&self, index: u8) -> bool {
        !self.denied.contains(&index)
    }
}

impl Codec for ToyCodec {
    type Target = TestObject;
    type Value = Vec<u8>;
    type DateTime = u32;

    fn interface_type(&self) -> InterfaceType {
        self.interface
    }

    fn connection_state(&self) -> ConnectionState {
        self.state
    }

    fn pre_established(&self) -> bool {
        self.pre_established
    }

    fn authentication(&self) -> Authentication {
        self.authentication
    }

    fn security(&self) -> Security {
        self.security
    }

    fn can_read(&self, _target: &TestObject, index: u8) -> bool {
        self.allowed(index)
    }

    fn can_write(&self, _target: &TestObject, index: u8) -> bool {
        self.allowed(index)
    }

    fn can_invoke(&self, _target: &TestObject, index: u8) -> bool {
        self.allowed(index)
    }

    fn link_setup_request(&mut self) -> DlmsResult<Option<Vec<u8>>> {
        Ok(self.has_link_setup.then(|| LINK_SETUP.to_vec()))
    }

    fn association_request(&mut self) -> DlmsResult<Blocks> {
        Ok(vec![ASSOCIATE.to_vec()])
    }

    fn handshake_request(&mut self) -> DlmsResult<Blocks> {
        Ok(vec![HANDSHAKE.to_vec()])
    }

    fn receiver_ready(&mut self, _reply: &ReplyData<Vec<u8>>) -> DlmsResult<Vec<u8>> {
        self.receiver_ready_count += 1;
        Ok(RECEIVER_READY.to_vec())
    }

    fn release_request(&mut self) -> DlmsResult<Blocks> {
        Ok(vec![RELEASE.to_vec()])
    }

    fn disconnect_request(&mut self) -> DlmsResult<Option<Vec<u8>>> {
        self.state = ConnectionState::None;
        Ok(self.has_disconnect.then(|| DISCONNECT.to_vec()))
    }

    fn read_request(&mut self, target: &TestObject, index: u8) -> DlmsResult<Blocks> {
        self.requests.push(format!("{}:{}", target, index));
        Ok(vec![vec![0x01, index]])
    }

    fn read_list_request(&mut self, list: &[(TestObject, u8)]) -> DlmsResult<Blocks> {
        let mut block = vec![0x0A, list.len() as u8];
        block.extend(list.iter().map(|(_, index)| *index));
        Ok(vec![block])
    }

    fn write_request(&mut self, target: &TestObject, index: u8) -> DlmsResult<Blocks> {
        let mut block = vec![0x02, index];
        if let Some(value) = target.values.get(&index) {
            block.extend_from_slice(value);
        }
        Ok(vec![block])
    }

    fn method_request(
        &mut self,
        _target: &TestObject,
        index: u8,
        argument: Vec<u8>,
    ) -> DlmsResult<Blocks> {
        let mut block = vec![0x03, index];
        block.extend(argument);
        Ok(vec![block])
    }

    fn read_rows_by_entry_request(
        &mut self,
        target: &TestObject,
        index: u32,
        count: u32,
    ) -> DlmsResult<Blocks> {
        self.requests.push(format!("rows {}", target));
        Ok(vec![vec![0x0B, index as u8, count as u8]])
    }

    fn read_rows_by_range_request(
        &mut self,
        _target: &TestObject,
        start: &u32,
        end: &u32,
    ) -> DlmsResult<Blocks> {
        Ok(vec![vec![0x0C, *start as u8, *end as u8]])
    }

    fn objects_request(&mut self) -> DlmsResult<Blocks> {
        Ok(vec![OBJECTS.to_vec()])
    }

    fn frame_size(&self, buffer: &[u8]) -> usize {
        if buffer.len() < HEADER_LEN {
            return HEADER_LEN - buffer.len();
        }
        (HEADER_LEN + buffer[3] as usize)
            .saturating_sub(buffer.len())
            .max(1)
    }

    fn parse(
        &mut self,
        buffer: &mut BytesMut,
        reply: &mut ReplyData<Vec<u8>>,
        notify: &mut ReplyData<Vec<u8>>,
    ) -> DlmsResult<bool> {
        loop {
            if buffer.len() < HEADER_LEN {
                return Ok(false);
            }
            if buffer[0] != FRAME_START {
                return Err(DlmsError::FrameInvalid(format!(
                    "Unexpected start byte {:02X}",
                    buffer[0]
                )));
            }
            let len = buffer[3] as usize;
            if buffer.len() < HEADER_LEN + len {
                return Ok(false);
            }
            let header = buffer.split_to(HEADER_LEN);
            let payload = buffer.split_to(len);
            let flags = header[1];
            let error = header[2] as i8 as i32;

            if flags & FLAG_NOTIFY != 0 {
                notify.clear();
                notify.data_mut().extend_from_slice(&payload);
                notify.set_value(payload.to_vec());
                notify.set_notification(true);
                notify.set_complete(true);
                continue;
            }

            // An error reply carries no data.
            if error == 0 {
                reply.data_mut().extend_from_slice(&payload);
            }
            reply.set_error(error);
            reply.set_more_data(flags & FLAG_MORE != 0);
            reply.set_streaming(flags & FLAG_STREAM != 0);
            reply.set_complete(true);
            if !reply.is_more_data() && !reply.is_streaming() {
                let value = reply.data().to_vec();
                reply.set_value(value);
            }
            return Ok(true);
        }
    }

    fn apply_value(
        &mut self,
        target: &mut TestObject,
        index: u8,
        value: Option<Vec<u8>>,
    ) -> DlmsResult<Vec<u8>> {
        let value = value.ok_or_else(|| {
            DlmsError::InvalidData(format!("No value for {} index {}", target, index))
        })?;
        target.values.insert(index, value.clone());
        Ok(value)
    }

    fn apply_values(
        &mut self,
        list: &mut [(TestObject, u8)],
        values: Vec<Vec<u8>>,
    ) -> DlmsResult<()> {
        for ((target, index), value) in list.iter_mut().zip(values) {
            target.values.insert(*index, value);
        }
        Ok(())
    }

    fn unpack_list(&self, value: Vec<u8>) -> DlmsResult<Vec<Vec<u8>>> {
        let mut bytes = value.as_slice();
        if bytes.is_empty() {
            return Err(DlmsError::InvalidData("Empty list".to_string()));
        }
        let count = bytes.get_u8() as usize;
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            if bytes.is_empty() {
                return Err(DlmsError::InvalidData("Truncated list".to_string()));
            }
            let len = bytes.get_u8() as usize;
            if bytes.len() < len {
                return Err(DlmsError::InvalidData("Truncated list item".to_string()));
            }
            items.push(bytes[..len].to_vec());
            bytes.advance(len);
        }
        Ok(items)
    }

    fn parse_link_setup_response(&mut self, _data: &[u8]) -> DlmsResult<()> {
        self.state = ConnectionState::Hdlc;
        Ok(())
    }

    fn parse_association_response(&mut self, data: &[u8]) -> DlmsResult<()> {
        if data.first() == Some(&0xFF) {
            return Err(DlmsError::AccessDenied("Association rejected".to_string()));
        }
        self.state = ConnectionState::Dlms;
        Ok(())
    }

    fn parse_handshake_response(&mut self, _data: &[u8]) -> DlmsResult<()> {
        self.handshakes += 1;
        Ok(())
    }

    fn parse_objects(&mut self, data: &[u8]) -> DlmsResult<usize> {
        self.catalog = data.iter().map(|id| format!("object-{}", id)).collect();
        Ok(self.catalog.len())
    }

    fn load_objects(&mut self, path: &Path) -> DlmsResult<usize> {
        let text = std::fs::read_to_string(path)?;
        self.catalog = text.lines().filter(|l| !l.is_empty()).map(String::from).collect();
        Ok(self.catalog.len())
    }

    fn save_objects(&self, path: &Path) -> DlmsResult<()> {
        std::fs::write(path, self.catalog.join("\n"))?;
        Ok(())
    }

    fn attributes_to_read(&self, target: &TestObject) -> Vec<u8> {
        target.attributes.clone()
    }

    fn ciphering(&self) -> Option<CipheringInfo> {
        self.ciphering.clone()
    }

    fn readout_plan(&self) -> ReadoutPlan<TestObject> {
        let mut plan = ReadoutPlan::default();
        for name in &self.catalog {
            let id = name
                .strip_prefix("object-")
                .and_then(|id| id.parse::<u8>().ok())
                .unwrap_or(0);
            if PROFILE_IDS.contains(&id) {
                plan.profiles.push(TestObject::new(name));
                continue;
            }
            if REGISTER_IDS.contains(&id) {
                plan.scalers_and_units.push((TestObject::new(name), 3));
            }
            if COMPACT_DATA_IDS.contains(&id) {
                plan.compact_data.push(TestObject::new(name));
                plan.objects.push(TestObject::new(name));
            } else {
                plan.objects.push(TestObject::new(name).with_attributes(&[2]));
            }
        }
        plan
    }

    fn has_rows(&self, profile: &TestObject) -> bool {
        profile
            .values
            .get(&7)
            .and_then(|entries| entries.first())
            .is_some_and(|entries| *entries != 0)
    }
}

/// Observer of what a [`ScriptedMedia`] was asked to do
#[derive(Debug, Clone, Default)]
pub struct MediaLog {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    opens: Arc<Mutex<usize>>,
    closes: Arc<Mutex<usize>>,
}

impl MediaLog {
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn opens(&self) -> usize {
        *self.opens.lock().unwrap()
    }

    pub fn closes(&self) -> usize {
        *self.closes.lock().unwrap()
    }
}

/// Media replaying a fixed list of receive results
///
/// Each receive pops one entry: `Some(bytes)` is delivered as is, `None`
/// (or an exhausted script) is a timeout.
#[derive(Debug)]
pub struct ScriptedMedia {
    script: VecDeque<Option<Vec<u8>>>,
    log: MediaLog,
    open: bool,
}

impl ScriptedMedia {
    pub fn new(script: Vec<Option<Vec<u8>>>) -> (Self, MediaLog) {
        let log = MediaLog::default();
        let media = Self {
            script: script.into(),
            log: log.clone(),
            open: false,
        };
        (media, log)
    }
}

#[async_trait]
impl Media for ScriptedMedia {
    async fn open(&mut self) -> DlmsResult<()> {
        self.open = true;
        *self.log.opens.lock().unwrap() += 1;
        Ok(())
    }

    async fn close(&mut self) -> DlmsResult<()> {
        self.open = false;
        *self.log.closes.lock().unwrap() += 1;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    async fn send(&mut self, data: &[u8]) -> DlmsResult<()> {
        self.log.sent.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    async fn receive(&mut self, params: &mut ReceiveParameters) -> DlmsResult<bool> {
        match self.script.pop_front().flatten() {
            Some(bytes) => {
                params.reply = bytes;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
