//! Reply accumulator for one logical exchange
//!
//! A [`ReplyData`] collects the bytes and the decoded value of one reply. It
//! is created per request, cleared (keeping its allocation) between the
//! blocks of a multi-block exchange and dropped when the exchange ends.
//!
//! The codec writes into it while parsing; the engine only reads the flags
//! to decide whether to send a continuation request, keep receiving, or
//! stop.

use bytes::BytesMut;
use dlms_core::ErrorCode;

/// Observable state of a reply between two receive attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyState {
    /// Nothing usable has been parsed yet
    Pending,
    /// The reply is complete
    Complete,
    /// The device holds more data and waits for a receiver ready request
    MoreData,
    /// Bytes of the current physical frame are still arriving
    Streaming,
    /// The device answered with an error code
    Error(i32),
}

/// Accumulated reply of one request
#[derive(Debug, Clone)]
pub struct ReplyData<V> {
    data: BytesMut,
    value: Option<V>,
    more_data: bool,
    streaming: bool,
    complete: bool,
    notification: bool,
    error: i32,
}

impl<V> Default for ReplyData<V> {
    fn default() -> Self {
        Self {
            data: BytesMut::new(),
            value: None,
            more_data: false,
            streaming: false,
            complete: false,
            notification: false,
            error: 0,
        }
    }
}

impl<V> ReplyData<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset every field, keeping the byte buffer's allocation
    pub fn clear(&mut self) {
        self.data.clear();
        self.value = None;
        self.more_data = false;
        self.streaming = false;
        self.complete = false;
        self.notification = false;
        self.error = 0;
    }

    /// Payload bytes collected so far
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut BytesMut {
        &mut self.data
    }

    pub fn value(&self) -> Option<&V> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: V) {
        self.value = Some(value);
    }

    pub fn take_value(&mut self) -> Option<V> {
        self.value.take()
    }

    pub fn is_more_data(&self) -> bool {
        self.more_data
    }

    pub fn set_more_data(&mut self, more_data: bool) {
        self.more_data = more_data;
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn set_streaming(&mut self, streaming: bool) {
        self.streaming = streaming;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn set_complete(&mut self, complete: bool) {
        self.complete = complete;
    }

    /// Check if this reply is an unsolicited notification
    pub fn is_notification(&self) -> bool {
        self.notification
    }

    pub fn set_notification(&mut self, notification: bool) {
        self.notification = notification;
    }

    /// Last device error code, `0` on success
    pub fn error(&self) -> i32 {
        self.error
    }

    pub fn set_error(&mut self, error: i32) {
        self.error = error;
    }

    /// Last device error code as an [`ErrorCode`], `None` on success
    pub fn error_code(&self) -> Option<ErrorCode> {
        (self.error != 0).then(|| ErrorCode::from(self.error))
    }

    pub fn state(&self) -> ReplyState {
        if self.error != 0 {
            ReplyState::Error(self.error)
        } else if self.streaming {
            ReplyState::Streaming
        } else if self.more_data {
            ReplyState::MoreData
        } else if self.complete {
            ReplyState::Complete
        } else {
            ReplyState::Pending
        }
    }
}
