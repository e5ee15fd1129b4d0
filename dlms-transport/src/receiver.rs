//! Pending receive buffer shared by the media implementations

use crate::error::{DlmsError, DlmsResult};
use crate::media::ReceiveParameters;
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::Instant;

const READ_CHUNK_SIZE: usize = 1024;

/// Bytes received from the channel but not yet handed to the caller
#[derive(Debug, Default)]
pub(crate) struct ReceiveBuffer {
    pending: BytesMut,
}

impl ReceiveBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Length of the first receivable unit, if `params` is already satisfied
    fn ready_len(&self, params: &ReceiveParameters) -> Option<usize> {
        let count = params.count.max(1);
        if self.pending.len() < count {
            return None;
        }
        match params.eop {
            None => Some(count),
            Some(eop) => self.pending[count - 1..]
                .iter()
                .position(|b| *b == eop)
                .map(|pos| count + pos),
        }
    }

    /// Move the bytes satisfying `params` into `params.reply`
    ///
    /// Returns `false` and leaves everything buffered when not enough bytes
    /// have arrived yet.
    pub fn take_ready(&mut self, params: &mut ReceiveParameters) -> bool {
        let Some(len) = self.ready_len(params) else {
            return false;
        };
        let len = if params.all_data { self.pending.len() } else { len };
        params.reply = self.pending.split_to(len).to_vec();
        true
    }
}

/// Read from a byte stream until `params` is satisfied or the wait time ends
///
/// # Returns
/// `Ok(false)` on timeout. EOF is reported as `UnexpectedEof`.
pub(crate) async fn receive_from_stream<R>(
    reader: &mut R,
    buffer: &mut ReceiveBuffer,
    params: &mut ReceiveParameters,
) -> DlmsResult<bool>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let deadline = Instant::now() + params.wait_time;
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        if buffer.take_ready(params) {
            return Ok(true);
        }
        match tokio::time::timeout_at(deadline, reader.read(&mut chunk)).await {
            Err(_) => return Ok(false),
            Ok(Ok(0)) => {
                return Err(DlmsError::Connection(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "Connection closed by peer",
                )));
            }
            Ok(Ok(n)) => buffer.extend(&chunk[..n]),
            Ok(Err(e)) => return Err(DlmsError::Connection(e)),
        }
    }
}
