//! Frame transaction: one request frame, one complete reply
//!
//! A transaction holds the media guard from its first send until the codec
//! reports a complete unit. Missing replies are retried a bounded number of
//! times, unsolicited notifications that arrive in between are handed to the
//! reader's notification handler, and a reply rejected by the device is
//! repeated after a back-off.

use crate::codec::Codec;
use crate::reader::DlmsReader;
use crate::reply::ReplyData;
use bytes::BytesMut;
use dlms_core::hex::to_hex;
use dlms_core::{DlmsError, DlmsResult, ErrorCode};
use dlms_transport::{Media, ReceiveParameters};

/// Log target of the TX/RX trace lines
pub const TRACE_TARGET: &str = "dlms_client::trace";

impl<M: Media, C: Codec> DlmsReader<M, C> {
    /// Send one frame and wait until one complete reply is parsed
    ///
    /// When `reply` is streaming, nothing is sent and the transaction only
    /// receives the rest of the current physical frame.
    ///
    /// # Arguments
    /// * `frame` - Encoded frame to send
    /// * `reply` - Accumulator the codec parses the reply into
    ///
    /// # Errors
    /// * `EmptyPacket` if `frame` is empty and `reply` is not streaming
    /// * `RetriesExhausted` if the device did not answer in time
    /// * `Device` if the device answered with an error code
    /// * any error reported by the media or the codec
    pub async fn read_dlms_packet(
        &mut self,
        frame: &[u8],
        reply: &mut ReplyData<C::Value>,
    ) -> DlmsResult<()> {
        let eop = self.codec.interface_type().end_of_packet();
        let mut rejected = 0u32;
        loop {
            if frame.is_empty() && !reply.is_streaming() {
                return Err(DlmsError::EmptyPacket);
            }
            reply.set_error(0);
            self.exchange(frame, eop, reply).await?;

            match reply.error_code() {
                None => return Ok(()),
                Some(ErrorCode::Rejected) if rejected < self.settings.max_rejected_retries => {
                    rejected += 1;
                    self.statistics.rejected_retries += 1;
                    log::warn!(
                        "Device rejected the request. Try again {}/{}",
                        rejected,
                        self.settings.max_rejected_retries
                    );
                    // Media guard is already released here. Collected segments
                    // and the streaming flag stay; only the error is reset.
                    tokio::time::sleep(self.settings.rejected_backoff()).await;
                }
                Some(code) => return Err(DlmsError::Device(code)),
            }
        }
    }

    /// One send/receive cycle under the media guard
    async fn exchange(
        &mut self,
        frame: &[u8],
        eop: Option<u8>,
        reply: &mut ReplyData<C::Value>,
    ) -> DlmsResult<()> {
        let shared = self.media.clone();
        let mut media = shared.acquire().await;

        let attempts = self.settings.attempts();
        let streaming = reply.is_streaming();
        let mut buffer = BytesMut::new();
        let mut notify = ReplyData::new();
        let mut params = ReceiveParameters::new(
            eop,
            self.codec.frame_size(&buffer),
            self.settings.wait_time(),
        );

        let mut attempt = 0u32;
        loop {
            if !streaming {
                if attempt > 0 {
                    self.statistics.resends += 1;
                }
                self.send_frame(&mut *media, frame).await?;
            }
            if self.receive_frame(&mut *media, &mut params).await? {
                break;
            }
            attempt += 1;
            if attempt >= attempts {
                return Err(DlmsError::RetriesExhausted { attempts: attempt });
            }
            // Without a frame marker, read one byte at a time.
            if eop.is_none() {
                params.count = 1;
            }
            log::warn!("Data send failed. Try to resend {}/{}", attempt, attempts);
        }
        buffer.extend_from_slice(&params.take_reply());

        attempt = 0;
        while !self.codec.parse(&mut buffer, reply, &mut notify)? {
            self.dispatch_notification(&mut notify);
            if eop.is_none() {
                params.count = self.codec.frame_size(&buffer);
            }
            while !self.receive_frame(&mut *media, &mut params).await? {
                attempt += 1;
                if attempt >= attempts {
                    return Err(DlmsError::RetriesExhausted { attempts: attempt });
                }
                if !frame.is_empty() {
                    self.statistics.resends += 1;
                    self.send_frame(&mut *media, frame).await?;
                }
                log::warn!("Data send failed. Try to resend {}/{}", attempt, attempts);
            }
            buffer.extend_from_slice(&params.take_reply());
        }
        self.dispatch_notification(&mut notify);
        Ok(())
    }

    async fn send_frame(&mut self, media: &mut M, frame: &[u8]) -> DlmsResult<()> {
        log::trace!(target: TRACE_TARGET, "TX:\t{}", to_hex(frame));
        media.send(frame).await?;
        self.statistics.frames_sent += 1;
        Ok(())
    }

    async fn receive_frame(
        &mut self,
        media: &mut M,
        params: &mut ReceiveParameters,
    ) -> DlmsResult<bool> {
        params.reply.clear();
        if media.receive(params).await? {
            log::trace!(target: TRACE_TARGET, "RX:\t{}", to_hex(&params.reply));
            self.statistics.frames_received += 1;
            Ok(true)
        } else {
            self.statistics.timeouts += 1;
            Ok(false)
        }
    }

    /// Hand a complete notification to the handler and reset it
    fn dispatch_notification(&mut self, notify: &mut ReplyData<C::Value>) {
        if !notify.is_complete() || notify.is_more_data() {
            return;
        }
        if let Some(value) = notify.take_value() {
            self.statistics.notifications += 1;
            match self.notification_handler.as_mut() {
                Some(handler) => handler(value),
                None => log::debug!("Notification dropped, no handler installed: {:?}", value),
            }
        }
        notify.clear();
    }
}
