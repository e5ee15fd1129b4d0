//! Block sequencer
//!
//! Runs the blocks of one logical request through frame transactions in
//! order, and keeps asking the device for the next block (receiver ready)
//! while it reports that more data is pending.

use crate::codec::Codec;
use crate::reader::DlmsReader;
use crate::reply::ReplyData;
use dlms_core::DlmsResult;
use dlms_transport::Media;

impl<M: Media, C: Codec> DlmsReader<M, C> {
    /// Send every block of a request and collect the reply of the last one
    ///
    /// The accumulator is cleared before each block. An empty block set does
    /// nothing.
    ///
    /// # Returns
    /// `true` if the final reply carries no device error
    ///
    /// # Errors
    /// Stops at the first block that fails and returns its error.
    pub async fn read_data_blocks(
        &mut self,
        blocks: &[Vec<u8>],
        reply: &mut ReplyData<C::Value>,
    ) -> DlmsResult<bool> {
        for block in blocks {
            reply.clear();
            self.read_data_block(block, reply).await?;
        }
        Ok(reply.error() == 0)
    }

    /// Send one block and receive every continuation of its reply
    pub async fn read_data_block(
        &mut self,
        block: &[u8],
        reply: &mut ReplyData<C::Value>,
    ) -> DlmsResult<()> {
        self.read_dlms_packet(block, reply).await?;
        while self.needs_continuation(reply) {
            let next = if reply.is_streaming() {
                Vec::new()
            } else {
                self.codec.receiver_ready(reply)?
            };
            self.read_dlms_packet(&next, reply).await?;
        }
        Ok(())
    }

    fn needs_continuation(&self, reply: &ReplyData<C::Value>) -> bool {
        let linked = self.codec.connection_state().is_active() || self.codec.pre_established();
        (reply.is_more_data() && linked) || (reply.error() == 0 && reply.data().is_empty())
    }
}
