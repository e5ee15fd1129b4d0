//! DLMS reader: session operations on top of the transaction engine
//!
//! A [`DlmsReader`] owns one codec and one shared media. Every operation
//! follows the same shape: check the capability, let the codec build the
//! request blocks, run them through the block sequencer, then let the codec
//! apply what came back.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! let media = TcpTransport::from_address("192.168.1.10:4059")?;
//! let mut reader = DlmsReader::new(media, codec, ReaderSettings::default());
//! reader.connect().await?;
//! let value = reader.read(&mut clock, 2).await?;
//! reader.close().await?;
//! ```

use crate::codec::{
    Blocks, Codec, ReadoutPlan, COMPACT_DATA_ATTRIBUTES, PROFILE_GENERIC_BUFFER,
    PROFILE_GENERIC_CAPTURE_OBJECTS, PROFILE_GENERIC_ENTRIES_IN_USE,
    PROFILE_GENERIC_PROFILE_ENTRIES,
};
use crate::reply::ReplyData;
use crate::settings::ReaderSettings;
use crate::statistics::ExchangeStatistics;
use dlms_core::hex::to_hex;
use dlms_core::{DlmsError, DlmsResult, InterfaceType, Security};
use dlms_transport::{Media, MediaEventReceiver, SharedMedia};
use std::path::Path;

/// Callback receiving decoded unsolicited values
pub type NotificationHandler<V> = Box<dyn FnMut(V) + Send>;

/// Client side of one metering device connection
pub struct DlmsReader<M: Media, C: Codec> {
    pub(crate) media: SharedMedia<M>,
    pub(crate) codec: C,
    pub(crate) settings: ReaderSettings,
    pub(crate) notification_handler: Option<NotificationHandler<C::Value>>,
    pub(crate) statistics: ExchangeStatistics,
    closed: bool,
}

impl<M: Media, C: Codec> DlmsReader<M, C> {
    /// Create a reader that owns its media
    pub fn new(media: M, codec: C, settings: ReaderSettings) -> Self {
        Self::with_shared_media(SharedMedia::new(media), codec, settings)
    }

    /// Create a reader on a media handle that other tasks may also hold
    pub fn with_shared_media(media: SharedMedia<M>, codec: C, settings: ReaderSettings) -> Self {
        Self {
            media,
            codec,
            settings,
            notification_handler: None,
            statistics: ExchangeStatistics::new(),
            closed: false,
        }
    }

    pub fn media(&self) -> &SharedMedia<M> {
        &self.media
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn codec_mut(&mut self) -> &mut C {
        &mut self.codec
    }

    pub fn settings(&self) -> &ReaderSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: ReaderSettings) {
        self.settings = settings;
    }

    pub fn statistics(&self) -> &ExchangeStatistics {
        &self.statistics
    }

    pub fn clear_statistics(&mut self) {
        self.statistics.clear();
    }

    /// Check if [`close`](Self::close) has run since the last connect
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Install the callback that receives unsolicited notifications
    ///
    /// The callback runs inside the receive loop, so it must not block.
    pub fn set_notification_handler<F>(&mut self, handler: F)
    where
        F: FnMut(C::Value) + Send + 'static,
    {
        self.notification_handler = Some(Box::new(handler));
    }

    pub fn clear_notification_handler(&mut self) {
        self.notification_handler = None;
    }

    /// Subscribe to the media's trace and error events
    pub async fn media_events(&self) -> MediaEventReceiver {
        self.media.subscribe().await
    }

    /// Open the media and establish the association
    ///
    /// Runs the link setup, then (unless the connection is pre-established)
    /// the association request and, for authentication above `Low`, the high
    /// level security handshake.
    ///
    /// # Errors
    /// Returns error if the media cannot be opened or any step fails
    pub async fn connect(&mut self) -> DlmsResult<()> {
        log::info!("Interface: {}", self.codec.interface_type());
        if self.codec.security() != Security::None {
            log::info!("Security: {:?}", self.codec.security());
            for line in self.ciphering_summary() {
                log::debug!("{}", line);
            }
        }
        self.media.open().await?;
        self.closed = false;

        self.link_setup().await?;
        if self.codec.pre_established() {
            return Ok(());
        }
        self.associate().await?;
        log::info!("Conformance: {:#08X}", self.codec.negotiated_conformance());
        Ok(())
    }

    /// Ciphering material as hex lines; the dedicated key only when set
    fn ciphering_summary(&self) -> Vec<String> {
        let Some(keys) = self.codec.ciphering() else {
            return Vec::new();
        };
        let mut lines = vec![
            format!("System title: {}", to_hex(&keys.system_title)),
            format!("Authentication key: {}", to_hex(&keys.authentication_key)),
            format!("Block cipher key: {}", to_hex(&keys.block_cipher_key)),
        ];
        if !keys.dedicated_key.is_empty() {
            lines.push(format!("Dedicated key: {}", to_hex(&keys.dedicated_key)));
        }
        lines
    }

    async fn link_setup(&mut self) -> DlmsResult<()> {
        let Some(frame) = self.codec.link_setup_request()? else {
            return Ok(());
        };
        let mut reply = ReplyData::new();
        self.read_data_block(&frame, &mut reply).await?;
        log::debug!("Parsing UA reply");
        self.codec.parse_link_setup_response(reply.data())
    }

    async fn associate(&mut self) -> DlmsResult<()> {
        let blocks = self.codec.association_request()?;
        if blocks.is_empty() {
            return Ok(());
        }
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        self.codec.parse_association_response(reply.data())?;

        if self.codec.authentication().requires_hls() {
            let blocks = self.codec.handshake_request()?;
            self.read_data_blocks(&blocks, &mut reply).await?;
            self.codec.parse_handshake_response(reply.data())?;
        }
        Ok(())
    }

    /// Read one attribute and store it on the target
    ///
    /// # Arguments
    /// * `target` - Object to read
    /// * `index` - Attribute index
    ///
    /// # Returns
    /// The value as returned by the codec after applying it
    ///
    /// # Errors
    /// * `AccessDenied` if the attribute is not readable
    /// * any transaction or codec error
    pub async fn read(&mut self, target: &mut C::Target, index: u8) -> DlmsResult<C::Value> {
        if !self.codec.can_read(target, index) {
            return Err(DlmsError::AccessDenied(format!(
                "Cannot read {} index {}",
                target, index
            )));
        }
        let blocks = self.codec.read_request(target, index)?;
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        self.codec.apply_value(target, index, reply.take_value())
    }

    /// Read several attributes with list requests
    ///
    /// Values are applied in request order. When the device returns a
    /// different number of values than requested nothing is applied.
    ///
    /// # Errors
    /// * `AccessDenied` if any attribute is not readable
    /// * `CountMismatch` if the number of values differs from the request
    pub async fn read_many(&mut self, list: &mut [(C::Target, u8)]) -> DlmsResult<()> {
        if let Some((target, index)) = list
            .iter()
            .find(|(target, index)| !self.codec.can_read(target, *index))
        {
            return Err(DlmsError::AccessDenied(format!(
                "Cannot read {} index {}",
                target, index
            )));
        }
        let blocks = self.codec.read_list_request(list)?;
        let mut reply = ReplyData::new();
        let mut values = Vec::with_capacity(list.len());
        for block in &blocks {
            self.read_data_block(block, &mut reply).await?;
            if !reply.is_more_data() {
                if let Some(value) = reply.take_value() {
                    values.extend(self.codec.unpack_list(value)?);
                }
            }
            reply.clear();
        }
        if values.len() != list.len() {
            return Err(DlmsError::CountMismatch {
                expected: list.len(),
                actual: values.len(),
            });
        }
        self.codec.apply_values(list, values)
    }

    /// Write the target's current attribute value to the device
    pub async fn write(&mut self, target: &C::Target, index: u8) -> DlmsResult<()> {
        if !self.codec.can_write(target, index) {
            return Err(DlmsError::AccessDenied(format!(
                "Cannot write {} index {}",
                target, index
            )));
        }
        let blocks = self.codec.write_request(target, index)?;
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        Ok(())
    }

    /// Invoke a method
    ///
    /// # Returns
    /// The method's return value, if the device sent one
    pub async fn invoke(
        &mut self,
        target: &C::Target,
        method: u8,
        argument: C::Value,
    ) -> DlmsResult<Option<C::Value>> {
        if !self.codec.can_invoke(target, method) {
            return Err(DlmsError::AccessDenied(format!(
                "Cannot invoke {} method {}",
                target, method
            )));
        }
        let blocks = self.codec.method_request(target, method, argument)?;
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        Ok(reply.take_value())
    }

    /// Read profile rows starting at entry `index`
    pub async fn read_rows_by_entry(
        &mut self,
        target: &mut C::Target,
        index: u32,
        count: u32,
    ) -> DlmsResult<Vec<C::Value>> {
        self.check_rows_readable(target)?;
        let blocks = self.codec.read_rows_by_entry_request(target, index, count)?;
        self.read_rows(target, blocks).await
    }

    /// Read profile rows captured between `start` and `end`
    pub async fn read_rows_by_range(
        &mut self,
        target: &mut C::Target,
        start: &C::DateTime,
        end: &C::DateTime,
    ) -> DlmsResult<Vec<C::Value>> {
        self.check_rows_readable(target)?;
        let blocks = self.codec.read_rows_by_range_request(target, start, end)?;
        self.read_rows(target, blocks).await
    }

    fn check_rows_readable(&self, target: &C::Target) -> DlmsResult<()> {
        if self.codec.can_read(target, PROFILE_GENERIC_BUFFER) {
            Ok(())
        } else {
            Err(DlmsError::AccessDenied(format!("Cannot read rows of {}", target)))
        }
    }

    async fn read_rows(
        &mut self,
        target: &mut C::Target,
        blocks: Blocks,
    ) -> DlmsResult<Vec<C::Value>> {
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        let value = self
            .codec
            .apply_value(target, PROFILE_GENERIC_BUFFER, reply.take_value())?;
        self.codec.unpack_list(value)
    }

    /// Load the object catalog, from `cache` when possible
    ///
    /// A cache that cannot be loaded is deleted. After reading from the
    /// device the catalog is saved to `cache`.
    ///
    /// # Returns
    /// `true` if the catalog was read from the device, `false` if it came
    /// from the cache
    pub async fn get_association_view(&mut self, cache: Option<&Path>) -> DlmsResult<bool> {
        if let Some(path) = cache {
            if tokio::fs::try_exists(path).await.unwrap_or(false) {
                match self.codec.load_objects(path) {
                    Ok(count) if count != 0 => return Ok(false),
                    Ok(_) => {}
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", path.display(), e);
                        if let Err(e) = tokio::fs::remove_file(path).await {
                            log::warn!("Failed to remove {}: {}", path.display(), e);
                        }
                    }
                }
            }
        }

        let blocks = self.codec.objects_request()?;
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        let count = self.codec.parse_objects(reply.data())?;
        log::info!("Association view holds {} objects", count);
        if let Some(path) = cache {
            self.codec.save_objects(path)?;
        }
        Ok(true)
    }

    /// Read every attribute the codec lists for each target
    ///
    /// Failures are logged and skipped.
    ///
    /// # Returns
    /// Number of attributes read successfully
    pub async fn read_out(&mut self, targets: &mut [C::Target]) -> usize {
        let mut read = 0;
        for target in targets.iter_mut() {
            for index in self.codec.attributes_to_read(target) {
                if !self.codec.can_read(target, index) {
                    continue;
                }
                match self.read(target, index).await {
                    Ok(value) => {
                        read += 1;
                        log::debug!("{} Index: {} Value: {:?}", target, index, value);
                    }
                    Err(e) => log::warn!("Read failed {}:{}: {}", target, index, e),
                }
            }
        }
        read
    }

    /// Connect and read everything the catalog offers
    ///
    /// Steps, in order: connect, association view, scalers/units and
    /// profile columns (only when the catalog came from the device), compact
    /// data, readout of every non-profile object, profile entries with the
    /// first row of each profile that has rows, catalog save.
    ///
    /// Failures after the association view are logged and skipped.
    ///
    /// # Returns
    /// The plan the codec produced, with the values applied to its targets
    ///
    /// # Errors
    /// Returns error if connecting or loading the association view fails
    pub async fn read_all(&mut self, cache: Option<&Path>) -> DlmsResult<ReadoutPlan<C::Target>> {
        self.connect().await?;
        let from_device = self.get_association_view(cache).await?;
        let mut plan = self.codec.readout_plan();
        if from_device {
            self.read_scalers_and_units(&mut plan.scalers_and_units).await;
            self.read_profile_columns(&mut plan.profiles).await;
        }
        self.read_compact_data(&mut plan.compact_data).await;
        let read = self.read_out(&mut plan.objects).await;
        log::info!("Readout: {} attributes", read);
        self.read_profiles(&mut plan.profiles).await;
        if let Some(path) = cache {
            if let Err(e) = self.codec.save_objects(path) {
                log::warn!("Failed to save {}: {}", path.display(), e);
            }
        }
        Ok(plan)
    }

    async fn read_scalers_and_units(&mut self, targets: &mut [(C::Target, u8)]) {
        for (target, index) in targets.iter_mut() {
            if !self.codec.can_read(target, *index) {
                continue;
            }
            if let Err(e) = self.read(target, *index).await {
                log::warn!("Scaler and unit read failed {}: {}", target, e);
            }
        }
    }

    async fn read_profile_columns(&mut self, profiles: &mut [C::Target]) {
        for profile in profiles.iter_mut() {
            match self.read(profile, PROFILE_GENERIC_CAPTURE_OBJECTS).await {
                Ok(columns) => log::debug!("Profile {} columns: {:?}", profile, columns),
                Err(e) => log::warn!("Profile columns read failed {}: {}", profile, e),
            }
        }
    }

    async fn read_compact_data(&mut self, targets: &mut [C::Target]) {
        for target in targets.iter_mut() {
            for index in COMPACT_DATA_ATTRIBUTES {
                if !self.codec.can_read(target, index) {
                    continue;
                }
                if let Err(e) = self.read(target, index).await {
                    log::warn!("Read failed {}:{}: {}", target, index, e);
                }
            }
        }
    }

    async fn read_profiles(&mut self, profiles: &mut [C::Target]) {
        for profile in profiles.iter_mut() {
            for index in [PROFILE_GENERIC_ENTRIES_IN_USE, PROFILE_GENERIC_PROFILE_ENTRIES] {
                if !self.codec.can_read(profile, index) {
                    continue;
                }
                if let Err(e) = self.read(profile, index).await {
                    log::warn!("Read failed {}:{}: {}", profile, index, e);
                }
            }
            if !self.codec.has_rows(profile) {
                continue;
            }
            match self.read_rows_by_entry(profile, 1, 1).await {
                Ok(rows) => {
                    for row in rows {
                        log::debug!("{} row: {:?}", profile, row);
                    }
                }
                Err(e) => log::warn!("Row read failed {}: {}", profile, e),
            }
        }
    }

    /// Release the association
    ///
    /// Only the wrapper interface and ciphered, not pre-established
    /// connections send a release request.
    pub async fn release(&mut self) -> DlmsResult<()> {
        let wrapper = self.codec.interface_type() == InterfaceType::Wrapper;
        let ciphered = self.codec.security() != Security::None && !self.codec.pre_established();
        if !wrapper && !ciphered {
            return Ok(());
        }
        let blocks = self.codec.release_request()?;
        let mut reply = ReplyData::new();
        self.read_data_blocks(&blocks, &mut reply).await?;
        Ok(())
    }

    /// Release (best effort), then send the disconnect request
    pub async fn disconnect(&mut self) -> DlmsResult<()> {
        if let Err(e) = self.release().await {
            // Not every meter supports release.
            log::warn!("Release failed: {}", e);
        }
        let Some(frame) = self.codec.disconnect_request()? else {
            return Ok(());
        };
        let mut reply = ReplyData::new();
        self.read_dlms_packet(&frame, &mut reply).await
    }

    /// Disconnect and close the media
    ///
    /// A second call does nothing. The media is closed even when the
    /// disconnect fails.
    pub async fn close(&mut self) -> DlmsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.media.is_open().await {
            if let Err(e) = self.disconnect().await {
                log::warn!("Disconnect failed: {}", e);
            }
        }
        self.media.close().await
    }
}
