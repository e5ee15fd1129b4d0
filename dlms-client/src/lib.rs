//! DLMS/COSEM reader
//!
//! This crate drives request/reply exchanges with a metering device over a
//! [`Media`](dlms_transport::Media). Protocol encoding is left to a
//! [`Codec`] implementation; the crate itself handles frame boundaries,
//! bounded retries, multi-block continuation and unsolicited notifications.
//!
//! # Layers
//!
//! - **Frame transaction** ([`DlmsReader::read_dlms_packet`]): one frame out,
//!   one complete reply back
//! - **Block sequencer** ([`DlmsReader::read_data_blocks`],
//!   [`DlmsReader::read_data_block`]): ordered blocks and receiver ready
//!   continuation
//! - **Session operations** ([`DlmsReader`]): connect, read, write, invoke,
//!   profile rows, association view, full readout, release and close
//!
//! # TODO
//!
//! ## 客户端功能
//! - [x] 读取/写入/方法调用
//! - [x] 列表读取（数量校验）
//! - [x] 曲线数据按条目/时间范围读取
//! - [x] 关联视图缓存
//! - [x] 完整抄读（ReadAll）
//! - [x] 事件通知处理（回调）
//! - [ ] 事件通知通过独立通道投递

mod blocks;
pub mod codec;
pub mod reader;
pub mod reply;
pub mod settings;
pub mod statistics;
mod transaction;

#[cfg(test)]
mod test_support;

pub use codec::{
    Blocks, CipheringInfo, Codec, ReadoutPlan, COMPACT_DATA_ATTRIBUTES, PROFILE_GENERIC_BUFFER,
    PROFILE_GENERIC_CAPTURE_OBJECTS, PROFILE_GENERIC_ENTRIES_IN_USE,
    PROFILE_GENERIC_PROFILE_ENTRIES,
};
pub use reader::{DlmsReader, NotificationHandler};
pub use reply::{ReplyData, ReplyState};
pub use settings::ReaderSettings;
pub use statistics::ExchangeStatistics;
pub use transaction::TRACE_TARGET;
