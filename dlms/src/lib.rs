//! DLMS reader - request/reply transaction engine for DLMS/COSEM meters
//!
//! # Architecture
//!
//! This library is organized as a workspace with multiple crates:
//!
//! - `dlms-core`: Error handling, device error codes and link enumerations
//! - `dlms-transport`: Media layer (TCP, UDP, Serial) and exclusive-use handle
//! - `dlms-client`: Frame transaction, block sequencer and session operations
//!
//! # Implementation Status
//!
//! ## ✅ 已完成
//! - 传输层（TCP, UDP, Serial）
//! - 帧事务（重试、通知、拒绝重发）
//! - 多块数据接收（Receiver Ready）
//! - 会话操作（连接、读写、方法调用、释放、断开）
//!
//! # Usage
//!
//! ```no_run
//! use dlms::client::{DlmsReader, ReaderSettings};
//! use dlms::transport::TcpTransport;
//! ```

// Re-export core types
pub use dlms_core::{
    Authentication, ConnectionState, DlmsError, DlmsResult, ErrorCode, InterfaceType, Security,
};

// Re-export client API
pub mod client {
    pub use dlms_client::*;
}

// Re-export media layer
pub mod transport {
    pub use dlms_transport::*;
}
