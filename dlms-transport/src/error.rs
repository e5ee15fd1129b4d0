//! Transport errors are the workspace-wide DLMS errors

pub use dlms_core::error::{DlmsError, DlmsResult};
